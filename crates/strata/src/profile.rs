//! Profiles: live instances of a schema
//!
//! A [`Profile`] holds the current value of every setting of a [`Schema`],
//! enforces mutability on writes and tracks whether anything changed since it
//! was created. All state sits behind one reader/writer lock so a profile can
//! be shared between threads.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

use strata_types::version;

use crate::preferences::Preferences;
use crate::prelude::*;
use crate::schema::Schema;
use crate::spec::{DEFAULT_LANG, SettingSpec};

/// Live counterpart of a [`SettingSpec`] inside a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
	key: Box<str>,
	kind: Kind,
	value: SettingValue,
	default: String,
	is_set: bool,
	mutability: Mutability,
	persistent: bool,
	required: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	description: Option<Box<str>>,
}

impl Setting {
	fn from_spec(spec: &SettingSpec, lang: &str) -> StResult<Self> {
		Ok(Self {
			key: spec.key.clone(),
			kind: spec.kind(),
			value: spec.decode(spec.initial_value())?,
			default: spec.default_value().to_string(),
			is_set: spec.is_set(),
			mutability: spec.mutability(),
			persistent: spec.persistent(),
			required: spec.required(),
			description: spec.description(lang).map(Into::into),
		})
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn kind(&self) -> Kind {
		self.kind
	}

	pub fn value(&self) -> &SettingValue {
		&self.value
	}

	/// Canonical string form of the default value
	pub fn default_value(&self) -> &str {
		&self.default
	}

	/// Whether the value was written by a user or loaded from preferences
	pub fn is_set(&self) -> bool {
		self.is_set
	}

	pub fn mutability(&self) -> Mutability {
		self.mutability
	}

	pub fn persistent(&self) -> bool {
		self.persistent
	}

	pub fn required(&self) -> bool {
		self.required
	}

	/// Description in the profile's language
	pub fn description(&self) -> Option<&str> {
		self.description.as_deref()
	}
}

impl fmt::Display for Setting {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.value, f)
	}
}

/// What to do with stored preference keys the schema cannot resolve
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
	/// Drop them silently (logged at debug level)
	#[default]
	Drop,
	/// Drop them, but keep a list available through [`Profile::unresolved`]
	Report,
	/// Fail the load
	Reject,
}

/// Profile creation options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileOptions {
	/// Language used for setting descriptions
	pub lang: Box<str>,
	pub unresolved: UnresolvedPolicy,
}

impl Default for ProfileOptions {
	fn default() -> Self {
		Self { lang: DEFAULT_LANG.into(), unresolved: UnresolvedPolicy::default() }
	}
}

impl ProfileOptions {
	pub fn with_lang(mut self, lang: &str) -> Self {
		self.lang = lang.into();
		self
	}

	pub fn with_unresolved(mut self, policy: UnresolvedPolicy) -> Self {
		self.unresolved = policy;
		self
	}
}

#[derive(Debug)]
struct ProfileState {
	loaded: bool,
	changed: bool,
	settings: HashMap<Box<str>, Setting>,
	unresolved: Vec<Box<str>>,
}

pub struct Profile {
	name: Box<str>,
	lang: Box<str>,
	policy: UnresolvedPolicy,
	schema: Schema,
	state: RwLock<ProfileState>,
}

impl fmt::Debug for Profile {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.state.read();
		f.debug_struct("Profile")
			.field("name", &self.name)
			.field("lang", &self.lang)
			.field("schema", &self.schema)
			.field("loaded", &state.loaded)
			.field("changed", &state.changed)
			.finish_non_exhaustive()
	}
}

impl Schema {
	/// Create a profile, optionally seeded from stored preferences
	pub fn profile(&self, name: &str, preferences: Option<&Preferences>) -> StResult<Profile> {
		self.profile_with(name, preferences, &ProfileOptions::default())
	}

	pub fn profile_with(
		&self,
		name: &str,
		preferences: Option<&Preferences>,
		options: &ProfileOptions,
	) -> StResult<Profile> {
		let mut settings = HashMap::with_capacity(self.len());
		for spec in self.specs() {
			settings.insert(spec.key.clone(), Setting::from_spec(spec, &options.lang)?);
		}

		let profile = Profile {
			name: name.into(),
			lang: options.lang.clone(),
			policy: options.unresolved,
			schema: self.clone(),
			state: RwLock::new(ProfileState {
				loaded: false,
				changed: false,
				settings,
				unresolved: Vec::new(),
			}),
		};
		if let Some(preferences) = preferences {
			profile.load(preferences)?;
		}
		debug!("Created profile {} from schema {}", name, self.id());
		Ok(profile)
	}
}

/// Decode and validate one stored value into the staged settings
fn stage(
	schema: &Schema,
	staged: &mut HashMap<Box<str>, Setting>,
	key: &str,
	raw: &str,
) -> StResult<()> {
	let (Some(spec), Some(setting)) = (schema.spec(key), staged.get_mut(key)) else {
		return Err(Error::KeyNotFound(key.into()));
	};
	setting.value = spec.decode_validated(key, raw)?;
	setting.is_set = true;
	Ok(())
}

impl Profile {
	/// Load stored preferences into this profile
	///
	/// Allowed once per profile. The stored version must equal the schema
	/// version as a semantic version, not as a string: a leading `v` is
	/// ignored, so `v1.0.0` matches `1.0.0`, while `1.0.1` or `1.0.0-rc.1`
	/// do not. Stored keys are matched directly first, then through the
	/// schema's migrations; a direct match wins over a migrated one. Any
	/// decode or validation failure leaves the profile untouched.
	pub fn load(&self, preferences: &Preferences) -> StResult<()> {
		let mut state = self.state.write();
		if state.loaded {
			return Err(Error::AlreadyLoaded(self.name.clone()));
		}

		let found = version::parse(preferences.version())?;
		if &found != self.schema.semver() {
			warn!(
				"Preferences version {} does not match schema version {} for profile {}",
				preferences.version(),
				self.schema.version(),
				self.name
			);
			return Err(Error::VersionMismatch {
				expected: self.schema.version().into(),
				found: preferences.version().into(),
			});
		}

		let mut direct = Vec::new();
		let mut migrated = Vec::new();
		let mut unresolved = Vec::new();
		for (key, raw) in preferences.iter() {
			if self.schema.contains(key) {
				direct.push((key, raw));
			} else if let Some(target) = self.schema.resolve(key) {
				migrated.push((key, target, raw));
			} else {
				unresolved.push(key);
			}
		}

		match self.policy {
			UnresolvedPolicy::Reject => {
				if let Some(key) = unresolved.first() {
					warn!("Unknown preference '{}' in profile {}", key, self.name);
					return Err(Error::UnresolvedPreference((*key).into()));
				}
			}
			UnresolvedPolicy::Report => {
				for key in &unresolved {
					warn!("Dropping unknown preference '{}' in profile {}", key, self.name);
				}
			}
			UnresolvedPolicy::Drop => {
				for key in &unresolved {
					debug!("Dropping unknown preference '{}' in profile {}", key, self.name);
				}
			}
		}

		let mut staged = state.settings.clone();
		let mut loaded = HashSet::new();
		for (key, raw) in direct {
			stage(&self.schema, &mut staged, key, raw)?;
			loaded.insert(key);
		}
		for (from, to, raw) in migrated {
			if loaded.contains(to) {
				debug!("Preference '{}' shadowed by '{}'", from, to);
				continue;
			}
			debug!("Migrating preference '{}' to '{}'", from, to);
			stage(&self.schema, &mut staged, to, raw)?;
			loaded.insert(to);
		}

		state.settings = staged;
		state.loaded = true;
		if self.policy == UnresolvedPolicy::Report {
			state.unresolved = unresolved.into_iter().map(Into::into).collect();
		}
		info!("Loaded {} preferences into profile {}", loaded.len(), self.name);
		Ok(())
	}

	pub fn get(&self, key: &str) -> Option<Setting> {
		self.state.read().settings.get(key).cloned()
	}

	pub fn has(&self, key: &str) -> bool {
		self.state.read().settings.contains_key(key)
	}

	/// Description of a setting in the profile's language
	pub fn describe(&self, key: &str) -> StResult<Option<&str>> {
		let spec = self.schema.spec(key).ok_or_else(|| Error::KeyNotFound(key.into()))?;
		Ok(spec.description(&self.lang))
	}

	/// Write a setting
	///
	/// Immutable settings always reject, `Once` settings reject after the
	/// first write. The value is decoded and validated before anything is
	/// touched. Writing the value a setting already holds does not mark the
	/// profile as changed.
	pub fn set(&self, key: &str, value: &str) -> StResult<()> {
		let spec = self.schema.spec(key).ok_or_else(|| Error::KeyNotFound(key.into()))?;

		let mut guard = self.state.write();
		let state = &mut *guard;
		let setting =
			state.settings.get_mut(key).ok_or_else(|| Error::KeyNotFound(key.into()))?;

		if !setting.mutability.allows(setting.is_set) {
			warn!(
				"Rejected write to {} setting '{}' in profile {}",
				setting.mutability, key, self.name
			);
			return Err(Error::Mutability { key: key.into(), mutability: setting.mutability });
		}

		let value = spec.decode_validated(key, value)?;
		if value.encode() != setting.value.encode() {
			state.changed = true;
		}
		setting.value = value;
		setting.is_set = true;

		info!("Setting '{}' updated in profile {}", key, self.name);
		Ok(())
	}

	/// Restore a mutable setting to its default and mark it unset
	pub fn reset(&self, key: &str) -> StResult<()> {
		let spec = self.schema.spec(key).ok_or_else(|| Error::KeyNotFound(key.into()))?;

		let mut guard = self.state.write();
		let state = &mut *guard;
		let setting =
			state.settings.get_mut(key).ok_or_else(|| Error::KeyNotFound(key.into()))?;
		if setting.mutability != Mutability::Mutable {
			return Err(Error::Mutability { key: key.into(), mutability: setting.mutability });
		}

		let value = spec.decode(spec.default_value())?;
		if value.encode() != setting.value.encode() {
			state.changed = true;
		}
		setting.value = value;
		setting.is_set = false;

		info!("Setting '{}' reset in profile {}", key, self.name);
		Ok(())
	}

	/// Snapshot of every persistent, user-set value
	pub fn preferences(&self) -> Preferences {
		let state = self.state.read();
		let mut preferences = Preferences::new(self.schema.version());
		for setting in state.settings.values().filter(|s| s.persistent && s.is_set) {
			preferences.insert(&setting.key, setting.value.encode());
		}
		preferences
	}

	/// Key-sorted snapshot of all settings
	///
	/// The lock is released before the snapshot is returned, so callers may
	/// call back into the profile while iterating.
	pub fn all(&self) -> Vec<Setting> {
		let mut settings: Vec<Setting> = self.state.read().settings.values().cloned().collect();
		settings.sort_by(|a, b| a.key.cmp(&b.key));
		settings
	}

	/// Key-sorted snapshot of the settings under `prefix`
	pub fn all_with_prefix(&self, prefix: &str) -> Vec<Setting> {
		let mut settings: Vec<Setting> = self
			.state
			.read()
			.settings
			.values()
			.filter(|setting| setting.key.starts_with(prefix))
			.cloned()
			.collect();
		settings.sort_by(|a, b| a.key.cmp(&b.key));
		settings
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn lang(&self) -> &str {
		&self.lang
	}

	/// Schema version this profile was created from
	pub fn version(&self) -> &str {
		self.schema.version()
	}

	pub fn schema(&self) -> &Schema {
		&self.schema
	}

	/// Whether any setting changed its value since creation
	pub fn changed(&self) -> bool {
		self.state.read().changed
	}

	pub fn is_loaded(&self) -> bool {
		self.state.read().loaded
	}

	/// Stored keys dropped on load under [`UnresolvedPolicy::Report`]
	pub fn unresolved(&self) -> Vec<String> {
		self.state.read().unresolved.iter().map(ToString::to_string).collect()
	}

	fn typed<T>(
		&self,
		key: &str,
		expected: Kind,
		extract: impl FnOnce(&SettingValue) -> Option<T>,
	) -> StResult<T> {
		let state = self.state.read();
		let setting = state.settings.get(key).ok_or_else(|| Error::KeyNotFound(key.into()))?;
		extract(&setting.value).ok_or_else(|| Error::TypeMismatch {
			key: key.into(),
			expected,
			found: setting.kind,
		})
	}

	pub fn get_bool(&self, key: &str) -> StResult<bool> {
		self.typed(key, Kind::Bool, SettingValue::as_bool)
	}

	pub fn get_int(&self, key: &str) -> StResult<i64> {
		self.typed(key, Kind::Int, SettingValue::as_int)
	}

	pub fn get_uint(&self, key: &str) -> StResult<u64> {
		self.typed(key, Kind::Uint, SettingValue::as_uint)
	}

	pub fn get_string(&self, key: &str) -> StResult<String> {
		self.typed(key, Kind::String, |value| value.as_str().map(str::to_string))
	}

	pub fn get_duration(&self, key: &str) -> StResult<Duration> {
		self.typed(key, Kind::Duration, SettingValue::as_duration)
	}

	pub fn get_string_list(&self, key: &str) -> StResult<Vec<String>> {
		self.typed(key, Kind::StringList, |value| value.as_list().map(<[String]>::to_vec))
	}

	/// Required settings that are neither set nor carry a non-empty value
	pub fn missing_required(&self) -> Vec<String> {
		let state = self.state.read();
		let mut missing: Vec<String> = state
			.settings
			.values()
			.filter(|s| s.required && !s.is_set && s.value.is_zero())
			.map(|s| s.key.to_string())
			.collect();
		drop(state);
		missing.sort();
		missing
	}

	pub fn validate_required(&self) -> StResult<()> {
		match self.missing_required().into_iter().next() {
			Some(key) => {
				error!("Required setting '{}' has no value in profile {}", key, self.name);
				Err(Error::Required(key.into()))
			}
			None => Ok(()),
		}
	}
}


// vim: ts=4
