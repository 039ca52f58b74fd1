//! Blueprint: mutable builder of setting specifications
//!
//! A blueprint collects specs, named subgroups, validators, descriptions and
//! key migrations. It stays mutable until [`Blueprint::schema`] compiles it;
//! after that every group in the tree is frozen.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use strata_types::key;

use crate::prelude::*;
use crate::scanner::{self, Descriptor};
use crate::spec::SettingSpec;

/// Execution mode a blueprint is compiled for; part of the schema id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
	Development,
	Production,
	Test,
}

impl Mode {
	pub fn as_str(self) -> &'static str {
		match self {
			Mode::Development => "development",
			Mode::Production => "production",
			Mode::Test => "test",
		}
	}
}

impl Default for Mode {
	fn default() -> Self {
		if cfg!(debug_assertions) {
			Mode::Development
		} else {
			Mode::Production
		}
	}
}

/// Mutable builder used during application initialization
#[derive(Debug, Clone)]
pub struct Blueprint {
	pub(crate) name: Box<str>,
	pub(crate) mode: Mode,
	pub(crate) specs: HashMap<Box<str>, SettingSpec>,
	pub(crate) groups: HashMap<Box<str>, Blueprint>,
	/// Old key → new key, relative to this group
	pub(crate) migrations: HashMap<Box<str>, Box<str>>,
	pub(crate) descriptions: BTreeMap<Box<str>, Box<str>>,
	/// Non-fatal errors recorded while building, surfaced on compilation
	pub(crate) errors: Vec<Error>,
	pub(crate) frozen: bool,
}

impl Blueprint {
	pub fn new(name: impl Into<Box<str>>) -> Self {
		Self {
			name: name.into(),
			mode: Mode::default(),
			specs: HashMap::new(),
			groups: HashMap::new(),
			migrations: HashMap::new(),
			descriptions: BTreeMap::new(),
			errors: Vec::new(),
			frozen: false,
		}
	}

	/// Scan a descriptor into a new blueprint
	pub fn from_descriptor(descriptor: &dyn Descriptor) -> StResult<Self> {
		scanner::scan(descriptor)
	}

	pub fn with_mode(mut self, mode: Mode) -> Self {
		self.set_mode(mode);
		self
	}

	fn set_mode(&mut self, mode: Mode) {
		self.mode = mode;
		for group in self.groups.values_mut() {
			group.set_mode(mode);
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn mode(&self) -> Mode {
		self.mode
	}

	pub fn is_frozen(&self) -> bool {
		self.frozen
	}

	/// Deferred build errors recorded on this group
	pub fn errors(&self) -> &[Error] {
		&self.errors
	}

	/// Description of the group itself
	pub fn description(&self, lang: &str) -> Option<&str> {
		self.descriptions
			.get(lang)
			.or_else(|| self.descriptions.get(crate::spec::DEFAULT_LANG))
			.map(|text| &**text)
	}

	pub fn group(&self, name: &str) -> Option<&Blueprint> {
		self.groups.get(name)
	}

	/// Number of leaf settings in this group and every subgroup
	pub fn len(&self) -> usize {
		self.specs.len() + self.groups.values().map(Blueprint::len).sum::<usize>()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Look up a spec by (possibly dotted) key
	pub fn spec(&self, key: &str) -> Option<&SettingSpec> {
		if let Some(spec) = self.specs.get(key) {
			return Some(spec);
		}
		let (group, rest) = key::split_group(key)?;
		self.groups.get(group)?.spec(rest)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.spec(key).is_some()
	}

	fn spec_mut(&mut self, key: &str) -> Option<&mut SettingSpec> {
		if self.specs.contains_key(key) {
			return self.specs.get_mut(key);
		}
		let (group, rest) = key::split_group(key)?;
		self.groups.get_mut(group)?.spec_mut(rest)
	}

	fn ensure_open(&self) -> StResult<()> {
		if self.frozen {
			return Err(Error::GroupFrozen(self.name.clone()));
		}
		Ok(())
	}

	/// Register a new setting spec
	///
	/// Dotted keys are routed into subgroups, creating them as needed.
	/// Nested settings specs become subgroups of their own.
	pub fn add_spec(&mut self, mut spec: SettingSpec) -> StResult<()> {
		self.ensure_open()?;
		spec.check()?;

		if let Some((group, rest)) = key::split_group(&spec.key) {
			let (group, rest): (Box<str>, Box<str>) = (group.into(), rest.into());
			if self.specs.contains_key(&group) {
				return Err(Error::DuplicateKey(group));
			}
			let mode = self.mode;
			let child = self
				.groups
				.entry(group.clone())
				.or_insert_with(|| Blueprint::new(group).with_mode(mode));
			spec.key = rest;
			return child.add_spec(spec);
		}

		if spec.kind == Kind::Settings {
			let Some(group) = spec.group.take() else {
				return Err(Error::Definition(format!(
					"nested settings '{}' have no blueprint",
					spec.key
				)));
			};
			let mut group = *group;
			group.descriptions.extend(spec.descriptions);
			return self.attach(&spec.key, group);
		}

		if self.specs.contains_key(&spec.key) || self.groups.contains_key(&spec.key) {
			return Err(Error::DuplicateKey(spec.key));
		}

		debug!("Registering setting: {}.{}", self.name, spec.key);
		self.specs.insert(spec.key.clone(), spec);
		Ok(())
	}

	/// Attach a built blueprint as a named subgroup
	pub fn attach(&mut self, name: &str, mut group: Blueprint) -> StResult<()> {
		self.ensure_open()?;
		key::validate(name)?;
		if key::split_group(name).is_some() {
			return Err(Error::Definition(format!("group name '{}' must be a single segment", name)));
		}
		if self.groups.contains_key(name) || self.specs.contains_key(name) {
			return Err(Error::DuplicateGroup(name.into()));
		}
		// a compiled group never joins another tree
		if group.frozen {
			return Err(Error::GroupFrozen(name.into()));
		}

		debug!("Attaching group {} to {}", name, self.name);
		group.name = name.into();
		group.set_mode(self.mode);
		self.groups.insert(name.into(), group);
		Ok(())
	}

	/// Compile a nested descriptor and attach it as a named subgroup
	pub fn extend(&mut self, name: &str, descriptor: &dyn Descriptor) -> StResult<()> {
		self.ensure_open()?;
		if self.groups.contains_key(name) || self.specs.contains_key(name) {
			return Err(Error::DuplicateGroup(name.into()));
		}
		let group = Blueprint::from_descriptor(descriptor).inspect_err(|err| {
			warn!("Failed to compile group {} of {}: {}", name, self.name, err);
		})?;
		self.attach(name, group)
	}

	/// Append a validator to an existing spec
	///
	/// An unknown key does not fail here; the error is recorded and returned
	/// when the blueprint is compiled.
	pub fn add_validator<F>(&mut self, key: &str, f: F)
	where
		F: Fn(&SettingValue) -> StResult<()> + Send + Sync + 'static,
	{
		if let Err(err) = self.ensure_open() {
			self.errors.push(err);
			return;
		}
		match self.spec_mut(key) {
			Some(spec) => spec.validators.push(Arc::new(f)),
			None => {
				warn!("Validator for unknown setting: {}", key);
				self.errors.push(Error::KeyNotFound(key.into()));
			}
		}
	}

	/// Attach a localized description to a spec
	pub fn describe(&mut self, key: &str, lang: &str, text: impl Into<String>) -> StResult<()> {
		self.ensure_open()?;
		let spec = self.spec_mut(key).ok_or_else(|| Error::KeyNotFound(key.into()))?;
		if spec.descriptions.contains_key(lang) {
			return Err(Error::Definition(format!(
				"setting '{}' already has a '{}' description",
				key, lang
			)));
		}
		spec.descriptions.insert(lang.into(), text.into().into_boxed_str());
		Ok(())
	}

	/// Register a one-hop rename of a persisted key
	///
	/// Migrations do not chain: a source key maps to exactly one target,
	/// and that target must be a registered setting.
	pub fn migrate(&mut self, from: &str, to: &str) -> StResult<()> {
		self.ensure_open()?;
		key::validate(from)?;
		if from == to {
			return Err(Error::Definition(format!("migration of '{}' onto itself", from)));
		}
		if self.migrations.contains_key(from) {
			return Err(Error::DuplicateMigration(from.into()));
		}
		if !self.contains(to) {
			return Err(Error::KeyNotFound(to.into()));
		}

		debug!("Registering migration: {} -> {}", from, to);
		self.migrations.insert(from.into(), to.into());
		Ok(())
	}

	/// Override the default value of a spec
	///
	/// A pre-populated current value is kept; otherwise the current value
	/// follows the new default.
	pub fn set_default(&mut self, key: &str, value: &str) -> StResult<()> {
		self.ensure_open()?;
		let spec = self.spec_mut(key).ok_or_else(|| Error::KeyNotFound(key.into()))?;
		if spec.kind == Kind::Settings {
			return Err(Error::Definition(format!("nested settings '{}' have no default", key)));
		}
		spec.default = spec.decode(value)?.encode();
		Ok(())
	}

	/// First deferred error in this group or any subgroup
	pub(crate) fn first_error(&self) -> Option<&Error> {
		self.errors.first().or_else(|| self.groups.values().find_map(Blueprint::first_error))
	}

	pub(crate) fn freeze(&mut self) {
		self.frozen = true;
		for group in self.groups.values_mut() {
			group.freeze();
		}
	}
}


// vim: ts=4
