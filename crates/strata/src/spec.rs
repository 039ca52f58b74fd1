//! Setting specifications
//!
//! A [`SettingSpec`] is the static declaration of one configurable item. Specs
//! are built either by the declaration scanner or explicitly through
//! [`SettingSpec::builder`].

use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use strata_types::key;
use strata_types::value::Codec;

use crate::blueprint::Blueprint;
use crate::prelude::*;

/// Language used when a description is requested in a language nobody wrote
pub const DEFAULT_LANG: &str = "en";

/// Type alias for setting validator function
pub type SettingValidator = Arc<dyn Fn(&SettingValue) -> StResult<()> + Send + Sync>;

/// Setting specification - defines metadata for each setting
#[derive(Clone)]
pub struct SettingSpec {
	/// Key relative to the group the spec lives in; fully qualified once compiled
	pub(crate) key: Box<str>,
	pub(crate) kind: Kind,
	/// Canonical string form of the default value
	pub(crate) default: String,
	/// Pre-populated current value, if the declaration carried one
	pub(crate) initial: Option<String>,
	pub(crate) mutability: Mutability,
	pub(crate) persistent: bool,
	pub(crate) required: bool,
	pub(crate) is_set: bool,
	pub(crate) validators: Vec<SettingValidator>,
	pub(crate) descriptions: BTreeMap<Box<str>, Box<str>>,
	pub(crate) codec: Option<Arc<dyn Codec>>,
	/// Nested blueprint for `Kind::Settings`; moved into the owning
	/// blueprint's groups on registration
	pub(crate) group: Option<Box<Blueprint>>,
}

impl Debug for SettingSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SettingSpec")
			.field("key", &self.key)
			.field("kind", &self.kind)
			.field("default", &self.default)
			.field("initial", &self.initial)
			.field("mutability", &self.mutability)
			.field("persistent", &self.persistent)
			.field("required", &self.required)
			.field("is_set", &self.is_set)
			.field("validators", &self.validators.len())
			.field("descriptions", &self.descriptions)
			.field("codec", &self.codec.is_some())
			.field("group", &self.group.as_ref().map(|g| g.name()))
			.finish()
	}
}

impl SettingSpec {
	/// Create a builder for constructing a SettingSpec
	pub fn builder(key: impl Into<String>) -> SettingSpecBuilder {
		SettingSpecBuilder::new(key)
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn kind(&self) -> Kind {
		self.kind
	}

	/// Canonical string form of the default value
	pub fn default_value(&self) -> &str {
		&self.default
	}

	/// Canonical string form of the value a fresh profile starts with
	pub fn initial_value(&self) -> &str {
		self.initial.as_deref().unwrap_or(&self.default)
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

	pub fn is_set(&self) -> bool {
		self.is_set
	}

	pub fn validators(&self) -> &[SettingValidator] {
		&self.validators
	}

	pub fn codec(&self) -> Option<&dyn Codec> {
		self.codec.as_deref()
	}

	/// Description in `lang`, falling back to [`DEFAULT_LANG`] and then to any
	/// available language
	pub fn description(&self, lang: &str) -> Option<&str> {
		self.descriptions
			.get(lang)
			.or_else(|| self.descriptions.get(DEFAULT_LANG))
			.or_else(|| self.descriptions.values().next())
			.map(|text| &**text)
	}

	pub fn descriptions(&self) -> impl Iterator<Item = (&str, &str)> {
		self.descriptions.iter().map(|(lang, text)| (&**lang, &**text))
	}

	/// Decode a raw string under this spec's kind
	pub fn decode(&self, raw: &str) -> StResult<SettingValue> {
		SettingValue::decode(self.kind, raw, self.codec())
	}

	/// Decode a raw string and run every attached validator on the result
	pub fn decode_validated(&self, key: &str, raw: &str) -> StResult<SettingValue> {
		let value = self.decode(raw)?;
		for validator in &self.validators {
			validator(&value).map_err(|err| err.into_validation(key))?;
		}
		Ok(value)
	}

	/// Structural check, run on registration and again while compiling
	pub(crate) fn check(&self) -> StResult<()> {
		key::validate(&self.key)?;
		// ordinal range check
		Mutability::try_from(self.mutability as u8)?;

		match self.kind {
			Kind::Settings => {
				if self.mutability != Mutability::Immutable {
					return Err(Error::Definition(format!(
						"nested settings '{}' must be immutable",
						self.key
					)));
				}
			}
			Kind::Custom if self.codec.is_none() => {
				return Err(Error::Definition(format!(
					"custom setting '{}' has no decoder",
					self.key
				)));
			}
			_ => {
				self.decode(&self.default)?;
				if let Some(initial) = &self.initial {
					self.decode(initial)?;
				}
			}
		}
		Ok(())
	}
}

/// Builder for SettingSpec with fluent API
pub struct SettingSpecBuilder {
	key: String,
	kind: Kind,
	default: Option<String>,
	value: Option<String>,
	mutability: Mutability,
	persistent: bool,
	required: bool,
	validators: Vec<SettingValidator>,
	descriptions: BTreeMap<Box<str>, Box<str>>,
	codec: Option<Arc<dyn Codec>>,
	group: Option<Blueprint>,
}

impl SettingSpecBuilder {
	pub fn new(key: impl Into<String>) -> Self {
		Self {
			key: key.into(),
			kind: Kind::String,
			default: None,
			value: None,
			mutability: Mutability::Immutable,
			persistent: true,
			required: false,
			validators: Vec::new(),
			descriptions: BTreeMap::new(),
			codec: None,
			group: None,
		}
	}

	/// Set the value kind (defaults to String)
	pub fn kind(mut self, kind: Kind) -> Self {
		self.kind = kind;
		self
	}

	/// Set the default value in string form (defaults to the kind's zero value)
	pub fn default(mut self, value: impl Into<String>) -> Self {
		self.default = Some(value.into());
		self
	}

	/// Pre-populate the current value
	pub fn value(mut self, value: impl Into<String>) -> Self {
		self.value = Some(value.into());
		self
	}

	/// Set the mutability (defaults to Immutable)
	pub fn mutability(mut self, mutability: Mutability) -> Self {
		self.mutability = mutability;
		self
	}

	/// Whether user overrides may be saved to preferences (defaults to true)
	pub fn persistent(mut self, persistent: bool) -> Self {
		self.persistent = persistent;
		self
	}

	pub fn required(mut self, required: bool) -> Self {
		self.required = required;
		self
	}

	/// Add a description in the default language
	pub fn description(self, text: impl Into<String>) -> Self {
		self.describe(DEFAULT_LANG, text)
	}

	/// Add a description in a specific language
	pub fn describe(mut self, lang: &str, text: impl Into<String>) -> Self {
		self.descriptions.insert(lang.into(), text.into().into_boxed_str());
		self
	}

	/// Add a validation function
	pub fn validator<F>(mut self, f: F) -> Self
	where
		F: Fn(&SettingValue) -> StResult<()> + Send + Sync + 'static,
	{
		self.validators.push(Arc::new(f));
		self
	}

	/// Set the decoder for `Kind::Custom`
	pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
		self.codec = Some(codec);
		self
	}

	/// Make this a nested group of settings
	///
	/// Nested settings are immutable and count as set.
	pub fn group(mut self, blueprint: Blueprint) -> Self {
		self.kind = Kind::Settings;
		self.mutability = Mutability::Immutable;
		self.group = Some(blueprint);
		self
	}

	/// Build the SettingSpec
	pub fn build(self) -> StResult<SettingSpec> {
		key::validate(&self.key)?;

		if self.kind == Kind::Settings {
			let Some(group) = self.group else {
				return Err(Error::Definition(format!(
					"nested settings '{}' have no blueprint",
					self.key
				)));
			};
			let spec = SettingSpec {
				key: self.key.into(),
				kind: Kind::Settings,
				default: String::new(),
				initial: None,
				mutability: Mutability::Immutable,
				persistent: false,
				required: self.required,
				is_set: true,
				validators: self.validators,
				descriptions: self.descriptions,
				codec: None,
				group: Some(Box::new(group)),
			};
			return Ok(spec);
		}

		if self.kind == Kind::Custom && self.codec.is_none() {
			return Err(Error::Definition(format!("custom setting '{}' has no decoder", self.key)));
		}

		let codec = self.codec.as_deref();
		let canonical = |raw: &str| -> StResult<String> {
			SettingValue::decode(self.kind, raw, codec).map(|value| value.encode()).map_err(|err| {
				Error::Definition(format!("setting '{}' has an invalid value: {}", self.key, err))
			})
		};

		let default = match &self.default {
			Some(raw) => canonical(raw)?,
			None => self.kind.zero().map(|zero| zero.encode()).unwrap_or_default(),
		};
		let initial = self.value.as_deref().map(canonical).transpose()?;

		Ok(SettingSpec {
			key: self.key.into(),
			kind: self.kind,
			default,
			initial,
			mutability: self.mutability,
			persistent: self.persistent,
			required: self.required,
			is_set: false,
			validators: self.validators,
			descriptions: self.descriptions,
			codec: self.codec,
			group: None,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_builder_defaults() {
		let spec = SettingSpec::builder("name").build().unwrap();
		assert_eq!(spec.kind(), Kind::String);
		assert_eq!(spec.mutability(), Mutability::Immutable);
		assert_eq!(spec.default_value(), "");
		assert!(spec.persistent());
		assert!(!spec.is_set());
	}

	#[test]
	fn test_default_is_canonicalized() {
		let spec = SettingSpec::builder("timeout")
			.kind(Kind::Duration)
			.default("90s")
			.build()
			.unwrap();
		assert_eq!(spec.default_value(), "1m30s");

		let spec = SettingSpec::builder("retries").kind(Kind::Int).build().unwrap();
		assert_eq!(spec.default_value(), "0");
	}

	#[test]
	fn test_invalid_default_is_definition_error() {
		let result = SettingSpec::builder("retries").kind(Kind::Int).default("many").build();
		assert!(matches!(result, Err(Error::Definition(_))));
	}

	#[test]
	fn test_invalid_key_rejected() {
		assert!(SettingSpec::builder("net..port").build().is_err());
		assert!(SettingSpec::builder("").build().is_err());
	}

	#[test]
	fn test_custom_requires_codec() {
		let result = SettingSpec::builder("region").kind(Kind::Custom).build();
		assert!(matches!(result, Err(Error::Definition(_))));
	}

	#[test]
	fn test_prepopulated_value_wins_over_default() {
		let spec = SettingSpec::builder("port")
			.kind(Kind::Uint)
			.default("80")
			.value("8080")
			.build()
			.unwrap();
		assert_eq!(spec.default_value(), "80");
		assert_eq!(spec.initial_value(), "8080");
	}

	#[test]
	fn test_description_fallback() {
		let spec = SettingSpec::builder("name")
			.description("User name")
			.describe("hu", "Felhasználónév")
			.build()
			.unwrap();
		assert_eq!(spec.description("hu"), Some("Felhasználónév"));
		assert_eq!(spec.description("de"), Some("User name"));
	}

	#[test]
	fn test_nested_group_spec() {
		let spec = SettingSpec::builder("net").group(Blueprint::new("net")).build().unwrap();
		assert_eq!(spec.kind(), Kind::Settings);
		assert_eq!(spec.mutability(), Mutability::Immutable);
		assert!(spec.is_set());
		assert!(!spec.persistent());

		let result = SettingSpec::builder("net").kind(Kind::Settings).build();
		assert!(matches!(result, Err(Error::Definition(_))));
	}

	#[test]
	fn test_decode_validated_runs_validators() {
		let spec = SettingSpec::builder("port")
			.kind(Kind::Uint)
			.validator(|value| match value.as_uint() {
				Some(port) if port > 0 && port < 65536 => Ok(()),
				_ => Err(Error::rejected("port out of range")),
			})
			.build()
			.unwrap();
		assert!(spec.decode_validated("port", "443").is_ok());
		assert!(matches!(
			spec.decode_validated("port", "70000"),
			Err(Error::Validation { .. })
		));
		assert!(matches!(spec.decode_validated("port", "x"), Err(Error::InvalidValue { .. })));
	}
}

// vim: ts=4
