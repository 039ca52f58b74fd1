//! Declaration scanner
//!
//! A [`Descriptor`] lists its fields together with their declaration
//! metadata. The scanner turns every field into a [`SettingSpec`] and collects
//! them into a [`Blueprint`]. Fields holding another descriptor become nested
//! groups; fields holding a [`Leaf`] become settings.
//!
//! ```ignore
//! struct Server { host: String, port: u32, tls: Tls }
//!
//! impl Descriptor for Server {
//! 	fn name(&self) -> &str { "server" }
//!
//! 	fn fields(&self) -> Vec<Field<'_>> {
//! 		vec![
//! 			Field::leaf("host", &self.host).default("localhost").mutation("mutable"),
//! 			Field::leaf("port", &self.port).default("8080").mutation("once"),
//! 			Field::nested("tls", &self.tls),
//! 		]
//! 	}
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use strata_types::key;
use strata_types::value::{format_duration, Codec, LIST_SEPARATOR};

use crate::blueprint::Blueprint;
use crate::prelude::*;
use crate::spec::{SettingSpec, DEFAULT_LANG};

/// A value that can back a leaf setting
///
/// Built-in kinds decode through their kind; [`Kind::Custom`] values must
/// provide a [`Codec`].
pub trait Leaf {
	fn kind(&self) -> Kind;

	/// Canonical string form of the current value
	fn encode(&self) -> String;

	/// Whether the value is still its type's zero value (not pre-populated)
	fn is_zero(&self) -> bool;

	fn codec(&self) -> Option<Arc<dyn Codec>> {
		None
	}
}

/// A declarative settings descriptor
pub trait Descriptor {
	/// Name of the descriptor, part of the schema id
	fn name(&self) -> &str;

	fn fields(&self) -> Vec<Field<'_>>;

	/// Called after all fields are scanned, to attach validators,
	/// descriptions, migrations or extensions
	fn configure(&self, _blueprint: &mut Blueprint) -> StResult<()> {
		Ok(())
	}
}

pub enum FieldValue<'a> {
	Leaf(&'a dyn Leaf),
	Nested(&'a dyn Descriptor),
	/// A field whose type is neither a leaf value nor a descriptor
	Unsupported(&'a str),
}

/// One declared field with its metadata
pub struct Field<'a> {
	name: &'a str,
	key: Option<&'a str>,
	default: Option<&'a str>,
	mutation: Option<&'a str>,
	required: bool,
	persistent: bool,
	descriptions: Vec<(&'a str, &'a str)>,
	value: FieldValue<'a>,
}

impl<'a> Field<'a> {
	fn with_value(name: &'a str, value: FieldValue<'a>) -> Self {
		Self {
			name,
			key: None,
			default: None,
			mutation: None,
			required: false,
			persistent: true,
			descriptions: Vec::new(),
			value,
		}
	}

	pub fn leaf(name: &'a str, value: &'a dyn Leaf) -> Self {
		Self::with_value(name, FieldValue::Leaf(value))
	}

	pub fn nested(name: &'a str, value: &'a dyn Descriptor) -> Self {
		Self::with_value(name, FieldValue::Nested(value))
	}

	/// Declare a field the scanner cannot handle; scanning fails on it
	pub fn unsupported(name: &'a str, type_name: &'a str) -> Self {
		Self::with_value(name, FieldValue::Unsupported(type_name))
	}

	/// Explicit key instead of the canonical form of the field name
	pub fn key(mut self, key: &'a str) -> Self {
		self.key = Some(key);
		self
	}

	pub fn default(mut self, default: &'a str) -> Self {
		self.default = Some(default);
		self
	}

	/// Mutation hint: `once`, `mutable`, anything else is immutable
	pub fn mutation(mut self, hint: &'a str) -> Self {
		self.mutation = Some(hint);
		self
	}

	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}

	/// Keep the setting out of saved preferences
	pub fn transient(mut self) -> Self {
		self.persistent = false;
		self
	}

	pub fn description(self, text: &'a str) -> Self {
		self.describe(DEFAULT_LANG, text)
	}

	pub fn describe(mut self, lang: &'a str, text: &'a str) -> Self {
		self.descriptions.push((lang, text));
		self
	}

	/// Key derived from the explicit tag or the field name
	pub fn resolved_key(&self) -> String {
		match self.key {
			Some(key) => key.to_string(),
			None => key::canonical(self.name),
		}
	}
}

/// Scan a descriptor and its nested descriptors into a blueprint
pub fn scan(descriptor: &dyn Descriptor) -> StResult<Blueprint> {
	let mut blueprint = Blueprint::new(descriptor.name());
	for field in descriptor.fields() {
		let spec = scan_field(&field)?;
		blueprint.add_spec(spec)?;
	}
	descriptor.configure(&mut blueprint)?;
	debug!("Scanned descriptor {} into {} settings", blueprint.name(), blueprint.len());
	Ok(blueprint)
}

fn scan_field(field: &Field<'_>) -> StResult<SettingSpec> {
	let key = field.resolved_key();
	let mut builder = SettingSpec::builder(key.as_str()).required(field.required);

	match &field.value {
		FieldValue::Nested(nested) => {
			builder = builder.group(scan(*nested)?);
		}
		FieldValue::Leaf(leaf) => {
			let kind = leaf.kind();
			if kind == Kind::Settings {
				return Err(Error::Definition(format!(
					"field '{}' declares nested settings but is not a descriptor",
					field.name
				)));
			}
			if kind == Kind::Bool {
				if let Some(default) = field.default {
					let decoded = SettingValue::decode(Kind::Bool, default, None);
					if decoded != Ok(SettingValue::Bool(false)) {
						return Err(Error::Definition(format!(
							"boolean setting '{}' may only default to false",
							key
						)));
					}
				}
			}
			match leaf.codec() {
				Some(codec) => builder = builder.codec(codec),
				None if kind == Kind::Custom => {
					return Err(Error::Definition(format!(
						"field '{}' of custom kind has no decoder",
						field.name
					)));
				}
				None => {}
			}

			builder = builder
				.kind(kind)
				.mutability(Mutability::from_hint(field.mutation.unwrap_or_default()))
				.persistent(field.persistent);
			if let Some(default) = field.default {
				builder = builder.default(default);
			}
			if !leaf.is_zero() {
				let encoded = leaf.encode();
				builder = builder.default(encoded.as_str()).value(encoded);
			}
		}
		FieldValue::Unsupported(type_name) => {
			return Err(Error::Definition(format!(
				"field '{}' of type {} is neither a setting value nor a settings group",
				field.name, type_name
			)));
		}
	}

	for (lang, text) in &field.descriptions {
		builder = builder.describe(lang, *text);
	}
	builder.build()
}

impl Leaf for bool {
	fn kind(&self) -> Kind {
		Kind::Bool
	}

	fn encode(&self) -> String {
		self.to_string()
	}

	fn is_zero(&self) -> bool {
		!*self
	}
}

macro_rules! number_leaf {
	($kind:expr => $($ty:ty),+) => {
		$(
			impl Leaf for $ty {
				fn kind(&self) -> Kind {
					$kind
				}

				fn encode(&self) -> String {
					self.to_string()
				}

				fn is_zero(&self) -> bool {
					*self == 0
				}
			}
		)+
	};
}

number_leaf!(Kind::Int => i8, i16, i32, i64, isize);
number_leaf!(Kind::Uint => u8, u16, u32, u64, usize);

impl Leaf for String {
	fn kind(&self) -> Kind {
		Kind::String
	}

	fn encode(&self) -> String {
		self.clone()
	}

	fn is_zero(&self) -> bool {
		self.is_empty()
	}
}

impl Leaf for Duration {
	fn kind(&self) -> Kind {
		Kind::Duration
	}

	fn encode(&self) -> String {
		format_duration(*self)
	}

	fn is_zero(&self) -> bool {
		Duration::is_zero(self)
	}
}

impl Leaf for Vec<String> {
	fn kind(&self) -> Kind {
		Kind::StringList
	}

	fn encode(&self) -> String {
		self.join(LIST_SEPARATOR)
	}

	fn is_zero(&self) -> bool {
		self.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[derive(Default)]
	struct Tls {
		enabled: bool,
		cert: String,
	}

	impl Descriptor for Tls {
		fn name(&self) -> &str {
			"tls"
		}

		fn fields(&self) -> Vec<Field<'_>> {
			vec![
				Field::leaf("enabled", &self.enabled).mutation("mutable"),
				Field::leaf("certPath", &self.cert).key("cert").mutation("mutable"),
			]
		}
	}

	#[derive(Default)]
	struct Server {
		host: String,
		max_connections: u32,
		timeout: Duration,
		tls: Tls,
	}

	impl Descriptor for Server {
		fn name(&self) -> &str {
			"server"
		}

		fn fields(&self) -> Vec<Field<'_>> {
			vec![
				Field::leaf("host", &self.host).default("localhost").mutation("mutable"),
				Field::leaf("MaxConnections", &self.max_connections).default("64").mutation("once"),
				Field::leaf("timeout", &self.timeout).default("30s").transient(),
				Field::nested("tls", &self.tls).description("TLS settings"),
			]
		}
	}

	#[test]
	fn test_scan_keys_and_kinds() {
		let bp = scan(&Server::default()).unwrap();
		assert_eq!(bp.name(), "server");
		assert_eq!(bp.len(), 5);

		let host = bp.spec("host").unwrap();
		assert_eq!(host.kind(), Kind::String);
		assert_eq!(host.mutability(), Mutability::Mutable);
		assert_eq!(host.default_value(), "localhost");

		let max = bp.spec("max_connections").unwrap();
		assert_eq!(max.kind(), Kind::Uint);
		assert_eq!(max.mutability(), Mutability::Once);

		let timeout = bp.spec("timeout").unwrap();
		assert_eq!(timeout.mutability(), Mutability::Immutable);
		assert!(!timeout.persistent());

		assert!(bp.contains("tls.enabled"));
		assert!(bp.contains("tls.cert"));
		assert_eq!(bp.group("tls").and_then(|g| g.description("en")), Some("TLS settings"));
	}

	#[test]
	fn test_prepopulated_field_is_default_and_value() {
		let server = Server { host: "example.org".into(), ..Server::default() };
		let bp = scan(&server).unwrap();
		let host = bp.spec("host").unwrap();
		assert_eq!(host.default_value(), "example.org");
		assert_eq!(host.initial_value(), "example.org");
	}

	struct BadBool {
		flag: bool,
	}

	impl Descriptor for BadBool {
		fn name(&self) -> &str {
			"bad"
		}

		fn fields(&self) -> Vec<Field<'_>> {
			vec![Field::leaf("flag", &self.flag).default("true")]
		}
	}

	#[test]
	fn test_bool_default_must_be_false() {
		assert!(matches!(scan(&BadBool { flag: false }), Err(Error::Definition(_))));
	}

	struct Flags {
		on: bool,
		default: &'static str,
	}

	impl Descriptor for Flags {
		fn name(&self) -> &str {
			"flags"
		}

		fn fields(&self) -> Vec<Field<'_>> {
			vec![Field::leaf("on", &self.on).default(self.default)]
		}
	}

	#[test]
	fn test_bool_default_uses_value_parsing() {
		for default in ["false", "False", " 0 ", "no", "OFF"] {
			let bp = scan(&Flags { on: false, default }).unwrap();
			assert_eq!(bp.spec("on").map(SettingSpec::default_value), Some("false"));
		}
		for default in ["1", "yes", "maybe", ""] {
			assert!(matches!(scan(&Flags { on: false, default }), Err(Error::Definition(_))));
		}
	}

	struct Opaque;

	impl Descriptor for Opaque {
		fn name(&self) -> &str {
			"opaque"
		}

		fn fields(&self) -> Vec<Field<'_>> {
			vec![Field::unsupported("handle", "std::fs::File")]
		}
	}

	#[test]
	fn test_unsupported_field_rejected() {
		assert!(matches!(scan(&Opaque), Err(Error::Definition(_))));
	}

	struct Region(String);

	impl Leaf for Region {
		fn kind(&self) -> Kind {
			Kind::Custom
		}

		fn encode(&self) -> String {
			self.0.clone()
		}

		fn is_zero(&self) -> bool {
			self.0.is_empty()
		}
	}

	struct NoCodec {
		region: Region,
	}

	impl Descriptor for NoCodec {
		fn name(&self) -> &str {
			"no-codec"
		}

		fn fields(&self) -> Vec<Field<'_>> {
			vec![Field::leaf("region", &self.region)]
		}
	}

	#[test]
	fn test_custom_leaf_without_codec_rejected() {
		let descriptor = NoCodec { region: Region(String::new()) };
		assert!(matches!(scan(&descriptor), Err(Error::Definition(_))));
	}

	struct Zone(String);

	impl Leaf for Zone {
		fn kind(&self) -> Kind {
			Kind::Custom
		}

		fn encode(&self) -> String {
			self.0.clone()
		}

		fn is_zero(&self) -> bool {
			self.0.is_empty()
		}

		fn codec(&self) -> Option<Arc<dyn Codec>> {
			Some(Arc::new(|raw: &str| match raw.trim().to_ascii_lowercase().as_str() {
				zone @ ("eu" | "us" | "ap") => Ok(zone.to_string()),
				other => Err(Error::rejected(format!("unknown zone {}", other))),
			}))
		}
	}

	struct Placement {
		zone: Zone,
	}

	impl Descriptor for Placement {
		fn name(&self) -> &str {
			"placement"
		}

		fn fields(&self) -> Vec<Field<'_>> {
			vec![Field::leaf("zone", &self.zone).default("US").mutation("mutable")]
		}
	}

	#[test]
	fn test_custom_leaf_with_codec() {
		let bp = scan(&Placement { zone: Zone(String::new()) }).unwrap();
		let zone = bp.spec("zone").unwrap();
		assert_eq!(zone.kind(), Kind::Custom);
		assert_eq!(zone.default_value(), "us");
		assert_eq!(zone.decode(" EU ").ok(), Some(SettingValue::Custom("eu".into())));
		assert!(zone.decode("mars").is_err());
	}
}

// vim: ts=4
