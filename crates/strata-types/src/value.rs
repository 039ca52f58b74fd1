//! Setting kinds, mutability levels, and typed setting values
//!
//! Every setting value has a canonical string form. Decoding a raw string
//! under a [`Kind`] and encoding the result again always yields that canonical
//! form, so two values are equal exactly when their encodings are equal.

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

use crate::error::{Error, StResult};

/// Separator used by the canonical string form of string lists
pub const LIST_SEPARATOR: &str = ",";

/// Value type of a setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kind {
	Bool,
	Int,
	Uint,
	String,
	Duration,
	StringList,
	/// Application-defined type decoded through a [`Codec`]
	Custom,
	/// A nested group of settings; carries no value of its own
	Settings,
}

impl Kind {
	pub fn as_str(self) -> &'static str {
		match self {
			Kind::Bool => "bool",
			Kind::Int => "int",
			Kind::Uint => "uint",
			Kind::String => "string",
			Kind::Duration => "duration",
			Kind::StringList => "string-list",
			Kind::Custom => "custom",
			Kind::Settings => "settings",
		}
	}

	/// Zero value of this kind, `None` for nested settings
	pub fn zero(self) -> Option<SettingValue> {
		match self {
			Kind::Bool => Some(SettingValue::Bool(false)),
			Kind::Int => Some(SettingValue::Int(0)),
			Kind::Uint => Some(SettingValue::Uint(0)),
			Kind::String => Some(SettingValue::String(String::new())),
			Kind::Duration => Some(SettingValue::Duration(Duration::ZERO)),
			Kind::StringList => Some(SettingValue::StringList(Vec::new())),
			Kind::Custom => Some(SettingValue::Custom(String::new())),
			Kind::Settings => None,
		}
	}
}

impl fmt::Display for Kind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Mutability defines whether and how often a setting may change at runtime
#[derive(
	Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Mutability {
	/// Never changeable at runtime
	#[default]
	Immutable = 0,
	/// Changeable until the setting has been set once
	Once = 1,
	/// Always changeable
	Mutable = 2,
}

impl Mutability {
	/// Map a declaration hint: `once` and `mutable` are recognized, anything
	/// else means immutable
	pub fn from_hint(hint: &str) -> Self {
		match hint.trim().to_ascii_lowercase().as_str() {
			"once" => Mutability::Once,
			"mutable" => Mutability::Mutable,
			_ => Mutability::Immutable,
		}
	}

	/// Check whether a write is allowed given the current set state
	pub fn allows(self, is_set: bool) -> bool {
		match self {
			Mutability::Immutable => false,
			Mutability::Once => !is_set,
			Mutability::Mutable => true,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Mutability::Immutable => "immutable",
			Mutability::Once => "once",
			Mutability::Mutable => "mutable",
		}
	}
}

impl TryFrom<u8> for Mutability {
	type Error = Error;

	fn try_from(value: u8) -> StResult<Self> {
		match value {
			0 => Ok(Mutability::Immutable),
			1 => Ok(Mutability::Once),
			2 => Ok(Mutability::Mutable),
			n => Err(Error::Definition(format!("mutability {} is out of range", n))),
		}
	}
}

impl fmt::Display for Mutability {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Decoder for [`Kind::Custom`] values
///
/// Turns a raw string into the canonical string form of the custom type, or
/// rejects it.
pub trait Codec: Send + Sync {
	fn decode(&self, raw: &str) -> StResult<String>;
}

impl<F> Codec for F
where
	F: Fn(&str) -> StResult<String> + Send + Sync,
{
	fn decode(&self, raw: &str) -> StResult<String> {
		self(raw)
	}
}

/// Setting value types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
	Bool(bool),
	Int(i64),
	Uint(u64),
	String(String),
	Duration(Duration),
	StringList(Vec<String>),
	Custom(String),
}

impl SettingValue {
	pub fn kind(&self) -> Kind {
		match self {
			SettingValue::Bool(_) => Kind::Bool,
			SettingValue::Int(_) => Kind::Int,
			SettingValue::Uint(_) => Kind::Uint,
			SettingValue::String(_) => Kind::String,
			SettingValue::Duration(_) => Kind::Duration,
			SettingValue::StringList(_) => Kind::StringList,
			SettingValue::Custom(_) => Kind::Custom,
		}
	}

	/// Get the type name for error messages
	pub fn type_name(&self) -> &'static str {
		self.kind().as_str()
	}

	/// Decode a raw string as `kind`
	///
	/// `codec` is only consulted for [`Kind::Custom`]; without one the raw
	/// string is kept as is.
	pub fn decode(kind: Kind, raw: &str, codec: Option<&dyn Codec>) -> StResult<Self> {
		let invalid = || Error::InvalidValue { kind, value: raw.into() };
		match kind {
			Kind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
				"true" | "1" | "yes" | "on" => Ok(SettingValue::Bool(true)),
				"false" | "0" | "no" | "off" => Ok(SettingValue::Bool(false)),
				_ => Err(invalid()),
			},
			Kind::Int => raw.trim().parse().map(SettingValue::Int).map_err(|_| invalid()),
			Kind::Uint => raw.trim().parse().map(SettingValue::Uint).map_err(|_| invalid()),
			Kind::String => Ok(SettingValue::String(raw.to_string())),
			Kind::Duration => parse_duration(raw).map(SettingValue::Duration).ok_or_else(invalid),
			Kind::StringList => Ok(SettingValue::StringList(
				raw.split(LIST_SEPARATOR)
					.map(str::trim)
					.filter(|item| !item.is_empty())
					.map(String::from)
					.collect(),
			)),
			Kind::Custom => match codec {
				Some(codec) => codec.decode(raw).map(SettingValue::Custom),
				None => Ok(SettingValue::Custom(raw.to_string())),
			},
			Kind::Settings => Err(invalid()),
		}
	}

	/// Canonical string form
	pub fn encode(&self) -> String {
		match self {
			SettingValue::Bool(b) => b.to_string(),
			SettingValue::Int(i) => i.to_string(),
			SettingValue::Uint(u) => u.to_string(),
			SettingValue::String(s) | SettingValue::Custom(s) => s.clone(),
			SettingValue::Duration(d) => format_duration(*d),
			SettingValue::StringList(items) => items.join(LIST_SEPARATOR),
		}
	}

	pub fn is_zero(&self) -> bool {
		match self {
			SettingValue::Bool(b) => !b,
			SettingValue::Int(i) => *i == 0,
			SettingValue::Uint(u) => *u == 0,
			SettingValue::String(s) | SettingValue::Custom(s) => s.is_empty(),
			SettingValue::Duration(d) => d.is_zero(),
			SettingValue::StringList(items) => items.is_empty(),
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			SettingValue::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			SettingValue::Int(i) => Some(*i),
			_ => None,
		}
	}

	pub fn as_uint(&self) -> Option<u64> {
		match self {
			SettingValue::Uint(u) => Some(*u),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			SettingValue::String(s) | SettingValue::Custom(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_duration(&self) -> Option<Duration> {
		match self {
			SettingValue::Duration(d) => Some(*d),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[String]> {
		match self {
			SettingValue::StringList(items) => Some(items),
			_ => None,
		}
	}
}

impl fmt::Display for SettingValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.encode())
	}
}

// Durations serialize in canonical string form so JSON output stays readable
impl Serialize for SettingValue {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			SettingValue::Bool(b) => serializer.serialize_bool(*b),
			SettingValue::Int(i) => serializer.serialize_i64(*i),
			SettingValue::Uint(u) => serializer.serialize_u64(*u),
			SettingValue::String(s) | SettingValue::Custom(s) => serializer.serialize_str(s),
			SettingValue::Duration(d) => serializer.serialize_str(&format_duration(*d)),
			SettingValue::StringList(items) => {
				let mut seq = serializer.serialize_seq(Some(items.len()))?;
				for item in items {
					seq.serialize_element(item)?;
				}
				seq.end()
			}
		}
	}
}

const MILLIS_PER_SEC: u128 = 1_000;
const DURATION_UNITS: [(&str, u128); 5] = [
	("d", 86_400 * MILLIS_PER_SEC),
	("h", 3_600 * MILLIS_PER_SEC),
	("m", 60 * MILLIS_PER_SEC),
	("s", MILLIS_PER_SEC),
	("ms", 1),
];

/// Parse durations like `90s`, `1h30m`, `250ms` or `2d`
///
/// A bare `0` is accepted. Components may appear in any order and repeat.
pub fn parse_duration(raw: &str) -> Option<Duration> {
	let raw = raw.trim();
	if raw.is_empty() {
		return None;
	}
	if raw == "0" {
		return Some(Duration::ZERO);
	}

	let mut rest = raw;
	let mut total: u128 = 0;
	while !rest.is_empty() {
		let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
		if digits == 0 {
			return None;
		}
		let amount: u128 = rest[..digits].parse().ok()?;
		rest = &rest[digits..];

		let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
		let unit = &rest[..unit_len];
		rest = &rest[unit_len..];

		let (_, millis) = DURATION_UNITS.iter().find(|(name, _)| *name == unit)?;
		total = total.checked_add(amount.checked_mul(*millis)?)?;
	}

	let secs = u64::try_from(total / MILLIS_PER_SEC).ok()?;
	let millis = u64::try_from(total % MILLIS_PER_SEC).ok()?;
	Some(Duration::from_secs(secs) + Duration::from_millis(millis))
}

/// Canonical duration form, largest units first, millisecond precision
pub fn format_duration(duration: Duration) -> String {
	let mut remaining = duration.as_millis();
	// sub-millisecond durations collapse to zero
	if remaining == 0 {
		return "0s".to_string();
	}

	let mut out = String::new();
	for (name, millis) in DURATION_UNITS {
		let amount = remaining / millis;
		if amount > 0 {
			out.push_str(&amount.to_string());
			out.push_str(name);
			remaining %= millis;
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_mutability_hints() {
		assert_eq!(Mutability::from_hint("once"), Mutability::Once);
		assert_eq!(Mutability::from_hint(" Mutable "), Mutability::Mutable);
		assert_eq!(Mutability::from_hint("readonly"), Mutability::Immutable);
		assert_eq!(Mutability::from_hint(""), Mutability::Immutable);
	}

	#[test]
	fn test_mutability_range() {
		assert_eq!(Mutability::try_from(1).ok(), Some(Mutability::Once));
		assert!(matches!(Mutability::try_from(3), Err(Error::Definition(_))));
	}

	#[test]
	fn test_mutability_allows() {
		assert!(!Mutability::Immutable.allows(false));
		assert!(Mutability::Once.allows(false));
		assert!(!Mutability::Once.allows(true));
		assert!(Mutability::Mutable.allows(true));
	}

	#[test]
	fn test_decode_bool() {
		assert_eq!(SettingValue::decode(Kind::Bool, "TRUE", None).ok(), Some(SettingValue::Bool(true)));
		assert_eq!(SettingValue::decode(Kind::Bool, "off", None).ok(), Some(SettingValue::Bool(false)));
		assert!(SettingValue::decode(Kind::Bool, "maybe", None).is_err());
	}

	#[test]
	fn test_decode_numbers() {
		assert_eq!(SettingValue::decode(Kind::Int, " -42 ", None).ok(), Some(SettingValue::Int(-42)));
		assert!(SettingValue::decode(Kind::Uint, "-1", None).is_err());
		assert!(SettingValue::decode(Kind::Int, "4x", None).is_err());
	}

	#[test]
	fn test_string_list_canonical_form() {
		let value = SettingValue::decode(Kind::StringList, " a, b ,,c ", None).ok();
		assert_eq!(value.as_ref().map(SettingValue::encode).as_deref(), Some("a,b,c"));
		let empty = SettingValue::decode(Kind::StringList, "", None).ok();
		assert_eq!(empty, Some(SettingValue::StringList(Vec::new())));
	}

	#[test]
	fn test_durations() {
		assert_eq!(parse_duration("90s"), Some(Duration::from_secs(90)));
		assert_eq!(parse_duration("1h30m"), Some(Duration::from_secs(5400)));
		assert_eq!(parse_duration("1s500ms"), Some(Duration::from_millis(1500)));
		assert_eq!(parse_duration("0"), Some(Duration::ZERO));
		assert_eq!(parse_duration(""), None);
		assert_eq!(parse_duration("10"), None);
		assert_eq!(parse_duration("5w"), None);

		assert_eq!(format_duration(Duration::from_secs(90)), "1m30s");
		assert_eq!(format_duration(Duration::from_millis(1500)), "1s500ms");
		assert_eq!(format_duration(Duration::from_secs(2 * 86_400)), "2d");
		assert_eq!(format_duration(Duration::ZERO), "0s");
	}

	#[test]
	fn test_custom_codec() {
		let upper = |raw: &str| -> StResult<String> {
			if raw.is_empty() {
				Err(Error::rejected("empty"))
			} else {
				Ok(raw.to_ascii_uppercase())
			}
		};
		let value = SettingValue::decode(Kind::Custom, "eu-west", Some(&upper)).ok();
		assert_eq!(value, Some(SettingValue::Custom("EU-WEST".into())));
		assert!(SettingValue::decode(Kind::Custom, "", Some(&upper)).is_err());
	}

	#[test]
	fn test_nested_settings_have_no_value() {
		assert!(Kind::Settings.zero().is_none());
		assert!(SettingValue::decode(Kind::Settings, "x", None).is_err());
	}

	#[test]
	fn test_serialize_values() {
		let json = serde_json::to_value(SettingValue::Duration(Duration::from_secs(60))).ok();
		assert_eq!(json, Some(serde_json::json!("1m")));
		let json = serde_json::to_value(SettingValue::StringList(vec!["a".into()])).ok();
		assert_eq!(json, Some(serde_json::json!(["a"])));
	}
}

// vim: ts=4
