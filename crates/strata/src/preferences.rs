//! Preferences: versioned snapshot of user-overridden persistent values
//!
//! Two encodings are supported:
//!
//! - **Binary**: `STPF` magic, a format byte, then length-prefixed UTF-8
//!   strings: the schema version, the pair count, and every key/value pair
//!   in sorted key order. Lengths and the count are big-endian `u32`.
//! - **JSON**: an object with a mandatory `"version"` string; every other
//!   member is a value, or an object of values whose keys are joined to the
//!   member name with a dot.
//!
//! Storage location and transport are left to the host.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use strata_types::value::LIST_SEPARATOR;
use strata_types::{key, version};

use crate::prelude::*;

const MAGIC: &[u8; 4] = b"STPF";
const FORMAT_V1: u8 = 1;
/// Reserved top-level JSON member; no persistent setting may use this key
pub(crate) const VERSION_FIELD: &str = "version";

/// Encoding used to persist preferences
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
	#[default]
	Binary,
	/// Top-level `version` is reserved, so preferences holding a `version`
	/// key cannot be written in this format
	Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
	version: Box<str>,
	values: BTreeMap<String, String>,
}

impl Preferences {
	/// Empty preferences for the given schema version
	pub fn new(version: impl Into<Box<str>>) -> Self {
		Self { version: version.into(), values: BTreeMap::new() }
	}

	pub fn version(&self) -> &str {
		&self.version
	}

	pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> StResult<()> {
		let key = key.into();
		key::validate(&key)?;
		self.values.insert(key, value.into());
		Ok(())
	}

	/// Insert a key already known to be valid
	pub(crate) fn insert(&mut self, key: &str, value: String) {
		self.values.insert(key.to_string(), value);
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.values.get(key).map(String::as_str)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.values.contains_key(key)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Key/value pairs in sorted key order
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	pub fn encode(&self, format: Format) -> StResult<Vec<u8>> {
		match format {
			Format::Binary => self.to_binary(),
			Format::Json => self.to_json(),
		}
	}

	/// Decode persisted preferences, detecting the format
	///
	/// Empty input means nothing was saved yet and yields empty preferences
	/// at `current_version`.
	pub fn decode(bytes: &[u8], current_version: &str) -> StResult<Self> {
		if bytes.iter().all(u8::is_ascii_whitespace) {
			debug!("No saved preferences, starting fresh at {}", current_version);
			return Ok(Self::new(current_version));
		}
		if bytes.starts_with(MAGIC) {
			return Self::from_binary(bytes);
		}
		if bytes.iter().find(|b| !b.is_ascii_whitespace()) == Some(&b'{') {
			return Self::from_json(bytes);
		}
		Err(Error::Format("unrecognized preferences encoding".into()))
	}

	pub fn to_binary(&self) -> StResult<Vec<u8>> {
		let mut out = Vec::with_capacity(16 + self.values.len() * 32);
		out.extend_from_slice(MAGIC);
		out.push(FORMAT_V1);
		write_str(&mut out, &self.version)?;
		write_len(&mut out, self.values.len())?;
		for (key, value) in &self.values {
			write_str(&mut out, key)?;
			write_str(&mut out, value)?;
		}
		Ok(out)
	}

	pub fn from_binary(bytes: &[u8]) -> StResult<Self> {
		let mut reader = Reader { bytes };
		if reader.take(MAGIC.len())? != MAGIC {
			return Err(Error::Format("bad magic".into()));
		}
		let format = reader.take(1)?;
		if format != [FORMAT_V1] {
			return Err(Error::Format(format!("unsupported format {:?}", format)));
		}

		let version = reader.string()?;
		version::parse(&version)?;

		let count = reader.u32()?;
		let mut prefs = Self::new(version);
		for _ in 0..count {
			let key = reader.string()?;
			let value = reader.string()?;
			if prefs.values.contains_key(&key) {
				return Err(Error::Format(format!("duplicate key '{}'", key)));
			}
			prefs.set(key, value)?;
		}
		if !reader.bytes.is_empty() {
			return Err(Error::Format(format!("{} trailing bytes", reader.bytes.len())));
		}
		Ok(prefs)
	}

	pub fn to_json(&self) -> StResult<Vec<u8>> {
		let mut map = Map::new();
		map.insert(VERSION_FIELD.into(), Value::String(self.version.to_string()));
		for (key, value) in &self.values {
			if key == VERSION_FIELD {
				return Err(Error::Format(format!("key '{}' is reserved", VERSION_FIELD)));
			}
			map.insert(key.clone(), Value::String(value.clone()));
		}
		Ok(serde_json::to_vec_pretty(&Value::Object(map))?)
	}

	pub fn from_json(bytes: &[u8]) -> StResult<Self> {
		let Value::Object(map) = serde_json::from_slice::<Value>(bytes)? else {
			return Err(Error::Format("expected a JSON object".into()));
		};

		let version = match map.get(VERSION_FIELD) {
			Some(Value::String(version)) => version.clone(),
			Some(_) => return Err(Error::Format("version must be a string".into())),
			None => return Err(Error::Format("version is missing".into())),
		};
		version::parse(&version)?;

		let mut prefs = Self::new(version);
		for (name, value) in &map {
			if name == VERSION_FIELD {
				continue;
			}
			match value {
				Value::Object(inner) => {
					for (inner_name, inner_value) in inner {
						let full = key::join(name, inner_name);
						prefs.insert_json(full, inner_value)?;
					}
				}
				_ => prefs.insert_json(name.clone(), value)?,
			}
		}
		Ok(prefs)
	}

	fn insert_json(&mut self, key: String, value: &Value) -> StResult<()> {
		let value = match value {
			Value::Null => return Ok(()),
			Value::String(s) => s.clone(),
			Value::Bool(b) => b.to_string(),
			Value::Number(n) => n.to_string(),
			Value::Array(items) => {
				let items = items
					.iter()
					.map(|item| match item {
						Value::String(s) => Ok(s.as_str()),
						_ => Err(Error::Format(format!("list '{}' must hold strings", key))),
					})
					.collect::<StResult<Vec<_>>>()?;
				items.join(LIST_SEPARATOR)
			}
			Value::Object(_) => {
				return Err(Error::Format(format!("'{}' is nested too deeply", key)));
			}
		};
		if self.values.contains_key(&key) {
			return Err(Error::Format(format!("duplicate key '{}'", key)));
		}
		self.set(key, value)
	}
}

fn write_len(out: &mut Vec<u8>, len: usize) -> StResult<()> {
	let len = u32::try_from(len).map_err(|_| Error::Format("length exceeds u32".into()))?;
	out.extend_from_slice(&len.to_be_bytes());
	Ok(())
}

fn write_str(out: &mut Vec<u8>, s: &str) -> StResult<()> {
	write_len(out, s.len())?;
	out.extend_from_slice(s.as_bytes());
	Ok(())
}

struct Reader<'a> {
	bytes: &'a [u8],
}

impl<'a> Reader<'a> {
	fn take(&mut self, n: usize) -> StResult<&'a [u8]> {
		if self.bytes.len() < n {
			return Err(Error::Format("truncated".into()));
		}
		let (head, tail) = self.bytes.split_at(n);
		self.bytes = tail;
		Ok(head)
	}

	fn u32(&mut self) -> StResult<u32> {
		let raw = self.take(4)?;
		let mut buf = [0u8; 4];
		buf.copy_from_slice(raw);
		Ok(u32::from_be_bytes(buf))
	}

	fn string(&mut self) -> StResult<String> {
		let len = self.u32()? as usize;
		let raw = self.take(len)?;
		String::from_utf8(raw.to_vec()).map_err(|_| Error::Format("invalid UTF-8".into()))
	}
}


// vim: ts=4
