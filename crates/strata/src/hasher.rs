//! Hasher format for schema identifiers. Capable of handling multiple versions.

use base64::Engine;
use sha2::{Digest, Sha256};

pub enum Hasher {
	V1(Sha256),
}

impl Hasher {
	pub fn new() -> Self {
		Self::V1(Sha256::new())
	}

	/// Feed one field; fields are terminated so that ("ab", "c") and
	/// ("a", "bc") hash differently
	pub fn field(&mut self, data: &str) {
		match self {
			Self::V1(hasher) => {
				hasher.update(data.as_bytes());
				hasher.update([0u8]);
			}
		}
	}

	pub fn finalize(self, prefix: &str) -> String {
		match self {
			Self::V1(hasher) => {
				let digest =
					base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hasher.finalize());
				format!("{}1~{}", prefix, digest)
			}
		}
	}
}

impl Default for Hasher {
	fn default() -> Self {
		Self::new()
	}
}

/// Stable schema identifier over descriptor name, module path and mode
pub fn schema_id(name: &str, module: &str, mode: &str) -> Box<str> {
	let mut hasher = Hasher::new();
	hasher.field(name);
	hasher.field(module);
	hasher.field(mode);
	hasher.finalize("sc").into()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_schema_id_is_stable() {
		let a = schema_id("app", "example.com/app", "production");
		let b = schema_id("app", "example.com/app", "production");
		assert_eq!(a, b);
		assert!(a.starts_with("sc1~"));
	}

	#[test]
	fn test_schema_id_depends_on_every_field() {
		let base = schema_id("app", "mod", "production");
		assert_ne!(base, schema_id("other", "mod", "production"));
		assert_ne!(base, schema_id("app", "other", "production"));
		assert_ne!(base, schema_id("app", "mod", "test"));
		assert_ne!(schema_id("ab", "c", "m"), schema_id("a", "bc", "m"));
	}
}

// vim: ts=4
