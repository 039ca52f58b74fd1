//! Semantic version parsing shared by schemas and preferences

use semver::Version;

use crate::error::{Error, StResult};

/// Parse a semantic version, tolerating a leading `v` (`"v1.0.0"`)
pub fn parse(raw: &str) -> StResult<Version> {
	let trimmed = raw.trim();
	let bare = trimmed.strip_prefix(['v', 'V']).unwrap_or(trimmed);
	if bare.is_empty() {
		return Err(Error::Version(format!("'{}' is empty", raw)));
	}
	Version::parse(bare).map_err(|err| Error::Version(format!("'{}': {}", raw, err)))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_versions() {
		assert_eq!(parse("1.2.3").ok(), Some(Version::new(1, 2, 3)));
		assert_eq!(parse("v1.0.0").ok(), Some(Version::new(1, 0, 0)));
		assert!(parse("1.0").is_err());
		assert!(parse("v").is_err());
		assert!(parse("").is_err());
	}

	#[test]
	fn test_exact_comparison() {
		assert_eq!(parse("v1.0.0").ok(), parse("1.0.0").ok());
		assert_ne!(parse("1.0.0").ok(), parse("1.0.1").ok());
	}
}

// vim: ts=4
