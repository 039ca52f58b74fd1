//! Setting key helpers
//!
//! Keys are dot-separated paths. Each segment names either a setting or a
//! group of settings; the last segment always names a setting.

use crate::error::{Error, StResult};

pub const SEPARATOR: char = '.';

/// Join a group prefix and a key: `("net", "port")` → `"net.port"`
pub fn join(prefix: &str, key: &str) -> String {
	if prefix.is_empty() {
		key.to_string()
	} else {
		format!("{}{}{}", prefix, SEPARATOR, key)
	}
}

/// Split off the first group segment: `"net.http.port"` → `("net", "http.port")`
pub fn split_group(key: &str) -> Option<(&str, &str)> {
	key.split_once(SEPARATOR)
}

/// Check that a key is a non-empty path of non-empty segments made of
/// alphanumerics, `_` and `-`
pub fn validate(key: &str) -> StResult<()> {
	if key.is_empty() {
		return Err(Error::Definition("setting key is empty".into()));
	}
	for segment in key.split(SEPARATOR) {
		if segment.is_empty() {
			return Err(Error::Definition(format!("setting key '{}' has an empty segment", key)));
		}
		if !segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
			return Err(Error::Definition(format!(
				"setting key '{}' contains invalid characters",
				key
			)));
		}
	}
	Ok(())
}

/// Convert a field name to its canonical key form
///
/// Word boundaries are detected at case changes and existing separators, words
/// are lower-cased and joined with `_`.
///
/// # Examples
/// - `"MaxRetries"` → `"max_retries"`
/// - `"httpPort"` → `"http_port"`
/// - `"HTTPProxy"` → `"http_proxy"`
/// - `"log-level"` → `"log_level"`
pub fn canonical(name: &str) -> String {
	let chars: Vec<char> = name.chars().collect();
	let mut out = String::with_capacity(name.len() + 4);

	for (i, &c) in chars.iter().enumerate() {
		if c == '_' || c == '-' || c == ' ' {
			if !out.is_empty() && !out.ends_with('_') {
				out.push('_');
			}
			continue;
		}
		if c.is_uppercase() && i > 0 {
			let prev = chars[i - 1];
			let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
			let boundary = prev.is_lowercase()
				|| prev.is_ascii_digit()
				|| (prev.is_uppercase() && next_lower);
			if boundary && !out.is_empty() && !out.ends_with('_') {
				out.push('_');
			}
		}
		out.extend(c.to_lowercase());
	}

	while out.ends_with('_') {
		out.pop();
	}
	out
}


// vim: ts=4
