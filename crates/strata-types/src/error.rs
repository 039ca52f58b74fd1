//! Error types for the settings engine
//!
//! A single error enum covers the whole taxonomy: definition and structural
//! errors raised while building a blueprint, version and validation errors
//! raised while loading preferences, and runtime errors raised by profile
//! mutation.

use std::fmt;

use crate::value::{Kind, Mutability};

pub type StResult<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
	/// Malformed descriptor or setting specification
	Definition(String),
	/// A key is registered twice within the same group
	DuplicateKey(Box<str>),
	/// A subgroup name is registered twice within the same group
	DuplicateGroup(Box<str>),
	/// A group was modified or compiled after it produced a schema
	GroupFrozen(Box<str>),
	/// A migration source key already has a mapping
	DuplicateMigration(Box<str>),
	/// Preferences were written by a different schema version
	VersionMismatch { expected: Box<str>, found: Box<str> },
	/// A version string could not be parsed
	Version(String),
	KeyNotFound(Box<str>),
	/// Write rejected by the setting's mutability
	Mutability { key: Box<str>, mutability: Mutability },
	/// A validator rejected the decoded value of a setting
	Validation { key: Box<str>, message: String },
	/// Returned by validators; wrapped into `Validation` with the key attached
	Rejected(String),
	/// A raw string could not be decoded as the given kind
	InvalidValue { kind: Kind, value: Box<str> },
	/// Typed accessor used on a setting of another kind
	TypeMismatch { key: Box<str>, expected: Kind, found: Kind },
	/// A profile was loaded twice
	AlreadyLoaded(Box<str>),
	/// A preference key matched neither a setting nor a migration
	UnresolvedPreference(Box<str>),
	/// A required setting has no value
	Required(Box<str>),
	/// Malformed persisted preferences payload
	Format(String),
}

impl Error {
	/// Shorthand for validators
	pub fn rejected(message: impl Into<String>) -> Self {
		Error::Rejected(message.into())
	}

	/// Attach a key to a validator failure
	pub fn into_validation(self, key: &str) -> Self {
		match self {
			Error::Rejected(message) => Error::Validation { key: key.into(), message },
			Error::Validation { message, .. } => Error::Validation { key: key.into(), message },
			err => Error::Validation { key: key.into(), message: err.to_string() },
		}
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Error::Definition(msg) => write!(f, "definition error: {}", msg),
			Error::DuplicateKey(key) => write!(f, "setting '{}' is already registered", key),
			Error::DuplicateGroup(name) => write!(f, "group '{}' is already registered", name),
			Error::GroupFrozen(name) => write!(f, "group '{}' is already compiled", name),
			Error::DuplicateMigration(key) => {
				write!(f, "migration for '{}' is already registered", key)
			}
			Error::VersionMismatch { expected, found } => {
				write!(f, "preferences version {} does not match schema version {}", found, expected)
			}
			Error::Version(msg) => write!(f, "invalid version: {}", msg),
			Error::KeyNotFound(key) => write!(f, "unknown setting: {}", key),
			Error::Mutability { key, mutability } => {
				write!(f, "setting '{}' is {} and cannot be changed", key, mutability)
			}
			Error::Validation { key, message } => {
				write!(f, "invalid value for '{}': {}", key, message)
			}
			Error::Rejected(msg) => write!(f, "rejected: {}", msg),
			Error::InvalidValue { kind, value } => {
				write!(f, "cannot decode '{}' as {}", value, kind)
			}
			Error::TypeMismatch { key, expected, found } => {
				write!(f, "setting '{}' is {}, not {}", key, found, expected)
			}
			Error::AlreadyLoaded(name) => write!(f, "profile '{}' is already loaded", name),
			Error::UnresolvedPreference(key) => write!(f, "unresolved preference: {}", key),
			Error::Required(key) => write!(f, "required setting '{}' is not set", key),
			Error::Format(msg) => write!(f, "malformed preferences: {}", msg),
		}
	}
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Format(err.to_string())
	}
}

impl From<semver::Error> for Error {
	fn from(err: semver::Error) -> Self {
		Error::Version(err.to_string())
	}
}


// vim: ts=4
