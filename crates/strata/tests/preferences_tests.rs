//! Integration tests for saving and restoring profiles through preferences

use strata::{Blueprint, Error, Format, Kind, Mode, Mutability, Preferences, Schema, SettingSpec};

fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn schema(version: &str) -> Schema {
	let mut blueprint = Blueprint::new("client").with_mode(Mode::Test);
	for spec in [
		SettingSpec::builder("theme").default("light").mutability(Mutability::Mutable),
		SettingSpec::builder("sync.interval")
			.kind(Kind::Duration)
			.default("5m")
			.mutability(Mutability::Mutable),
		SettingSpec::builder("sync.servers").kind(Kind::StringList).mutability(Mutability::Mutable),
		SettingSpec::builder("sync.enabled").kind(Kind::Bool).mutability(Mutability::Mutable),
		SettingSpec::builder("font.size")
			.kind(Kind::Int)
			.default("12")
			.mutability(Mutability::Mutable),
	] {
		blueprint.add_spec(spec.build().unwrap()).unwrap();
	}
	blueprint.migrate("sync.every", "sync.interval").unwrap();
	blueprint.schema("example.com/client", version).unwrap()
}

fn edited_profile_bytes(format: Format) -> Vec<u8> {
	let profile = schema("1.0.0").profile("p", None).unwrap();
	profile.set("theme", "dark").unwrap();
	profile.set("sync.interval", "90s").unwrap();
	profile.set("sync.servers", "a.example.com, b.example.com").unwrap();
	profile.set("sync.enabled", "on").unwrap();
	profile.set("font.size", "-2").unwrap();
	profile.preferences().encode(format).unwrap()
}

#[test]
fn test_profile_survives_both_formats() {
	init_tracing();
	for format in [Format::Binary, Format::Json] {
		let bytes = edited_profile_bytes(format);
		let schema = schema("1.0.0");
		let stored = Preferences::decode(&bytes, schema.version()).unwrap();
		let profile = schema.profile("restored", Some(&stored)).unwrap();

		assert_eq!(profile.get_string("theme"), Ok("dark".to_string()));
		assert_eq!(profile.get("sync.interval").unwrap().to_string(), "1m30s");
		assert_eq!(
			profile.get_string_list("sync.servers"),
			Ok(vec!["a.example.com".to_string(), "b.example.com".to_string()])
		);
		assert_eq!(profile.get_bool("sync.enabled"), Ok(true));
		assert_eq!(profile.get_int("font.size"), Ok(-2));
		assert!(!profile.changed());
	}
}

#[test]
fn test_fresh_install() {
	init_tracing();
	let schema = schema("1.0.0");
	let stored = Preferences::decode(b"", schema.version()).unwrap();
	let profile = schema.profile("p", Some(&stored)).unwrap();
	assert!(profile.is_loaded());
	assert_eq!(profile.get_string("theme"), Ok("light".to_string()));
	assert!(profile.all().iter().all(|setting| !setting.is_set()));
}

#[test]
fn test_hand_written_json_with_nested_group_and_migration() {
	init_tracing();
	let json = br#"{
		"version": "1.0.0",
		"theme": "dark",
		"sync": { "every": "10m", "enabled": true, "servers": ["a", "b"] }
	}"#;
	let schema = schema("1.0.0");
	let stored = Preferences::decode(json, schema.version()).unwrap();
	let profile = schema.profile("p", Some(&stored)).unwrap();

	assert_eq!(profile.get("sync.interval").unwrap().to_string(), "10m");
	assert!(profile.get("sync.interval").unwrap().is_set());
	assert_eq!(profile.get_bool("sync.enabled"), Ok(true));
	assert_eq!(profile.get_string_list("sync.servers").unwrap().len(), 2);
}

#[test]
fn test_upgraded_schema_rejects_old_preferences() {
	init_tracing();
	let bytes = edited_profile_bytes(Format::Binary);
	let newer = schema("1.1.0");
	let stored = Preferences::decode(&bytes, newer.version()).unwrap();
	assert_eq!(stored.version(), "1.0.0");
	assert!(matches!(newer.profile("p", Some(&stored)), Err(Error::VersionMismatch { .. })));
}

#[test]
fn test_stored_value_of_wrong_kind_fails_load() {
	init_tracing();
	let json = br#"{"version": "1.0.0", "theme": "dark", "font": {"size": "large"}}"#;
	let schema = schema("1.0.0");
	let stored = Preferences::decode(json, schema.version()).unwrap();
	assert!(matches!(schema.profile("p", Some(&stored)), Err(Error::InvalidValue { .. })));
}

#[test]
fn test_versionless_json_is_an_error() {
	init_tracing();
	let result = Preferences::decode(br#"{"theme": "dark"}"#, "1.0.0");
	assert!(matches!(result, Err(Error::Format(_))));
}

// vim: ts=4
