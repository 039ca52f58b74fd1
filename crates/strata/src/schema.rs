//! Schema compiler
//!
//! [`Blueprint::schema`] flattens a blueprint tree into an immutable
//! [`Schema`]: a flat map of fully-qualified keys to specs, stamped with a
//! module identifier, a semantic version and a stable id. Schemas are cheap to
//! clone and safe to share between threads.

use itertools::Itertools;
use semver::Version;
use std::collections::HashMap;
use std::sync::Arc;

use strata_types::{key, version};

use crate::blueprint::Blueprint;
use crate::hasher;
use crate::preferences::VERSION_FIELD;
use crate::prelude::*;
use crate::spec::SettingSpec;

struct SchemaInner {
	module: Box<str>,
	version: Box<str>,
	semver: Version,
	id: Box<str>,
	specs: HashMap<Box<str>, SettingSpec>,
	migrations: HashMap<Box<str>, Box<str>>,
}

/// Immutable, versioned compilation of a blueprint
#[derive(Clone)]
pub struct Schema {
	inner: Arc<SchemaInner>,
}

impl std::fmt::Debug for Schema {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Schema")
			.field("module", &self.inner.module)
			.field("version", &self.inner.version)
			.field("id", &self.inner.id)
			.field("settings", &self.inner.specs.len())
			.field("migrations", &self.inner.migrations.len())
			.finish()
	}
}

impl Blueprint {
	/// Compile this blueprint into a schema and freeze it
	///
	/// Fails on the first deferred build error or invalid spec; no partial
	/// schema is ever returned. Compiling a frozen blueprint is an error.
	pub fn schema(&mut self, module: &str, version: &str) -> StResult<Schema> {
		if self.frozen {
			return Err(Error::GroupFrozen(self.name.clone()));
		}
		if let Some(err) = self.first_error() {
			return Err(err.clone());
		}
		let semver = version::parse(version)?;

		let mut specs = HashMap::new();
		let mut migrations = HashMap::new();
		flatten(self, "", &mut specs, &mut migrations)?;

		let id = hasher::schema_id(&self.name, module, self.mode.as_str());
		self.freeze();
		info!(
			"Compiled schema {} {} ({}) with {} settings and {} migrations",
			module,
			version,
			id,
			specs.len(),
			migrations.len()
		);

		Ok(Schema {
			inner: Arc::new(SchemaInner {
				module: module.into(),
				version: version.into(),
				semver,
				id,
				specs,
				migrations,
			}),
		})
	}
}

fn flatten(
	blueprint: &Blueprint,
	prefix: &str,
	specs: &mut HashMap<Box<str>, SettingSpec>,
	migrations: &mut HashMap<Box<str>, Box<str>>,
) -> StResult<()> {
	for spec in blueprint.specs.values() {
		spec.check()?;
		let full: Box<str> = key::join(prefix, &spec.key).into();
		if spec.persistent && &*full == VERSION_FIELD {
			return Err(Error::Definition(format!(
				"persistent setting '{}' collides with the preferences version field",
				full
			)));
		}
		if specs.contains_key(&full) {
			return Err(Error::DuplicateKey(full));
		}
		let mut spec = spec.clone();
		spec.key = full.clone();
		specs.insert(full, spec);
	}

	// Outer registrations are merged first and win over inner ones
	for (from, to) in &blueprint.migrations {
		let from: Box<str> = key::join(prefix, from).into();
		let to: Box<str> = key::join(prefix, to).into();
		match migrations.get(&from) {
			Some(existing) if *existing != to => {
				debug!("Migration {} -> {} shadowed by {} -> {}", from, to, from, existing);
			}
			Some(_) => {}
			None => {
				migrations.insert(from, to);
			}
		}
	}

	for (name, group) in &blueprint.groups {
		flatten(group, &key::join(prefix, name), specs, migrations)?;
	}
	Ok(())
}

impl Schema {
	pub fn module(&self) -> &str {
		&self.inner.module
	}

	/// Version string as given at compilation
	pub fn version(&self) -> &str {
		&self.inner.version
	}

	pub fn semver(&self) -> &Version {
		&self.inner.semver
	}

	/// Content-derived identifier, for diagnostics and cache keys
	pub fn id(&self) -> &str {
		&self.inner.id
	}

	pub fn len(&self) -> usize {
		self.inner.specs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.specs.is_empty()
	}

	pub fn spec(&self, key: &str) -> Option<&SettingSpec> {
		self.inner.specs.get(key)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.inner.specs.contains_key(key)
	}

	pub fn specs(&self) -> impl Iterator<Item = &SettingSpec> {
		self.inner.specs.values()
	}

	/// All keys, sorted
	pub fn keys(&self) -> Vec<&str> {
		self.inner.specs.keys().map(|key| &**key).sorted().collect()
	}

	/// Keys starting with `prefix`, sorted
	pub fn keys_with_prefix(&self, prefix: &str) -> Vec<&str> {
		self.inner
			.specs
			.keys()
			.map(|key| &**key)
			.filter(|key| key.starts_with(prefix))
			.sorted()
			.collect()
	}

	pub fn migrations(&self) -> &HashMap<Box<str>, Box<str>> {
		&self.inner.migrations
	}

	/// Resolve a key directly or through one migration hop
	pub fn resolve<'a>(&'a self, key: &'a str) -> Option<&'a str> {
		if self.contains(key) {
			return Some(key);
		}
		let target = self.inner.migrations.get(key)?;
		self.contains(target).then_some(&**target)
	}
}


// vim: ts=4
