//! Declarative settings engine.
//!
//! Settings are declared once, by a [`Descriptor`] or explicit
//! [`SettingSpec`]s, collected into a [`Blueprint`] and compiled into an
//! immutable, versioned [`Schema`]. A schema hands out [`Profile`]s: live,
//! lock-guarded instances that enforce mutability and can be seeded from, or
//! saved back into, [`Preferences`].
//!
//! ```ignore
//! let mut blueprint = Blueprint::from_descriptor(&config)?;
//! blueprint.migrate("username", "name")?;
//! let schema = blueprint.schema("example.com/app", "1.0.0")?;
//!
//! let stored = Preferences::decode(&bytes, schema.version())?;
//! let profile = schema.profile("default", Some(&stored))?;
//! profile.set("name", "bob")?;
//! let bytes = profile.preferences().encode(Format::Binary)?;
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![forbid(unsafe_code)]

pub mod blueprint;
pub mod hasher;
pub mod preferences;
pub mod prelude;
pub mod profile;
pub mod scanner;
pub mod schema;
pub mod spec;

pub use strata_types as types;

// Re-export commonly used types
pub use blueprint::{Blueprint, Mode};
pub use preferences::{Format, Preferences};
pub use profile::{Profile, ProfileOptions, Setting, UnresolvedPolicy};
pub use scanner::{Descriptor, Field, FieldValue, Leaf};
pub use schema::Schema;
pub use spec::{SettingSpec, SettingSpecBuilder, SettingValidator};
pub use strata_types::error::{Error, StResult};
pub use strata_types::value::{Codec, Kind, Mutability, SettingValue};

// vim: ts=4
