pub use crate::error::{Error, StResult};
pub use crate::value::{Kind, Mutability, SettingValue};

pub use tracing::{debug, error, info, warn};

// vim: ts=4
