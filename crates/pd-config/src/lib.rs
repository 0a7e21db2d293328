//! pd-config
//!
//! Settings for the playground directory binary and its logging setup.

pub mod error;
pub mod logging;
pub mod settings;

pub use error::SettingsError;
pub use logging::init_tracing;
pub use settings::{
    FirestoreSettings, LogFormat, LogSettings, ServerSettings, Settings, StoreBackend,
    StoreSettings,
};
