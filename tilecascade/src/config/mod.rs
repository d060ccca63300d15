//! Configuration.
//!
//! [`EngineConfig`] carries the runtime knobs of a tile engine. [`ConfigFile`]
//! loads the same knobs, plus source and logging settings, from an INI file.

mod defaults;
mod engine;
mod file;
mod parser;

pub use defaults::*;
pub use engine::EngineConfig;
pub use file::{
    CacheSettings, ConfigFile, ConfigFileError, FetchSettings, LoggingSettings, SourceSettings,
    ViewportSettings,
};
