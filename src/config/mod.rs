//! Configuration management for screen-spots
//!
//! A single JSON settings file under the platform config directory. Spot data
//! itself lives in the data directory (see [`crate::store`]).

pub mod settings;

pub use settings::Settings;
