//! Configuration for the capability engine.
//!
//! Loaded from an optional TOML file with `ENTITY_CAPS__*` environment
//! variables layered on top (highest priority); every field has a default
//! so an empty configuration is valid.

mod caps;

pub use caps::*;
