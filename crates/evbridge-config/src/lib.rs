//! Options parsing for evbridge
//!
//! This crate reads the add-on options document (JSON) and normalizes it
//! into the immutable [`Config`] the daemon runs with. Malformed options
//! fall back to their documented defaults with a warning; nothing in here
//! is fatal.

mod error;
mod model;
mod parser;

pub use error::ConfigError;
pub use model::*;
pub use parser::{load_config, parse_options, read_options};
