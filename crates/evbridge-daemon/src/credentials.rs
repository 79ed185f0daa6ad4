//! Supervisor token lookup
//!
//! The token comes from the environment when the add-on runs under a
//! recent supervisor, with an s6 container-environment file fallback
//! for older setups. No token means the sink can never authenticate,
//! so startup fails.

use std::path::Path;

use anyhow::{bail, Result};

const TOKEN_ENV_VARS: &[&str] = &["SUPERVISOR_TOKEN", "HASSIO_TOKEN"];
const TOKEN_FILE_PATHS: &[&str] = &[
    "/run/s6/container_environment/SUPERVISOR_TOKEN",
    "/run/s6/container_environment/HASSIO_TOKEN",
];

pub fn supervisor_token() -> Result<String> {
    for var in TOKEN_ENV_VARS {
        if let Ok(value) = std::env::var(var) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Ok(trimmed.to_string());
            }
        }
    }
    for path in TOKEN_FILE_PATHS {
        if let Some(token) = token_from_file(Path::new(path)) {
            return Ok(token);
        }
    }
    bail!("Missing SUPERVISOR_TOKEN/HASSIO_TOKEN")
}

fn token_from_file(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_string())
}
