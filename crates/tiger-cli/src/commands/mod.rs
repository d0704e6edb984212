pub mod check_config;
pub mod dot;
pub mod opt;
pub mod run;

use anyhow::Context;
use std::path::Path;
use tiger_cfg::{OptConfig, Program};

/// Read a program in JSON form. Bodies are validated while decoding.
pub fn load_program(path: &Path) -> anyhow::Result<Program> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let program = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid program", path.display()))?;
    Ok(program)
}

/// The file's configuration, or the defaults when no file is given
pub fn load_config(path: Option<&Path>) -> anyhow::Result<OptConfig> {
    match path {
        Some(path) => OptConfig::from_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display())),
        None => Ok(OptConfig::default()),
    }
}
