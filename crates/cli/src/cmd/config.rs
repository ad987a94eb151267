//! Show the effective configuration
//!
//! Output is valid TOML, so it can be redirected into a `settle.toml`.

use anyhow::Result;
use settle_cli::SettleConfig;
use std::path::Path;

pub fn run(config: &SettleConfig, source: Option<&Path>) -> Result<()> {
    match source {
        Some(path) => println!("# Source: {}", path.display()),
        None => println!("# Source: built-in defaults"),
    }
    print!("{}", config.to_toml_string()?);
    Ok(())
}
