//! Configuration commands.

use anyhow::Result;
use custodian_config::CustodianConfig;

/// Prints the effective configuration after every source has been merged.
pub fn show(config: &CustodianConfig, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        print!("{}", config.to_toml()?);
    }
    Ok(())
}
