use anyhow::Result;

use crate::config::Settings;

/// Print the resolved settings as JSON.
pub fn run(settings: &Settings) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}
