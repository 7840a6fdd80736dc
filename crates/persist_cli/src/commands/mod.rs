//! CLI command implementations.

pub mod collections;
pub mod documents;
pub mod index;

use persist_core::Value;
use serde::Serialize;
use tracing::debug;

/// Result type of every command.
pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Parses a JSON command-line argument into a value.
fn parse_json(what: &str, text: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let json: serde_json::Value = serde_json::from_str(text).map_err(|e| {
        debug!(argument = what, error = %e, "rejected JSON argument");
        format!("invalid JSON for {what}: {e}")
    })?;
    Ok(Value::from(json))
}

fn print_json(output: &impl Serialize) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(output)?);
    Ok(())
}
