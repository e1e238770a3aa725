//! Print the OpenAPI document for the docshelf API to stdout.

use anyhow::Result;

fn main() -> Result<()> {
    let spec = docshelf::api::openapi();
    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}
