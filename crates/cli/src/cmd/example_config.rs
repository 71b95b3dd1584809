//! Print the example configuration file

use anyhow::Result;

pub async fn run() -> Result<()> {
    print!("{}", coalesce_core::example_config());
    Ok(())
}
