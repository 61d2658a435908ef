//! `get` - read the current value of a signal.

use crate::error::CliError;
use vss_sdk::client::VssClient;

pub async fn run(address: &str, path: &str) -> Result<(), CliError> {
    let mut client = VssClient::new(address);
    client.connect().await?;

    match client.get_value(path).await? {
        Some(value) => println!("{} = {}", path, value),
        None => println!("{} has no value", path),
    }
    Ok(())
}
