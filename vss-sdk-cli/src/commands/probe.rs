//! `probe` - connect and verify the databroker is alive.

use crate::error::CliError;
use vss_sdk::client::VssClient;

pub async fn run(address: &str) -> Result<(), CliError> {
    let mut client = VssClient::new(address);
    client.connect().await?;
    println!("Databroker at {} is alive", address);
    Ok(())
}
