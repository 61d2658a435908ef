//! `publish` - report a sensor value.

use super::{parse_value, ValueKindArg};
use crate::error::CliError;
use vss_sdk::client::VssClient;

pub async fn run(
    address: &str,
    path: &str,
    raw: &str,
    kind: Option<ValueKindArg>,
) -> Result<(), CliError> {
    let value = parse_value(raw, kind)?;
    let mut client = VssClient::new(address);
    client.connect().await?;

    client.publish_value(path, value.clone()).await?;
    println!("Published {} = {}", path, value);
    Ok(())
}
