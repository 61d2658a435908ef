//! `subscribe` - print signal updates until interrupted.

use crate::error::CliError;
use vss_sdk::client::VssClient;

pub async fn run(address: &str, paths: Vec<String>) -> Result<(), CliError> {
    let mut client = VssClient::new(address);
    client.connect().await?;

    for path in &paths {
        let printed_path = path.clone();
        client.subscribe_value(path.clone(), move |value| {
            println!("{} = {}", printed_path, value);
        })?;
    }
    client.start_subscriptions().await?;
    println!("Subscribed to {} signal(s); press Ctrl-C to stop", paths.len());

    tokio::signal::ctrl_c().await.map_err(CliError::Signal)?;
    client.disconnect().await;
    Ok(())
}
