//! `provide` - own actuators and echo commands back as actual values.
//!
//! A fixture-style provider: every commanded target is accepted and
//! immediately reported back as the actual value, which is enough to
//! exercise consumer applications against a live broker.

use crate::error::CliError;
use vss_sdk::provider::ActuatorProvider;

pub async fn run(address: &str, paths: Vec<String>) -> Result<(), CliError> {
    let mut provider = ActuatorProvider::new(address);
    provider.connect().await?;

    let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    provider.provide_actuators(&path_refs).await?;

    let publisher = provider.publish_handle();
    provider.on_actuate_request(move |request| {
        println!("{} commanded to {}", request.path, request.value);
        publisher.publish_actual(request.path, request.value);
    });

    provider.start().await?;
    println!("Providing {} actuator(s); press Ctrl-C to stop", paths.len());

    tokio::signal::ctrl_c().await.map_err(CliError::Signal)?;
    provider.stop().await;
    Ok(())
}
