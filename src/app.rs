//! One probe run as the binary performs it.

use anyhow::{bail, Context};

use crate::{
    config::ProbeConfig,
    dispatcher::{QueryDispatcher, Response},
    transport::Transport,
};

/// Sends the configured query over `transport`. Getting no response in time is an error here.
pub async fn run<T: Transport>(config: &ProbeConfig, transport: T) -> anyhow::Result<Response> {
    let dispatcher = QueryDispatcher::new(transport)
        .with_port(config.port)
        .with_timeout(config.timeout);
    let Some(response) = dispatcher
        .send_query(
            config.destination,
            config.question.clone(),
            config.recursion_desired,
        )
        .await
        .context("DNS query failed")?
    else {
        bail!(
            "no response received from {}:{} within {:?}",
            config.destination,
            config.port,
            config.timeout
        );
    };
    Ok(response)
}
