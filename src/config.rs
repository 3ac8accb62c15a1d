use std::{net::Ipv4Addr, time::Duration};

use clap::Parser;
use thiserror::Error;

use crate::{
    probe::DNS_PORT,
    proto::{DomainName, DomainNameError, QType, Question, UnknownMnemonic},
};

pub const DEFAULT_SERVER: &str = "37.152.177.218";
pub const DEFAULT_NAME: &str = "cloud99p.org";

#[derive(Debug, Parser)]
#[command(
    name = "dns-probe",
    version,
    about = "Send a single DNS query over UDP and print the response"
)]
pub struct Cli {
    /// IPv4 address of the name server to query
    #[arg(long, default_value = DEFAULT_SERVER)]
    pub server: String,

    /// Destination UDP port
    #[arg(long, default_value_t = DNS_PORT)]
    pub port: u16,

    /// Domain name to ask about
    #[arg(long, default_value = DEFAULT_NAME)]
    pub name: String,

    /// Record type, as a mnemonic (A, NS, MX, ...) or a number
    #[arg(long = "type", default_value = "A")]
    pub record_type: String,

    /// Clear the recursion desired flag
    #[arg(long)]
    pub no_recursion: bool,

    /// How long to wait for the response, in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub timeout: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("'{0}' is not a valid IPv4 address")]
    InvalidDestination(String),
    #[error("'{name}' is not a valid domain name")]
    InvalidName {
        name: String,
        #[source]
        source: DomainNameError,
    },
    #[error(transparent)]
    InvalidType(#[from] UnknownMnemonic),
    #[error("The timeout must be larger than zero")]
    ZeroTimeout,
}

/// Everything one probe run needs, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub destination: Ipv4Addr,
    pub port: u16,
    pub question: Question,
    pub recursion_desired: bool,
    pub timeout: Duration,
}

impl TryFrom<&Cli> for ProbeConfig {
    type Error = ConfigError;

    fn try_from(cli: &Cli) -> Result<Self, Self::Error> {
        let destination = cli
            .server
            .parse::<Ipv4Addr>()
            .map_err(|_| ConfigError::InvalidDestination(cli.server.clone()))?;
        let name = cli
            .name
            .parse::<DomainName>()
            .map_err(|source| ConfigError::InvalidName {
                name: cli.name.clone(),
                source,
            })?;
        let q_type = cli.record_type.parse::<QType>()?;
        if cli.timeout == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(Self {
            destination,
            port: cli.port,
            question: Question::internet(name, q_type),
            recursion_desired: !cli.no_recursion,
            timeout: Duration::from_millis(cli.timeout),
        })
    }
}
