//! A probe that sends one DNS query over UDP and reports the response.

pub mod app;
pub mod config;
pub mod dispatcher;
pub mod probe;
pub mod proto;
pub mod transport;
