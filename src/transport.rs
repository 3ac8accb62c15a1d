//! Getting a query onto the network and one matching datagram back.

use std::{
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::{net::UdpSocket, time::Instant};
use tracing::{debug, warn};

use crate::probe::ProbePacket;

/// Large enough for any UDP DNS response, EDNS(0) sized ones included.
const MAX_DATAGRAM_SIZE: usize = 4096;

/// A datagram received in reply to a probe.
#[derive(Debug, Clone)]
pub struct Datagram {
    pub source: SocketAddr,
    pub local: SocketAddr,
    pub payload: Bytes,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to bind a UDP socket on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("Failed to connect the UDP socket to {destination}")]
    Connect {
        destination: SocketAddrV4,
        #[source]
        source: io::Error,
    },
    #[error("Failed to send the query to {destination}")]
    Send {
        destination: SocketAddrV4,
        #[source]
        source: io::Error,
    },
    #[error("Failed to receive a response from {destination}")]
    Receive {
        destination: SocketAddrV4,
        #[source]
        source: io::Error,
    },
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the packet once and waits for the first datagram that
    /// [ProbePacket::matches_reply]. `Ok(None)` means nothing matching arrived within `timeout`.
    async fn exchange(
        &self,
        packet: &ProbePacket,
        timeout: Duration,
    ) -> Result<Option<Datagram>, TransportError>;

    fn name(&self) -> &'static str;
}

pub struct UdpTransport {
    bind_addr: SocketAddr,
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
    }
}

impl UdpTransport {
    /// Port 0 in `bind_addr` lets the operating system choose the source port.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self { bind_addr }
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn exchange(
        &self,
        packet: &ProbePacket,
        timeout: Duration,
    ) -> Result<Option<Datagram>, TransportError> {
        let destination = packet.destination();
        let socket = UdpSocket::bind(self.bind_addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: self.bind_addr,
                source,
            })?;
        // Connecting makes the kernel drop datagrams from any other peer.
        socket
            .connect(destination)
            .await
            .map_err(|source| TransportError::Connect {
                destination,
                source,
            })?;
        let local = socket
            .local_addr()
            .map_err(|source| TransportError::Bind {
                addr: self.bind_addr,
                source,
            })?;

        let deadline = Instant::now() + timeout;
        let sent = tokio::time::timeout_at(deadline, socket.send(packet.payload()))
            .await
            .map_err(|_| TransportError::Send {
                destination,
                source: io::ErrorKind::TimedOut.into(),
            })?
            .map_err(|source| TransportError::Send {
                destination,
                source,
            })?;
        debug!(%destination, %local, id = packet.dns().id(), bytes = sent, "Query sent");

        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            let received = match tokio::time::timeout_at(deadline, socket.recv(&mut buffer)).await {
                Ok(received) => received.map_err(|source| TransportError::Receive {
                    destination,
                    source,
                })?,
                Err(_) => {
                    warn!(%destination, ?timeout, "No response before the deadline");
                    return Ok(None);
                }
            };
            let datagram = &buffer[..received];
            if packet.matches_reply(SocketAddr::V4(destination), datagram) {
                debug!(%destination, bytes = received, "Response received");
                return Ok(Some(Datagram {
                    source: SocketAddr::V4(destination),
                    local,
                    payload: Bytes::copy_from_slice(datagram),
                }));
            }
            debug!(%destination, bytes = received, "Ignoring datagram that does not answer the query");
        }
    }

    fn name(&self) -> &'static str {
        "UDP"
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::proto::{Packet, QType, Question, ResponseCode};

    fn query(port: u16) -> ProbePacket {
        let dns = Packet::query(rand::random())
            .recursion_desired(true)
            .add_question(Question::internet("cloud99p.org".parse().unwrap(), QType::A))
            .build()
            .unwrap();
        ProbePacket::new(Ipv4Addr::LOCALHOST, port, dns).unwrap()
    }

    async fn responder() -> (Arc<UdpSocket>, u16) {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = socket.local_addr().unwrap().port();
        (Arc::new(socket), port)
    }

    fn transport() -> UdpTransport {
        UdpTransport::new(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
    }

    #[tokio::test]
    async fn exchange_with_local_server() {
        let (server, port) = responder().await;
        let packet = query(port);

        let server_task = tokio::spawn({
            let server = Arc::clone(&server);
            async move {
                let mut buffer = [0u8; 512];
                let (size, peer) = server.recv_from(&mut buffer).await.unwrap();
                let query = Packet::try_parse(&buffer[..size]).unwrap();
                let reply = query.respond(ResponseCode::None).build().unwrap();
                server
                    .send_to(&reply.encode().unwrap(), peer)
                    .await
                    .unwrap();
                query
            }
        });

        let datagram = transport()
            .exchange(&packet, Duration::from_secs(5))
            .await
            .unwrap()
            .expect("a response");
        let seen_by_server = server_task.await.unwrap();

        assert_eq!(&seen_by_server, packet.dns());
        assert_eq!(datagram.source, SocketAddr::from((Ipv4Addr::LOCALHOST, port)));
        assert_ne!(datagram.local.port(), 0);
        let reply = Packet::try_parse(&datagram.payload).unwrap();
        assert_eq!(reply.id(), packet.dns().id());
    }

    #[tokio::test]
    async fn skips_unrelated_datagrams() {
        let (server, port) = responder().await;
        let packet = query(port);

        tokio::spawn({
            let server = Arc::clone(&server);
            async move {
                let mut buffer = [0u8; 512];
                let (size, peer) = server.recv_from(&mut buffer).await.unwrap();
                let query = Packet::try_parse(&buffer[..size]).unwrap();
                // Echo of the query, garbage, then the real response.
                server.send_to(&buffer[..size], peer).await.unwrap();
                server.send_to(&[1, 2, 3], peer).await.unwrap();
                let reply = query.respond(ResponseCode::Refused).build().unwrap();
                server
                    .send_to(&reply.encode().unwrap(), peer)
                    .await
                    .unwrap();
            }
        });

        let datagram = transport()
            .exchange(&packet, Duration::from_secs(5))
            .await
            .unwrap()
            .expect("a response");
        let reply = Packet::try_parse(&datagram.payload).unwrap();
        assert_eq!(reply.header().response_code, ResponseCode::Refused);
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let (_server, port) = responder().await;
        let packet = query(port);

        let result = transport()
            .exchange(&packet, Duration::from_millis(100))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn refused_port_is_a_transport_error() {
        let (closed, port) = responder().await;
        drop(closed);
        let packet = query(port);

        let error = transport()
            .exchange(&packet, Duration::from_secs(5))
            .await
            .unwrap_err();
        match error {
            TransportError::Receive { destination, source } => {
                assert_eq!(destination, packet.destination());
                assert_eq!(source.kind(), io::ErrorKind::ConnectionRefused);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn connect_failure_names_the_step() {
        let destination = SocketAddrV4::new(Ipv4Addr::LOCALHOST, 53);
        let error = TransportError::Connect {
            destination,
            source: io::ErrorKind::PermissionDenied.into(),
        };
        assert_eq!(
            error.to_string(),
            "Failed to connect the UDP socket to 127.0.0.1:53"
        );
        assert_eq!(
            std::error::Error::source(&error)
                .and_then(|source| source.downcast_ref::<io::Error>())
                .map(io::Error::kind),
            Some(io::ErrorKind::PermissionDenied)
        );
    }
}
