//! Builds the one query of a probe run, sends it and hands back what came in reply.

use std::{
    fmt,
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    probe::{ProbePacket, DNS_PORT},
    proto::{Packet, PacketError, Question},
    transport::{Transport, TransportError, UdpTransport},
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to build the query packet")]
    Build(#[source] PacketError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("The response from {source_addr} is not a valid DNS message")]
    MalformedResponse {
        source_addr: SocketAddr,
        #[source]
        source: PacketError,
    },
}

/// The reply to a probe.
#[derive(Debug, Clone)]
pub struct Response {
    source: SocketAddr,
    local: SocketAddr,
    raw: Bytes,
    packet: Packet,
}

impl Response {
    pub fn source(&self) -> SocketAddr {
        self.source
    }

    pub fn local(&self) -> SocketAddr {
        self.local
    }

    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    pub fn packet(&self) -> &Packet {
        &self.packet
    }

    pub fn summary(&self) -> String {
        format!(
            "IP / UDP {} > {} / {}",
            self.source,
            self.local,
            self.packet.summary()
        )
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ";; SERVER: {} ({} bytes)", self.source, self.raw.len())?;
        write!(f, "{}", self.packet)
    }
}

/// Sends single queries over a [Transport]. Nothing is retried.
pub struct QueryDispatcher<T = UdpTransport> {
    transport: T,
    port: u16,
    timeout: Duration,
}

impl<T: Transport> QueryDispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            port: DNS_PORT,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Destination UDP port, 53 unless changed.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Assembles the packet for a query without sending it. The transaction id is random.
    pub fn build_packet(
        &self,
        destination: Ipv4Addr,
        question: Question,
        recursion_desired: bool,
    ) -> Result<ProbePacket, DispatchError> {
        let dns = Packet::query(rand::random())
            .recursion_desired(recursion_desired)
            .add_question(question)
            .build()
            .map_err(DispatchError::Build)?;
        ProbePacket::new(destination, self.port, dns).map_err(DispatchError::Build)
    }

    /// Sends one query for `question` to `destination` and waits for its response. `Ok(None)`
    /// means no response arrived before the timeout.
    pub async fn send_query(
        &self,
        destination: Ipv4Addr,
        question: Question,
        recursion_desired: bool,
    ) -> Result<Option<Response>, DispatchError> {
        let packet = self.build_packet(destination, question, recursion_desired)?;
        self.send_packet(&packet).await
    }

    pub async fn send_packet(&self, packet: &ProbePacket) -> Result<Option<Response>, DispatchError> {
        info!(
            transport = self.transport.name(),
            destination = %packet.destination(),
            id = packet.dns().id(),
            timeout = ?self.timeout,
            "{}",
            packet.summary()
        );
        let Some(datagram) = self.transport.exchange(packet, self.timeout).await? else {
            return Ok(None);
        };
        let dns = Packet::try_parse(&datagram.payload).map_err(|source| {
            DispatchError::MalformedResponse {
                source_addr: datagram.source,
                source,
            }
        })?;
        debug!(
            source = %datagram.source,
            answers = dns.answers().len(),
            code = %dns.header().response_code,
            "Parsed response"
        );
        Ok(Some(Response {
            source: datagram.source,
            local: datagram.local,
            raw: datagram.payload,
            packet: dns,
        }))
    }
}

#[cfg(test)]
mod test {
    use std::{
        net::SocketAddrV4,
        sync::{Arc, Mutex},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        proto::{Class, DomainName, QType, RData, Resource, ResponseCode},
        transport::Datagram,
    };

    const RESOLVER: Ipv4Addr = Ipv4Addr::new(37, 152, 177, 218);

    enum Reply {
        Answer(Ipv4Addr),
        Garbage,
        Nothing,
    }

    /// Answers from a script and remembers every packet it was asked to send.
    struct ScriptedTransport {
        reply: Reply,
        sent: Arc<Mutex<Vec<ProbePacket>>>,
    }

    impl ScriptedTransport {
        fn new(reply: Reply) -> (Self, Arc<Mutex<Vec<ProbePacket>>>) {
            let sent = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    reply,
                    sent: Arc::clone(&sent),
                },
                sent,
            )
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn exchange(
            &self,
            packet: &ProbePacket,
            _timeout: Duration,
        ) -> Result<Option<Datagram>, TransportError> {
            self.sent.lock().unwrap().push(packet.clone());
            // Decode what would have gone on the wire, like a server would.
            let query = Packet::try_parse(packet.payload()).unwrap();
            let payload = match self.reply {
                Reply::Answer(addr) => {
                    let name = query.questions()[0].name().clone();
                    query
                        .respond(ResponseCode::None)
                        .add_answer(Resource::new(name, Class::IN, 60, RData::A(addr)))
                        .build()
                        .unwrap()
                        .encode()
                        .unwrap()
                }
                Reply::Garbage => {
                    // A matching header claiming a question that is not there.
                    let mut bytes = packet.payload()[..12].to_vec();
                    bytes[2] |= 0x80;
                    Bytes::from(bytes)
                }
                Reply::Nothing => return Ok(None),
            };
            Ok(Some(Datagram {
                source: SocketAddr::V4(packet.destination()),
                local: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 2), 40000)),
                payload,
            }))
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    fn question() -> Question {
        Question::internet("cloud99p.org".parse().unwrap(), QType::A)
    }

    #[test]
    fn built_packet_carries_one_question_with_recursion() {
        let (transport, _) = ScriptedTransport::new(Reply::Nothing);
        let packet = QueryDispatcher::new(transport)
            .build_packet(RESOLVER, question(), true)
            .unwrap();

        let dns = packet.dns();
        assert_eq!(dns.questions(), &[question()]);
        assert!(dns.header().recursion_desired);
        assert_eq!(packet.ip().destination, RESOLVER);
        assert_eq!(packet.udp().destination_port, DNS_PORT);
        assert_eq!(packet.udp().source_port, None);
    }

    #[test]
    fn recursion_can_be_cleared_and_port_changed() {
        let (transport, _) = ScriptedTransport::new(Reply::Nothing);
        let packet = QueryDispatcher::new(transport)
            .with_port(8080)
            .build_packet(Ipv4Addr::LOCALHOST, question(), false)
            .unwrap();
        assert!(!packet.dns().header().recursion_desired);
        assert_eq!(packet.destination().to_string(), "127.0.0.1:8080");
    }

    #[tokio::test]
    async fn wire_bytes_decode_to_the_question() {
        let (transport, sent) = ScriptedTransport::new(Reply::Answer(Ipv4Addr::new(1, 2, 3, 4)));
        let dispatcher = QueryDispatcher::new(transport);
        dispatcher
            .send_query(RESOLVER, question(), true)
            .await
            .unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].ip().destination, RESOLVER);
        let decoded = Packet::try_parse(sent[0].payload()).unwrap();
        assert_eq!(decoded.questions().len(), 1);
        let decoded_question = &decoded.questions()[0];
        assert_eq!(
            decoded_question.name(),
            &"cloud99p.org".parse::<DomainName>().unwrap()
        );
        assert_eq!(decoded_question.q_type(), QType::A);
        assert!(decoded.header().recursion_desired);
        // RD is the lowest bit of the third header byte.
        assert_eq!(sent[0].payload()[2] & 1, 1);
    }

    #[tokio::test]
    async fn response_is_returned() {
        let (transport, _) = ScriptedTransport::new(Reply::Answer(Ipv4Addr::new(1, 2, 3, 4)));
        let response = QueryDispatcher::new(transport)
            .send_query(RESOLVER, question(), true)
            .await
            .unwrap()
            .expect("a response");

        assert_eq!(response.source().to_string(), "37.152.177.218:53");
        assert_eq!(response.packet().answers().len(), 1);
        assert_eq!(
            response.summary(),
            "IP / UDP 37.152.177.218:53 > 10.0.0.2:40000 / DNS Ans \"1.2.3.4\""
        );
        let dump = response.to_string();
        assert!(dump.starts_with(";; SERVER: 37.152.177.218:53 ("));
        assert!(dump.contains(";; ANSWER SECTION:\ncloud99p.org.\t60\tIN\tA\t1.2.3.4\n"));
    }

    #[tokio::test]
    async fn no_response_is_none() {
        let (transport, sent) = ScriptedTransport::new(Reply::Nothing);
        let response = QueryDispatcher::new(transport)
            .with_timeout(Duration::from_millis(10))
            .send_query(RESOLVER, question(), true)
            .await
            .unwrap();
        assert!(response.is_none());
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn malformed_response_is_an_error() {
        let (transport, _) = ScriptedTransport::new(Reply::Garbage);
        let error = QueryDispatcher::new(transport)
            .send_query(RESOLVER, question(), true)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            DispatchError::MalformedResponse {
                source: PacketError::TooFewEntries { .. },
                ..
            }
        ));
    }
}
