//! The query as it goes on the wire: an IPv4 destination, a UDP header and the DNS message.

use std::{
    fmt,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
};

use bytes::Bytes;

use crate::proto::{FromPacketBytes, Header, Packet, PacketError, PacketType};

pub const DNS_PORT: u16 = 53;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Layer {
    pub destination: Ipv4Addr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UdpLayer {
    /// `None` lets the operating system pick an ephemeral port when the socket is bound.
    pub source_port: Option<u16>,
    pub destination_port: u16,
}

/// A single use query packet. The DNS message is encoded when the packet is built so an invalid
/// or oversized message never reaches a transport.
#[derive(Debug, Clone)]
pub struct ProbePacket {
    ip: Ipv4Layer,
    udp: UdpLayer,
    dns: Packet,
    payload: Bytes,
}

impl ProbePacket {
    pub fn new(destination: Ipv4Addr, destination_port: u16, dns: Packet) -> Result<Self, PacketError> {
        let payload = dns.encode()?;
        Ok(Self {
            ip: Ipv4Layer { destination },
            udp: UdpLayer {
                source_port: None,
                destination_port,
            },
            dns,
            payload,
        })
    }

    pub fn ip(&self) -> &Ipv4Layer {
        &self.ip
    }

    pub fn udp(&self) -> &UdpLayer {
        &self.udp
    }

    pub fn dns(&self) -> &Packet {
        &self.dns
    }

    /// The encoded DNS message, i.e. the UDP payload.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn destination(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.ip.destination, self.udp.destination_port)
    }

    /// Whether a datagram received from `source` is the response to this query: it has to come
    /// from the destination and carry a response header with the query's id.
    pub fn matches_reply(&self, source: SocketAddr, datagram: &[u8]) -> bool {
        if source != SocketAddr::V4(self.destination()) {
            return false;
        }
        match Header::parse(datagram, 0) {
            Ok((header, _)) => {
                header.id == self.dns.id() && header.packet_type == PacketType::Response
            }
            Err(_) => false,
        }
    }

    pub fn summary(&self) -> String {
        format!("IP / UDP {} / {}", self, self.dns.summary())
    }
}

impl fmt::Display for ProbePacket {
    /// `source > destination` of the UDP layer.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.udp.source_port {
            Some(port) => write!(f, "{port}")?,
            None => f.write_str("ephemeral")?,
        }
        write!(f, " > {}", self.destination())
    }
}
