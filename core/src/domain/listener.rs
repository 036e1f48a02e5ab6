//! Listener domain models.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

// ============================================================================
// Transport / AddressFamily
// ============================================================================

/// Transport protocol of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Tcp,
    Udp,
}

impl Transport {
    /// Protocol name as the firewall expects it after `-p`.
    pub fn protocol(&self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Udp => "udp",
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.protocol())
    }
}

/// Network-layer address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Family of a concrete address.
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }
}

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("ipv4"),
            AddressFamily::V6 => f.write_str("ipv6"),
        }
    }
}

// ============================================================================
// SocketState
// ============================================================================

/// Kernel socket state, as reported in the `st` column of `/proc/net/*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SocketState {
    Established,
    SynSent,
    SynRecv,
    FinWait1,
    FinWait2,
    TimeWait,
    Close,
    CloseWait,
    LastAck,
    Listen,
    Closing,
    NewSynRecv,
    Unknown(u8),
}

impl SocketState {
    /// Decode the numeric state code used by the Linux kernel.
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => SocketState::Established,
            0x02 => SocketState::SynSent,
            0x03 => SocketState::SynRecv,
            0x04 => SocketState::FinWait1,
            0x05 => SocketState::FinWait2,
            0x06 => SocketState::TimeWait,
            0x07 => SocketState::Close,
            0x08 => SocketState::CloseWait,
            0x09 => SocketState::LastAck,
            0x0A => SocketState::Listen,
            0x0B => SocketState::Closing,
            0x0C => SocketState::NewSynRecv,
            other => SocketState::Unknown(other),
        }
    }
}

// ============================================================================
// ListenerRecord / ClassifiedListener
// ============================================================================

/// One row of the OS socket table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerRecord {
    /// Address the socket is bound to.
    pub local_addr: IpAddr,
    /// Port the socket is bound to.
    pub local_port: u16,
    /// Transport protocol.
    pub transport: Transport,
    /// Kernel state at query time.
    pub state: SocketState,
}

impl ListenerRecord {
    pub fn new(
        local_addr: IpAddr,
        local_port: u16,
        transport: Transport,
        state: SocketState,
    ) -> Self {
        Self {
            local_addr,
            local_port,
            transport,
            state,
        }
    }
}

impl std::fmt::Display for ListenerRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.local_addr {
            IpAddr::V4(ip) => write!(f, "{} {}:{}", self.transport, ip, self.local_port),
            IpAddr::V6(ip) => write!(f, "{} [{}]:{}", self.transport, ip, self.local_port),
        }
    }
}

/// A listener record tagged with the table it was read from.
///
/// Rebuilt on every reconciliation cycle; nothing is carried across cycles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassifiedListener {
    pub transport: Transport,
    pub family: AddressFamily,
    pub record: ListenerRecord,
}

impl ClassifiedListener {
    pub fn new(transport: Transport, family: AddressFamily, record: ListenerRecord) -> Self {
        Self {
            transport,
            family,
            record,
        }
    }
}
