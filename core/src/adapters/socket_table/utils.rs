use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::domain::{AddressFamily, ListenerRecord, SocketState, Transport};
use crate::error::{Error, Result};

pub struct Utils;

impl Utils {
    /// Parse the contents of `/proc/net/{tcp,udp,tcp6,udp6}`.
    ///
    /// Each line after the header looks like:
    /// ```text
    ///   sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
    ///    0: 00000000:1F90 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 12345
    /// ```
    /// Lines that cannot be decoded are skipped.
    pub fn parse_proc_net(
        content: &str,
        transport: Transport,
        family: AddressFamily,
    ) -> Vec<ListenerRecord> {
        let mut records = Vec::new();

        for line in content.lines().skip(1) {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                continue;
            }

            let (local_addr, local_port) = match Self::parse_hex_socket(parts[1], family) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::debug!("Skipping socket table line: {}", e);
                    continue;
                }
            };

            let Ok(code) = u8::from_str_radix(parts[3], 16) else {
                tracing::debug!("Skipping socket table line with state {:?}", parts[3]);
                continue;
            };

            records.push(ListenerRecord::new(
                local_addr,
                local_port,
                transport,
                SocketState::from_code(code),
            ));
        }

        records
    }

    /// Parse a hex `address:port` pair for the given family.
    pub fn parse_hex_socket(s: &str, family: AddressFamily) -> Result<(IpAddr, u16)> {
        let (addr_hex, port_hex) = s
            .split_once(':')
            .ok_or_else(|| Error::ParseError(format!("Invalid socket address: {}", s)))?;

        let addr = match family {
            AddressFamily::V4 => IpAddr::V4(Self::parse_hex_v4(addr_hex)?),
            AddressFamily::V6 => IpAddr::V6(Self::parse_hex_v6(addr_hex)?),
        };

        // Port is printed in network order
        let port = u16::from_str_radix(port_hex, 16)
            .map_err(|_| Error::ParseError(format!("Invalid port: {}", port_hex)))?;

        Ok((addr, port))
    }

    /// The kernel prints the raw 32-bit word in host byte order.
    fn parse_hex_v4(hex: &str) -> Result<Ipv4Addr> {
        if hex.len() != 8 {
            return Err(Error::ParseError(format!("Invalid IPv4 address: {}", hex)));
        }
        let word = u32::from_str_radix(hex, 16)
            .map_err(|_| Error::ParseError(format!("Invalid IPv4 address: {}", hex)))?;
        Ok(Ipv4Addr::from(word.to_ne_bytes()))
    }

    /// Four 32-bit words, each printed in host byte order.
    fn parse_hex_v6(hex: &str) -> Result<Ipv6Addr> {
        if !hex.is_ascii() {
            return Err(Error::ParseError(format!("Invalid IPv6 address: {:?}", hex)));
        }
        if hex.len() != 32 {
            return Err(Error::ParseError(format!(
                "Invalid IPv6 address length: expected 32 hex chars, got {}",
                hex.len()
            )));
        }

        let mut octets = [0u8; 16];
        for i in 0..4 {
            let word_hex = &hex[i * 8..(i + 1) * 8];
            let word = u32::from_str_radix(word_hex, 16)
                .map_err(|_| Error::ParseError(format!("Invalid IPv6 word: {}", word_hex)))?;
            octets[i * 4..(i + 1) * 4].copy_from_slice(&word.to_ne_bytes());
        }

        Ok(Ipv6Addr::from(octets))
    }
}
