//! Exemption rules deciding which listeners get blocked.

use std::collections::HashSet;
use std::net::IpAddr;

use super::{ListenerRecord, SocketState, Transport};
use crate::config::Config;

/// Pure predicates over listener records, built once from configuration.
///
/// Address exemption is checked first and short-circuits everything else;
/// port protection only applies to listeners that survived it.
#[derive(Debug, Clone, Default)]
pub struct ExemptionClassifier {
    close_ips: HashSet<String>,
    protected_ports: HashSet<String>,
}

impl ExemptionClassifier {
    pub fn new(
        close_ips: impl IntoIterator<Item = impl Into<String>>,
        protected_ports: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            close_ips: close_ips.into_iter().map(Into::into).collect(),
            protected_ports: protected_ports.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.close_ips.iter().cloned(), config.protected_ports.iter().cloned())
    }

    /// True if the address is listed in `closeips`.
    ///
    /// Matching is exact on the canonical text form: no CIDR, and entries
    /// that are not canonical never match. IPv4-mapped IPv6 addresses are
    /// compared in their dotted IPv4 form.
    pub fn is_exempt(&self, local_ip: &IpAddr) -> bool {
        self.close_ips.contains(&local_ip.to_canonical().to_string())
    }

    pub fn is_monitor_candidate_tcp(&self, record: &ListenerRecord) -> bool {
        if self.is_exempt(&record.local_addr) {
            return false;
        }
        record.state == SocketState::Listen
    }

    /// UDP has no listen state, so every bound, non-exempt socket counts.
    pub fn is_monitor_candidate_udp(&self, record: &ListenerRecord) -> bool {
        !self.is_exempt(&record.local_addr)
    }

    /// True if the listener's port is in `protectedports`, whatever its
    /// transport or family.
    pub fn is_protected(&self, record: &ListenerRecord) -> bool {
        self.protected_ports.contains(&record.local_port.to_string())
    }

    /// The candidate predicate for a transport.
    pub fn candidate_filter(
        &self,
        transport: Transport,
    ) -> impl Fn(&ListenerRecord) -> bool + Send + Sync + '_ {
        move |record: &ListenerRecord| match transport {
            Transport::Tcp => self.is_monitor_candidate_tcp(record),
            Transport::Udp => self.is_monitor_candidate_udp(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn classifier() -> ExemptionClassifier {
        ExemptionClassifier::new(["127.0.0.1", "::1"], ["22"])
    }

    fn tcp(ip: IpAddr, port: u16, state: SocketState) -> ListenerRecord {
        ListenerRecord::new(ip, port, Transport::Tcp, state)
    }

    #[test]
    fn test_exempt_ip_is_never_a_candidate() {
        let c = classifier();
        let lo = IpAddr::V4(Ipv4Addr::LOCALHOST);
        assert!(c.is_exempt(&lo));

        let listening = tcp(lo, 8080, SocketState::Listen);
        assert!(!c.is_monitor_candidate_tcp(&listening));

        let udp = ListenerRecord::new(lo, 53, Transport::Udp, SocketState::Close);
        assert!(!c.is_monitor_candidate_udp(&udp));
    }

    #[test]
    fn test_tcp_candidate_requires_listen() {
        let c = classifier();
        let any = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        assert!(c.is_monitor_candidate_tcp(&tcp(any, 9000, SocketState::Listen)));
        assert!(!c.is_monitor_candidate_tcp(&tcp(any, 9000, SocketState::Established)));
        assert!(!c.is_monitor_candidate_tcp(&tcp(any, 9000, SocketState::TimeWait)));
    }

    #[test]
    fn test_udp_candidate_ignores_state() {
        let c = classifier();
        let any = IpAddr::V6(Ipv6Addr::UNSPECIFIED);
        for state in [SocketState::Close, SocketState::Established] {
            let record = ListenerRecord::new(any, 5353, Transport::Udp, state);
            assert!(c.is_monitor_candidate_udp(&record));
        }
    }

    #[test]
    fn test_protected_port_is_transport_independent() {
        let c = classifier();
        let any = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        let t = tcp(any, 22, SocketState::Listen);
        let u = ListenerRecord::new(any, 22, Transport::Udp, SocketState::Close);
        assert!(c.is_protected(&t));
        assert!(c.is_protected(&u));
        assert!(!c.is_protected(&tcp(any, 2222, SocketState::Listen)));
    }

    #[test]
    fn test_protected_port_on_exempt_ip_is_still_exempt() {
        let c = classifier();
        let record = tcp(IpAddr::V4(Ipv4Addr::LOCALHOST), 22, SocketState::Listen);
        assert!(!c.is_monitor_candidate_tcp(&record));
    }

    #[test]
    fn test_non_canonical_entries_never_match() {
        let c = ExemptionClassifier::new(["127.000.000.001", "10.0.0.0/8"], Vec::<String>::new());
        assert!(!c.is_exempt(&IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert!(!c.is_exempt(&IpAddr::V4(Ipv4Addr::new(10, 1, 2, 3))));
    }

    #[test]
    fn test_ipv4_mapped_address_matches_v4_entry() {
        let c = classifier();
        let mapped = IpAddr::V6(Ipv4Addr::LOCALHOST.to_ipv6_mapped());
        assert!(c.is_exempt(&mapped));
    }

    #[test]
    fn test_candidate_filter_dispatches_on_transport() {
        let c = classifier();
        let any = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        let established = tcp(any, 443, SocketState::Established);
        assert!(!(c.candidate_filter(Transport::Tcp))(&established));
        assert!((c.candidate_filter(Transport::Udp))(&established));
    }
}
