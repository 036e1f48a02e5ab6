//! In-memory port implementations shared by the application tests.

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::domain::{
    AddressFamily, BlockRule, ListenerRecord, SocketState, Transport, FILTER_TABLE, INPUT_CHAIN,
};
use crate::error::{Error, Result};
use crate::ports::{FirewallControlPort, FirewallHandle, ListenerFilter, SocketTablePort};

pub fn record(ip: &str, port: u16, transport: Transport, state: SocketState) -> ListenerRecord {
    let addr: IpAddr = ip.parse().unwrap();
    ListenerRecord::new(addr, port, transport, state)
}

// ============================================================================
// MockSocketTable
// ============================================================================

/// Socket table with fixed rows per (transport, family).
#[derive(Default)]
pub struct MockSocketTable {
    rows: HashMap<(Transport, AddressFamily), Vec<ListenerRecord>>,
    failing: HashSet<(Transport, AddressFamily)>,
    panics: bool,
}

impl MockSocketTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row; the family is taken from the address.
    pub fn with(mut self, record: ListenerRecord) -> Self {
        let family = AddressFamily::of(&record.local_addr);
        self.rows.entry((record.transport, family)).or_default().push(record);
        self
    }

    pub fn failing(mut self, transport: Transport, family: AddressFamily) -> Self {
        self.failing.insert((transport, family));
        self
    }

    /// Every query panics, taking the calling task down with it.
    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }
}

impl SocketTablePort for MockSocketTable {
    async fn query(
        &self,
        transport: Transport,
        family: AddressFamily,
        filter: ListenerFilter<'_>,
    ) -> Result<Vec<ListenerRecord>> {
        assert!(!self.panics, "socket table exploded");
        if self.failing.contains(&(transport, family)) {
            return Err(Error::CommandFailed(format!(
                "simulated {}/{} table failure",
                transport, family
            )));
        }
        Ok(self
            .rows
            .get(&(transport, family))
            .map(|rows| rows.iter().filter(|r| filter(*r)).cloned().collect())
            .unwrap_or_default())
    }
}

// ============================================================================
// RecordingFirewall
// ============================================================================

/// A rule as it landed in the fake firewall.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstalledRule {
    pub family: AddressFamily,
    pub table: String,
    pub chain: String,
    pub rule: BlockRule,
}

#[derive(Default)]
struct FirewallState {
    rules: Vec<InstalledRule>,
    append_calls: usize,
}

/// Firewall with append-unique semantics that records what was installed.
///
/// Clones share state, so a test can keep one and hand the other out.
#[derive(Clone)]
pub struct RecordingFirewall {
    state: Arc<Mutex<FirewallState>>,
    chains: Vec<String>,
    unavailable: HashSet<AddressFamily>,
    rejected_ports: HashSet<u16>,
}

impl RecordingFirewall {
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            chains: vec![INPUT_CHAIN.to_string(), "FORWARD".to_string(), "OUTPUT".to_string()],
            unavailable: HashSet::new(),
            rejected_ports: HashSet::new(),
        }
    }

    pub fn with_chains(mut self, chains: &[&str]) -> Self {
        self.chains = chains.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn unavailable(mut self, family: AddressFamily) -> Self {
        self.unavailable.insert(family);
        self
    }

    /// Make appends for this destination port fail.
    pub fn rejecting_port(mut self, port: u16) -> Self {
        self.rejected_ports.insert(port);
        self
    }

    pub fn rules(&self) -> Vec<InstalledRule> {
        self.state.lock().rules.clone()
    }

    pub fn append_calls(&self) -> usize {
        self.state.lock().append_calls
    }
}

impl FirewallControlPort for RecordingFirewall {
    type Handle = RecordingHandle;

    async fn open(&self, family: AddressFamily) -> Result<RecordingHandle> {
        if self.unavailable.contains(&family) {
            return Err(Error::CommandFailed(format!("{} filtering unavailable", family)));
        }
        Ok(RecordingHandle {
            family,
            firewall: self.clone(),
        })
    }
}

pub struct RecordingHandle {
    family: AddressFamily,
    firewall: RecordingFirewall,
}

impl FirewallHandle for RecordingHandle {
    async fn list_chains(&self, table: &str) -> Result<Vec<String>> {
        if table == FILTER_TABLE {
            Ok(self.firewall.chains.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn append_unique(&self, table: &str, chain: &str, rule: &BlockRule) -> Result<()> {
        let mut state = self.firewall.state.lock();
        state.append_calls += 1;

        if self.firewall.rejected_ports.contains(&rule.destination_port) {
            return Err(Error::Firewall {
                message: "simulated append failure".to_string(),
                exit_code: Some(4),
            });
        }

        let installed = InstalledRule {
            family: self.family,
            table: table.to_string(),
            chain: chain.to_string(),
            rule: *rule,
        };
        if !state.rules.contains(&installed) {
            state.rules.push(installed);
        }
        Ok(())
    }
}
