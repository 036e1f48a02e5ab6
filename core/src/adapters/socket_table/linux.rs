//! Linux socket table implementation reading `/proc/net`.

use std::path::PathBuf;

use tokio::fs;

use crate::domain::{AddressFamily, ListenerRecord, Transport};
use crate::error::{Error, Result};
use crate::ports::ListenerFilter;

use super::utils::Utils;
use super::Table;

/// Linux-specific socket table reader.
pub struct LinuxTable {
    proc_net: PathBuf,
}

impl LinuxTable {
    pub fn new() -> Self {
        Self::with_root("/proc/net")
    }

    /// Read tables from a directory other than `/proc/net` (for testing).
    pub fn with_root(proc_net: impl Into<PathBuf>) -> Self {
        Self {
            proc_net: proc_net.into(),
        }
    }

    fn table_path(&self, transport: Transport, family: AddressFamily) -> PathBuf {
        let name = match (transport, family) {
            (Transport::Tcp, AddressFamily::V4) => "tcp",
            (Transport::Udp, AddressFamily::V4) => "udp",
            (Transport::Tcp, AddressFamily::V6) => "tcp6",
            (Transport::Udp, AddressFamily::V6) => "udp6",
        };
        self.proc_net.join(name)
    }
}

impl Default for LinuxTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Table for LinuxTable {
    async fn query(
        &self,
        transport: Transport,
        family: AddressFamily,
        filter: ListenerFilter<'_>,
    ) -> Result<Vec<ListenerRecord>> {
        let path = self.table_path(transport, family);
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| {
                Error::CommandFailed(format!("Failed to read {}: {}", path.display(), e))
            })?;

        let mut records = Utils::parse_proc_net(&content, transport, family);
        records.retain(|r| filter(r));
        Ok(records)
    }
}
