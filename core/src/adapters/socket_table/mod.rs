//! Socket table adapters.
//!
//! Platform-specific implementations of socket table queries.

#[cfg(target_os = "linux")]
mod linux;

#[cfg(not(target_os = "linux"))]
mod unsupported;

mod utils;

pub use utils::Utils;

use crate::domain::{AddressFamily, ListenerRecord, Transport};
use crate::error::Result;
use crate::ports::{ListenerFilter, SocketTablePort};

/// The main socket table reader that uses platform-specific implementations.
pub struct SocketTable {
    #[cfg(target_os = "linux")]
    inner: linux::LinuxTable,

    #[cfg(not(target_os = "linux"))]
    inner: unsupported::UnsupportedTable,
}

impl SocketTable {
    /// Create a new socket table reader for the current platform.
    pub fn new() -> Self {
        Self {
            #[cfg(target_os = "linux")]
            inner: linux::LinuxTable::new(),

            #[cfg(not(target_os = "linux"))]
            inner: unsupported::UnsupportedTable::new(),
        }
    }
}

impl Default for SocketTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SocketTablePort for SocketTable {
    async fn query(
        &self,
        transport: Transport,
        family: AddressFamily,
        filter: ListenerFilter<'_>,
    ) -> Result<Vec<ListenerRecord>> {
        self.inner.query(transport, family, filter).await
    }
}

/// Internal trait for platform-specific implementations.
trait Table: Send + Sync {
    fn query(
        &self,
        transport: Transport,
        family: AddressFamily,
        filter: ListenerFilter<'_>,
    ) -> impl std::future::Future<Output = Result<Vec<ListenerRecord>>> + Send;
}
