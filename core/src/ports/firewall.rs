//! Firewall control port (interface).

use crate::domain::{AddressFamily, BlockRule};
use crate::error::Result;

/// Port for obtaining family-scoped firewall handles.
///
/// Opening a handle may fail when the family's filtering stack is not
/// available; callers treat that as a failure of that family only.
pub trait FirewallControlPort: Send + Sync {
    type Handle: FirewallHandle;

    /// Open a handle for one address family.
    fn open(
        &self,
        family: AddressFamily,
    ) -> impl std::future::Future<Output = Result<Self::Handle>> + Send;
}

/// Operations on the packet filter of a single address family.
pub trait FirewallHandle: Send + Sync {
    /// List chain names of `table`.
    fn list_chains(
        &self,
        table: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;

    /// Append `rule` to `table`/`chain` unless an identical rule already exists.
    fn append_unique(
        &self,
        table: &str,
        chain: &str,
        rule: &BlockRule,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
