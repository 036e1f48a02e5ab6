//! Socket table port (interface).

use crate::domain::{AddressFamily, ListenerRecord, Transport};
use crate::error::Result;

/// Predicate applied to raw socket table rows before they are returned.
pub type ListenerFilter<'a> = &'a (dyn Fn(&ListenerRecord) -> bool + Send + Sync);

/// Port for reading the operating system's socket table.
///
/// One query covers exactly one (transport, family) combination so callers
/// can tolerate a failure in one table without losing the others.
pub trait SocketTablePort: Send + Sync {
    /// Return the rows of one table that satisfy `filter`.
    fn query(
        &self,
        transport: Transport,
        family: AddressFamily,
        filter: ListenerFilter<'_>,
    ) -> impl std::future::Future<Output = Result<Vec<ListenerRecord>>> + Send;
}
