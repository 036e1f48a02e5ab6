//! Fallback for platforms without a socket table reader.

use crate::domain::{AddressFamily, ListenerRecord, Transport};
use crate::error::{Error, Result};
use crate::ports::ListenerFilter;

use super::Table;

pub struct UnsupportedTable;

impl UnsupportedTable {
    pub fn new() -> Self {
        Self
    }
}

impl Table for UnsupportedTable {
    async fn query(
        &self,
        transport: Transport,
        family: AddressFamily,
        _filter: ListenerFilter<'_>,
    ) -> Result<Vec<ListenerRecord>> {
        Err(Error::UnsupportedPlatform(format!(
            "no {}/{} socket table reader for {}",
            transport,
            family,
            std::env::consts::OS
        )))
    }
}
