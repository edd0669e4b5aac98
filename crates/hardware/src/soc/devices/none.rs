//! Placeholder slave for disabled windows and unattached peripheral slots.

use crate::soc::devices::Slave;
use crate::soc::transaction::{SlaveRequest, SlaveResponse};

/// Slave that always answers `SlaveResponse::NONE` and never changes state.
#[derive(Debug, Clone)]
pub struct NoneSlave {
    name: String,
}

impl NoneSlave {
    /// Creates a placeholder with the name of the slot it stands in for.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Slave for NoneSlave {
    fn name(&self) -> &str {
        &self.name
    }

    fn access(&mut self, _req: &SlaveRequest) -> SlaveResponse {
        SlaveResponse::NONE
    }
}
