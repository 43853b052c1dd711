//! Operator pause switch

use candid::CandidType;
use serde::Deserialize;

/// Halt struct containing reasoning and status
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub struct Halt {
    /// The current halt status
    pub status: HaltStatus,
    /// The halt message (if the vault status is not `Functional`)
    pub message: Option<String>,
}

impl Default for Halt {
    fn default() -> Self {
        Self {
            status: HaltStatus::Functional,
            message: None,
        }
    }
}

/// Halt Status enum determining whether deposits and deployments are accepted
#[derive(Clone, CandidType, Debug, Deserialize, PartialEq)]
pub enum HaltStatus {
    /// Functioning as expected
    Functional,
    /// Paused by the operator. Redemptions stay open.
    Paused {
        /// Timestamp in seconds of the pause
        paused_at: u64,
    },
}

impl Halt {
    /// Returns `true` if the vault is not paused.
    pub fn is_functional(&self) -> bool {
        matches!(self.status, HaltStatus::Functional)
    }

    /// Pauses the vault. Pausing an already paused vault keeps the original timestamp
    /// and replaces the message.
    pub fn pause(&mut self, now: u64, message: Option<String>) -> &mut Self {
        if self.is_functional() {
            self.status = HaltStatus::Paused { paused_at: now };
        }
        self.message = message;
        self
    }

    /// Resumes normal operation.
    pub fn unpause(&mut self) -> &mut Self {
        self.status = HaltStatus::Functional;
        self.message = None;
        self
    }
}
