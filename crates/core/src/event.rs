//! Audit-trail events emitted by the vault.

use crate::types::{Amount, Identity, Payload};
use serde::{Deserialize, Serialize};

/// One observable state change. Every variant except `FundsReceived`
/// carries the acting owner and the affected index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum VaultEvent {
    ProposalSubmitted {
        owner: Identity,
        index: u64,
    },
    ProposalConfirmed {
        owner: Identity,
        index: u64,
    },
    ProposalRevoked {
        owner: Identity,
        index: u64,
    },
    ProposalExecuted {
        owner: Identity,
        index: u64,
    },
    TransactionSubmitted {
        owner: Identity,
        index: u64,
        recipient: Identity,
        amount: Amount,
        payload: Payload,
    },
    TransactionConfirmed {
        owner: Identity,
        index: u64,
    },
    TransactionRevoked {
        owner: Identity,
        index: u64,
    },
    TransactionExecuted {
        owner: Identity,
        index: u64,
    },
    /// Passive deposit with no associated transaction.
    FundsReceived {
        sender: Identity,
        amount: Amount,
        balance: Amount,
    },
}

impl VaultEvent {
    /// Stable event name, used as the row discriminator in sinks.
    pub fn name(&self) -> &'static str {
        match self {
            VaultEvent::ProposalSubmitted { .. } => "ProposalSubmitted",
            VaultEvent::ProposalConfirmed { .. } => "ProposalConfirmed",
            VaultEvent::ProposalRevoked { .. } => "ProposalRevoked",
            VaultEvent::ProposalExecuted { .. } => "ProposalExecuted",
            VaultEvent::TransactionSubmitted { .. } => "TransactionSubmitted",
            VaultEvent::TransactionConfirmed { .. } => "TransactionConfirmed",
            VaultEvent::TransactionRevoked { .. } => "TransactionRevoked",
            VaultEvent::TransactionExecuted { .. } => "TransactionExecuted",
            VaultEvent::FundsReceived { .. } => "FundsReceived",
        }
    }
}
