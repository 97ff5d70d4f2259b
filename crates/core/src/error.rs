//! Centralized error types for the multisig workspace.

use crate::types::{Identity, Timestamp};
use thiserror::Error;

/// Which append-only log an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Proposal,
    Transaction,
}

impl std::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemKind::Proposal => f.write_str("proposal"),
            ItemKind::Transaction => f.write_str("transaction"),
        }
    }
}

/// Why an outbound transfer/invoke did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallFailure {
    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance {
        available: crate::types::Amount,
        required: crate::types::Amount,
    },

    #[error("recipient rejected call: {0}")]
    Rejected(String),
}

/// Top-level error enum. Every variant is a rejection of the attempted
/// operation; none of them leave partial state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum VaultError {
    #[error("caller {0} is not an owner")]
    Unauthorized(Identity),

    #[error("{kind} {index} does not exist")]
    NotFound { kind: ItemKind, index: u64 },

    #[error("{kind} {index} already executed")]
    AlreadyExecuted { kind: ItemKind, index: u64 },

    #[error("{kind} {index} already confirmed by {owner}")]
    AlreadyConfirmed {
        kind: ItemKind,
        index: u64,
        owner: Identity,
    },

    #[error("{kind} {index} not confirmed by {owner}")]
    NotConfirmed {
        kind: ItemKind,
        index: u64,
        owner: Identity,
    },

    #[error("proposal {index} expired at {expires_at}")]
    Expired { index: u64, expires_at: Timestamp },

    #[error("{kind} {index} has {confirmations} confirmations, quorum is {quorum}")]
    QuorumNotMet {
        kind: ItemKind,
        index: u64,
        confirmations: usize,
        quorum: usize,
    },

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("External call failed: {0}")]
    ExternalCall(#[from] CallFailure),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type VaultResult<T> = Result<T, VaultError>;
