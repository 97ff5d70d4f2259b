//! Domain models, events, configuration, and error definitions.
//!
//! Foundation crate -- no async or I/O dependencies beyond reading a config file.

pub mod config;
pub mod error;
pub mod event;
pub mod types;

pub use config::{VaultConfig, DEFAULT_EXPIRY_WINDOW};
pub use error::{CallFailure, ItemKind, VaultError, VaultResult};
pub use event::VaultEvent;
pub use types::{
    Amount, Confirmations, Identity, OwnerSet, Payload, Proposal, ProposalKind, Timestamp,
    Transaction,
};
