//! Governance core, transaction ledger, vault aggregate, report generator,
//! and event sinks.

pub mod actor;
pub mod governance;
pub mod ledger;
pub mod reporter;
pub mod sink;
pub mod vault;

pub use actor::VaultHandle;
pub use governance::{Governance, GovernanceView};
pub use ledger::Ledger;
pub use vault::Vault;
