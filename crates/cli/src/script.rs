//! Scripted sessions: a JSON list of steps replayed against a vault.
//!
//! ```json
//! {
//!   "start": 1700000000,
//!   "steps": [
//!     { "op": "deposit", "sender": "0x...", "amount": "0xde0b6b3a7640000" },
//!     { "op": "submit_transaction", "caller": "0x...", "recipient": "0x...", "amount": "0x1" },
//!     { "op": "confirm_transaction", "caller": "0x...", "index": 0 },
//!     { "op": "advance", "secs": 3600 }
//!   ]
//! }
//! ```

use multisig_core::{Amount, Identity, Payload, ProposalKind, Timestamp, VaultError, VaultResult};
use multisig_engine::{Vault, VaultHandle};
use multisig_host::{ManualClock, Transport};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Script {
    /// Clock start; defaults to wall-clock time.
    #[serde(default)]
    pub start: Option<Timestamp>,
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_path(path: impl AsRef<Path>) -> VaultResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            VaultError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| VaultError::InvalidConfig(format!("malformed script: {e}")))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Advance {
        secs: u64,
    },
    Deposit {
        sender: Identity,
        amount: Amount,
    },
    SubmitProposal {
        caller: Identity,
        proposal: ProposalKind,
    },
    ConfirmProposal {
        caller: Identity,
        index: u64,
    },
    RevokeProposal {
        caller: Identity,
        index: u64,
    },
    ExecuteProposal {
        caller: Identity,
        index: u64,
    },
    SubmitTransaction {
        caller: Identity,
        recipient: Identity,
        amount: Amount,
        #[serde(default)]
        payload: Payload,
    },
    ConfirmTransaction {
        caller: Identity,
        index: u64,
    },
    RevokeConfirmation {
        caller: Identity,
        index: u64,
    },
    ExecuteTransaction {
        caller: Identity,
        index: u64,
    },
}

impl Step {
    /// Applies the step and returns a one-line outcome.
    pub async fn run<T>(
        self,
        handle: &VaultHandle<ManualClock, T>,
        clock: &ManualClock,
    ) -> VaultResult<String>
    where
        T: Transport<Vault<ManualClock>> + Send + 'static,
    {
        match self {
            Step::Advance { secs } => {
                let now = clock.advance(secs);
                Ok(format!("clock -> {now}"))
            }
            Step::Deposit { sender, amount } => {
                let balance = handle.deposit(sender, amount).await?;
                Ok(format!("deposit {amount} from {sender}, balance {balance}"))
            }
            Step::SubmitProposal { caller, proposal } => {
                let label = proposal.to_string();
                let index = handle.submit_proposal(caller, proposal).await?;
                Ok(format!("proposal #{index} submitted: {label}"))
            }
            Step::ConfirmProposal { caller, index } => {
                handle.confirm_proposal(caller, index).await?;
                Ok(format!("proposal #{index} confirmed by {caller}"))
            }
            Step::RevokeProposal { caller, index } => {
                handle.revoke_proposal(caller, index).await?;
                Ok(format!("proposal #{index} revoked by {caller}"))
            }
            Step::ExecuteProposal { caller, index } => {
                handle.execute_proposal(caller, index).await?;
                Ok(format!("proposal #{index} executed by {caller}"))
            }
            Step::SubmitTransaction {
                caller,
                recipient,
                amount,
                payload,
            } => {
                let index = handle
                    .submit_transaction(caller, recipient, amount, payload)
                    .await?;
                Ok(format!("transaction #{index} submitted: {amount} -> {recipient}"))
            }
            Step::ConfirmTransaction { caller, index } => {
                handle.confirm_transaction(caller, index).await?;
                Ok(format!("transaction #{index} confirmed by {caller}"))
            }
            Step::RevokeConfirmation { caller, index } => {
                handle.revoke_confirmation(caller, index).await?;
                Ok(format!("transaction #{index} revoked by {caller}"))
            }
            Step::ExecuteTransaction { caller, index } => {
                handle.execute_transaction(caller, index).await?;
                Ok(format!("transaction #{index} executed by {caller}"))
            }
        }
    }
}
