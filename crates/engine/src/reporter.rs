//! Vault status report.
//!
//! Takes a [`Vault`] and produces a human-readable summary with owner
//! labels, pending and executed items, and confirmation progress.

use crate::vault::Vault;
use multisig_core::{Amount, Identity, Timestamp};
use multisig_host::Clock;
use serde::Serialize;

/// Snapshot of a vault, ready to render or serialize.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub now: Timestamp,
    pub owners: Vec<OwnerLine>,
    pub quorum: usize,
    pub balance: Amount,
    pub proposals: Vec<ItemLine>,
    pub transactions: Vec<ItemLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerLine {
    pub address: Identity,
    pub label: String,
}

/// One proposal or transaction.
#[derive(Debug, Clone, Serialize)]
pub struct ItemLine {
    pub index: u64,
    pub summary: String,
    pub confirmations: usize,
    pub status: ItemStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    Pending,
    Ready,
    Expired,
    Executed,
}

impl ItemStatus {
    fn label(self) -> &'static str {
        match self {
            ItemStatus::Pending => "PENDING",
            ItemStatus::Ready => "READY",
            ItemStatus::Expired => "EXPIRED",
            ItemStatus::Executed => "EXECUTED",
        }
    }
}

impl Report {
    pub fn build<C: Clock>(vault: &Vault<C>) -> Self {
        let now = vault.now();
        let quorum = vault.quorum();
        let config = vault.config();

        let status = |executed: bool, expired: bool, confirmations: usize| {
            if executed {
                ItemStatus::Executed
            } else if expired {
                ItemStatus::Expired
            } else if confirmations >= quorum {
                ItemStatus::Ready
            } else {
                ItemStatus::Pending
            }
        };

        let owners = vault
            .owners()
            .iter()
            .map(|o| OwnerLine {
                address: *o,
                label: config.label(o),
            })
            .collect();

        let proposals = vault
            .governance()
            .proposals()
            .iter()
            .enumerate()
            .map(|(i, p)| ItemLine {
                index: i as u64,
                summary: format!("{} (by {})", p.kind, config.label(&p.submitter)),
                confirmations: p.confirmations,
                status: status(p.executed, p.is_expired(now), p.confirmations),
            })
            .collect();

        let transactions = vault
            .ledger()
            .transactions()
            .iter()
            .enumerate()
            .map(|(i, tx)| {
                // First four bytes are the call selector when present.
                let selector = if tx.payload.is_empty() {
                    "transfer".to_string()
                } else {
                    format!("0x{}", hex::encode(&tx.payload[..tx.payload.len().min(4)]))
                };
                ItemLine {
                    index: i as u64,
                    summary: format!(
                        "{} -> {} [{}]",
                        tx.amount,
                        config.label(&tx.recipient),
                        selector
                    ),
                    confirmations: tx.confirmations,
                    status: status(tx.executed, false, tx.confirmations),
                }
            })
            .collect();

        Report {
            now,
            owners,
            quorum,
            balance: vault.balance(),
            proposals,
            transactions,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.proposals
            .iter()
            .chain(&self.transactions)
            .filter(|l| matches!(l.status, ItemStatus::Pending | ItemStatus::Ready))
            .count()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push('\n');
        out.push_str("╔══════════════════════════════════════════════════════════════╗\n");
        out.push_str("║                    MULTISIG VAULT REPORT                     ║\n");
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        out.push_str(&format!("║  Time:               {:>39} ║\n", self.now));
        out.push_str(&format!("║  Owners:             {:>39} ║\n", self.owners.len()));
        out.push_str(&format!("║  Quorum:             {:>39} ║\n", self.quorum));
        out.push_str(&format!("║  Balance:            {:>39} ║\n", self.balance));
        out.push_str(&format!("║  Proposals:          {:>39} ║\n", self.proposals.len()));
        out.push_str(&format!("║  Transactions:       {:>39} ║\n", self.transactions.len()));
        out.push_str(&format!("║  Open items:         {:>39} ║\n", self.pending_count()));
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        out.push_str("║  OWNERS                                                      ║\n");
        for (i, o) in self.owners.iter().enumerate() {
            out.push_str(&format!("║  {}. {} ({})\n", i, o.label, o.address));
        }

        if !self.proposals.is_empty() {
            out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
            out.push_str("║  PROPOSALS                                                   ║\n");
            for p in &self.proposals {
                out.push_str(&format!(
                    "║  #{} [{}] {}/{}  {}\n",
                    p.index,
                    p.status.label(),
                    p.confirmations,
                    self.quorum,
                    p.summary
                ));
            }
        }

        if !self.transactions.is_empty() {
            out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
            out.push_str("║  TRANSACTIONS                                                ║\n");
            for tx in &self.transactions {
                out.push_str(&format!(
                    "║  #{} [{}] {}/{}  {}\n",
                    tx.index,
                    tx.status.label(),
                    tx.confirmations,
                    self.quorum,
                    tx.summary
                ));
            }
        }

        out.push_str("╚══════════════════════════════════════════════════════════════╝\n");
        out
    }
}
