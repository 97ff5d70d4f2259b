//! Transaction ledger: pending value/data transfers and their confirmations.
//!
//! Transactions never expire. The ledger reads owners and quorum through
//! [`GovernanceView`] and never mutates governance state.

use crate::governance::GovernanceView;
use multisig_core::{
    Amount, Confirmations, Identity, ItemKind, Payload, Transaction, VaultError, VaultEvent,
    VaultResult,
};
use multisig_host::OutboundCall;

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    transactions: Vec<Transaction>,
    confirmations: Confirmations,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction_count(&self) -> u64 {
        self.transactions.len() as u64
    }

    pub fn transaction(&self, index: u64) -> Option<&Transaction> {
        self.transactions.get(usize::try_from(index).ok()?)
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn is_confirmed(&self, index: u64, owner: &Identity) -> bool {
        self.confirmations.is_confirmed(index, owner)
    }

    pub fn confirmations_consistent(&self) -> bool {
        self.transactions
            .iter()
            .enumerate()
            .all(|(i, tx)| tx.confirmations == self.confirmations.count_for(i as u64))
    }

    pub fn submit<G: GovernanceView + ?Sized>(
        &mut self,
        gov: &G,
        caller: Identity,
        recipient: Identity,
        amount: Amount,
        payload: Payload,
        events: &mut Vec<VaultEvent>,
    ) -> VaultResult<u64> {
        gov.ensure_owner(&caller)?;

        let index = self.transactions.len() as u64;
        tracing::info!(index, %caller, %recipient, %amount, payload_len = payload.len(), "transaction submitted");

        self.transactions.push(Transaction {
            recipient,
            amount,
            payload: payload.clone(),
            executed: false,
            confirmations: 0,
        });
        events.push(VaultEvent::TransactionSubmitted {
            owner: caller,
            index,
            recipient,
            amount,
            payload,
        });
        Ok(index)
    }

    pub fn confirm<G: GovernanceView + ?Sized>(
        &mut self,
        gov: &G,
        caller: Identity,
        index: u64,
        events: &mut Vec<VaultEvent>,
    ) -> VaultResult<()> {
        gov.ensure_owner(&caller)?;
        self.pending_mut(index)?;
        if !self.confirmations.confirm(index, caller) {
            return Err(VaultError::AlreadyConfirmed {
                kind: ItemKind::Transaction,
                index,
                owner: caller,
            });
        }
        let tx = self.pending_mut(index)?;
        tx.confirmations += 1;
        tracing::info!(index, %caller, confirmations = tx.confirmations, "transaction confirmed");

        events.push(VaultEvent::TransactionConfirmed {
            owner: caller,
            index,
        });
        Ok(())
    }

    pub fn revoke<G: GovernanceView + ?Sized>(
        &mut self,
        gov: &G,
        caller: Identity,
        index: u64,
        events: &mut Vec<VaultEvent>,
    ) -> VaultResult<()> {
        gov.ensure_owner(&caller)?;
        self.pending_mut(index)?;
        if !self.confirmations.revoke(index, caller) {
            return Err(VaultError::NotConfirmed {
                kind: ItemKind::Transaction,
                index,
                owner: caller,
            });
        }
        let tx = self.pending_mut(index)?;
        tx.confirmations -= 1;
        tracing::info!(index, %caller, confirmations = tx.confirmations, "transaction revoked");

        events.push(VaultEvent::TransactionRevoked {
            owner: caller,
            index,
        });
        Ok(())
    }

    /// Checks quorum against the current governance state and marks the
    /// transaction executed. The returned call must only be dispatched after
    /// this flag is set: a re-entrant execute for the same index then sees
    /// `AlreadyExecuted`.
    pub fn begin_execution<G: GovernanceView + ?Sized>(
        &mut self,
        gov: &G,
        caller: Identity,
        index: u64,
    ) -> VaultResult<OutboundCall> {
        gov.ensure_owner(&caller)?;
        let quorum = gov.quorum();
        let tx = self.pending_mut(index)?;
        if tx.confirmations < quorum {
            return Err(VaultError::QuorumNotMet {
                kind: ItemKind::Transaction,
                index,
                confirmations: tx.confirmations,
                quorum,
            });
        }

        tx.executed = true;
        Ok(OutboundCall {
            index,
            recipient: tx.recipient,
            amount: tx.amount,
            payload: tx.payload.clone(),
        })
    }

    /// Clears the flag set by [`Self::begin_execution`] after the outbound
    /// call was rolled back.
    pub(crate) fn abort_execution(&mut self, index: u64) {
        if let Some(tx) = usize::try_from(index)
            .ok()
            .and_then(|i| self.transactions.get_mut(i))
        {
            tx.executed = false;
        }
    }

    fn pending_mut(&mut self, index: u64) -> VaultResult<&mut Transaction> {
        let tx = usize::try_from(index)
            .ok()
            .and_then(|i| self.transactions.get_mut(i))
            .ok_or(VaultError::NotFound {
                kind: ItemKind::Transaction,
                index,
            })?;
        if tx.executed {
            return Err(VaultError::AlreadyExecuted {
                kind: ItemKind::Transaction,
                index,
            });
        }
        Ok(tx)
    }
}
