//! Single-writer actor for hosts that accept calls concurrently.
//!
//! One tokio task owns the [`Vault`] and its transport and applies jobs in
//! arrival order. Handles are cheap to clone; every call is a message over
//! `mpsc` with the reply on a `oneshot`.

use crate::vault::Vault;
use multisig_core::{
    Amount, Identity, Payload, Proposal, ProposalKind, Transaction, VaultError, VaultEvent,
    VaultResult,
};
use multisig_host::{Clock, Transport};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type Job<C, T> = Box<dyn FnOnce(&mut Vault<C>, &mut T) + Send>;

const MAILBOX: usize = 256;

pub struct VaultHandle<C: Clock, T> {
    tx: mpsc::Sender<Job<C, T>>,
}

impl<C: Clock, T> Clone for VaultHandle<C, T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

/// Spawns the actor. The join handle yields the vault back once every
/// handle has been dropped.
pub fn spawn<C, T>(vault: Vault<C>, transport: T) -> (VaultHandle<C, T>, JoinHandle<Vault<C>>)
where
    C: Clock + 'static,
    T: Transport<Vault<C>> + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Job<C, T>>(MAILBOX);
    let task = tokio::spawn(async move {
        let mut vault = vault;
        let mut transport = transport;
        let mut applied = 0u64;
        while let Some(job) = rx.recv().await {
            job(&mut vault, &mut transport);
            applied += 1;
        }
        tracing::debug!(applied, "vault actor stopped");
        vault
    });
    (VaultHandle { tx }, task)
}

impl<C, T> VaultHandle<C, T>
where
    C: Clock + 'static,
    T: Transport<Vault<C>> + Send + 'static,
{
    /// Runs `f` with exclusive access to the vault and transport.
    pub async fn call<R, F>(&self, f: F) -> VaultResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut Vault<C>, &mut T) -> R + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job<C, T> = Box::new(move |vault, transport| {
            // Receiver gone means the caller stopped waiting; nothing to do.
            let _ = reply_tx.send(f(vault, transport));
        });
        self.tx
            .send(job)
            .await
            .map_err(|_| VaultError::Internal("vault actor has shut down".into()))?;
        reply_rx
            .await
            .map_err(|_| VaultError::Internal("vault actor dropped the reply".into()))
    }

    pub async fn submit_proposal(&self, caller: Identity, kind: ProposalKind) -> VaultResult<u64> {
        self.call(move |v, _| v.submit_proposal(caller, kind)).await?
    }

    pub async fn confirm_proposal(&self, caller: Identity, index: u64) -> VaultResult<()> {
        self.call(move |v, _| v.confirm_proposal(caller, index)).await?
    }

    pub async fn revoke_proposal(&self, caller: Identity, index: u64) -> VaultResult<()> {
        self.call(move |v, _| v.revoke_proposal(caller, index)).await?
    }

    pub async fn execute_proposal(&self, caller: Identity, index: u64) -> VaultResult<()> {
        self.call(move |v, _| v.execute_proposal(caller, index)).await?
    }

    pub async fn submit_transaction(
        &self,
        caller: Identity,
        recipient: Identity,
        amount: Amount,
        payload: Payload,
    ) -> VaultResult<u64> {
        self.call(move |v, _| v.submit_transaction(caller, recipient, amount, payload))
            .await?
    }

    pub async fn confirm_transaction(&self, caller: Identity, index: u64) -> VaultResult<()> {
        self.call(move |v, _| v.confirm_transaction(caller, index)).await?
    }

    pub async fn revoke_confirmation(&self, caller: Identity, index: u64) -> VaultResult<()> {
        self.call(move |v, _| v.revoke_confirmation(caller, index)).await?
    }

    pub async fn execute_transaction(&self, caller: Identity, index: u64) -> VaultResult<()> {
        self.call(move |v, t| v.execute_transaction(caller, index, t))
            .await?
    }

    pub async fn deposit(&self, sender: Identity, amount: Amount) -> VaultResult<Amount> {
        self.call(move |v, _| v.deposit(sender, amount)).await?
    }

    pub async fn owners(&self) -> VaultResult<Vec<Identity>> {
        self.call(|v, _| v.owners().to_vec()).await
    }

    pub async fn quorum(&self) -> VaultResult<usize> {
        self.call(|v, _| v.quorum()).await
    }

    pub async fn proposal(&self, index: u64) -> VaultResult<Option<Proposal>> {
        self.call(move |v, _| v.proposal(index).cloned()).await
    }

    pub async fn transaction(&self, index: u64) -> VaultResult<Option<Transaction>> {
        self.call(move |v, _| v.transaction(index).cloned()).await
    }

    pub async fn drain_events(&self) -> VaultResult<Vec<VaultEvent>> {
        self.call(|v, _| v.drain_events()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, U256};
    use multisig_core::VaultConfig;
    use multisig_host::{ManualClock, RecordingTransport};

    fn addr(n: u8) -> Identity {
        Address::with_last_byte(n)
    }

    #[tokio::test]
    async fn concurrent_confirmations_are_serialized() {
        let owners: Vec<Identity> = (1..=8).map(addr).collect();
        let cfg = VaultConfig::new(owners.clone(), 8).with_initial_balance(U256::from(1u64));
        let vault = Vault::new(cfg, ManualClock::new(0)).unwrap();
        let (handle, task) = spawn(vault, RecordingTransport::new());

        let idx = handle
            .submit_transaction(addr(1), addr(99), U256::from(1u64), Bytes::new())
            .await
            .unwrap();

        let mut joins = Vec::new();
        for owner in owners {
            let h = handle.clone();
            joins.push(tokio::spawn(async move {
                h.confirm_transaction(owner, idx).await
            }));
        }
        for j in joins {
            j.await.unwrap().unwrap();
        }

        handle.execute_transaction(addr(3), idx).await.unwrap();
        let tx = handle.transaction(idx).await.unwrap().unwrap();
        assert!(tx.executed);
        assert_eq!(tx.confirmations, 8);

        drop(handle);
        let vault = task.await.unwrap();
        assert!(vault.invariants_hold());
        assert_eq!(vault.balance(), U256::ZERO);
    }

    #[tokio::test]
    async fn rejections_propagate_through_handle() {
        let cfg = VaultConfig::new(vec![addr(1)], 1);
        let vault = Vault::new(cfg, ManualClock::new(0)).unwrap();
        let (handle, _task) = spawn(vault, RecordingTransport::new());

        let err = handle
            .submit_proposal(addr(2), ProposalKind::SetQuorum { quorum: 1 })
            .await
            .unwrap_err();
        assert_eq!(err, VaultError::Unauthorized(addr(2)));
        assert!(handle.drain_events().await.unwrap().is_empty());
    }
}
