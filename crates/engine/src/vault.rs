//! The vault: aggregate root over governance, ledger, and balance.
//!
//! Every mutating operation takes `&mut self` for its whole duration, which
//! serializes callers, and either fully commits or leaves no trace: state and
//! events are rolled back together when an operation is rejected.

use crate::governance::{Governance, GovernanceView};
use crate::ledger::Ledger;
use multisig_core::{
    Amount, CallFailure, Identity, Payload, Proposal, ProposalKind, Timestamp, Transaction,
    VaultConfig, VaultError, VaultEvent, VaultResult,
};
use multisig_host::{Clock, SystemClock, Transport};
use std::sync::Arc;

/// Governance and ledger sit behind `Arc` so a snapshot is two refcount
/// bumps. Writes go through `Arc::make_mut`, which copies a part only while
/// a snapshot still shares it.
#[derive(Debug, Clone)]
struct VaultState {
    governance: Arc<Governance>,
    ledger: Arc<Ledger>,
    balance: Amount,
}

pub struct Vault<C: Clock = SystemClock> {
    state: VaultState,
    events: Vec<VaultEvent>,
    clock: C,
    config: VaultConfig,
}

impl Vault<SystemClock> {
    pub fn with_system_clock(config: VaultConfig) -> VaultResult<Self> {
        Self::new(config, SystemClock)
    }
}

impl<C: Clock> Vault<C> {
    pub fn new(config: VaultConfig, clock: C) -> VaultResult<Self> {
        let owners = config.validate()?;
        let governance = Governance::new(owners, config.quorum, config.expiry_window_secs)?;

        tracing::info!(
            owners = governance.owners().len(),
            quorum = governance.quorum(),
            expiry_window_secs = config.expiry_window_secs,
            "vault initialized"
        );

        Ok(Self {
            state: VaultState {
                governance: Arc::new(governance),
                ledger: Arc::new(Ledger::new()),
                balance: config.initial_balance,
            },
            events: Vec::new(),
            clock,
            config,
        })
    }

    /// For operations that check every precondition before their first
    /// write: a rejection has touched nothing, so only events are dropped.
    fn checked<T>(&mut self, op: impl FnOnce(&mut Self) -> VaultResult<T>) -> VaultResult<T> {
        let mark = self.events.len();
        op(self).inspect_err(|e| {
            self.events.truncate(mark);
            tracing::debug!(error = %e, "operation rejected");
        })
    }

    /// All-or-nothing commit for operations that hand control to external
    /// code: on `Err` the whole state is restored from a snapshot and events
    /// emitted by `op` (including re-entrant ones) are discarded.
    fn atomically<T>(&mut self, op: impl FnOnce(&mut Self) -> VaultResult<T>) -> VaultResult<T> {
        let snapshot = self.state.clone();
        let mark = self.events.len();
        op(self).inspect_err(|e| {
            self.state = snapshot;
            self.events.truncate(mark);
            tracing::debug!(error = %e, "operation rejected, state rolled back");
        })
    }

    // -----------------------------------------------------------------------
    // Governance
    // -----------------------------------------------------------------------

    pub fn submit_proposal(&mut self, caller: Identity, kind: ProposalKind) -> VaultResult<u64> {
        let now = self.clock.now();
        self.checked(|v| Arc::make_mut(&mut v.state.governance).submit(caller, kind, now, &mut v.events))
    }

    pub fn confirm_proposal(&mut self, caller: Identity, index: u64) -> VaultResult<()> {
        let now = self.clock.now();
        self.checked(|v| Arc::make_mut(&mut v.state.governance).confirm(caller, index, now, &mut v.events))
    }

    pub fn revoke_proposal(&mut self, caller: Identity, index: u64) -> VaultResult<()> {
        let now = self.clock.now();
        self.checked(|v| Arc::make_mut(&mut v.state.governance).revoke(caller, index, now, &mut v.events))
    }

    pub fn execute_proposal(&mut self, caller: Identity, index: u64) -> VaultResult<()> {
        let now = self.clock.now();
        self.checked(|v| Arc::make_mut(&mut v.state.governance).execute(caller, index, now, &mut v.events))
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    pub fn submit_transaction(
        &mut self,
        caller: Identity,
        recipient: Identity,
        amount: Amount,
        payload: Payload,
    ) -> VaultResult<u64> {
        self.checked(|v| {
            let VaultState {
                governance, ledger, ..
            } = &mut v.state;
            Arc::make_mut(ledger).submit(&**governance, caller, recipient, amount, payload, &mut v.events)
        })
    }

    pub fn confirm_transaction(&mut self, caller: Identity, index: u64) -> VaultResult<()> {
        self.checked(|v| {
            let VaultState {
                governance, ledger, ..
            } = &mut v.state;
            Arc::make_mut(ledger).confirm(&**governance, caller, index, &mut v.events)
        })
    }

    pub fn revoke_confirmation(&mut self, caller: Identity, index: u64) -> VaultResult<()> {
        self.checked(|v| {
            let VaultState {
                governance, ledger, ..
            } = &mut v.state;
            Arc::make_mut(ledger).revoke(&**governance, caller, index, &mut v.events)
        })
    }

    /// Marks the transaction executed, debits the balance, then hands the
    /// call to `transport`. The transport gets `&mut self` and may re-enter;
    /// a re-entrant execute of the same index is rejected by the flag that
    /// is already set. Any failure rolls everything back and the
    /// transaction stays pending for a later retry.
    ///
    /// The flag is set before the snapshot is taken, so a call that does not
    /// re-enter copies neither governance nor the ledger.
    pub fn execute_transaction<T>(
        &mut self,
        caller: Identity,
        index: u64,
        transport: &mut T,
    ) -> VaultResult<()>
    where
        T: Transport<Self> + ?Sized,
    {
        let call = self.checked(|v| {
            let VaultState {
                governance, ledger, ..
            } = &mut v.state;
            Arc::make_mut(ledger).begin_execution(&**governance, caller, index)
        })?;

        let outcome = self.atomically(|v| {
            if v.state.balance < call.amount {
                return Err(CallFailure::InsufficientBalance {
                    available: v.state.balance,
                    required: call.amount,
                }
                .into());
            }
            v.state.balance -= call.amount;

            if let Err(failure) = transport.transfer_and_invoke(&call, v) {
                tracing::warn!(index, recipient = %call.recipient, %failure, "external call failed");
                return Err(VaultError::ExternalCall(failure));
            }

            tracing::info!(
                index,
                %caller,
                recipient = %call.recipient,
                amount = %call.amount,
                "transaction executed"
            );
            v.events.push(VaultEvent::TransactionExecuted {
                owner: caller,
                index,
            });
            Ok(())
        });

        if outcome.is_err() {
            Arc::make_mut(&mut self.state.ledger).abort_execution(index);
        }
        outcome
    }

    /// Passive receive: value arriving with no associated transaction.
    /// Anyone may deposit.
    pub fn deposit(&mut self, sender: Identity, amount: Amount) -> VaultResult<Amount> {
        self.checked(|v| {
            let balance = v.state.balance.checked_add(amount).ok_or_else(|| {
                VaultError::InvariantViolation("balance overflow".into())
            })?;
            v.state.balance = balance;
            tracing::info!(%sender, %amount, %balance, "funds received");
            v.events.push(VaultEvent::FundsReceived {
                sender,
                amount,
                balance,
            });
            Ok(balance)
        })
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn owners(&self) -> &[Identity] {
        self.state.governance.owners()
    }

    pub fn is_owner(&self, identity: &Identity) -> bool {
        self.state.governance.is_owner(identity)
    }

    pub fn quorum(&self) -> usize {
        self.state.governance.quorum()
    }

    pub fn balance(&self) -> Amount {
        self.state.balance
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn governance(&self) -> &Governance {
        &self.state.governance
    }

    pub fn ledger(&self) -> &Ledger {
        &self.state.ledger
    }

    pub fn proposal_count(&self) -> u64 {
        self.state.governance.proposal_count()
    }

    pub fn proposal(&self, index: u64) -> Option<&Proposal> {
        self.state.governance.proposal(index)
    }

    pub fn is_proposal_confirmed(&self, index: u64, owner: &Identity) -> bool {
        self.state.governance.is_confirmed(index, owner)
    }

    pub fn transaction_count(&self) -> u64 {
        self.state.ledger.transaction_count()
    }

    pub fn transaction(&self, index: u64) -> Option<&Transaction> {
        self.state.ledger.transaction(index)
    }

    pub fn is_transaction_confirmed(&self, index: u64, owner: &Identity) -> bool {
        self.state.ledger.is_confirmed(index, owner)
    }

    /// Events emitted so far and not yet drained.
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }

    /// `1 <= quorum <= owners`, owner set self-consistent, and every
    /// confirmation counter matches its entries.
    pub fn invariants_hold(&self) -> bool {
        let gov = &self.state.governance;
        let quorum = gov.quorum();
        quorum >= 1
            && quorum <= gov.owners().len()
            && gov.owner_set().is_consistent()
            && gov.confirmations_consistent()
            && self.state.ledger.confirmations_consistent()
    }
}

impl<C: Clock + std::fmt::Debug> std::fmt::Debug for Vault<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("owners", &self.owners())
            .field("quorum", &self.quorum())
            .field("balance", &self.state.balance)
            .field("proposals", &self.proposal_count())
            .field("transactions", &self.transaction_count())
            .field("clock", &self.clock)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, U256};
    use multisig_host::{ManualClock, NullTransport, RecordingTransport};

    fn addr(n: u8) -> Identity {
        Address::with_last_byte(n)
    }

    fn vault(owners: &[u8], quorum: usize, balance: u64) -> (Vault<ManualClock>, ManualClock) {
        let clock = ManualClock::new(1_000);
        let cfg = VaultConfig::new(owners.iter().map(|n| addr(*n)).collect(), quorum)
            .with_initial_balance(U256::from(balance));
        (Vault::new(cfg, clock.clone()).unwrap(), clock)
    }

    #[test]
    fn plain_execution_leaves_governance_unshared() {
        let (mut v, _) = vault(&[1, 2], 1, 10);
        v.submit_proposal(addr(1), ProposalKind::SetQuorum { quorum: 2 })
            .unwrap();
        let idx = v
            .submit_transaction(addr(1), addr(9), U256::from(3u64), Bytes::new())
            .unwrap();
        v.confirm_transaction(addr(2), idx).unwrap();

        let governance = Arc::clone(&v.state.governance);
        v.execute_transaction(addr(1), idx, &mut NullTransport).unwrap();

        assert!(Arc::ptr_eq(&governance, &v.state.governance));
        assert_eq!(Arc::strong_count(&v.state.ledger), 1);
        assert!(v.transaction(idx).unwrap().executed);
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = VaultConfig::new(vec![addr(1)], 2);
        assert!(Vault::new(cfg, ManualClock::new(0)).is_err());
    }

    #[test]
    fn failed_transfer_rolls_back_flag_balance_and_events() {
        let (mut v, _) = vault(&[1], 1, 10);
        let idx = v
            .submit_transaction(addr(1), addr(9), U256::from(4u64), Bytes::new())
            .unwrap();
        v.confirm_transaction(addr(1), idx).unwrap();
        let before = v.events().len();

        let mut transport =
            RecordingTransport::new().fail_with(CallFailure::Rejected("revert".into()));
        let err = v.execute_transaction(addr(1), idx, &mut transport).unwrap_err();
        assert!(matches!(err, VaultError::ExternalCall(CallFailure::Rejected(_))));
        assert!(!v.transaction(idx).unwrap().executed);
        assert_eq!(v.balance(), U256::from(10u64));
        assert_eq!(v.events().len(), before);

        // Retry succeeds once the recipient accepts.
        transport.succeed();
        v.execute_transaction(addr(1), idx, &mut transport).unwrap();
        assert!(v.transaction(idx).unwrap().executed);
        assert_eq!(v.balance(), U256::from(6u64));
        assert_eq!(transport.delivered().len(), 1);
    }

    #[test]
    fn insufficient_balance_is_external_failure() {
        let (mut v, _) = vault(&[1], 1, 1);
        let idx = v
            .submit_transaction(addr(1), addr(9), U256::from(2u64), Bytes::new())
            .unwrap();
        v.confirm_transaction(addr(1), idx).unwrap();
        assert!(matches!(
            v.execute_transaction(addr(1), idx, &mut NullTransport),
            Err(VaultError::ExternalCall(CallFailure::InsufficientBalance { .. }))
        ));
        assert!(!v.transaction(idx).unwrap().executed);
    }

    #[test]
    fn deposit_emits_funds_received() {
        let (mut v, _) = vault(&[1], 1, 0);
        let balance = v.deposit(addr(42), U256::from(3u64)).unwrap();
        assert_eq!(balance, U256::from(3u64));
        assert_eq!(
            v.drain_events(),
            vec![VaultEvent::FundsReceived {
                sender: addr(42),
                amount: U256::from(3u64),
                balance: U256::from(3u64),
            }]
        );
        assert!(v.events().is_empty());
    }

    #[test]
    fn deposit_overflow_rejected() {
        let (mut v, _) = vault(&[1], 1, 0);
        v.deposit(addr(2), U256::MAX).unwrap();
        assert!(v.deposit(addr(2), U256::from(1u64)).is_err());
        assert_eq!(v.balance(), U256::MAX);
    }

    #[test]
    fn proposal_expiry_uses_clock() {
        let (mut v, clock) = vault(&[1, 2], 1, 0);
        let idx = v
            .submit_proposal(addr(1), ProposalKind::AddOwner { owner: addr(3) })
            .unwrap();
        clock.advance(v.config().expiry_window_secs);
        assert!(matches!(
            v.confirm_proposal(addr(1), idx),
            Err(VaultError::Expired { .. })
        ));
        assert!(v.invariants_hold());
    }
}
