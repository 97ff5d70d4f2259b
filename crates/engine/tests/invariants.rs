//! Property tests: random interleavings of owner and non-owner operations
//! never break the owner/quorum or confirmation-count invariants, and a
//! rejected operation never leaves a trace.

use alloy_primitives::{Address, Bytes, U256};
use multisig_core::{CallFailure, Identity, ProposalKind, VaultConfig, VaultError};
use multisig_engine::Vault;
use multisig_host::{ManualClock, RecordingTransport};
use proptest::prelude::*;

const WINDOW: u64 = 1_000;

fn identity(n: u8) -> Identity {
    Address::with_last_byte(n + 1)
}

#[derive(Debug, Clone)]
enum Op {
    SubmitProposal(u8, ProposalKind),
    ConfirmProposal(u8, u64),
    RevokeProposal(u8, u64),
    ExecuteProposal(u8, u64),
    SubmitTransaction(u8, u64),
    ConfirmTransaction(u8, u64),
    RevokeConfirmation(u8, u64),
    ExecuteTransaction(u8, u64, bool),
    Deposit(u64),
    Advance(u64),
}

fn kind() -> impl Strategy<Value = ProposalKind> {
    prop_oneof![
        (0u8..6).prop_map(|n| ProposalKind::AddOwner { owner: identity(n) }),
        (0u8..6, 0usize..6).prop_map(|(n, index)| ProposalKind::RemoveOwner {
            owner: identity(n),
            index
        }),
        (0usize..7).prop_map(|quorum| ProposalKind::SetQuorum { quorum }),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    // Identities 0..6; the vault starts with owners 0..3, so 3..6 are
    // outsiders until an add-owner proposal goes through.
    let who = 0u8..6;
    let idx = 0u64..6;
    prop_oneof![
        (who.clone(), kind()).prop_map(|(w, k)| Op::SubmitProposal(w, k)),
        (who.clone(), idx.clone()).prop_map(|(w, i)| Op::ConfirmProposal(w, i)),
        (who.clone(), idx.clone()).prop_map(|(w, i)| Op::RevokeProposal(w, i)),
        (who.clone(), idx.clone()).prop_map(|(w, i)| Op::ExecuteProposal(w, i)),
        (who.clone(), 0u64..5).prop_map(|(w, a)| Op::SubmitTransaction(w, a)),
        (who.clone(), idx.clone()).prop_map(|(w, i)| Op::ConfirmTransaction(w, i)),
        (who.clone(), idx.clone()).prop_map(|(w, i)| Op::RevokeConfirmation(w, i)),
        (who, idx, any::<bool>()).prop_map(|(w, i, ok)| Op::ExecuteTransaction(w, i, ok)),
        (0u64..5).prop_map(Op::Deposit),
        (0u64..600).prop_map(Op::Advance),
    ]
}

fn apply(v: &mut Vault<ManualClock>, clock: &ManualClock, op: Op) -> Result<(), VaultError> {
    match op {
        Op::SubmitProposal(w, k) => v.submit_proposal(identity(w), k).map(|_| ()),
        Op::ConfirmProposal(w, i) => v.confirm_proposal(identity(w), i),
        Op::RevokeProposal(w, i) => v.revoke_proposal(identity(w), i),
        Op::ExecuteProposal(w, i) => v.execute_proposal(identity(w), i),
        Op::SubmitTransaction(w, a) => v
            .submit_transaction(identity(w), identity(9), U256::from(a), Bytes::new())
            .map(|_| ()),
        Op::ConfirmTransaction(w, i) => v.confirm_transaction(identity(w), i),
        Op::RevokeConfirmation(w, i) => v.revoke_confirmation(identity(w), i),
        Op::ExecuteTransaction(w, i, accept) => {
            let mut transport = if accept {
                RecordingTransport::new()
            } else {
                RecordingTransport::new().fail_with(CallFailure::Rejected("revert".into()))
            };
            v.execute_transaction(identity(w), i, &mut transport)
        }
        Op::Deposit(a) => v.deposit(identity(8), U256::from(a)).map(|_| ()),
        Op::Advance(secs) => {
            clock.advance(secs);
            Ok(())
        }
    }
}

proptest! {
    #[test]
    fn invariants_survive_random_operations(ops in prop::collection::vec(op(), 1..80)) {
        let clock = ManualClock::new(0);
        let cfg = VaultConfig::new((0..3).map(identity).collect(), 2)
            .with_expiry_window(WINDOW)
            .with_initial_balance(U256::from(10u64));
        let mut v = Vault::new(cfg, clock.clone()).unwrap();

        for op in ops {
            let events_before = v.events().len();
            let owners_before = v.owners().to_vec();
            let quorum_before = v.quorum();
            let balance_before = v.balance();

            let result = apply(&mut v, &clock, op);

            prop_assert!(v.invariants_hold());
            if let Err(err) = result {
                prop_assert_eq!(v.events().len(), events_before, "rejected op emitted: {}", err);
                prop_assert_eq!(v.owners(), owners_before.as_slice());
                prop_assert_eq!(v.quorum(), quorum_before);
                prop_assert_eq!(v.balance(), balance_before);
            }
        }
    }

    #[test]
    fn non_owner_is_always_unauthorized(index in 0u64..4, quorum in 1usize..3) {
        let clock = ManualClock::new(0);
        let cfg = VaultConfig::new(vec![identity(0), identity(1)], 1);
        let mut v = Vault::new(cfg, clock).unwrap();
        v.submit_proposal(identity(0), ProposalKind::SetQuorum { quorum: 2 }).unwrap();
        v.drain_events();

        let outsider = identity(5);
        prop_assert_eq!(
            v.submit_proposal(outsider, ProposalKind::SetQuorum { quorum }),
            Err(VaultError::Unauthorized(outsider))
        );
        prop_assert_eq!(
            v.confirm_proposal(outsider, index),
            Err(VaultError::Unauthorized(outsider))
        );
        prop_assert_eq!(
            v.execute_proposal(outsider, index),
            Err(VaultError::Unauthorized(outsider))
        );
        prop_assert!(v.events().is_empty());
    }
}
