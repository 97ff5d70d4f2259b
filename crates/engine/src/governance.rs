//! Governance core: owner set, quorum, and the proposal lifecycle.
//!
//! Proposal states:
//!   `Pending --confirm/revoke--> Pending`
//!   `Pending --execute--> Executed` (terminal)
//!   `Pending --now >= expires_at--> Expired` (derived on read, never stored)
//!
//! Every kind-specific precondition is checked at submission and again at
//! execution against the owner set as it is *then*, since other proposals
//! may have reshaped it in between.

use multisig_core::{
    Confirmations, Identity, ItemKind, OwnerSet, Proposal, ProposalKind, Timestamp, VaultError,
    VaultEvent, VaultResult,
};

/// Read-only access to "who is an owner" and "how many confirmations are
/// required". The transaction ledger sees governance only through this.
pub trait GovernanceView {
    fn owners(&self) -> &[Identity];
    fn is_owner(&self, identity: &Identity) -> bool;
    fn quorum(&self) -> usize;

    fn ensure_owner(&self, caller: &Identity) -> VaultResult<()> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(VaultError::Unauthorized(*caller))
        }
    }
}

#[derive(Debug, Clone)]
pub struct Governance {
    owners: OwnerSet,
    quorum: usize,
    expiry_window: u64,
    proposals: Vec<Proposal>,
    confirmations: Confirmations,
}

impl GovernanceView for Governance {
    fn owners(&self) -> &[Identity] {
        self.owners.as_slice()
    }

    fn is_owner(&self, identity: &Identity) -> bool {
        self.owners.contains(identity)
    }

    fn quorum(&self) -> usize {
        self.quorum
    }
}

impl Governance {
    /// `owners` must already be validated; `quorum` must satisfy
    /// `1 <= quorum <= owners.len()`.
    pub fn new(owners: OwnerSet, quorum: usize, expiry_window: u64) -> VaultResult<Self> {
        if quorum == 0 || quorum > owners.len() {
            return Err(VaultError::InvalidConfig(format!(
                "quorum {quorum} outside 1..={}",
                owners.len()
            )));
        }
        Ok(Self {
            owners,
            quorum,
            expiry_window,
            proposals: Vec::new(),
            confirmations: Confirmations::new(),
        })
    }

    pub fn owner_set(&self) -> &OwnerSet {
        &self.owners
    }

    pub fn proposal_count(&self) -> u64 {
        self.proposals.len() as u64
    }

    pub fn proposal(&self, index: u64) -> Option<&Proposal> {
        self.proposals.get(usize::try_from(index).ok()?)
    }

    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    pub fn is_confirmed(&self, index: u64, owner: &Identity) -> bool {
        self.confirmations.is_confirmed(index, owner)
    }

    /// Every proposal's counter matches its confirmation entries.
    pub fn confirmations_consistent(&self) -> bool {
        self.proposals
            .iter()
            .enumerate()
            .all(|(i, p)| p.confirmations == self.confirmations.count_for(i as u64))
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    pub fn submit(
        &mut self,
        caller: Identity,
        kind: ProposalKind,
        now: Timestamp,
        events: &mut Vec<VaultEvent>,
    ) -> VaultResult<u64> {
        self.ensure_owner(&caller)?;
        self.validate_submission(&kind)?;

        let index = self.proposals.len() as u64;
        let expires_at = now.saturating_add(self.expiry_window);
        tracing::info!(index, %caller, %kind, expires_at, "proposal submitted");

        self.proposals.push(Proposal {
            kind,
            submitter: caller,
            expires_at,
            executed: false,
            confirmations: 0,
        });
        events.push(VaultEvent::ProposalSubmitted {
            owner: caller,
            index,
        });
        Ok(index)
    }

    pub fn confirm(
        &mut self,
        caller: Identity,
        index: u64,
        now: Timestamp,
        events: &mut Vec<VaultEvent>,
    ) -> VaultResult<()> {
        self.ensure_owner(&caller)?;
        self.pending(index, now)?;
        if !self.confirmations.confirm(index, caller) {
            return Err(VaultError::AlreadyConfirmed {
                kind: ItemKind::Proposal,
                index,
                owner: caller,
            });
        }
        let proposal = self.pending_mut(index, now)?;
        proposal.confirmations += 1;
        tracing::info!(index, %caller, confirmations = proposal.confirmations, "proposal confirmed");

        events.push(VaultEvent::ProposalConfirmed {
            owner: caller,
            index,
        });
        Ok(())
    }

    pub fn revoke(
        &mut self,
        caller: Identity,
        index: u64,
        now: Timestamp,
        events: &mut Vec<VaultEvent>,
    ) -> VaultResult<()> {
        self.ensure_owner(&caller)?;
        self.pending(index, now)?;
        if !self.confirmations.revoke(index, caller) {
            return Err(VaultError::NotConfirmed {
                kind: ItemKind::Proposal,
                index,
                owner: caller,
            });
        }
        let proposal = self.pending_mut(index, now)?;
        proposal.confirmations -= 1;
        tracing::info!(index, %caller, confirmations = proposal.confirmations, "proposal revoked");

        events.push(VaultEvent::ProposalRevoked {
            owner: caller,
            index,
        });
        Ok(())
    }

    /// Applies the proposal's effect, then marks it executed.
    pub fn execute(
        &mut self,
        caller: Identity,
        index: u64,
        now: Timestamp,
        events: &mut Vec<VaultEvent>,
    ) -> VaultResult<()> {
        self.ensure_owner(&caller)?;
        let proposal = self.pending(index, now)?;
        if proposal.confirmations < self.quorum {
            return Err(VaultError::QuorumNotMet {
                kind: ItemKind::Proposal,
                index,
                confirmations: proposal.confirmations,
                quorum: self.quorum,
            });
        }

        let kind = proposal.kind.clone();
        self.apply(&kind)?;
        self.pending_mut(index, now)?.executed = true;

        tracing::info!(
            index,
            %caller,
            %kind,
            owners = self.owners.len(),
            quorum = self.quorum,
            "proposal executed"
        );
        events.push(VaultEvent::ProposalExecuted {
            owner: caller,
            index,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Checks
    // -----------------------------------------------------------------------

    /// Exists, not executed, not expired. Executed wins over expired so a
    /// second execution always reports `AlreadyExecuted`.
    fn pending(&self, index: u64, now: Timestamp) -> VaultResult<&Proposal> {
        let proposal = self.proposal(index).ok_or(VaultError::NotFound {
            kind: ItemKind::Proposal,
            index,
        })?;
        if proposal.executed {
            return Err(VaultError::AlreadyExecuted {
                kind: ItemKind::Proposal,
                index,
            });
        }
        if proposal.is_expired(now) {
            return Err(VaultError::Expired {
                index,
                expires_at: proposal.expires_at,
            });
        }
        Ok(proposal)
    }

    fn pending_mut(&mut self, index: u64, now: Timestamp) -> VaultResult<&mut Proposal> {
        self.pending(index, now)?;
        self.proposals
            .get_mut(index as usize)
            .ok_or(VaultError::NotFound {
                kind: ItemKind::Proposal,
                index,
            })
    }

    fn validate_submission(&self, kind: &ProposalKind) -> VaultResult<()> {
        match *kind {
            ProposalKind::AddOwner { owner } => self.check_add(owner),
            ProposalKind::RemoveOwner { owner, index } => self.check_remove(owner, index),
            ProposalKind::SetQuorum { quorum } => {
                if quorum == self.quorum {
                    return Err(VaultError::InvariantViolation(format!(
                        "quorum is already {quorum}"
                    )));
                }
                self.check_quorum(quorum)
            }
        }
    }

    fn check_add(&self, owner: Identity) -> VaultResult<()> {
        if owner.is_zero() {
            return Err(VaultError::InvariantViolation(
                "new owner must not be the zero address".into(),
            ));
        }
        if self.owners.contains(&owner) {
            return Err(VaultError::InvariantViolation(format!(
                "{owner} is already an owner"
            )));
        }
        Ok(())
    }

    fn check_remove(&self, owner: Identity, index: usize) -> VaultResult<()> {
        if !self.owners.contains(&owner) {
            return Err(VaultError::InvariantViolation(format!(
                "{owner} is not an owner"
            )));
        }
        if self.owners.get(index) != Some(&owner) {
            return Err(VaultError::InvariantViolation(format!(
                "owner index {index} no longer refers to {owner}"
            )));
        }
        if self.owners.len() - 1 < self.quorum {
            return Err(VaultError::InvariantViolation(format!(
                "removing {owner} leaves {} owners, below quorum {}",
                self.owners.len() - 1,
                self.quorum
            )));
        }
        Ok(())
    }

    fn check_quorum(&self, quorum: usize) -> VaultResult<()> {
        if quorum == 0 || quorum > self.owners.len() {
            return Err(VaultError::InvariantViolation(format!(
                "quorum {quorum} outside 1..={}",
                self.owners.len()
            )));
        }
        Ok(())
    }

    /// Re-validates against current state, then mutates.
    fn apply(&mut self, kind: &ProposalKind) -> VaultResult<()> {
        match *kind {
            ProposalKind::AddOwner { owner } => {
                self.check_add(owner)?;
                self.owners.insert(owner)
            }
            ProposalKind::RemoveOwner { owner, index } => {
                self.check_remove(owner, index)?;
                self.owners.swap_remove(index).map(|_| ())
            }
            ProposalKind::SetQuorum { quorum } => {
                self.check_quorum(quorum)?;
                self.quorum = quorum;
                Ok(())
            }
        }
    }
}
