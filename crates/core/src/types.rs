//! Domain types for the multisig vault.

use crate::error::{VaultError, VaultResult};
use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashSet;

/// Participant handle. `Address::ZERO` is the invalid sentinel.
pub type Identity = Address;

/// Value moved by a transaction.
pub type Amount = U256;

/// Opaque call data forwarded to the recipient.
pub type Payload = Bytes;

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

// ---------------------------------------------------------------------------
// Owner set
// ---------------------------------------------------------------------------

/// Ordered owners plus a membership index.
///
/// Removal is swap-with-last, so positions are not stable: an index captured
/// before any removal must be re-checked against [`OwnerSet::get`] before it
/// is trusted.
///
/// `SmallVec<[Identity; 8]>` keeps typical vaults off the heap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerSet {
    ordered: SmallVec<[Identity; 8]>,
    members: HashSet<Identity>,
}

impl OwnerSet {
    /// Builds a set from an initial owner list. Rejects an empty list, the
    /// zero address, and duplicates.
    pub fn from_owners<I>(owners: I) -> VaultResult<Self>
    where
        I: IntoIterator<Item = Identity>,
    {
        let mut set = Self {
            ordered: SmallVec::new(),
            members: HashSet::new(),
        };
        for owner in owners {
            set.insert(owner)?;
        }
        if set.is_empty() {
            return Err(VaultError::InvalidConfig("owner list is empty".into()));
        }
        Ok(set)
    }

    /// Appends a new owner.
    pub fn insert(&mut self, owner: Identity) -> VaultResult<()> {
        if owner == Address::ZERO {
            return Err(VaultError::InvariantViolation(
                "owner must not be the zero address".into(),
            ));
        }
        if !self.members.insert(owner) {
            return Err(VaultError::InvariantViolation(format!(
                "{owner} is already an owner"
            )));
        }
        self.ordered.push(owner);
        Ok(())
    }

    /// Removes the owner at `index` by swapping the last owner into its slot.
    /// The last remaining owner can never be removed.
    pub fn swap_remove(&mut self, index: usize) -> VaultResult<Identity> {
        if index >= self.ordered.len() {
            return Err(VaultError::InvariantViolation(format!(
                "owner index {index} out of range ({} owners)",
                self.ordered.len()
            )));
        }
        if self.ordered.len() == 1 {
            return Err(VaultError::InvariantViolation(
                "cannot remove the last owner".into(),
            ));
        }
        let removed = self.ordered.swap_remove(index);
        self.members.remove(&removed);
        Ok(removed)
    }

    #[inline]
    pub fn contains(&self, identity: &Identity) -> bool {
        self.members.contains(identity)
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Identity> {
        self.ordered.get(index)
    }

    pub fn position(&self, identity: &Identity) -> Option<usize> {
        self.ordered.iter().position(|o| o == identity)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn as_slice(&self) -> &[Identity] {
        &self.ordered
    }

    /// True when the ordered view and membership index agree and hold no
    /// duplicates.
    pub fn is_consistent(&self) -> bool {
        let distinct: HashSet<&Identity> = self.ordered.iter().collect();
        distinct.len() == self.ordered.len()
            && self.members.len() == self.ordered.len()
            && self.ordered.iter().all(|o| self.members.contains(o))
    }
}

// ---------------------------------------------------------------------------
// Confirmations
// ---------------------------------------------------------------------------

/// `(item index, owner)` pairs that are currently confirmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Confirmations {
    confirmed: HashSet<(u64, Identity)>,
}

impl Confirmations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the pair was already confirmed.
    pub fn confirm(&mut self, index: u64, owner: Identity) -> bool {
        self.confirmed.insert((index, owner))
    }

    /// Returns `false` if the pair was not confirmed.
    pub fn revoke(&mut self, index: u64, owner: Identity) -> bool {
        self.confirmed.remove(&(index, owner))
    }

    #[inline]
    pub fn is_confirmed(&self, index: u64, owner: &Identity) -> bool {
        self.confirmed.contains(&(index, *owner))
    }

    /// Number of confirmed entries for `index`. Linear; used for audits.
    pub fn count_for(&self, index: u64) -> usize {
        self.confirmed.iter().filter(|(i, _)| *i == index).count()
    }
}

// ---------------------------------------------------------------------------
// Proposals
// ---------------------------------------------------------------------------

/// Governance change requested by a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposalKind {
    AddOwner { owner: Identity },
    /// `index` is the owner's position at submission time.
    RemoveOwner { owner: Identity, index: usize },
    SetQuorum { quorum: usize },
}

impl std::fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProposalKind::AddOwner { owner } => write!(f, "add owner {owner}"),
            ProposalKind::RemoveOwner { owner, index } => {
                write!(f, "remove owner {owner} @{index}")
            }
            ProposalKind::SetQuorum { quorum } => write!(f, "set quorum {quorum}"),
        }
    }
}

/// A pending or executed governance change. Proposals are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub kind: ProposalKind,
    pub submitter: Identity,
    pub expires_at: Timestamp,
    pub executed: bool,
    pub confirmations: usize,
}

impl Proposal {
    /// Expiry is derived, never stored: the proposal is dead once `now`
    /// reaches `expires_at`.
    #[inline]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Outbound value/data transfer awaiting quorum. Transactions do not expire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub recipient: Identity,
    pub amount: Amount,
    /// `Bytes` (ref-counted) so handing the payload to the transport is cheap.
    pub payload: Payload,
    pub executed: bool,
    pub confirmations: usize,
}
