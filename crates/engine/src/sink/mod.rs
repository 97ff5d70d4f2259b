//! Audit-trail sinks for vault events.
//!
//! Row schema: [`EventRow`], one per emitted [`VaultEvent`], numbered in
//! emission order and stamped with the vault clock at drain time.
//!
//! Backend:
//! - **NDJSON stream** — write newline-delimited JSON rows to any `Write` impl

pub mod json_stream;

use multisig_core::{Timestamp, VaultEvent};
use serde::Serialize;

/// One row per event. The event's own fields are flattened in, keyed by
/// its `event` tag.
#[derive(Debug, Clone, Serialize)]
pub struct EventRow {
    pub seq: u64,
    pub at: Timestamp,
    #[serde(flatten)]
    pub event: VaultEvent,
}

/// Numbers events as they are drained from a vault.
#[derive(Debug, Default)]
pub struct EventSequencer {
    next: u64,
}

impl EventSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&mut self, at: Timestamp, events: Vec<VaultEvent>) -> Vec<EventRow> {
        events
            .into_iter()
            .map(|event| {
                let seq = self.next;
                self.next += 1;
                EventRow { seq, at, event }
            })
            .collect()
    }

    /// Sequence number the next row will get.
    pub fn next_seq(&self) -> u64 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

    #[test]
    fn sequence_continues_across_batches() {
        let owner = Address::with_last_byte(1);
        let mut seq = EventSequencer::new();
        let first = seq.rows(
            5,
            vec![VaultEvent::ProposalSubmitted { owner, index: 0 }],
        );
        let second = seq.rows(
            9,
            vec![
                VaultEvent::ProposalConfirmed { owner, index: 0 },
                VaultEvent::ProposalExecuted { owner, index: 0 },
            ],
        );
        assert_eq!(first[0].seq, 0);
        assert_eq!(second[0].seq, 1);
        assert_eq!(second[1].seq, 2);
        assert_eq!(second[1].at, 9);
        assert_eq!(seq.next_seq(), 3);
    }

    #[test]
    fn row_flattens_event_tag() {
        let row = EventRow {
            seq: 0,
            at: 1,
            event: VaultEvent::TransactionExecuted {
                owner: Address::with_last_byte(1),
                index: 4,
            },
        };
        let v = serde_json::to_value(&row).unwrap();
        assert_eq!(v["event"], "TransactionExecuted");
        assert_eq!(v["index"], 4);
        assert_eq!(v["seq"], 0);
    }
}
