// Scenario ledger: deterministic simulator for contract-based test scenarios
//
// SPDX-License-Identifier: Apache-2.0

//! The step log: the ordered record of everything that has happened to a
//! ledger. Every [`crate::ledger::Ledger`] operation appends exactly one
//! entry.

use core::fmt;

use chrono::{DateTime, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ids::{EventId, Location, NodeId, Party};
use crate::tx::RichTransaction;

/// One entry in the step log.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LedgerStep {
    /// A transaction was committed; carries the rich transaction it produced,
    /// the root event ids it introduced in tree order, and the caller-supplied
    /// location of the commit itself (distinct from any `Node`'s own
    /// location).
    Commit { transaction: RichTransaction, roots: Vec<EventId>, location: Option<Location> },
    /// The ledger's current time was advanced.
    PassTime { previous: DateTime<Utc>, advanced_to: DateTime<Utc> },
    /// A caller recorded that committing a transaction as a given party is
    /// known to fail; the attempted transaction itself is never handed to
    /// the ledger — interpreting whether it would fail is the caller's job
    /// (this is a pure append, not a replay).
    AssertMustFail { actor: Party, time: DateTime<Utc>, location: Option<Location> },
}

impl LedgerStep {
    pub fn step_kind(&self) -> &'static str {
        match self {
            LedgerStep::Commit { .. } => "commit",
            LedgerStep::PassTime { .. } => "pass-time",
            LedgerStep::AssertMustFail { .. } => "assert-must-fail",
        }
    }
}

/// A one-line rendering for test-failure diagnostics; no behavior in the
/// ledger depends on this, only error messages and debug output.
impl fmt::Display for LedgerStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerStep::Commit { transaction, roots, .. } => {
                write!(f, "commit by {} with {} root node(s)", transaction.committer, roots.len())
            }
            LedgerStep::PassTime { previous, advanced_to } => {
                write!(f, "pass time from {previous} to {advanced_to}")
            }
            LedgerStep::AssertMustFail { actor, .. } => write!(f, "assert must fail as {actor}"),
        }
    }
}

/// Forms the event id `local_node_id` will be rewritten to *if* the
/// transaction currently being built against `ledger` commits next: the pair
/// of `ledger`'s next step id and the node's local id. Used for diagnostics
/// about a partial, not-yet-committed transaction — e.g. an error message
/// that needs to name a node before its commit has actually happened.
pub fn ptx_event_id(ledger: &crate::ledger::Ledger, local_node_id: NodeId) -> EventId {
    EventId::new(ledger.next_step_id(), local_node_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::StepId;

    #[test]
    fn pass_time_renders_a_one_line_summary() {
        let step = LedgerStep::PassTime {
            previous: DateTime::<Utc>::UNIX_EPOCH,
            advanced_to: DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(60),
        };
        assert!(step.to_string().starts_with("pass time from"));
        assert_eq!(step.step_kind(), "pass-time");
    }

    #[test]
    fn ptx_event_id_uses_the_next_step_id_not_the_current_one() {
        let ledger = crate::ledger::Ledger::new(DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(ptx_event_id(&ledger, NodeId::new(0)), EventId::new(StepId::FIRST, NodeId::new(0)));
    }
}
