// Scenario ledger: deterministic simulator for contract-based test scenarios
//
// SPDX-License-Identifier: Apache-2.0

//! Component D: the ledger's persistent value representation. [`LedgerData`]
//! is the entire state of a ledger at a point in time; every committing
//! operation produces a new [`LedgerData`] rather than mutating one in
//! place, so a [`crate::ledger::Ledger`] can be cheaply snapshotted or handed
//! to a concurrent reader without locking.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ids::{ContractId, EventId, GlobalKey, Party, StepId, TemplateId};
use crate::tx::RichNode;

/// Everything the ledger remembers about one committed node, keyed by its
/// event id.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeInfo {
    /// The node itself, with its children (if any) already resolved to event
    /// ids.
    pub node: RichNode,
    /// The step at which this node was committed.
    pub origin: StepId,
    /// The effective-at timestamp of the transaction that committed this
    /// node, denormalized here so lookup does not need to chase the step
    /// log on its hot path.
    pub effective_at: chrono::DateTime<chrono::Utc>,
    /// The event id of the parent exercise this node was a child of, or
    /// `None` if it was a root of its transaction.
    pub parent: Option<EventId>,
    /// For each party who has ever been made a witness of this node (by
    /// explicit disclosure or divulgence, across any number of
    /// transactions), the step id at which that party *first* witnessed it.
    /// Never rewritten once a party appears here: observer onset is
    /// monotonic in step order.
    pub observing_since: BTreeMap<Party, StepId>,
    /// Event ids of every node that has referenced this one: a `Fetch` of
    /// its contract id, an `Exercise` targeting it, or a positive
    /// `LookupByKey` resolving to it.
    pub referenced_by: BTreeSet<EventId>,
    /// The event id of the consuming exercise that archived this node's
    /// contract, if any. Only ever set on a `Create` node's info. Once set
    /// it is never cleared or overwritten: a contract is archived exactly
    /// once.
    pub consumer: Option<EventId>,
}

impl NodeInfo {
    /// True once a later transaction has consumed the contract this node
    /// created. Always `false` for non-`Create` nodes.
    pub fn is_archived(&self) -> bool { self.consumer.is_some() }

    /// Parties currently entitled to see this node: everyone who has ever
    /// been recorded in [`NodeInfo::observing_since`].
    pub fn witnesses(&self) -> BTreeSet<Party> { self.observing_since.keys().cloned().collect() }
}

/// The full persistent state of a ledger: every committed node, the active
/// key registry, the step log, and the ledger's current time.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LedgerData {
    /// The ledger's current time; advanced only by `PassTime` steps.
    pub current_time: DateTime<Utc>,
    /// Every node ever committed, keyed by its global event id.
    pub nodes: BTreeMap<EventId, NodeInfo>,
    /// The step log, in commit order: `Commit`, `PassTime`, or
    /// `AssertMustFail` entries, keyed by the step id they occupy.
    pub steps: IndexMap<StepId, crate::steps::LedgerStep>,
    /// The contract-key registry: maps an active key to the contract id
    /// currently holding it. A key is removed when its holder is archived
    /// and re-added only by a later Create that reuses the same key.
    pub active_keys: BTreeMap<GlobalKey, ContractId>,
    /// Maps a contract id to the event id of the Create node that
    /// introduced it, so a later transaction's references (fetch, exercise
    /// target, key lookup result, or a value payload) can be resolved to a
    /// concrete node regardless of which step created it.
    pub contract_id_to_event_id: BTreeMap<ContractId, EventId>,
    /// The next step id to be allocated.
    pub next_step_id: StepId,
}

impl Default for LedgerData {
    fn default() -> Self {
        LedgerData {
            current_time: DateTime::<Utc>::UNIX_EPOCH,
            nodes: BTreeMap::new(),
            steps: IndexMap::new(),
            active_keys: BTreeMap::new(),
            contract_id_to_event_id: BTreeMap::new(),
            next_step_id: StepId::FIRST,
        }
    }
}

impl LedgerData {
    pub fn new(current_time: DateTime<Utc>) -> Self { LedgerData { current_time, ..Default::default() } }

    pub fn node(&self, id: EventId) -> Option<&NodeInfo> { self.nodes.get(&id) }

    /// The template of the Create node backing `contract_id`, if the ledger
    /// has ever seen that contract id.
    pub fn template_of(&self, contract_id: &ContractId) -> Option<&TemplateId> {
        let event_id = self.contract_id_to_event_id.get(contract_id)?;
        match &self.node(*event_id)?.node {
            crate::tx::Node::Create(create) => Some(&create.template),
            _ => None,
        }
    }
}
