// Scenario ledger: deterministic simulator for contract-based test scenarios
//
// SPDX-License-Identifier: Apache-2.0

//! The transaction tree: the input format callers submit to the ledger, and
//! the rich transaction it turns into once every local node id has been
//! rewritten to a global event id.
//!
//! A node is one of four tagged variants (Create, Fetch, Exercise,
//! LookupByKey). Only [`Exercise`] carries ordered child references, so the
//! tree type is generic over the id type used for those children: a
//! [`TransactionTree`] uses [`NodeId`] (local to the tree being built), a
//! [`RichTransaction`] uses [`EventId`] (global, once committed).

use std::collections::BTreeMap;
use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::authorize::FailedAuthorization;
use crate::ids::{ChoiceName, ContractId, EventId, GlobalKey, Location, NodeId, Party, TemplateId};
use crate::value::Value;

/// A key together with the parties that must maintain its uniqueness.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeyWithMaintainers {
    pub key: GlobalKey,
    pub maintainers: BTreeSet<Party>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Create {
    pub contract_id: ContractId,
    pub template: TemplateId,
    pub signatories: BTreeSet<Party>,
    pub stakeholders: BTreeSet<Party>,
    pub key: Option<KeyWithMaintainers>,
    pub instance: Value,
    pub location: Option<Location>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Fetch {
    pub contract_id: ContractId,
    pub template: TemplateId,
    pub stakeholders: BTreeSet<Party>,
    pub location: Option<Location>,
}

/// An exercise node. Generic over `Id`, the type used for its ordered
/// children: [`NodeId`] before commit, [`EventId`] after.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Exercise<Id> {
    pub target: ContractId,
    pub template: TemplateId,
    pub choice: ChoiceName,
    pub acting_parties: BTreeSet<Party>,
    pub signatories: BTreeSet<Party>,
    pub stakeholders: BTreeSet<Party>,
    pub consuming: bool,
    pub controllers_differ_from_actors: bool,
    /// The choice argument. May itself embed references to contracts beyond
    /// `target`; the enricher walks it the same way it would walk a create's
    /// instance, so a choice argument that passes along a contract id
    /// divulges it just as fetching that contract directly would.
    pub chosen_value: Value,
    pub children: Vec<Id>,
    pub location: Option<Location>,
}

#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LookupByKey {
    pub template: TemplateId,
    pub key: GlobalKey,
    pub maintainers: BTreeSet<Party>,
    pub result: Option<ContractId>,
    pub location: Option<Location>,
}

/// A transaction node, tagged by its kind and generic over the id type used
/// for an exercise's children.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Node<Id> {
    Create(Create),
    Fetch(Fetch),
    Exercise(Exercise<Id>),
    LookupByKey(LookupByKey),
}

impl<Id> Node<Id> {
    pub fn template(&self) -> &TemplateId {
        match self {
            Node::Create(n) => &n.template,
            Node::Fetch(n) => &n.template,
            Node::Exercise(n) => &n.template,
            Node::LookupByKey(n) => &n.template,
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            Node::Create(n) => n.location.as_ref(),
            Node::Fetch(n) => n.location.as_ref(),
            Node::Exercise(n) => n.location.as_ref(),
            Node::LookupByKey(n) => n.location.as_ref(),
        }
    }

    /// The informees of this node, per the glossary: stakeholders for
    /// Create/Fetch, signatories ∪ acting parties for Exercise, maintainers
    /// for LookupByKey.
    pub fn informees(&self) -> BTreeSet<Party> {
        match self {
            Node::Create(n) => n.stakeholders.clone(),
            Node::Fetch(n) => n.stakeholders.clone(),
            Node::Exercise(n) => n.signatories.union(&n.acting_parties).cloned().collect(),
            Node::LookupByKey(n) => n.maintainers.clone(),
        }
    }
}

/// The input format: an ordered sequence of root local node ids and a
/// mapping from local node id to node.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransactionTree {
    pub roots: Vec<NodeId>,
    pub nodes: BTreeMap<NodeId, Node<NodeId>>,
}

impl TransactionTree {
    pub fn new() -> Self { Self::default() }

    pub fn node(&self, id: NodeId) -> &Node<NodeId> {
        self.nodes
            .get(&id)
            .unwrap_or_else(|| crate::error::ledger_crash(format!("transaction tree has no node {id}")))
    }
}

/// A transaction node after commit: the same shape, but every local node id
/// has been rewritten to its global event id.
pub type RichNode = Node<EventId>;

/// The post-commit value: the tree shape unchanged, but with every local
/// node id rewritten to an event id and disclosure/divulgence resolved by
/// the commit processor (see [`crate::commit`]).
///
/// By the time a [`RichTransaction`] exists its `failed_authorizations` map
/// (tracked during enrichment, see [`crate::enrich::EnrichedTransaction`])
/// was empty — a non-empty map rejects the commit instead of producing one.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RichTransaction {
    pub committer: Party,
    pub effective_at: chrono::DateTime<chrono::Utc>,
    pub roots: Vec<EventId>,
    pub nodes: BTreeMap<EventId, RichNode>,
    /// Parties explicitly entitled to see each node.
    pub explicit_disclosure: BTreeMap<EventId, BTreeSet<Party>>,
    /// Additional parties who learn of a node created *within this same
    /// transaction* because they witnessed a parent exercise that referenced
    /// its contract id.
    pub local_divulgence: BTreeMap<EventId, BTreeSet<Party>>,
    /// Additional parties who learn of a contract created in an *earlier*
    /// transaction because they witnessed a parent exercise that referenced
    /// its contract id. Stays contract-id keyed even post-commit: that is
    /// the only handle a prior transaction's contract has here.
    pub global_divulgence: BTreeMap<ContractId, BTreeSet<Party>>,
    /// Always empty: a transaction only reaches this shape once the commit
    /// processor has already rejected it for any failed authorization.
    /// Carried anyway since it is part of the rich transaction's literal
    /// post-commit shape, not incidental detail.
    pub failed_authorizations: BTreeMap<EventId, FailedAuthorization>,
}

impl RichTransaction {
    pub fn node(&self, id: EventId) -> &RichNode {
        self.nodes
            .get(&id)
            .unwrap_or_else(|| crate::error::ledger_crash(format!("rich transaction has no node {id}")))
    }
}
