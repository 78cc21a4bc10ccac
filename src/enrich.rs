// Scenario ledger: deterministic simulator for contract-based test scenarios
//
// SPDX-License-Identifier: Apache-2.0

//! Component C: the enricher. Walks a [`TransactionTree`] in pre-order using
//! an explicit stack (never plain recursion, so a pathologically deep tree
//! cannot blow the call stack), accumulating per-node disclosure and
//! divulgence relations and recording the first authorization failure each
//! node hits.
//!
//! Divulgence is driven by the node kinds that actually reference another
//! contract id: a `Fetch`'s own referenced id, an `Exercise`'s target (plus
//! any contract id embedded in its choice argument), for the parties that
//! witness the node but are not already its stakeholders. `Create` and
//! `LookupByKey` never divulge — a created contract's embedded references
//! only divulge once something later actually fetches or exercises them.
//!
//! A divulged contract id created earlier in *this same* tree is recorded
//! against [`EnrichedTransaction::local_divulgence`] (keyed by the node id
//! that created it); anything else falls through to
//! [`EnrichedTransaction::global_divulgence`] (keyed by contract id), because
//! only the commit processor — which can see prior steps — knows which event
//! id such a contract id resolves to.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::authorize::{check_node, AuthorizationMode, FailedAuthorization};
use crate::ids::{ContractId, NodeId, Party};
use crate::tx::{Node, TransactionTree};
use crate::value::contract_ids_in;

/// The enricher's output: the input tree, unchanged, plus everything the
/// traversal discovered about who sees what and which nodes failed
/// authorization.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EnrichedTransaction {
    pub tree: TransactionTree,
    /// Parties explicitly entitled to see each node (its informees, plus
    /// anything its own ancestors already made visible).
    pub disclosure: BTreeMap<NodeId, BTreeSet<Party>>,
    /// Parties who learn of a node because a `Fetch`/`Exercise` elsewhere in
    /// this same tree referenced its contract id, and that contract id was
    /// created earlier in this same tree.
    pub local_divulgence: BTreeMap<NodeId, BTreeSet<Party>>,
    /// Parties who learn of a contract because a `Fetch`/`Exercise` in this
    /// tree referenced its contract id, and that contract id was *not*
    /// created in this tree (so it must come from an earlier step).
    pub global_divulgence: BTreeMap<ContractId, BTreeSet<Party>>,
    /// The first authorization failure recorded for each node, in pre-order
    /// traversal order of discovery. Non-empty here means the transaction as
    /// a whole must be rejected at commit time.
    pub failed_authorizations: BTreeMap<NodeId, FailedAuthorization>,
}

impl EnrichedTransaction {
    pub fn is_well_authorized(&self) -> bool { self.failed_authorizations.is_empty() }
}

/// One entry on the explicit traversal stack: the node to visit, the
/// authorization mode it inherits from its parent, and the witness set
/// (parties who have seen an ancestor and so divulge into this node too).
struct Frame {
    id: NodeId,
    mode: AuthorizationMode,
    witnesses: BTreeSet<Party>,
}

/// Enriches `tree` under the given top-level authorization mode.
///
/// Traversal order is pre-order, depth-first, children visited in the order
/// they appear on their parent exercise (or `tree.roots` at the top level).
/// A `contract_id -> NodeId` map is threaded through the walk so a divulged
/// reference to a contract created earlier in this same tree resolves to
/// local divulgence; anything else is recorded as global divulgence.
pub fn enrich(tree: TransactionTree, mode: AuthorizationMode) -> EnrichedTransaction {
    let mut disclosure = BTreeMap::new();
    let mut local_divulgence: BTreeMap<NodeId, BTreeSet<Party>> = BTreeMap::new();
    let mut global_divulgence: BTreeMap<ContractId, BTreeSet<Party>> = BTreeMap::new();
    let mut failed_authorizations = BTreeMap::new();
    let mut created_in_tree: BTreeMap<ContractId, NodeId> = BTreeMap::new();

    let mut stack: Vec<Frame> = tree
        .roots
        .iter()
        .rev()
        .map(|&id| Frame { id, mode: mode.clone(), witnesses: mode.initial_witnesses() })
        .collect();

    while let Some(Frame { id, mode, witnesses }) = stack.pop() {
        let node = tree.node(id);
        let informees = node.informees();
        let node_witnesses: BTreeSet<Party> = informees.union(&witnesses).cloned().collect();
        disclosure.entry(id).or_insert_with(BTreeSet::new).extend(node_witnesses.iter().cloned());

        if let Some(failure) = check_node(node, &mode) {
            failed_authorizations.entry(id).or_insert(failure);
        }

        match node {
            Node::Create(create) => {
                created_in_tree.insert(create.contract_id.clone(), id);
            }
            Node::Fetch(fetch) => {
                let divulging_to: BTreeSet<Party> = witnesses.difference(&fetch.stakeholders).cloned().collect();
                record_divulgence(&created_in_tree, &mut local_divulgence, &mut global_divulgence, fetch.contract_id.clone(), &divulging_to);
            }
            Node::Exercise(exercise) => {
                let divulging_to: BTreeSet<Party> = witnesses.difference(&exercise.stakeholders).cloned().collect();
                record_divulgence(&created_in_tree, &mut local_divulgence, &mut global_divulgence, exercise.target.clone(), &divulging_to);
                for cid in contract_ids_in(&exercise.chosen_value) {
                    if cid == exercise.target {
                        continue;
                    }
                    record_divulgence(&created_in_tree, &mut local_divulgence, &mut global_divulgence, cid, &divulging_to);
                }

                let child_mode =
                    mode.entering_exercise(exercise.signatories.union(&exercise.acting_parties).cloned().collect());
                for &child in exercise.children.iter().rev() {
                    stack.push(Frame { id: child, mode: child_mode.clone(), witnesses: node_witnesses.clone() });
                }
            }
            Node::LookupByKey(_) => {}
        }
    }

    EnrichedTransaction { tree, disclosure, local_divulgence, global_divulgence, failed_authorizations }
}

fn record_divulgence(
    created_in_tree: &BTreeMap<ContractId, NodeId>,
    local_divulgence: &mut BTreeMap<NodeId, BTreeSet<Party>>,
    global_divulgence: &mut BTreeMap<ContractId, BTreeSet<Party>>,
    contract_id: ContractId,
    divulging_to: &BTreeSet<Party>,
) {
    if divulging_to.is_empty() {
        return;
    }
    if let Some(&origin) = created_in_tree.get(&contract_id) {
        local_divulgence.entry(origin).or_insert_with(BTreeSet::new).extend(divulging_to.iter().cloned());
    } else {
        global_divulgence.entry(contract_id).or_insert_with(BTreeSet::new).extend(divulging_to.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ChoiceName, GlobalKey, TemplateId};
    use crate::tx::{Create, Exercise, Fetch};
    use crate::value::Value;

    fn party(s: &str) -> Party { Party::new(s).unwrap() }
    fn set(parties: &[&str]) -> BTreeSet<Party> { parties.iter().map(|p| party(p)).collect() }
    fn cid(s: &str) -> ContractId { ContractId::new(s).unwrap() }
    fn template() -> TemplateId { TemplateId::new("Tmpl").unwrap() }

    #[test]
    fn disclosure_covers_informees_and_inherited_witnesses() {
        let mut tree = TransactionTree::new();
        let root = NodeId::new(0);
        tree.roots.push(root);
        tree.nodes.insert(
            root,
            Node::Create(Create {
                contract_id: cid("c1"),
                template: template(),
                signatories: set(&["alice"]),
                stakeholders: set(&["alice", "bob"]),
                key: None,
                instance: Value::Unit,
                location: None,
            }),
        );

        let enriched = enrich(tree, AuthorizationMode::Authorize(set(&["alice"])));
        assert_eq!(enriched.disclosure[&root], set(&["alice", "bob"]));
        assert!(enriched.is_well_authorized());
    }

    #[test]
    fn create_never_divulges_its_embedded_references() {
        let mut tree = TransactionTree::new();
        let root = NodeId::new(0);
        tree.roots.push(root);
        tree.nodes.insert(
            root,
            Node::Create(Create {
                contract_id: cid("c2"),
                template: template(),
                signatories: set(&["bob"]),
                stakeholders: set(&["bob"]),
                key: None,
                instance: Value::ContractId(cid("prior")),
                location: None,
            }),
        );

        let enriched = enrich(tree, AuthorizationMode::DontAuthorize);
        assert!(enriched.global_divulgence.is_empty());
        assert!(enriched.local_divulgence.is_empty());
    }

    #[test]
    fn fetch_by_an_exercise_witness_divulges_to_parties_outside_its_own_stakeholders() {
        let mut tree = TransactionTree::new();
        let exercising = NodeId::new(0);
        let fetching = NodeId::new(1);
        tree.roots.push(exercising);
        tree.nodes.insert(
            exercising,
            Node::Exercise(Exercise {
                target: cid("c1"),
                template: template(),
                choice: ChoiceName::new("Do").unwrap(),
                acting_parties: set(&["alice"]),
                signatories: set(&["alice"]),
                stakeholders: set(&["alice"]),
                consuming: false,
                controllers_differ_from_actors: false,
                chosen_value: Value::Unit,
                children: vec![fetching],
                location: None,
            }),
        );
        tree.nodes.insert(
            fetching,
            Node::Fetch(Fetch {
                contract_id: cid("prior"),
                template: template(),
                stakeholders: set(&["bob"]),
                location: None,
            }),
        );

        let enriched = enrich(tree, AuthorizationMode::DontAuthorize);
        // Alice witnesses the exercise and is not a stakeholder of the
        // fetched contract, so she gets implicit (global) divulgence.
        assert_eq!(enriched.global_divulgence[&cid("prior")], set(&["alice"]));
        assert!(enriched.local_divulgence.is_empty());
    }

    #[test]
    fn exercise_target_created_earlier_in_the_same_tree_is_local_divulgence() {
        let mut tree = TransactionTree::new();
        let created = NodeId::new(0);
        let wrapping_exercise = NodeId::new(1);
        let exercising = NodeId::new(2);
        tree.roots.push(created);
        tree.roots.push(wrapping_exercise);
        tree.nodes.insert(
            created,
            Node::Create(Create {
                contract_id: cid("c1"),
                template: template(),
                signatories: set(&["alice"]),
                stakeholders: set(&["alice"]),
                key: None,
                instance: Value::Unit,
                location: None,
            }),
        );
        tree.nodes.insert(
            wrapping_exercise,
            Node::Exercise(Exercise {
                target: cid("other"),
                template: template(),
                choice: ChoiceName::new("Wrap").unwrap(),
                acting_parties: set(&["carol"]),
                signatories: set(&["carol"]),
                stakeholders: set(&["carol"]),
                consuming: false,
                controllers_differ_from_actors: false,
                chosen_value: Value::Unit,
                children: vec![exercising],
                location: None,
            }),
        );
        tree.nodes.insert(
            exercising,
            Node::Exercise(Exercise {
                target: cid("c1"),
                template: template(),
                choice: ChoiceName::new("Do").unwrap(),
                acting_parties: set(&["bob"]),
                signatories: set(&["bob"]),
                stakeholders: set(&["bob"]),
                consuming: false,
                controllers_differ_from_actors: false,
                chosen_value: Value::Unit,
                children: vec![],
                location: None,
            }),
        );

        let enriched = enrich(tree, AuthorizationMode::DontAuthorize);
        assert_eq!(enriched.local_divulgence[&created], set(&["carol"]));
        assert!(enriched.global_divulgence.is_empty());
    }

    #[test]
    fn exercise_child_failure_is_recorded_and_does_not_abort_the_walk() {
        let mut tree = TransactionTree::new();
        let root = NodeId::new(0);
        let child = NodeId::new(1);
        tree.roots.push(root);
        tree.nodes.insert(
            root,
            Node::Exercise(Exercise {
                target: cid("c1"),
                template: template(),
                choice: ChoiceName::new("Do").unwrap(),
                acting_parties: set(&["alice"]),
                signatories: set(&["alice"]),
                stakeholders: set(&["alice"]),
                consuming: true,
                controllers_differ_from_actors: false,
                chosen_value: Value::Unit,
                children: vec![child],
                location: None,
            }),
        );
        tree.nodes.insert(
            child,
            Node::LookupByKey(crate::tx::LookupByKey {
                template: template(),
                key: GlobalKey::new("k").unwrap(),
                maintainers: set(&["carol"]),
                result: None,
                location: None,
            }),
        );

        let enriched = enrich(tree, AuthorizationMode::Authorize(set(&["alice"])));
        assert!(!enriched.is_well_authorized());
        assert!(enriched.failed_authorizations.contains_key(&child));
        assert!(!enriched.failed_authorizations.contains_key(&root));
    }

    #[test]
    fn delegated_exercise_carries_signatories_and_acting_parties_into_child_authorizers() {
        // alice is the sole signatory but delegates the choice to bob as
        // controller; the child's authorizer set must be the union of both,
        // not just the acting parties, or an otherwise-authorized child is
        // wrongly rejected.
        let mut tree = TransactionTree::new();
        let root = NodeId::new(0);
        let child = NodeId::new(1);
        tree.roots.push(root);
        tree.nodes.insert(
            root,
            Node::Exercise(Exercise {
                target: cid("c1"),
                template: template(),
                choice: ChoiceName::new("Do").unwrap(),
                acting_parties: set(&["bob"]),
                signatories: set(&["alice"]),
                stakeholders: set(&["alice"]),
                consuming: false,
                controllers_differ_from_actors: false,
                chosen_value: Value::Unit,
                children: vec![child],
                location: None,
            }),
        );
        tree.nodes.insert(
            child,
            Node::Create(Create {
                contract_id: cid("c2"),
                template: template(),
                signatories: set(&["alice"]),
                stakeholders: set(&["alice"]),
                key: None,
                instance: Value::Unit,
                location: None,
            }),
        );

        let enriched = enrich(tree, AuthorizationMode::Authorize(set(&["alice", "bob"])));
        assert!(enriched.is_well_authorized(), "{:?}", enriched.failed_authorizations);
    }
}
