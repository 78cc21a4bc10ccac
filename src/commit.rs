// Scenario ledger: deterministic simulator for contract-based test scenarios
//
// SPDX-License-Identifier: Apache-2.0

//! Component E: the commit processor. Turns an enriched [`TransactionTree`]
//! plus the ledger state it commits against into a new [`LedgerData`] and
//! the [`RichTransaction`] that state now remembers, or rejects the
//! transaction outright leaving the ledger untouched.
//!
//! Four steps, run in order, any of which can abort the whole commit before
//! `data` is ever touched:
//!
//! 1. Enrich the input tree under the caller's authorization mode.
//! 2. Reject if enrichment recorded any authorization failure.
//! 3. Walk the tree pre-order, rewriting local node ids to event ids,
//!    inserting a [`NodeInfo`] for every node, and applying each node's side
//!    effects (key registration, referenced-by bookkeeping, contract
//!    archival) against a working copy of the ledger.
//! 4. Fold this transaction's disclosure and divulgence relations into the
//!    node index's observer-onset maps, then append the resulting
//!    [`RichTransaction`] to the step log.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::authorize::{AuthorizationMode, FailedAuthorization};
use crate::data::{LedgerData, NodeInfo};
use crate::enrich::enrich;
use crate::ids::{ContractId, EventId, GlobalKey, Location, NodeId, Party, StepId};
use crate::steps::LedgerStep;
use crate::tx::{Node, RichTransaction, TransactionTree};

/// Why a commit was rejected. In every case `data` is returned to the caller
/// unchanged: a rejected commit never partially applies.
#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum CommitError {
    /// transaction failed authorization on {0} node(s)
    FailedAuthorizations(BTreeMap<NodeId, FailedAuthorization>),
    /// key {0} is already held by an active contract
    DuplicateKey(GlobalKey),
    /// contract {0} is not active
    ContractNotActive(ContractId),
    /// contract {0} was never created on this ledger
    ContractNotFound(ContractId),
}

/// One stack frame of the side-effecting commit walk: the node to apply,
/// the event id it has already been rewritten to, and the event id of the
/// exercise it is a child of, if any.
struct Frame {
    node_id: NodeId,
    event_id: EventId,
    parent: Option<EventId>,
}

/// Commits `tree` against `data`, authorizing it under `mode` as committed by
/// `committer` and effective at `effective_at`. `location` is caller-supplied
/// diagnostic context for the commit as a whole (distinct from a `Node`'s own
/// `location`), carried through to the step log entry this commit produces.
///
/// On success returns the new ledger state and the rich transaction it now
/// remembers. On failure `data` is left conceptually untouched: the caller
/// receives only a [`CommitError`] and must keep using its prior state.
pub fn commit_transaction(
    data: &LedgerData,
    committer: Party,
    effective_at: DateTime<Utc>,
    location: Option<Location>,
    tree: TransactionTree,
    mode: AuthorizationMode,
) -> Result<(LedgerData, RichTransaction), CommitError> {
    let enriched = enrich(tree, mode);
    if !enriched.is_well_authorized() {
        return Err(CommitError::FailedAuthorizations(enriched.failed_authorizations));
    }

    let step_id = data.next_step_id;
    let mut working = data.clone();

    let local_to_event = |node_id: NodeId| EventId::new(step_id, node_id);

    let mut stack: Vec<Frame> = enriched
        .tree
        .roots
        .iter()
        .rev()
        .map(|&node_id| Frame { node_id, event_id: local_to_event(node_id), parent: None })
        .collect();

    let mut rich_nodes: BTreeMap<EventId, Node<EventId>> = BTreeMap::new();

    while let Some(Frame { node_id, event_id, parent }) = stack.pop() {
        let node = enriched.tree.node(node_id);
        let rich = rewrite_node(node, step_id);
        rich_nodes.insert(event_id, rich.clone());
        working.nodes.insert(
            event_id,
            NodeInfo {
                node: rich,
                origin: step_id,
                effective_at,
                parent,
                observing_since: BTreeMap::new(),
                referenced_by: BTreeSet::new(),
                consumer: None,
            },
        );

        match node {
            Node::Create(create) => {
                if let Some(key) = &create.key {
                    if working.active_keys.contains_key(&key.key) {
                        return Err(CommitError::DuplicateKey(key.key.clone()));
                    }
                    working.active_keys.insert(key.key.clone(), create.contract_id.clone());
                }
                working.contract_id_to_event_id.insert(create.contract_id.clone(), event_id);
            }
            Node::Fetch(fetch) => {
                // A fetch of an already-archived contract is tolerated at
                // commit time: the active-contract-set is a read-side
                // concern for lookups, not an enrich/commit-time validity
                // gate. Only an unknown contract id aborts the commit.
                let target_event_id = require_known(&working, &fetch.contract_id)?;
                reference(&mut working, target_event_id, event_id);
            }
            Node::Exercise(exercise) => {
                let target_event_id = require_active(&working, &exercise.target)?;
                reference(&mut working, target_event_id, event_id);
                if exercise.consuming {
                    if let Some(key) = active_key_of(&working, &exercise.target) {
                        working.active_keys.remove(&key);
                    }
                    if let Some(info) = working.nodes.get_mut(&target_event_id) {
                        info.consumer = Some(event_id);
                    }
                }
                for &child in exercise.children.iter().rev() {
                    stack.push(Frame { node_id: child, event_id: local_to_event(child), parent: Some(event_id) });
                }
            }
            Node::LookupByKey(lookup) => {
                if let Some(result) = &lookup.result {
                    let target_event_id = require_known(&working, result)?;
                    reference(&mut working, target_event_id, event_id);
                }
            }
        }
    }

    // Fold disclosure and divulgence into a single event-id-keyed observer
    // relation, then apply it to the node index: onset is recorded only for
    // parties not already present, so an earlier transaction's onset for a
    // party is never overwritten by a later one.
    let mut observers: BTreeMap<EventId, BTreeSet<Party>> = BTreeMap::new();
    let mut explicit_disclosure: BTreeMap<EventId, BTreeSet<Party>> = BTreeMap::new();
    for (node_id, parties) in &enriched.disclosure {
        let event_id = local_to_event(*node_id);
        explicit_disclosure.insert(event_id, parties.clone());
        observers.entry(event_id).or_default().extend(parties.iter().cloned());
    }
    let mut local_divulgence: BTreeMap<EventId, BTreeSet<Party>> = BTreeMap::new();
    for (node_id, parties) in &enriched.local_divulgence {
        let event_id = local_to_event(*node_id);
        local_divulgence.insert(event_id, parties.clone());
        observers.entry(event_id).or_default().extend(parties.iter().cloned());
    }
    let mut global_divulgence: BTreeMap<ContractId, BTreeSet<Party>> = BTreeMap::new();
    for (contract_id, parties) in enriched.global_divulgence {
        if let Some(&origin_event_id) = working.contract_id_to_event_id.get(&contract_id) {
            observers.entry(origin_event_id).or_default().extend(parties.iter().cloned());
        }
        global_divulgence.insert(contract_id, parties);
    }
    for (event_id, parties) in observers {
        if let Some(info) = working.nodes.get_mut(&event_id) {
            for party in parties {
                info.observing_since.entry(party).or_insert(step_id);
            }
        }
    }

    let roots: Vec<EventId> = enriched.tree.roots.iter().map(|&id| local_to_event(id)).collect();
    let transaction = RichTransaction {
        committer,
        effective_at,
        roots: roots.clone(),
        nodes: rich_nodes,
        explicit_disclosure,
        local_divulgence,
        global_divulgence,
        // Enrichment already rejected the commit above if this would be
        // non-empty; a committed RichTransaction never carries one.
        failed_authorizations: BTreeMap::new(),
    };

    working.steps.insert(step_id, LedgerStep::Commit { transaction: transaction.clone(), roots, location });
    working.next_step_id = step_id.next();

    Ok((working, transaction))
}

/// Records that `referencing` (a fetch, an exercise, or a positive key
/// lookup) references the contract created at `target_event_id`.
fn reference(working: &mut LedgerData, target_event_id: EventId, referencing: EventId) {
    if let Some(info) = working.nodes.get_mut(&target_event_id) {
        info.referenced_by.insert(referencing);
    }
}

fn active_key_of(data: &LedgerData, contract_id: &ContractId) -> Option<GlobalKey> {
    data.active_keys.iter().find(|(_, cid)| *cid == contract_id).map(|(key, _)| key.clone())
}

/// Checks that `contract_id` has been created on this ledger at all,
/// returning the event id of its Create node regardless of whether it has
/// since been archived.
fn require_known(data: &LedgerData, contract_id: &ContractId) -> Result<EventId, CommitError> {
    data.contract_id_to_event_id.get(contract_id).copied().ok_or_else(|| CommitError::ContractNotFound(contract_id.clone()))
}

/// Checks that `contract_id` has been created and not yet archived, returning
/// the event id of its Create node. Used for `Exercise` targets: exercising a
/// choice on an already-archived contract is always a commit-time error,
/// unlike fetching one.
fn require_active(data: &LedgerData, contract_id: &ContractId) -> Result<EventId, CommitError> {
    let event_id = require_known(data, contract_id)?;
    let info = data.node(event_id).unwrap_or_else(|| {
        crate::error::ledger_crash(format!("contract {contract_id} resolves to missing node {event_id}"))
    });
    if info.is_archived() {
        return Err(CommitError::ContractNotActive(contract_id.clone()));
    }
    Ok(event_id)
}

/// Rewrites a node's child ids (if any) from local node ids to the event ids
/// they were committed under at `step_id`. Non-exercise nodes have no
/// children and pass through unchanged in shape.
fn rewrite_node(node: &Node<NodeId>, step_id: StepId) -> Node<EventId> {
    match node {
        Node::Create(create) => Node::Create(create.clone()),
        Node::Fetch(fetch) => Node::Fetch(fetch.clone()),
        Node::LookupByKey(lookup) => Node::LookupByKey(lookup.clone()),
        Node::Exercise(exercise) => Node::Exercise(crate::tx::Exercise {
            target: exercise.target.clone(),
            template: exercise.template.clone(),
            choice: exercise.choice.clone(),
            acting_parties: exercise.acting_parties.clone(),
            signatories: exercise.signatories.clone(),
            stakeholders: exercise.stakeholders.clone(),
            consuming: exercise.consuming,
            controllers_differ_from_actors: exercise.controllers_differ_from_actors,
            chosen_value: exercise.chosen_value.clone(),
            children: exercise.children.iter().map(|&id| EventId::new(step_id, id)).collect(),
            location: exercise.location.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TemplateId;
    use crate::tx::Create;
    use crate::value::Value;

    fn party(s: &str) -> Party { Party::new(s).unwrap() }
    fn set(parties: &[&str]) -> BTreeSet<Party> { parties.iter().map(|p| party(p)).collect() }
    fn cid(s: &str) -> ContractId { ContractId::new(s).unwrap() }
    fn template() -> TemplateId { TemplateId::new("Tmpl").unwrap() }

    fn create_tree(id: &str, signatories: &[&str]) -> TransactionTree {
        let mut tree = TransactionTree::new();
        let root = NodeId::new(0);
        tree.roots.push(root);
        tree.nodes.insert(
            root,
            Node::Create(Create {
                contract_id: cid(id),
                template: template(),
                signatories: set(signatories),
                stakeholders: set(signatories),
                key: None,
                instance: Value::Unit,
                location: None,
            }),
        );
        tree
    }

    #[test]
    fn committing_a_create_registers_the_contract_as_active() {
        let data = LedgerData::new(DateTime::<Utc>::UNIX_EPOCH);
        let (new_data, rich) = commit_transaction(
            &data,
            party("alice"),
            data.current_time,
            None,
            create_tree("c1", &["alice"]),
            AuthorizationMode::Authorize(set(&["alice"])),
        )
        .unwrap();
        assert_eq!(rich.roots.len(), 1);
        let event_id = rich.roots[0];
        let info = new_data.node(event_id).unwrap();
        assert!(!info.is_archived());
        assert_eq!(info.parent, None);
        assert_eq!(info.effective_at, data.current_time);
        assert_eq!(new_data.contract_id_to_event_id.get(&cid("c1")), Some(&event_id));
    }

    #[test]
    fn duplicate_key_on_create_aborts_without_mutating_state() {
        let mut data = LedgerData::new(DateTime::<Utc>::UNIX_EPOCH);
        let mut tree = create_tree("c1", &["alice"]);
        if let Node::Create(create) = tree.nodes.get_mut(&NodeId::new(0)).unwrap() {
            create.key = Some(crate::tx::KeyWithMaintainers {
                key: GlobalKey::new("k").unwrap(),
                maintainers: set(&["alice"]),
            });
        }
        let (after_first, _) = commit_transaction(
            &data,
            party("alice"),
            data.current_time,
            None,
            tree.clone(),
            AuthorizationMode::Authorize(set(&["alice"])),
        )
        .unwrap();
        data = after_first;

        let mut second = create_tree("c2", &["alice"]);
        if let Node::Create(create) = second.nodes.get_mut(&NodeId::new(0)).unwrap() {
            create.key =
                Some(crate::tx::KeyWithMaintainers { key: GlobalKey::new("k").unwrap(), maintainers: set(&["alice"]) });
        }
        let err = commit_transaction(
            &data,
            party("alice"),
            data.current_time,
            None,
            second,
            AuthorizationMode::Authorize(set(&["alice"])),
        )
        .unwrap_err();
        assert!(matches!(err, CommitError::DuplicateKey(_)));
    }

    #[test]
    fn fetch_of_unknown_contract_is_rejected() {
        let data = LedgerData::new(DateTime::<Utc>::UNIX_EPOCH);
        let mut tree = TransactionTree::new();
        let root = NodeId::new(0);
        tree.roots.push(root);
        tree.nodes.insert(
            root,
            Node::Fetch(crate::tx::Fetch {
                contract_id: cid("ghost"),
                template: template(),
                stakeholders: set(&["alice"]),
                location: None,
            }),
        );
        let err = commit_transaction(
            &data,
            party("alice"),
            data.current_time,
            None,
            tree,
            AuthorizationMode::Authorize(set(&["alice"])),
        )
        .unwrap_err();
        assert!(matches!(err, CommitError::ContractNotFound(_)));
    }

    #[test]
    fn fetching_a_contract_records_the_fetch_as_a_referencer() {
        let data = LedgerData::new(DateTime::<Utc>::UNIX_EPOCH);
        let (data, create_rich) = commit_transaction(
            &data,
            party("alice"),
            data.current_time,
            None,
            create_tree("c1", &["alice"]),
            AuthorizationMode::Authorize(set(&["alice"])),
        )
        .unwrap();
        let create_event_id = create_rich.roots[0];

        let mut tree = TransactionTree::new();
        let root = NodeId::new(0);
        tree.roots.push(root);
        tree.nodes.insert(
            root,
            Node::Fetch(crate::tx::Fetch {
                contract_id: cid("c1"),
                template: template(),
                stakeholders: set(&["alice"]),
                location: None,
            }),
        );
        let (data, fetch_rich) = commit_transaction(
            &data,
            party("alice"),
            data.current_time,
            None,
            tree,
            AuthorizationMode::Authorize(set(&["alice"])),
        )
        .unwrap();
        let fetch_event_id = fetch_rich.roots[0];

        let info = data.node(create_event_id).unwrap();
        assert!(info.referenced_by.contains(&fetch_event_id));
    }

    #[test]
    fn observer_onset_is_never_overwritten_by_a_later_commit() {
        let data = LedgerData::new(DateTime::<Utc>::UNIX_EPOCH);
        let (data, create_rich) = commit_transaction(
            &data,
            party("alice"),
            data.current_time,
            None,
            create_tree("c1", &["alice"]),
            AuthorizationMode::Authorize(set(&["alice"])),
        )
        .unwrap();
        let create_event_id = create_rich.roots[0];
        let first_onset = *data.node(create_event_id).unwrap().observing_since.get(&party("alice")).unwrap();

        let (data, _) = commit_transaction(
            &data,
            party("alice"),
            data.current_time,
            None,
            create_tree("c2", &["alice"]),
            AuthorizationMode::Authorize(set(&["alice"])),
        )
        .unwrap();

        let second_onset = *data.node(create_event_id).unwrap().observing_since.get(&party("alice")).unwrap();
        assert_eq!(first_onset, second_onset);
    }
}
