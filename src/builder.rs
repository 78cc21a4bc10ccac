// Scenario ledger: deterministic simulator for contract-based test scenarios
//
// SPDX-License-Identifier: Apache-2.0

//! A fluent builder for assembling a [`TransactionTree`] node by node,
//! grounded on the teacher's `DeedBuilder`: each call appends one more piece
//! and returns `self`, so a whole transaction reads as a single chained
//! expression.

use std::collections::BTreeSet;

use crate::ids::{ChoiceName, ContractId, GlobalKey, NodeId, Party, TemplateId};
use crate::tx::{Create, Exercise, Fetch, KeyWithMaintainers, LookupByKey, Node, TransactionTree};
use crate::value::Value;

/// Builds a [`TransactionTree`] by appending nodes in the order they should
/// be evaluated. Every append call returns the next unused [`NodeId`] so
/// callers can wire it up as a root or as an exercise's child.
#[derive(Clone, Debug, Default)]
pub struct TxBuilder {
    tree: TransactionTree,
    next_id: u32,
}

impl TxBuilder {
    pub fn new() -> Self { Self::default() }

    fn allocate(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Appends a Create node and marks it as a root of the transaction.
    pub fn create_root(
        &mut self,
        contract_id: ContractId,
        template: TemplateId,
        signatories: BTreeSet<Party>,
        stakeholders: BTreeSet<Party>,
        instance: Value,
    ) -> NodeId {
        let id = self.create(contract_id, template, signatories, stakeholders, instance);
        self.tree.roots.push(id);
        id
    }

    /// Appends a Create node without marking it as a root, for use as a
    /// child of an exercise being built with [`TxBuilder::exercise`].
    pub fn create(
        &mut self,
        contract_id: ContractId,
        template: TemplateId,
        signatories: BTreeSet<Party>,
        stakeholders: BTreeSet<Party>,
        instance: Value,
    ) -> NodeId {
        let id = self.allocate();
        self.tree.nodes.insert(
            id,
            Node::Create(Create { contract_id, template, signatories, stakeholders, key: None, instance, location: None }),
        );
        id
    }

    /// Attaches a key to the Create node appended last, so callers can chain
    /// `builder.create(...); builder.with_key(...)`.
    pub fn with_key(&mut self, id: NodeId, key: GlobalKey, maintainers: BTreeSet<Party>) -> &mut Self {
        if let Some(Node::Create(create)) = self.tree.nodes.get_mut(&id) {
            create.key = Some(KeyWithMaintainers { key, maintainers });
        }
        self
    }

    /// Appends a Fetch node and marks it as a root of the transaction.
    pub fn fetch_root(&mut self, contract_id: ContractId, template: TemplateId, stakeholders: BTreeSet<Party>) -> NodeId {
        let id = self.fetch(contract_id, template, stakeholders);
        self.tree.roots.push(id);
        id
    }

    pub fn fetch(&mut self, contract_id: ContractId, template: TemplateId, stakeholders: BTreeSet<Party>) -> NodeId {
        let id = self.allocate();
        self.tree.nodes.insert(id, Node::Fetch(Fetch { contract_id, template, stakeholders, location: None }));
        id
    }

    /// Appends a LookupByKey node and marks it as a root of the transaction.
    pub fn lookup_by_key_root(
        &mut self,
        template: TemplateId,
        key: GlobalKey,
        maintainers: BTreeSet<Party>,
        result: Option<ContractId>,
    ) -> NodeId {
        let id = self.lookup_by_key(template, key, maintainers, result);
        self.tree.roots.push(id);
        id
    }

    pub fn lookup_by_key(
        &mut self,
        template: TemplateId,
        key: GlobalKey,
        maintainers: BTreeSet<Party>,
        result: Option<ContractId>,
    ) -> NodeId {
        let id = self.allocate();
        self.tree.nodes.insert(id, Node::LookupByKey(LookupByKey { template, key, maintainers, result, location: None }));
        id
    }

    /// Appends an Exercise node with the given children already built (via
    /// earlier, non-root `create`/`fetch`/`lookup_by_key` calls), and marks
    /// it as a root of the transaction.
    #[allow(clippy::too_many_arguments)]
    pub fn exercise_root(
        &mut self,
        target: ContractId,
        template: TemplateId,
        choice: ChoiceName,
        acting_parties: BTreeSet<Party>,
        signatories: BTreeSet<Party>,
        stakeholders: BTreeSet<Party>,
        consuming: bool,
        chosen_value: Value,
        children: Vec<NodeId>,
    ) -> NodeId {
        let id = self.allocate();
        self.tree.nodes.insert(
            id,
            Node::Exercise(Exercise {
                target,
                template,
                choice,
                acting_parties,
                signatories,
                stakeholders,
                consuming,
                controllers_differ_from_actors: false,
                chosen_value,
                children,
                location: None,
            }),
        );
        self.tree.roots.push(id);
        id
    }

    pub fn build(self) -> TransactionTree { self.tree }
}
