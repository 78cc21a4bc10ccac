// Scenario ledger: deterministic simulator for contract-based test scenarios
//
// SPDX-License-Identifier: Apache-2.0

//! Component F: the ledger facade. [`Ledger`] wraps a [`LedgerData`] snapshot
//! and exposes the operations a scenario runner drives it with: committing a
//! transaction, advancing time, and asserting that a commit attempt fails.
//! Every operation is persistent-value style — it takes `&self` and returns a
//! *new* [`Ledger`] rather than mutating in place, mirroring the rest of this
//! crate's "each step produces a new value" design.

use chrono::{DateTime, Duration, Utc};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use std::collections::BTreeSet;

use crate::authorize::AuthorizationMode;
use crate::commit;
pub use crate::commit::CommitError;
use crate::data::LedgerData;
use crate::ids::{ContractId, EventId, Location, Party, StepId, TemplateId};
pub use crate::steps::ptx_event_id;
use crate::steps::LedgerStep;
use crate::tx::{RichTransaction, TransactionTree};
use crate::value::Value;

/// Which party's eyes a lookup is performed through, driving the
/// `NotVisible` rule: the operator sees every contract regardless of
/// witnesses, a participant sees only what it has been made a witness of.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum View {
    /// Sees every contract on the ledger, archived or not, subject only to
    /// the `NotFound`/`NotEffective`/`NotActive` rules.
    OperatorView,
    /// Sees only contracts this party is a witness of.
    ParticipantView(Party),
}

/// The resolved shape of an active contract, returned by a successful
/// [`lookup_global_contract`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ActiveContract {
    pub contract_id: ContractId,
    pub event_id: EventId,
    pub template: TemplateId,
    pub instance: Value,
    pub stakeholders: BTreeSet<Party>,
}

/// The outcome of looking up a contract id against a ledger, per the
/// five-rule classification: a lookup can fail for exactly one of four
/// reasons, checked in this order, or succeed.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum LookupResult {
    /// No contract with this id was ever created.
    NotFound,
    /// The contract was created by a transaction that has not yet become
    /// effective as of the ledger's current time.
    NotEffective { effective_at: DateTime<Utc>, template: TemplateId },
    /// The contract has been archived by a consuming exercise.
    NotActive { template: TemplateId, consumed_by: EventId },
    /// The requesting view has not been made a witness of this contract.
    NotVisible { template: TemplateId, observers: BTreeSet<Party> },
    /// The contract is active, effective, and visible.
    Ok(ActiveContract),
}

/// Resolves `contract_id` against `data` as seen through `view` as of
/// `effective_at`, applying the five lookup rules in order: not-found,
/// not-yet-effective, archived, not-visible, then success.
pub fn lookup_global_contract(
    data: &LedgerData,
    view: &View,
    effective_at: DateTime<Utc>,
    contract_id: &ContractId,
) -> LookupResult {
    let Some(&event_id) = data.contract_id_to_event_id.get(contract_id) else {
        return LookupResult::NotFound;
    };
    let info = data.node(event_id).unwrap_or_else(|| {
        crate::error::ledger_crash(format!("contract {contract_id} resolves to missing node {event_id}"))
    });
    let (template, stakeholders, instance) = match &info.node {
        crate::tx::Node::Create(create) => (create.template.clone(), create.stakeholders.clone(), create.instance.clone()),
        _ => crate::error::ledger_crash(format!("contract {contract_id} resolves to a non-Create node {event_id}")),
    };

    if effective_at < info.effective_at {
        return LookupResult::NotEffective { effective_at: info.effective_at, template };
    }
    if let Some(consumed_by) = info.consumer {
        return LookupResult::NotActive { template, consumed_by };
    }
    if let View::ParticipantView(party) = view {
        if !info.observing_since.contains_key(party) {
            return LookupResult::NotVisible { template, observers: info.witnesses() };
        }
    }

    LookupResult::Ok(ActiveContract { contract_id: contract_id.clone(), event_id, template, instance, stakeholders })
}

/// An in-memory, deterministic multi-party contract ledger, built up by a
/// sequence of commits and time advances. Every method returns a new
/// `Ledger`; the receiver is never mutated.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ledger {
    data: LedgerData,
}

impl Ledger {
    /// Builds an empty ledger whose clock starts at `start_time`.
    pub fn new(start_time: DateTime<Utc>) -> Self { Ledger { data: LedgerData::new(start_time) } }

    pub fn current_time(&self) -> DateTime<Utc> { self.data.current_time }

    pub fn next_step_id(&self) -> StepId { self.data.next_step_id }

    pub fn steps(&self) -> &indexmap::IndexMap<StepId, LedgerStep> { &self.data.steps }

    /// Looks up `contract_id` as seen through `view`, as of the ledger's own
    /// current time.
    pub fn lookup_global_contract(&self, contract_id: &ContractId, view: &View) -> LookupResult {
        lookup_global_contract(&self.data, view, self.data.current_time, contract_id)
    }

    /// Commits `tree`, authorizing it under `mode`, as submitted by
    /// `committer` and effective at `effective_at`, with an optional
    /// diagnostic `location` for the commit as a whole. On success returns
    /// the new ledger, the step id the commit occupied, and the rich
    /// transaction it now remembers; on failure the receiver is unaffected
    /// and only the error is returned.
    pub fn commit(
        &self,
        committer: Party,
        effective_at: DateTime<Utc>,
        location: Option<Location>,
        tree: TransactionTree,
        mode: AuthorizationMode,
    ) -> Result<(Ledger, StepId, RichTransaction), CommitError> {
        let step_id = self.data.next_step_id;
        let (data, transaction) = commit::commit_transaction(&self.data, committer, effective_at, location, tree, mode)?;
        Ok((Ledger { data }, step_id, transaction))
    }

    /// Advances the ledger's current time by `delta`. `delta` may be
    /// negative: effective-at is advisory caller data, never enforced to be
    /// monotonic, so nothing here requires the clock to only move forward.
    pub fn pass_time(&self, delta: Duration) -> Ledger {
        let mut data = self.data.clone();
        let previous = data.current_time;
        data.current_time += delta;
        let advanced_to = data.current_time;
        let step_id = data.next_step_id;
        data.steps.insert(step_id, LedgerStep::PassTime { previous, advanced_to });
        data.next_step_id = step_id.next();
        Ledger { data }
    }

    /// Records that a transaction `actor` already attempted to commit is
    /// known to have failed. Attempting the transaction — running it
    /// through an interpreter to decide whether it would fail — is out of
    /// this crate's scope (§1); this is a pure append of that already-known
    /// fact to the step log, never a replay of the commit itself.
    pub fn assert_must_fail(&self, actor: Party, location: Option<Location>) -> Ledger {
        let mut data = self.data.clone();
        let step_id = data.next_step_id;
        let time = data.current_time;
        data.steps.insert(step_id, LedgerStep::AssertMustFail { actor, time, location });
        data.next_step_id = step_id.next();
        Ledger { data }
    }
}

/// Builds an empty ledger whose clock starts at `start_time`, mirroring
/// [`Ledger::new`] as a free function for callers that prefer the
/// function-per-operation style the rest of this module's public API uses.
pub fn initial_ledger(start_time: DateTime<Utc>) -> Ledger { Ledger::new(start_time) }

/// Commits `tree` against `ledger`, delegating to [`Ledger::commit`].
pub fn commit_transaction(
    ledger: &Ledger,
    committer: Party,
    effective_at: DateTime<Utc>,
    location: Option<Location>,
    tree: TransactionTree,
    mode: AuthorizationMode,
) -> Result<(Ledger, StepId, RichTransaction), CommitError> {
    ledger.commit(committer, effective_at, location, tree, mode)
}

/// Advances `ledger`'s clock by `delta`, delegating to [`Ledger::pass_time`].
pub fn pass_time(ledger: &Ledger, delta: Duration) -> Ledger { ledger.pass_time(delta) }

/// Records that `actor` already attempted a commit known to have failed,
/// delegating to [`Ledger::assert_must_fail`].
pub fn insert_assert_must_fail(ledger: &Ledger, actor: Party, location: Option<Location>) -> Ledger {
    ledger.assert_must_fail(actor, location)
}
