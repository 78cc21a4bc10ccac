// Scenario ledger: deterministic simulator for contract-based test scenarios
//
// SPDX-License-Identifier: Apache-2.0

//! Component B: the authorization checker. Per-node-kind predicates that
//! accept or reject a node given the authorizer set currently in force.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ids::{ChoiceName, Location, Party, TemplateId};
use crate::tx::Node;

/// The authorization mode in force along a traversal path: either no checks
/// are performed at all, or every node is checked against a concrete set of
/// authorizing parties.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AuthorizationMode {
    /// No authorization checks are performed; `failed_authorizations` stays
    /// empty regardless of node shape.
    DontAuthorize,
    /// Every node is checked against `authorizers`.
    Authorize(BTreeSet<Party>),
}

impl AuthorizationMode {
    /// The witness set a fresh traversal starts with: the authorizer set
    /// itself under [`AuthorizationMode::Authorize`], empty otherwise.
    pub fn initial_witnesses(&self) -> BTreeSet<Party> {
        match self {
            AuthorizationMode::DontAuthorize => BTreeSet::new(),
            AuthorizationMode::Authorize(authorizers) => authorizers.clone(),
        }
    }

    /// Replaces the authorizer set on entry to an exercise. Under
    /// `DontAuthorize` the mode is unchanged; an `Authorize` mode is
    /// *replaced*, not unioned, by `new_authorizers`.
    pub fn entering_exercise(&self, new_authorizers: BTreeSet<Party>) -> Self {
        match self {
            AuthorizationMode::DontAuthorize => AuthorizationMode::DontAuthorize,
            AuthorizationMode::Authorize(_) => AuthorizationMode::Authorize(new_authorizers),
        }
    }
}

/// The tag recorded for an authorization failure.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
#[display(lowercase)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FailureTag {
    CreateMissingAuth,
    NoSignatories,
    MaintainersNotSubsetOfSignatories,
    NoControllers,
    ActorMismatch,
    ExerciseMissingAuth,
    FetchMissingAuth,
    LookupByKeyMissingAuth,
}

/// A single authorization failure, recorded the first time a node fails any
/// of its checks. Carries enough context for test assertions: the
/// authorizer set in force at the moment of failure, and the set that was
/// actually required.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FailedAuthorization {
    pub tag: FailureTag,
    pub template: TemplateId,
    pub location: Option<Location>,
    pub authorizers: BTreeSet<Party>,
    pub required: BTreeSet<Party>,
}

/// Checks a single node against the authorizer set currently in force,
/// returning the *first* check (in the table order of spec §4.2) that
/// fails, or `None` if every applicable check passes.
///
/// Under [`AuthorizationMode::DontAuthorize`] this always returns `None`.
pub fn check_node<Id>(node: &Node<Id>, mode: &AuthorizationMode) -> Option<FailedAuthorization> {
    let authorizers = match mode {
        AuthorizationMode::DontAuthorize => return None,
        AuthorizationMode::Authorize(authorizers) => authorizers,
    };

    let fail = |tag: FailureTag, template: &TemplateId, location: Option<&Location>, required: BTreeSet<Party>| {
        Some(FailedAuthorization {
            tag,
            template: template.clone(),
            location: location.cloned(),
            authorizers: authorizers.clone(),
            required,
        })
    };

    match node {
        Node::Create(n) => {
            if !n.signatories.is_subset(authorizers) {
                return fail(FailureTag::CreateMissingAuth, &n.template, n.location.as_ref(), n.signatories.clone());
            }
            if n.signatories.is_empty() {
                return fail(FailureTag::NoSignatories, &n.template, n.location.as_ref(), n.signatories.clone());
            }
            if let Some(key) = &n.key {
                if !key.maintainers.is_subset(&n.signatories) {
                    return fail(
                        FailureTag::MaintainersNotSubsetOfSignatories,
                        &n.template,
                        n.location.as_ref(),
                        key.maintainers.clone(),
                    );
                }
            }
            None
        }
        Node::Exercise(n) => {
            if n.acting_parties.is_empty() {
                return fail(FailureTag::NoControllers, &n.template, n.location.as_ref(), n.acting_parties.clone());
            }
            if n.controllers_differ_from_actors {
                return fail(FailureTag::ActorMismatch, &n.template, n.location.as_ref(), n.acting_parties.clone());
            }
            if !n.acting_parties.is_subset(authorizers) {
                return fail(
                    FailureTag::ExerciseMissingAuth,
                    &n.template,
                    n.location.as_ref(),
                    n.acting_parties.clone(),
                );
            }
            None
        }
        Node::Fetch(n) => {
            if n.stakeholders.is_disjoint(authorizers) {
                return fail(
                    FailureTag::FetchMissingAuth,
                    &n.template,
                    n.location.as_ref(),
                    n.stakeholders.clone(),
                );
            }
            None
        }
        Node::LookupByKey(n) => {
            if !n.maintainers.is_subset(authorizers) {
                return fail(
                    FailureTag::LookupByKeyMissingAuth,
                    &n.template,
                    n.location.as_ref(),
                    n.maintainers.clone(),
                );
            }
            None
        }
    }
}
