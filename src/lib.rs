// Scenario ledger: deterministic simulator for contract-based test scenarios
//
// SPDX-License-Identifier: Apache-2.0

//! An in-memory, deterministic ledger that simulates a multi-party,
//! contract-based system for running and validating test scenarios. A
//! scenario is a sequence of [`Ledger`] operations — committing transaction
//! trees, advancing the ledger clock, asserting that a commit attempt fails
//! — each of which produces a new, independent ledger value rather than
//! mutating shared state in place.

#![deny(
    dead_code,
    unused_variables,
    unused_mut,
    unused_imports,
    non_upper_case_globals,
    non_camel_case_types,
    non_snake_case
)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

#[macro_use]
extern crate amplify;

#[cfg(feature = "serde")]
#[macro_use]
extern crate serde;

mod authorize;
mod builder;
mod commit;
mod data;
mod enrich;
mod error;
mod ids;
mod ledger;
mod steps;
mod tx;
mod value;

pub use authorize::{AuthorizationMode, FailedAuthorization, FailureTag};
pub use builder::TxBuilder;
pub use commit::CommitError;
pub use data::{LedgerData, NodeInfo};
pub use enrich::{enrich, EnrichedTransaction};
pub use error::ledger_crash;
pub use ids::{
    ChoiceName, ContractId, EmptyIdentifierError, EventId, GlobalKey, Location, NodeId, ParseEventIdError,
    ParseStepIdError, Party, StepId, TemplateId, EVENT_ID_MAX_LEN,
};
pub use ledger::{
    commit_transaction, initial_ledger, insert_assert_must_fail, lookup_global_contract, pass_time, ptx_event_id,
    ActiveContract, Ledger, LookupResult, View,
};
pub use steps::LedgerStep;
pub use tx::{
    Create, Exercise, Fetch, KeyWithMaintainers, LookupByKey, Node, RichNode, RichTransaction, TransactionTree,
};
pub use value::{contract_ids_in, Value};
