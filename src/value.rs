// Scenario ledger: deterministic simulator for contract-based test scenarios
//
// SPDX-License-Identifier: Apache-2.0

//! Component A: the value walker. A contract instance, a choice argument, or
//! a key is a [`Value`] tree; the walker enumerates every contract id
//! transitively reachable inside one, which drives divulgence accounting in
//! the enricher.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ids::ContractId;

/// A structured value as it would appear inside a contract instance, choice
/// argument, or key. The shape is closed and exhaustively matched by
/// [`contract_ids_in`]: adding a variant here without updating the walker
/// would silently under-report divulgence, so the match in that function
/// carries no wildcard arm.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub enum Value {
    /// A reference to a contract, the one leaf the walker collects.
    ContractId(ContractId),
    /// A record: an ordered, named-or-positional sequence of fields.
    Record(Vec<Value>),
    /// A tuple/struct of unnamed fields.
    Tuple(Vec<Value>),
    /// A variant: a constructor name plus its single payload.
    Variant(String, Box<Value>),
    /// An ordered list.
    List(Vec<Value>),
    /// An optional value.
    Optional(Option<Box<Value>>),
    /// A map keyed by text.
    TextMap(Vec<(String, Value)>),
    /// A general map: both the key and the value side may themselves nest
    /// contract ids.
    GenMap(Vec<(Value, Value)>),
    /// An enum constant (no payload).
    Enum(String),
    /// A numeric literal, kept in its textual form; the walker never
    /// interprets it.
    Numeric(String),
    /// Free text.
    Text(String),
    /// A date or timestamp, kept in its textual form.
    Date(String),
    /// The unit value.
    Unit,
}

/// Enumerates every [`ContractId`] transitively reachable inside `value`.
pub fn contract_ids_in(value: &Value) -> BTreeSet<ContractId> {
    let mut found = BTreeSet::new();
    walk(value, &mut found);
    found
}

fn walk(value: &Value, found: &mut BTreeSet<ContractId>) {
    match value {
        Value::ContractId(cid) => {
            found.insert(cid.clone());
        }
        Value::Record(fields) | Value::Tuple(fields) | Value::List(fields) => {
            for field in fields {
                walk(field, found);
            }
        }
        Value::Variant(_, inner) => walk(inner, found),
        Value::Optional(inner) => {
            if let Some(inner) = inner {
                walk(inner, found);
            }
        }
        Value::TextMap(entries) => {
            for (_, v) in entries {
                walk(v, found);
            }
        }
        Value::GenMap(entries) => {
            for (k, v) in entries {
                walk(k, found);
                walk(v, found);
            }
        }
        Value::Enum(_) | Value::Numeric(_) | Value::Text(_) | Value::Date(_) | Value::Unit => {}
    }
}
