// Scenario ledger: deterministic simulator for contract-based test scenarios
//
// SPDX-License-Identifier: Apache-2.0

//! Identifiers used throughout the ledger: step ids, local node ids, global
//! event ids, and the opaque identifiers supplied by callers (contract ids,
//! parties, template ids, choice names, global keys).
//!
//! Event ids follow the same construction the rest of this crate uses for
//! every identifier with a canonical textual form: a thin wrapper, a hand
//! written [`Display`] producing the wire form, and a [`FromStr`] which is
//! its exact inverse.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum textual length of an [`EventId`], per the wire format.
pub const EVENT_ID_MAX_LEN: usize = 255;

/// Monotonically increasing, non-negative step counter. Its textual form is
/// the unpadded decimal representation, guaranteed to be no more than eleven
/// characters (the counter is bounded by [`i32::MAX`]).
#[derive(Wrapper, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Default, From)]
#[wrapper(Deref)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct StepId(u32);

impl StepId {
    pub const FIRST: StepId = StepId(0);

    pub fn new(value: u32) -> Self {
        assert!(value <= i32::MAX as u32, "step id {value} exceeds the signed-32 maximum");
        StepId(value)
    }

    #[must_use]
    pub fn next(self) -> Self { Self::new(self.0 + 1) }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl FromStr for StepId {
    type Err = ParseStepIdError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 11 || (s != "0" && s.starts_with('0')) || !s.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(ParseStepIdError(s.to_string()));
        }
        let value = s.parse::<u32>().map_err(|_| ParseStepIdError(s.to_string()))?;
        if value > i32::MAX as u32 {
            return Err(ParseStepIdError(s.to_string()));
        }
        Ok(StepId(value))
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub struct ParseStepIdError(
    /// cannot parse step id '{0}'
    pub String,
);

/// Identifies a node within a single transaction tree, before that tree is
/// committed to the ledger.
#[derive(Wrapper, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Default, From)]
#[wrapper(Deref)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct NodeId(u32);

impl NodeId {
    pub fn new(value: u32) -> Self { NodeId(value) }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// A global, ledger-wide identifier for a node: the pair of the step at
/// which it was committed and its local node id within that step's
/// transaction.
///
/// Canonical textual form: `#<stepIdDecimal>:<localNodeIdDecimal>`, bounded
/// to [`EVENT_ID_MAX_LEN`] ASCII bytes. [`FromStr`] is the exact inverse of
/// [`Display`].
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventId {
    pub step_id: StepId,
    pub node_id: NodeId,
}

impl EventId {
    pub fn new(step_id: StepId, node_id: NodeId) -> Self { Self { step_id, node_id } }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.step_id, self.node_id)
    }
}

impl FromStr for EventId {
    type Err = ParseEventIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = || ParseEventIdError(s.to_string());

        if s.len() > EVENT_ID_MAX_LEN || !s.is_ascii() {
            return Err(fail());
        }
        let rest = s.strip_prefix('#').ok_or_else(fail)?;
        let (step, node) = rest.split_once(':').ok_or_else(fail)?;
        let step_id = step.parse::<StepId>().map_err(|_| fail())?;
        if node.is_empty() || (node != "0" && node.starts_with('0')) || !node.bytes().all(|b| b.is_ascii_digit()) {
            return Err(fail());
        }
        let node_id = node.parse::<u32>().map_err(|_| fail())?;
        Ok(EventId::new(step_id, NodeId::new(node_id)))
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub struct ParseEventIdError(
    /// cannot parse eventId {0}
    pub String,
);

/// Declares an opaque, caller-supplied string identifier: a thin wrapper
/// around [`String`] with the common set of derives every identifier in this
/// crate needs. Construction rejects the empty string, mirroring the
/// original ledger's `LedgerString` non-emptiness bound on party and
/// template identifiers.
macro_rules! opaque_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Wrapper, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display, From)]
        #[wrapper(Deref)]
        #[display(inner)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
        pub struct $name(String);

        impl $name {
            /// Constructs the identifier, rejecting an empty string.
            pub fn new(s: impl Into<String>) -> Result<Self, EmptyIdentifierError> {
                let s = s.into();
                if s.is_empty() {
                    return Err(EmptyIdentifierError(stringify!($name)));
                }
                Ok(Self(s))
            }
        }

        impl FromStr for $name {
            type Err = EmptyIdentifierError;
            fn from_str(s: &str) -> Result<Self, Self::Err> { Self::new(s) }
        }
    };
}

opaque_id!(ContractId, "An opaque identifier for a contract instance, supplied by the caller.");
opaque_id!(Party, "An opaque party identifier.");
opaque_id!(TemplateId, "An opaque template identifier.");
opaque_id!(ChoiceName, "The name of an exercised choice.");
opaque_id!(GlobalKey, "An opaque global contract-key identifier.");

#[derive(Clone, Copy, PartialEq, Eq, Debug, Display, Error)]
#[display(doc_comments)]
pub struct EmptyIdentifierError(
    /// {0} identifiers must not be empty
    pub &'static str,
);

/// An opaque source location attached by the caller to a node or a step, for
/// diagnostics only; the ledger never interprets its contents.
#[derive(Wrapper, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display, From)]
#[wrapper(Deref)]
#[display(inner)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct Location(pub String);
