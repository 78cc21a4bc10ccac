// Scenario ledger: deterministic simulator for contract-based test scenarios
//
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy. Most failures a caller can trigger legitimately (a
//! malformed identifier, a rejected commit) are ordinary `Result` values
//! defined next to the type that produces them ([`crate::ids`],
//! [`crate::ledger`]). This module holds only the crate-wide fatal path: an
//! invariant the ledger itself is supposed to maintain turning out false,
//! which is a bug in the ledger rather than something a caller did wrong.

use std::fmt::Display;

/// Panics with a message flagging that an internal ledger invariant has been
/// violated. Used at the handful of sites where a lookup is expected to
/// always succeed given the rest of the ledger's own bookkeeping — e.g. a
/// child event id recorded on a committed node failing to resolve in the
/// node table. A caller-triggerable condition must never route through
/// here; it belongs in a `Result`-returning error type instead.
#[track_caller]
pub fn ledger_crash(message: impl Display) -> ! {
    panic!("scenario ledger invariant violated: {message}");
}
