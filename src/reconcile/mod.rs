//! Reconciliation — cross-references the guest registry against the
//! external payment ledger.

pub mod ledger;
pub mod matcher;
pub mod normalize;

pub use ledger::{DisabledLedger, LedgerEntry, LedgerSource, SheetsLedger};
pub use matcher::{Matcher, MatchResult, ReconciliationReport};
pub use normalize::normalize;
