//! Saved-state snapshots.
//!
//! A [`Snapshot`] is the key/value container an owner hands back after a
//! restart. It holds only a closed set of value shapes ([`ValueCategory`]):
//! - nested snapshots and shared records
//! - strings and character sequences
//! - the eight scalars
//! - boxed-slice arrays of records, strings, character sequences or scalars
//! - `Vec` lists of records or ints
//!
//! [`codec::put`] / [`codec::get`] pick the category from the declared type
//! and reject anything else with `UnsupportedValueType`.

pub mod codec;
mod value;

pub use value::{Record, RecordRef, Snapshot, SnapshotValue, ValueCategory};
