//! degov - proposal and vote store for a governance agent
//!
//! Records proposals, accepts one vote per voter per proposal, reports
//! tallies, and survives process replacement through sealed snapshots.
//!
//! Key principles:
//! - Ids are allocated in strictly increasing order and never reused
//! - A mutation is visible only after the backend has acknowledged it
//! - Snapshots carry a schema version and checksum; bad ones are refused

pub mod governance;
pub mod serialization;
pub mod storage;
