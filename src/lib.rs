//! Nimbus Reports: reference data for Nimbus reporting
//!
//! Loads and caches the lookup tables (users, locations, departments,
//! agreement types, schedules) and the location group hierarchy from the
//! Nimbus OData API, and resolves group selections into location sets for
//! report filtering.

pub mod cli;
pub mod core;
pub mod entities;
