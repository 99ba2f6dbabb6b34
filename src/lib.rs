//! Poll-and-voting consistency engine.
//!
//! Maintains poll documents (embedded options, denormalized counters)
//! consistent with per-(user, poll) action records and comments under
//! concurrent access, using multi-document transactions against MongoDB.
//! Authentication, profile CRUD and the HTTP surface live outside this
//! crate and talk to it through [`state::AppContext`], the service structs
//! and the [`utils::profile::ProfileLookup`] collaborator.

pub mod db;
pub mod models;
pub mod repositories;
pub mod services;
pub mod state;
pub mod utils;
