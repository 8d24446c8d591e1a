//! Defect tracking for construction projects.
//!
//! The library is the query and access-control engine: role-scoped
//! visibility, filter compilation, sorting, pagination and dashboard
//! statistics, evaluated against a [`store::DefectStore`]. [`db::Database`]
//! is the SQLite implementation used by the `defectline` CLI.

pub mod db;
pub mod engine;
pub mod error;
pub mod filter;
pub mod models;
pub mod paginate;
pub mod policy;
pub mod sort;
pub mod stats;
pub mod store;

pub use engine::{check_visibility, get_statistics, list_defects, ListQuery};
pub use error::{CoreError, Result};
pub use policy::Actor;
