//! Provision and tear down a Postgres database from paired migration sets.
//!
//! A root directory holds a `create/` set (templated scripts that create the
//! database) and a `schema/` set (the database's own migrations). See
//! [`database::Database`] for the build/destroy flow.

#![deny(missing_docs)]

pub mod config;
pub mod conn_string;
pub mod database;
pub mod dialect;
pub mod error;
pub mod migrate;
pub mod render;
pub mod scoped;

pub use database::{Collaborators, Database};
pub use error::{Error, Result};
