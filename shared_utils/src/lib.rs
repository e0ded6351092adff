//! Small helpers shared across the workspace.

#![deny(missing_docs)]

pub mod env;
