//! Command implementations

pub(crate) mod common;
pub mod ls;
pub mod migrate;
pub mod status;
