//! Command implementations

pub mod changes;
pub mod common;
pub mod extract;
pub mod refresh;
pub mod resume;
pub mod status;
