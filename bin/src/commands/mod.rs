//! CLI command implementations.

pub(crate) mod fetch;
pub(crate) mod locate;
