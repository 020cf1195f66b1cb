pub(crate) mod aggregate;
pub(crate) mod associate;
pub(crate) mod context;
pub(crate) mod detect;
pub(crate) mod error;
pub(crate) mod normalize;
pub(crate) mod runner;
pub(crate) mod structure;
pub(crate) mod types;
