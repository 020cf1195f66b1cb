pub(crate) mod image_store;
pub(crate) mod job_store;
pub(crate) mod recognition;
