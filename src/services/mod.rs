pub(crate) mod attempt_status;
pub(crate) mod hybrid_locator;
pub(crate) mod monitor;
pub(crate) mod proctoring;
pub(crate) mod upload_pass;
