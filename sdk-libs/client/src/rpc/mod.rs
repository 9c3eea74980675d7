pub mod errors;
mod submitter;

pub use errors::SubmitError;
pub use submitter::{submit, Submitter};
