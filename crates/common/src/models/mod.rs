//! Domain models shared across citewalk crates

pub mod job;
pub mod paper;

pub use job::{Job, JobStatus};
pub use paper::{AuthorRef, PaperObject, PaperRecord};
