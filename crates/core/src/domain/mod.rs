// Domain Layer - Job and Queue models

pub mod job;
pub mod queue;

pub use job::{Job, JobId};
pub use queue::{AdmitStatus, QueueId, QueueKeys, QueueOptions};
