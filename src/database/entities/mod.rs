pub mod events;
pub mod leads;
pub mod pipeline_jobs;
