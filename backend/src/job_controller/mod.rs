pub mod map_job;
pub mod state;
