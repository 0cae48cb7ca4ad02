//! Data model shared by the map server and any client that talks to it.

pub mod jobs;
pub mod model;
pub mod requests;
