use serde::{Deserialize, Serialize};

/// Status of a background map-generation job, polled by the upload page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    /// Geocoding progress, in percent.
    InProgress(u32),
    /// Id of the saved map.
    Completed(String),
    Failed(String),
}
