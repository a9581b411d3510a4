use serde::Deserialize;

/// Shape of an inbound encoding request.
///
/// Missing fields deserialize to empty strings so that an incomplete
/// document fails validation rather than parsing.
#[derive(Debug, Default, Deserialize)]
pub struct VideoDraft {
    #[serde(default)]
    pub resource_id: String,
    #[serde(default)]
    pub file_path: String,
}
