use serde::Serialize;

use super::model::Job;
use crate::error::EncoderError;
use crate::infrastructure::queue::DeliveryHandle;

/// Terminal outcome of one dispatched delivery.
///
/// `job` is `None` when the delivery never made it far enough to create one.
/// The delivery handle travels with the result so that exactly one consumer
/// settles it.
pub struct JobResult {
    pub job: Option<Job>,
    pub delivery: DeliveryHandle,
    pub error: Option<EncoderError>,
}

impl JobResult {
    pub fn completed(job: Job, delivery: DeliveryHandle) -> Self {
        Self {
            job: Some(job),
            delivery,
            error: None,
        }
    }

    pub fn failed(job: Option<Job>, delivery: DeliveryHandle, error: EncoderError) -> Self {
        Self {
            job,
            delivery,
            error: Some(error),
        }
    }
}

/// Payload published when a delivery could not be turned into a finished job.
#[derive(Debug, Serialize)]
pub struct JobNotificationError {
    pub message: String,
    pub error: String,
}

impl JobNotificationError {
    pub fn new(body: &[u8], error: &EncoderError) -> Self {
        Self {
            message: String::from_utf8_lossy(body).into_owned(),
            error: error.to_string(),
        }
    }
}
