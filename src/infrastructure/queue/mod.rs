pub mod rabbitmq;

use async_trait::async_trait;

use crate::error::EncoderResult;

/// One inbound unit of work.
///
/// `ack` and `reject` take the handle by value, so a delivery can be settled
/// at most once; whoever holds the box is responsible for settling it.
#[async_trait]
pub trait Delivery: Send + Sync {
    fn body(&self) -> &[u8];

    fn message_id(&self) -> Option<&str>;

    async fn ack(self: Box<Self>) -> EncoderResult<()>;

    /// Rejects without requeue, routing the message to the dead-letter path.
    async fn reject(self: Box<Self>) -> EncoderResult<()>;
}

pub type DeliveryHandle = Box<dyn Delivery>;

/// Shared claim point for dispatch workers. Each handle is received by
/// exactly one worker.
pub type DeliveryStream = async_channel::Receiver<DeliveryHandle>;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, payload: &[u8]) -> EncoderResult<()>;
}
