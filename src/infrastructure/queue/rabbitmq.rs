use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties,
    message::Delivery as AmqpMessage,
    options::*,
    publisher_confirm::Confirmation,
    types::{AMQPValue, FieldTable},
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{Delivery, DeliveryHandle, Notifier};
use crate::config::settings::RabbitMqConfig;
use crate::error::{EncoderError, EncoderResult};

#[derive(Clone)]
pub struct RabbitMqService {
    config: RabbitMqConfig,
    // Kept alive for as long as the channel is in use.
    _conn: Arc<Connection>,
    channel: Channel,
}

impl RabbitMqService {
    async fn connect(url: &str) -> Result<(Connection, Channel)> {
        info!("Connecting to RabbitMQ");
        let conn = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(|e| anyhow!("Failed to connect to RabbitMQ: {}", e))?;

        let channel = conn
            .create_channel()
            .await
            .map_err(|e| anyhow!("Failed to create channel: {}", e))?;

        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(|e| anyhow!("Failed to enable publisher confirms: {}", e))?;

        info!("✅ Connected to RabbitMQ");
        Ok((conn, channel))
    }

    pub async fn new(config: &RabbitMqConfig) -> Result<Self> {
        let (conn, channel) = Self::connect(&config.dsn).await?;

        Ok(Self {
            config: config.clone(),
            _conn: Arc::new(conn),
            channel,
        })
    }

    /// Starts consuming the work queue and forwards every delivery into
    /// `sink`. The sink is dropped, closing the stream, when the broker
    /// consumer ends.
    pub async fn consume(
        &self,
        sink: async_channel::Sender<DeliveryHandle>,
        prefetch: u16,
    ) -> Result<JoinHandle<()>> {
        let queue_name = self.config.consumer_queue.as_str();

        let mut arguments = FieldTable::default();
        if let Some(dlx) = &self.config.dead_letter_exchange {
            arguments.insert(
                "x-dead-letter-exchange".into(),
                AMQPValue::LongString(dlx.as_str().into()),
            );
        }

        self.channel
            .queue_declare(
                queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                arguments,
            )
            .await
            .map_err(|e| anyhow!("Failed to declare queue: {}", e))?;

        self.channel
            .basic_qos(prefetch, BasicQosOptions::default())
            .await
            .map_err(|e| anyhow!("Failed to set prefetch: {}", e))?;

        let mut consumer = self
            .channel
            .basic_consume(
                queue_name,
                &self.config.consumer_name,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| anyhow!("Failed to create consumer: {}", e))?;

        info!("🎥 Encoder listening on '{}'", queue_name);

        Ok(tokio::spawn(async move {
            while let Some(delivery) = consumer.next().await {
                match delivery {
                    Ok(delivery) => {
                        let handle: DeliveryHandle = Box::new(AmqpDelivery::new(delivery));
                        if sink.send(handle).await.is_err() {
                            warn!("Delivery stream closed, stopping consumer");
                            break;
                        }
                    }
                    Err(e) => error!("Failed to receive delivery: {}", e),
                }
            }
            info!("RabbitMQ consumer finished");
        }))
    }

    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> Result<()> {
        let confirmation = self
            .channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_delivery_mode(2), // Persistent
            )
            .await
            .map_err(|e| anyhow!("Failed to publish message: {}", e))?
            .await
            .map_err(|e| anyhow!("Failed to confirm publication: {}", e))?;

        check_confirmation(confirmation)
    }
}

fn check_confirmation(confirmation: Confirmation) -> Result<()> {
    match confirmation {
        Confirmation::Ack(_) => Ok(()),
        Confirmation::Nack(_) => Err(anyhow!("Broker refused the publication")),
        Confirmation::NotRequested => Err(anyhow!("Publisher confirms are not enabled on the channel")),
    }
}

#[async_trait]
impl Notifier for RabbitMqService {
    async fn notify(&self, payload: &[u8]) -> EncoderResult<()> {
        self.publish(
            &self.config.notification_exchange,
            &self.config.notification_routing_key,
            payload,
        )
        .await
        .map_err(|e| EncoderError::Notify(e.to_string()))
    }
}

pub struct AmqpDelivery {
    message: AmqpMessage,
    message_id: Option<String>,
}

impl AmqpDelivery {
    pub fn new(message: AmqpMessage) -> Self {
        let message_id = message
            .properties
            .message_id()
            .as_ref()
            .map(|id| id.as_str().to_string());
        Self { message, message_id }
    }
}

#[async_trait]
impl Delivery for AmqpDelivery {
    fn body(&self) -> &[u8] {
        &self.message.data
    }

    fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    async fn ack(self: Box<Self>) -> EncoderResult<()> {
        self.message
            .ack(BasicAckOptions::default())
            .await
            .map(|_| ())
            .map_err(|e| EncoderError::Broker(format!("failed to ack message: {e}")))
    }

    async fn reject(self: Box<Self>) -> EncoderResult<()> {
        self.message
            .reject(BasicRejectOptions { requeue: false })
            .await
            .map(|_| ())
            .map_err(|e| EncoderError::Broker(format!("failed to reject message: {e}")))
    }
}
