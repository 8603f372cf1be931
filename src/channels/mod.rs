//! Notification delivery.
//!
//! Subscribers are stored as bare ids, so each one is first tried as a group
//! and, if the transport says it is not a valid group, as an individual. A
//! failure for one recipient is logged and never stops delivery to the rest.

pub mod onebot;
pub mod traits;

use std::sync::Arc;

pub use onebot::OneBotTransport;
pub use traits::{DeliveryError, DeliveryTransport, TargetKind};

/// A successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub recipient: String,
    pub kind: TargetKind,
}

/// A recipient that could not be reached by either kind of send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDelivery {
    pub recipient: String,
    pub error: DeliveryError,
}

/// Per-recipient outcome of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: Vec<Delivery>,
    pub failed: Vec<FailedDelivery>,
}

impl DispatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fans one notification out to a list of recipients.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn DeliveryTransport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn DeliveryTransport>) -> Self {
        Self { transport }
    }

    /// Send `text` to every recipient, in order.
    pub async fn dispatch(
        &self,
        site_id: &str,
        text: &str,
        recipients: &[String],
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        for recipient in recipients {
            match self.deliver(recipient, text).await {
                Ok(kind) => {
                    tracing::debug!(
                        site = site_id,
                        recipient = %recipient,
                        %kind,
                        "notification sent"
                    );
                    report.delivered.push(Delivery {
                        recipient: recipient.clone(),
                        kind,
                    });
                }
                Err(error) => {
                    tracing::warn!(
                        site = site_id,
                        recipient = %recipient,
                        transport = self.transport.id(),
                        error = %error,
                        "notification not delivered"
                    );
                    report.failed.push(FailedDelivery {
                        recipient: recipient.clone(),
                        error,
                    });
                }
            }
        }

        tracing::info!(
            site = site_id,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "dispatch finished"
        );
        report
    }

    async fn deliver(&self, recipient: &str, text: &str) -> Result<TargetKind, DeliveryError> {
        match self.transport.send_group_message(recipient, text).await {
            Ok(()) => Ok(TargetKind::Group),
            Err(DeliveryError::InvalidTarget { .. }) => self
                .transport
                .send_individual_message(recipient, text)
                .await
                .map(|()| TargetKind::User),
            Err(e) => Err(e),
        }
    }
}
