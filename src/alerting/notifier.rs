//! Alert delivery with bounded retries
//!
//! The [`Notifier`] turns a [`CrowdingEvent`] into an [`AlertMessage`] and hands
//! it to a [`MailTransport`]. The transport classifies each failure when it
//! happens: authentication problems and malformed messages abort at once,
//! everything else is retried after a fixed delay until the attempt budget is
//! spent. Only a confirmed delivery advances the cooldown window.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{error, info, warn};

use super::throttle::AlertThrottler;
use crate::config::defaults::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_SECS};
use crate::types::CrowdingEvent;

/// Notification failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    /// Credentials were rejected. Never retried.
    #[error("authentication failed: {0}")]
    Auth(String),
    /// Connection, TLS or protocol failure worth another attempt.
    #[error("delivery attempt failed: {0}")]
    Transient(String),
    /// The message could not be built (bad mailbox, header). Never retried.
    #[error("invalid alert message: {0}")]
    InvalidMessage(String),
    /// Every attempt failed with a transient error.
    #[error("gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl NotifyError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// A ready-to-send alert e-mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
    pub sender: String,
    pub recipient: String,
}

impl AlertMessage {
    pub fn for_event(event: &CrowdingEvent, sender: &str, recipient: &str) -> Self {
        let subject = format!("Person Detected - Bus {}", event.bus_id);
        let body = format!(
            "Person Detection Alert!\n\
             \n\
             Bus ID: {}\n\
             Time: {} UTC\n\
             Number of People Detected: {}\n\
             Occupancy: {:.1}% of capacity\n",
            event.bus_id,
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.passenger_count,
            event.occupancy_rate * 100.0,
        );
        Self {
            subject,
            body,
            sender: sender.to_string(),
            recipient: recipient.to_string(),
        }
    }
}

/// Delivery channel for alert messages.
///
/// Implementations perform one complete delivery per call and report failures
/// as `Auth`, `InvalidMessage` or `Transient`.
#[async_trait]
pub trait MailTransport: Send {
    async fn deliver(&mut self, message: &AlertMessage) -> Result<(), NotifyError>;

    /// Human-readable name for logging.
    fn transport_name(&self) -> &str;
}

/// Attempt budget and spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included
    pub max_attempts: u32,
    /// Wait between two attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

/// Successful delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sent {
    pub attempts: u32,
}

/// Sends alerts and owns the cooldown state.
pub struct Notifier<T: MailTransport> {
    transport: T,
    throttler: AlertThrottler,
    policy: RetryPolicy,
    sender: String,
    recipient: String,
}

impl<T: MailTransport> Notifier<T> {
    pub fn new(
        transport: T,
        throttler: AlertThrottler,
        policy: RetryPolicy,
        sender: impl Into<String>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            throttler,
            policy,
            sender: sender.into(),
            recipient: recipient.into(),
        }
    }

    pub fn throttler(&self) -> &AlertThrottler {
        &self.throttler
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Deliver an alert for `event`, retrying transient failures.
    ///
    /// Does not consult the cooldown; callers check
    /// [`AlertThrottler::should_notify`] first. On success the cooldown
    /// window restarts at `now`.
    pub async fn send(
        &mut self,
        event: &CrowdingEvent,
        now: DateTime<Utc>,
    ) -> Result<Sent, NotifyError> {
        let message = AlertMessage::for_event(event, &self.sender, &self.recipient);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            info!(
                bus_id = %event.bus_id,
                "Sending alert via {} (attempt {}/{})",
                self.transport.transport_name(),
                attempt,
                max_attempts
            );

            match self.transport.deliver(&message).await {
                Ok(()) => {
                    self.throttler.record_success(now);
                    info!(
                        bus_id = %event.bus_id,
                        people = event.passenger_count,
                        "Alert sent"
                    );
                    return Ok(Sent { attempts: attempt });
                }
                Err(e) if !e.is_retryable() => {
                    error!(bus_id = %event.bus_id, error = %e, "Alert not sent, not retrying");
                    return Err(e);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Alert attempt {} failed", attempt);
                    last_error = e.to_string();
                    if attempt < max_attempts {
                        info!("Retrying in {}s...", self.policy.delay.as_secs_f64());
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }

        warn!(
            bus_id = %event.bus_id,
            "Max retries reached. Continuing without sending notification."
        );
        Err(NotifyError::Exhausted {
            attempts: max_attempts,
            last_error,
        })
    }
}
