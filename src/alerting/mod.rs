//! Alerting: cooldown throttling and e-mail delivery.

pub mod notifier;
pub mod smtp;
pub mod throttle;

pub use notifier::{AlertMessage, MailTransport, NotifyError, Notifier, RetryPolicy, Sent};
pub use smtp::SmtpMailer;
pub use throttle::AlertThrottler;
