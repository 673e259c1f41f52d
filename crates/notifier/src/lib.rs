//! Alert delivery for the price alert service.
//!
//! Every alert is recorded in the local [`AlertLog`] and the service log.
//! When SMS credentials are configured it is also sent through Twilio; a
//! failed send degrades to the local record instead of failing the caller.

pub mod alert_log;
pub mod notifier;
pub mod twilio;

pub use alert_log::{AlertLog, AlertRecord};
pub use notifier::Notifier;
pub use twilio::TwilioTransport;
