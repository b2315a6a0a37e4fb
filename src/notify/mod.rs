//! Notification fan-out
//!
//! A [`Dispatcher`] owns the configured channels and delivers each alert
//! transition to all of them, isolating failures per channel.

pub mod channels;
pub mod dispatcher;
pub mod error;
pub mod message;

pub use channels::Channel;
pub use dispatcher::{ChannelOutcome, DeliveryStatus, DispatchReport, Dispatcher, DispatcherError};
pub use error::ChannelError;
pub use message::{Message, MessageOptions};
