//! Publish/subscribe topics (spec §4.4, §4.5).

mod publisher;
mod subscriber;

pub use publisher::Publisher;
pub use subscriber::{ReceivedMessage, Subscriber};
