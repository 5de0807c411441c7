pub mod mock;
pub mod pattern;
pub mod traits;

pub use mock::{SimulatedBus, SimulatedSender};
pub use pattern::SubscriptionPattern;
pub use traits::{BindId, Delivery, Transport};
