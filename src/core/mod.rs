pub mod message;
pub mod snapshot;

pub use message::{ClassId, DecodedMessage, FieldValue, MessageField, MessageId, SenderId};
pub use snapshot::{now_ns, MessageSnapshot};
