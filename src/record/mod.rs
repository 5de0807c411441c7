pub mod errors;
pub mod events;
pub mod history;
pub mod index;
pub mod recorder;

pub use errors::{RecordError, RecordResult};
pub use events::{EventHub, RecorderEvent};
pub use history::{MessageHistory, DEFAULT_CAPACITY};
pub use index::{HistoryId, IdentityIndex, MessageIdentity};
pub use recorder::{Recorder, RecorderStatus, SenderState};
