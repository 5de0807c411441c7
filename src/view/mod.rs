//! View model of the recorded messages: a sender / class / message / field
//! tree with display values, liveness colours, pins and row filtering.

pub mod errors;
pub mod filter;
pub mod format;
pub mod liveness;
pub mod pinned;
pub mod pins;
pub mod tree;

pub use errors::ViewError;
pub use filter::RowFilter;
pub use liveness::{Liveness, Rgb, DEFAULT_EXTINCTION_SECS};
pub use pinned::{PinnedRow, PinnedRows};
pub use pins::{PinKey, PinSet, PinState};
pub use tree::{ClassNode, FieldNode, MessageNode, MessageTree, SenderNode, ViewNode};
