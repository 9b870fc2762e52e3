pub mod compose;
pub mod view;

pub use compose::{Composer, Submit};
pub use view::{MessageEntry, MessageView, SyncState, Synchronizer};
