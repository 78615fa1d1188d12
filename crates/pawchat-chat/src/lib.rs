pub mod conversation;
pub mod error;
pub mod poller;
pub mod remote;
pub mod session;
pub mod sync;
pub mod testing;

pub use conversation::ConversationManager;
pub use error::{ChatError, RemoteError};
pub use poller::Poller;
pub use remote::{ChatBackend, HttpChatBackend, RemoteAdmin, RemoteMessage, WireId};
pub use session::{ChatSession, Notice, SessionEvent};
pub use sync::{merge_remote, MessageSync, Timeline};
