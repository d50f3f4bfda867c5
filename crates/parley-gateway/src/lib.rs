//! Realtime channel manager: per-conversation live buffers, join
//! reference counts, the live connection loop and the send routes.

pub mod buffer;
pub mod connection;
pub mod error;
pub mod manager;
pub mod options;
pub mod transcript;

pub use buffer::Mark;
pub use error::{ConnectError, SendError};
pub use manager::{ChannelManager, ChatSubscription, CommandReceiver, WeakChannelManager};
pub use options::{GatewayOptions, SendRoute};
pub use transcript::merge_transcript;
