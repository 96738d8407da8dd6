pub mod channel;
pub mod config;
pub mod store;

pub use channel::{ChannelCommand, ChannelMessage, CommandChannel};
pub use store::{HuntStore, Treasure};
