mod handler;
pub mod messages;

pub use handler::ws_handler;
pub use messages::{msg_types, ClientMessage, ServerMessage};
