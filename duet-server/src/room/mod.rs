mod code_generator;
mod room;
mod room_command;
mod room_config;
mod room_registry;
mod room_state;

pub use code_generator::*;
pub use room::*;
pub use room_command::*;
pub use room_config::*;
pub use room_registry::*;
pub use room_state::*;
