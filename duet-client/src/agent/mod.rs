mod call_agent;
mod call_command;

pub use call_agent::*;
pub use call_command::*;
