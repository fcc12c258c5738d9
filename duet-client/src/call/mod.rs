mod call_controller;
mod duration;

pub use call_controller::*;
pub use duration::*;
