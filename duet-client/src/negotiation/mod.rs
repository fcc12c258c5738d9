mod negotiation_machine;
mod negotiation_state;
mod signal_sink;

pub use negotiation_machine::*;
pub use negotiation_state::*;
pub use signal_sink::*;
