mod signaling_session;

pub use signaling_session::*;
