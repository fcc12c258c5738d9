mod agent;
mod call;
mod error;
mod media;
mod negotiation;
mod session;
mod transport;

pub use agent::*;
pub use call::*;
pub use error::*;
pub use media::*;
pub use negotiation::*;
pub use session::*;
pub use transport::*;
