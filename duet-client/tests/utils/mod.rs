pub mod mock_signals;
pub mod mock_transport;
pub mod test_server;

pub use mock_media::*;
pub use mock_signals::*;
pub use mock_transport::*;
pub use test_server::*;
