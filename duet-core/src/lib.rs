pub mod error;
pub mod model;
pub mod utils;

pub use error::RoomError;
pub use model::*;
