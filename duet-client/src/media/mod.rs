mod media_backend;
mod media_error;
mod recording;

pub use media_backend::*;
pub use media_error::*;
pub use recording::*;
