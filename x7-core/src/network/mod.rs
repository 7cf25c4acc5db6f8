pub mod probe;
pub mod transport;

pub use probe::probe;
pub use transport::{CameraEndpoint, Transport};
