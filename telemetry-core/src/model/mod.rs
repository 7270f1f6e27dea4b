// Core data models for verified readings and the shared telemetry state.

mod reading;
mod state;
mod status;

pub use reading::{DecryptedReading, ReadingWidth};
pub use state::CountedState;
pub use status::MoistureStatus;
