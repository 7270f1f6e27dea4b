// Crate root for the soil telemetry server modules.

pub mod app;
pub mod broadcast;
pub mod config;
pub mod constants;
pub mod http;
pub mod pipeline;
pub mod stats;
pub mod store;
pub mod udp;
pub mod utils;
pub mod ws;
