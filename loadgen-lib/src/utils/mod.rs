pub mod env;
pub mod fmt;
pub mod telemetry;
