pub mod collector_config;
pub mod settings;

pub use collector_config::*;
pub use settings::*;
