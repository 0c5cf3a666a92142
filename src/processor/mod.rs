pub mod feature_engineering;
pub mod rule_normalizer;
pub mod stats;

pub use feature_engineering::*;
pub use rule_normalizer::*;
