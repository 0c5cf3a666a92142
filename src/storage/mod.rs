pub mod artifact_store;
pub mod csv_store;

pub use artifact_store::*;
pub use csv_store::*;
