pub mod listing_collector;
pub mod listing_extractor;
pub mod page_renderer;

pub use listing_collector::*;
pub use listing_extractor::*;
pub use page_renderer::*;
