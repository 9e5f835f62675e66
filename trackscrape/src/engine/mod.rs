pub mod catalog;
pub mod classify;
pub mod error;
pub mod expand;
pub mod metadata;
pub mod normalize;
pub mod orchestrator;
pub mod page;
pub mod resolver;
pub mod rows;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use catalog::SelectorCatalog;
pub use expand::ExpandOptions;
pub use orchestrator::{ExtractOptions, Extractor};
pub use page::PageSource;
pub use types::{ArtistId, ExtractionResult};
