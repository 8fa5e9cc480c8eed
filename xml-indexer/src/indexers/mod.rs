//! Concrete item indexers.
//!
//! - [`FileSystemItemIndexer`]: indexes collections of XML files on local disk

mod filesystem;

pub use filesystem::{CollectionSource, FileSystemItemIndexer, PassSummary, COLLECTIONS_FILE};
