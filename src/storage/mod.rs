pub mod filter;
pub mod folder_store;
pub mod routing;

pub use filter::ListingFilter;
pub use folder_store::{LocalFolderStore, ReportStore, StoredReport};
pub use routing::{FolderRouter, ReportKind};
