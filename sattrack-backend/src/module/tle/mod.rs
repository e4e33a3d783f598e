///! TLE catalog module
///!
///! Turns raw element text into a catalog that can be searched by catalog
///! number or international designator.
///!
///! ## Main Components
///! - `TleRecord`: validated element set with derived identifiers
///! - `TleCatalogBuilder`: tolerant parser producing a `TleCatalog`
///! - `TleCatalogManager`: owns the current snapshot, refreshes it from the network

// ============ Core Data Structures ============
mod record;
pub use record::{
    TleError, TleLine, TleRecord, checksum, is_valid_satellite_name, looks_like_tle_line,
    MAX_NAME_LENGTH, TLE_LINE_LENGTH,
};

mod catalog;
pub use catalog::{SearchKey, TleCatalog};

mod builder;
pub use builder::TleCatalogBuilder;

// ============ Data Source Management ============
mod fetcher;
pub use fetcher::{TleFetcher, validate_url};

mod cache;

// ============ Core Manager ============
mod manager;
pub use manager::{RefreshReport, TleCatalogManager};

#[cfg(test)]
pub(crate) use record::tests as fixtures;
