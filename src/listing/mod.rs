//! Listing module - prefix resolution into folders and signed objects
//!
//! - `prefix`: normalised navigation prefixes
//! - `exclude`: the configured exclusion pattern
//! - `gather`: ordered all-or-nothing join used for signing
//! - `resolve`: the resolver itself
//! - `types`: result types

mod exclude;
mod gather;
mod prefix;
mod resolve;
mod types;

pub use exclude::ExclusionFilter;
pub use gather::gather_all_or_fail;
pub use prefix::Prefix;
pub use resolve::ListingResolver;
pub use types::{FolderEntry, ListingResult, ObjectEntry, SignedUrl};
