//! View-layer boundary: pure helpers the explorer UI renders from.

mod breadcrumbs;
mod format;
mod navigation;
mod table;

pub use breadcrumbs::{derive_breadcrumbs, listing_title, Breadcrumb};
pub use format::{format_last_modified, format_size};
pub use navigation::{navigation_url, prefix_from_query, PREFIX_PARAM};
pub use table::{ListingView, RowKind, TableRow};
