//! Table projection of a fetch state.

use super::breadcrumbs::{derive_breadcrumbs, listing_title, Breadcrumb};
use super::format::{format_last_modified, format_size};
use crate::listing::{ListingResult, Prefix};
use crate::query::FetchState;
use serde::Serialize;

const PLACEHOLDER: &str = "\u{2013}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Folder,
    File,
    Loading,
    Error,
}

/// One rendered table row. Folder rows link to their listing, file rows carry
/// the signed URL for both the name link and the download action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    pub kind: RowKind,
    pub name: String,
    pub link: Option<String>,
    pub last_modified: String,
    pub size: String,
    pub download_url: Option<String>,
}

impl TableRow {
    fn message(kind: RowKind, text: String) -> Self {
        TableRow {
            kind,
            name: text,
            link: None,
            last_modified: String::new(),
            size: String::new(),
            download_url: None,
        }
    }
}

/// Everything the explorer page shows for one prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingView {
    pub title: String,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub rows: Vec<TableRow>,
}

impl ListingView {
    pub fn build(prefix: &Prefix, bucket: &str, state: &FetchState) -> Self {
        let rows = match state {
            FetchState::Idle => Vec::new(),
            FetchState::Loading => vec![TableRow::message(
                RowKind::Loading,
                "Loading...".to_string(),
            )],
            FetchState::Error(message) => vec![TableRow::message(
                RowKind::Error,
                format!("Failed to fetch data: {}", message),
            )],
            FetchState::Success(listing) => listing_rows(listing),
        };

        ListingView {
            title: listing_title(prefix, bucket),
            breadcrumbs: derive_breadcrumbs(prefix),
            rows,
        }
    }

    pub fn is_error(&self) -> bool {
        self.rows.iter().any(|row| row.kind == RowKind::Error)
    }
}

/// Folder rows first, then object rows, each in listing order.
fn listing_rows(listing: &ListingResult) -> Vec<TableRow> {
    let folders = listing.folders.iter().map(|folder| TableRow {
        kind: RowKind::Folder,
        name: folder.name.clone(),
        link: Some(folder.navigation_url.clone()),
        last_modified: PLACEHOLDER.to_string(),
        size: PLACEHOLDER.to_string(),
        download_url: None,
    });

    let objects = listing.objects.iter().map(|object| TableRow {
        kind: RowKind::File,
        name: object.name.clone(),
        link: Some(object.download_url.url.clone()),
        last_modified: format_last_modified(object.last_modified),
        size: format_size(object.size),
        download_url: Some(object.download_url.url.clone()),
    });

    folders.chain(objects).collect()
}
