//! S3 list operations

use crate::error::StorageResult;
use crate::providers::{ListPage, ListRequest, ListedObject};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::DateTime as SmithyDateTime;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use log::debug;

/// Fetch one page of a delimited listing.
pub(super) async fn list_page(client: &Client, request: &ListRequest) -> StorageResult<ListPage> {
    let mut call = client
        .list_objects_v2()
        .bucket(&request.bucket)
        .prefix(&request.prefix)
        .delimiter(&request.delimiter)
        .max_keys(request.max_keys);

    if let Some(token) = &request.continuation_token {
        call = call.continuation_token(token);
    }

    let response = call
        .send()
        .await
        .map_err(|e| DisplayErrorContext(e).to_string())?;

    let objects: Vec<ListedObject> = response
        .contents()
        .iter()
        .filter_map(|obj| {
            let key = obj.key()?.to_string();
            Some(ListedObject {
                key,
                size: obj.size().and_then(|s| u64::try_from(s).ok()).unwrap_or(0),
                last_modified: obj.last_modified().and_then(to_chrono),
            })
        })
        .collect();

    let common_prefixes: Vec<String> = response
        .common_prefixes()
        .iter()
        .filter_map(|prefix| prefix.prefix().map(|s| s.to_string()))
        .collect();

    debug!(
        "s3_list_page: bucket={} prefix={:?} objects={} prefixes={} truncated={}",
        request.bucket,
        request.prefix,
        objects.len(),
        common_prefixes.len(),
        response.is_truncated().unwrap_or(false)
    );

    Ok(ListPage {
        common_prefixes,
        objects,
        next_continuation_token: response.next_continuation_token().map(|s| s.to_string()),
        is_truncated: response.is_truncated().unwrap_or(false),
    })
}

fn to_chrono(dt: &SmithyDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}
