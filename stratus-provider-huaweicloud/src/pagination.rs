//! Offset pagination over list APIs

use crate::client::{ClientResult, Method, RequestOpts, ServiceClient};
use crate::response::path_search;

/// Default page size for list requests
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Fetch every page of a list API and concatenate the `items_key` arrays
///
/// Pages are requested with `limit` and `offset` query parameters, starting
/// at offset 0 and advancing by the number of items received. Listing stops
/// at the first empty page; a page shorter than `limit` does not end it.
/// `query` is added to every request.
pub async fn list_all(
    client: &ServiceClient,
    url: &str,
    items_key: &str,
    limit: usize,
    query: &[(String, String)],
) -> ClientResult<Vec<serde_json::Value>> {
    let limit = limit.max(1);
    let mut items = Vec::new();
    let mut offset = 0;

    loop {
        let mut opts = RequestOpts::new()
            .with_query("limit", limit)
            .with_query("offset", offset);
        opts.query.extend(query.iter().cloned());

        let body = client.request(Method::Get, url, opts).await?;
        let page: Vec<serde_json::Value> = path_search(items_key, &body)
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        if page.is_empty() {
            break;
        }
        log::debug!("{}: page at offset {} has {} item(s)", url, offset, page.len());
        offset += page.len();
        items.extend(page);
    }

    Ok(items)
}
