//! HTTP route handlers.

pub mod health;
pub mod notifications;
pub mod users;

use murmur_core::storage::CREATED_AT;
use murmur_core::{QueryBuilder, QueryableHandle};
use murmur_proto::QueryRequest;

use crate::error::AppError;
use crate::json::ListResponse;
use crate::GatewayConfig;

/// Run the full list chain over `handle` with the gateway's limits.
///
/// `createdAtMin` / `createdAtMax` bound the creation time on every list.
pub(crate) async fn list_page<H: QueryableHandle>(
    handle: H,
    request: &QueryRequest,
    search_fields: &[&str],
    config: &GatewayConfig,
) -> Result<ListResponse, AppError> {
    let page = QueryBuilder::new(handle, request)
        .with_range_fields(&[CREATED_AT])
        .with_max_limit(config.max_limit)
        .allow_unbounded(config.allow_unbounded)
        .search(search_fields)
        .filter()?
        .sort()?
        .paginate()?
        .fields()?
        .build()
        .fetch()
        .await?;
    Ok(page.into())
}
