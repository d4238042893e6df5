use axum::extract::State;
use certkeeper_common::{params::PaginationParams, views::PaginatedList};
use certkeeper_db::storage::Storage;

use crate::{context::ApiContext, error::ApiError};

pub mod certificates;
pub mod validation_records;


#[utoipa::path(
    get,
    path = "/healthz",
    tags = ["health"],
    responses((status = 200, description = "Storage is reachable", body = String))
)]
pub async fn health_check(State(ctx): State<ApiContext>) -> Result<&'static str, ApiError> {
    Storage::ping(&**ctx.manager.storage()).await?;
    Ok("Healthy")
}

/// Cuts one page out of `items`. The page token is the key of the last item
/// handed out, so items must already be in a stable order.
fn paginate<T>(
    items: Vec<T>,
    params: &PaginationParams,
    key: impl Fn(&T) -> String,
) -> PaginatedList<T> {
    let start = match &params.next_token {
        Some(token) => items
            .iter()
            .position(|item| &key(item) == token)
            .map_or(items.len(), |i| i + 1),
        None => 0,
    };
    // A zero limit would hand out empty pages with no way forward.
    let requested = params.limit.filter(|&l| l > 0);
    let limit = requested.map_or(usize::MAX, |l| l as usize);

    let mut page: Vec<T> = items.into_iter().skip(start).collect();
    let next_token = if page.len() > limit {
        page.truncate(limit);
        page.last().map(&key)
    } else {
        None
    };

    PaginatedList {
        items: page,
        next_token,
        limit: requested,
    }
}
