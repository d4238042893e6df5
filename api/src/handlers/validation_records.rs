use axum::{
    Json,
    extract::{Query, State},
};
use certkeeper_common::{
    params::PaginationParams,
    views::{PaginatedList, ValidationRecord},
};

use crate::{context::ApiContext, error::ApiError, handlers::paginate};

#[utoipa::path(
    get,
    path = "/api/v1/validation-records",
    tags = ["validation-records"],
    params(PaginationParams),
    responses((status = 200, description = "Validation records not yet removed", body = PaginatedList<ValidationRecord>))
)]
pub async fn list_validation_records(
    State(ctx): State<ApiContext>,
    Query(query): Query<PaginationParams>,
) -> Result<Json<PaginatedList<ValidationRecord>>, ApiError> {
    let records: Vec<ValidationRecord> = ctx
        .manager
        .list_validation_records()
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(paginate(records, &query, |r| r.id.clone())))
}
