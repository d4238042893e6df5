use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use certkeeper_common::{
    params::{
        ApplyCertificateParams, PaginationParams, ProvisionValidationRecordParams,
        RenameCertificateParams,
    },
    views::{
        ApiErrorResponse, ApplyCertificateResponse, Certificate, CertificateStatusReport, PaginatedList,
        RenewCertificateResponse, ValidationRecord,
    },
};
use tracing::info;

use crate::{context::ApiContext, error::ApiError, handlers::paginate};

#[utoipa::path(
    get,
    path = "/api/v1/certificates",
    tags = ["certificates"],
    params(PaginationParams),
    responses((status = 200, description = "Tracked certificates", body = PaginatedList<Certificate>))
)]
pub async fn list_certificates(
    State(ctx): State<ApiContext>,
    Query(query): Query<PaginationParams>,
) -> Result<Json<PaginatedList<Certificate>>, ApiError> {
    let certs: Vec<Certificate> = ctx
        .manager
        .list()
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Json(paginate(certs, &query, |c| c.id.clone())))
}

#[utoipa::path(
    post,
    path = "/api/v1/certificates",
    tags = ["certificates"],
    request_body = ApplyCertificateParams,
    responses(
        (status = 201, description = "Certificate requested", body = ApplyCertificateResponse),
        (status = 502, description = "The CA rejected the request", body = ApiErrorResponse),
    )
)]
pub async fn apply_certificate(
    State(ctx): State<ApiContext>,
    Json(params): Json<ApplyCertificateParams>,
) -> Result<(StatusCode, Json<ApplyCertificateResponse>), ApiError> {
    let applied = ctx
        .manager
        .apply(
            &params.domain,
            params.validate_type,
            params.cert_alias.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(applied)))
}

#[utoipa::path(
    get,
    path = "/api/v1/certificates/{id}",
    tags = ["certificates"],
    params(("id" = String, Path, description = "Certificate id")),
    responses((status = 200, description = "The certificate", body = Certificate))
)]
pub async fn get_certificate(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Certificate>, ApiError> {
    Ok(Json(ctx.manager.get(&id).await?.into()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/certificates/{id}",
    tags = ["certificates"],
    params(("id" = String, Path, description = "Certificate id")),
    request_body = RenameCertificateParams,
    responses((status = 200, description = "Renamed certificate", body = Certificate))
)]
pub async fn rename_certificate(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(params): Json<RenameCertificateParams>,
) -> Result<Json<Certificate>, ApiError> {
    Ok(Json(ctx.manager.rename(&id, &params.name).await?.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/certificates/{id}",
    tags = ["certificates"],
    params(("id" = String, Path, description = "Certificate id")),
    responses(
        (status = 204, description = "Certificate deleted"),
        (status = 409, description = "Still served by a proxy rule", body = ApiErrorResponse),
    )
)]
pub async fn delete_certificate(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ctx.manager.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Polls the CA. When the poll completed a renewal that repointed proxy
/// rules, nginx is reloaded before answering.
#[utoipa::path(
    get,
    path = "/api/v1/certificates/{id}/status",
    tags = ["certificates"],
    params(("id" = String, Path, description = "Certificate id")),
    responses((status = 200, description = "Current CA status", body = CertificateStatusReport))
)]
pub async fn certificate_status(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<CertificateStatusReport>, ApiError> {
    let report = ctx.manager.check_status(&id).await?;

    if report.reloaded {
        info!(certificate_id = %id, "proxy rules repointed, reloading");
        ctx.reload_proxy().await;
    }

    Ok(Json(report))
}

#[utoipa::path(
    post,
    path = "/api/v1/certificates/{id}/download",
    tags = ["certificates"],
    params(("id" = String, Path, description = "Certificate id")),
    responses((status = 200, description = "Files written", body = Certificate))
)]
pub async fn download_certificate(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Certificate>, ApiError> {
    Ok(Json(ctx.manager.download(&id).await?.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/certificates/{id}/renew",
    tags = ["certificates"],
    params(("id" = String, Path, description = "Certificate id")),
    responses(
        (status = 200, description = "Renewal requested", body = RenewCertificateResponse),
        (status = 409, description = "A renewal is already in flight", body = ApiErrorResponse),
    )
)]
pub async fn renew_certificate(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<RenewCertificateResponse>, ApiError> {
    Ok(Json(ctx.manager.renew(&id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/certificates/{id}/validation-records",
    tags = ["certificates", "validation-records"],
    params(("id" = String, Path, description = "Certificate id")),
    request_body = ProvisionValidationRecordParams,
    responses((status = 201, description = "Record published and tracked", body = ValidationRecord))
)]
pub async fn provision_validation_record(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(params): Json<ProvisionValidationRecordParams>,
) -> Result<(StatusCode, Json<ValidationRecord>), ApiError> {
    let record = ctx
        .manager
        .provision_validation_record(&id, params.dns_provider)
        .await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}
