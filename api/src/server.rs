use axum::{
    Router,
    extract::MatchedPath,
    http::{HeaderName, Request},
};
use certkeeper_common::views::ApiErrorResponse;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info_span;
use utoipa::{
    ToSchema,
    openapi::{Info, License, OpenApi, RefOr, path::Operation},
};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{context::ApiContext, handlers};

const REQUEST_ID_HEADER: &str = "x-request-id";

pub fn make(context: ApiContext) -> (Router, OpenApi) {
    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
                // Log the request ID as generated
                let request_id = req.headers().get(REQUEST_ID_HEADER);
                let span = info_span!(
                    "http_request",
                    method = req.method().to_string(),
                    request_id = Option::<&str>::None,
                    path = Option::<&str>::None,
                );

                if let Some(request_id) = request_id.and_then(|v| v.to_str().ok()) {
                    span.record("request_id", request_id);
                };

                if let Some(path) = req.extensions().get::<MatchedPath>() {
                    span.record("path", path.as_str())
                } else {
                    span.record("path", req.uri().path())
                };

                span
            }),
        )
        .layer(PropagateRequestIdLayer::new(x_request_id));

    let openapi = OpenApi::builder()
        .info(
            Info::builder()
                .title("certkeeper API Reference")
                .version(env!("CARGO_PKG_VERSION"))
                .license(Some(
                    License::builder()
                        .name("Apache 2.0 License")
                        .identifier(Some(env!("CARGO_PKG_LICENSE")))
                        .build(),
                )),
        )
        .build();

    let (r, mut a) = OpenApiRouter::with_openapi(openapi)
        .routes(routes!(handlers::health_check))
        .routes(routes!(
            handlers::certificates::list_certificates,
            handlers::certificates::apply_certificate
        ))
        .routes(routes!(
            handlers::certificates::get_certificate,
            handlers::certificates::rename_certificate,
            handlers::certificates::delete_certificate
        ))
        .routes(routes!(handlers::certificates::certificate_status))
        .routes(routes!(handlers::certificates::download_certificate))
        .routes(routes!(handlers::certificates::renew_certificate))
        .routes(routes!(handlers::certificates::provision_validation_record))
        .routes(routes!(handlers::validation_records::list_validation_records))
        .layer(middleware)
        .with_state(context)
        .split_for_parts();

    a.paths.paths.iter_mut().for_each(|(_path, item)| {
        apply_default_errors(&mut item.get);
        apply_default_errors(&mut item.post);
        apply_default_errors(&mut item.patch);
        apply_default_errors(&mut item.put);
        apply_default_errors(&mut item.delete);
    });

    (r, a)
}

/// Every operation can fail on storage or for lack of a CA.
fn apply_default_errors(item: &mut Option<Operation>) {
    if let Some(item) = item {
        for (status, summary) in [
            ("404", "Not found"),
            ("500", "Internal server error"),
            ("503", "Certificate authority not configured"),
        ] {
            item.responses.responses.entry(status.into()).or_insert_with(|| {
                RefOr::Ref(
                    utoipa::openapi::Ref::builder()
                        .summary(summary)
                        .ref_location_from_schema_name(ApiErrorResponse::name())
                        .build(),
                )
            });
        }
    }
}
