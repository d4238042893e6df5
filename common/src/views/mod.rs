//! Output views for the various functions within certkeeper.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

mod certificate;
pub use certificate::*;

mod validation_record;
pub use validation_record::*;

/// A page of records returned by one of the list endpoints.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PaginatedList<T> {
    pub items: Vec<T>,

    /// The next page token, if any. Pass it back as `next_token` to fetch the
    /// following page.
    pub next_token: Option<String>,

    /// The maximum number of results that were requested.
    pub limit: Option<u64>,
}

/// An error response for an API endpoint. This is used to return errors to the
/// client in a consistent format.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ApiErrorResponse {
    /// An optional error code that can be used to identify the type of error
    /// that occurred.
    pub code: Option<String>,

    /// A human-readable message describing the error that occurred.
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
