use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A catalog entry as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Store-assigned identifier, never reused
    pub id: i64,
    pub title: String,
    pub author: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date_published: OffsetDateTime,
    /// Cover image location
    pub cover_image: String,
}

/// Validated content fields, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub date_published: OffsetDateTime,
    pub cover_image: String,
}

/// Request body for create and update.
///
/// Every field is optional on the wire so a missing value is reported as a
/// field violation by `validate` rather than as a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    pub title: Option<String>,
    pub author: Option<String>,
    /// RFC 3339 timestamp; offset-less timestamps and plain dates are read as UTC.
    pub date_published: Option<String>,
    pub cover_image: Option<String>,
}

/// Query parameters for the list endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListParams {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}
