use serde::Serialize;
use time::{
    format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime,
    PrimitiveDateTime, UtcOffset,
};

use bookshelf_kernel::settings::ValidationSettings;

use super::models::{BookInput, NewBook};

const COVER_SCHEMES: &[&str] = &["http", "https", "ftp"];

/// Constraints applied to submitted books before they reach the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub max_title_len: Option<usize>,
    pub max_author_len: Option<usize>,
    pub require_url_cover: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self::from(&ValidationSettings::default())
    }
}

impl From<&ValidationSettings> for ValidationPolicy {
    fn from(settings: &ValidationSettings) -> Self {
        Self {
            max_title_len: settings.max_title_len,
            max_author_len: settings.max_author_len,
            require_url_cover: settings.require_url_cover,
        }
    }
}

/// One violated constraint on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: &'static str,
    pub error: &'static str,
    pub message: String,
}

impl FieldViolation {
    fn required(field: &'static str) -> Self {
        Self {
            field,
            error: "required",
            message: format!("{field} is required"),
        }
    }
}

impl BookInput {
    /// Check every field against `policy`, collecting all violations.
    pub fn validate(&self, policy: &ValidationPolicy) -> Result<NewBook, Vec<FieldViolation>> {
        let mut violations = Vec::new();

        let title = required_text("title", &self.title, policy.max_title_len, &mut violations);
        let author = required_text("author", &self.author, policy.max_author_len, &mut violations);
        let date_published = match self.date_published.as_deref().map(str::trim) {
            None | Some("") => {
                violations.push(FieldViolation::required("datePublished"));
                None
            }
            Some(value) => {
                let parsed = parse_date(value);
                if parsed.is_none() {
                    violations.push(FieldViolation {
                        field: "datePublished",
                        error: "invalid_date",
                        message: "datePublished must be an RFC 3339 date-time".to_string(),
                    });
                }
                parsed
            }
        };

        let mut cover_image =
            required_text("coverImage", &self.cover_image, None, &mut violations);
        if policy.require_url_cover && cover_image.as_deref().is_some_and(|c| !is_cover_url(c)) {
            violations.push(FieldViolation {
                field: "coverImage",
                error: "invalid_url",
                message: "coverImage must be an absolute http, https or ftp URL".to_string(),
            });
            cover_image = None;
        }

        match (title, author, date_published, cover_image) {
            (Some(title), Some(author), Some(date_published), Some(cover_image))
                if violations.is_empty() =>
            {
                Ok(NewBook {
                    title,
                    author,
                    date_published,
                    cover_image,
                })
            }
            _ => Err(violations),
        }
    }
}

fn required_text(
    field: &'static str,
    value: &Option<String>,
    max_len: Option<usize>,
    violations: &mut Vec<FieldViolation>,
) -> Option<String> {
    let Some(value) = value.as_ref().filter(|v| !v.trim().is_empty()) else {
        violations.push(FieldViolation::required(field));
        return None;
    };

    if let Some(max) = max_len {
        let len = value.chars().count();
        if len > max {
            violations.push(FieldViolation {
                field,
                error: "max_length",
                message: format!("{field} must be at most {max} characters (got {len})"),
            });
            return None;
        }
    }

    Some(value.clone())
}

fn is_cover_url(value: &str) -> bool {
    match url::Url::parse(value) {
        Ok(url) => COVER_SCHEMES.contains(&url.scheme()) && url.has_host(),
        Err(_) => false,
    }
}

/// Accepts RFC 3339, an offset-less `YYYY-MM-DDTHH:MM:SS[.frac]` (UTC), or a
/// bare `YYYY-MM-DD` (midnight UTC). Results are normalised to UTC.
fn parse_date(value: &str) -> Option<OffsetDateTime> {
    if let Ok(date) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(date.to_offset(UtcOffset::UTC));
    }

    let local = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    if let Ok(date) = PrimitiveDateTime::parse(value, local) {
        return Some(date.assume_utc());
    }

    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}
