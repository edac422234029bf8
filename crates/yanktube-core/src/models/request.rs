use super::{OperationKind, Quality};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;
use utoipa::IntoParams;
use validator::Validate;

const URL_REQUIRED: &str = "The url field is required.";
const URL_INVALID: &str = "The url field must be a valid URL.";

/// Raw query parameters shared by every relay route.
#[derive(Debug, Clone, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DownloadQuery {
    /// Link to the video or playlist
    #[validate(required, url)]
    pub url: Option<String>,
    /// One of 1080p, 720p, 480p, 360p, 240p, 144p (video operations only, default 720p)
    pub quality: Option<String>,
}

impl DownloadQuery {
    /// Trims both fields and treats blank values as absent.
    fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        Self {
            url: clean(self.url),
            quality: clean(self.quality),
        }
    }
}

/// Validation failures keyed by field name, each with one or more messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let messages = self.0.entry(field.into()).or_default();
        let message = message.into();
        if !messages.contains(&message) {
            messages.push(message);
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| rule_message(&field, &error.code));
                out.add(field.to_string(), message);
            }
        }
        out
    }
}

/// Message for a failed validation rule, by field and rule code.
fn rule_message(field: &str, code: &str) -> String {
    match (field, code) {
        ("url", "required") => URL_REQUIRED.to_string(),
        ("url", "url") => URL_INVALID.to_string(),
        _ => format!("The {} field is invalid.", field),
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(", "))?;
        }
        Ok(())
    }
}

/// Validated input of one relay operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    operation: OperationKind,
    resource_url: Url,
    quality: Option<Quality>,
}

impl DownloadRequest {
    /// Validates raw parameters for `operation`, collecting every violated field.
    ///
    /// Video operations default `quality` to 720p; other operations ignore it entirely.
    pub fn from_query(operation: OperationKind, query: DownloadQuery) -> Result<Self, FieldErrors> {
        let query = query.normalized();

        let mut errors = match query.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => FieldErrors::from(e),
        };

        let quality = if operation.uses_quality() {
            match query.quality.as_deref().map(str::parse::<Quality>) {
                None => Some(Quality::default()),
                Some(Ok(quality)) => Some(quality),
                Some(Err(e)) => {
                    errors.add("quality", e.to_string());
                    None
                }
            }
        } else {
            None
        };

        // A missing url was already reported by the `required` rule.
        let resource_url = match query.url.as_deref() {
            Some(raw) if !errors.contains("url") => parse_resource_url(raw, &mut errors),
            _ => None,
        };

        match resource_url {
            Some(resource_url) if errors.is_empty() => Ok(Self {
                operation,
                resource_url,
                quality,
            }),
            _ => Err(errors),
        }
    }

    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    pub fn resource_url(&self) -> &Url {
        &self.resource_url
    }

    /// Always `None` for operations that do not involve video.
    pub fn quality(&self) -> Option<Quality> {
        self.quality
    }
}

fn parse_resource_url(raw: &str, errors: &mut FieldErrors) -> Option<Url> {
    match Url::parse(raw) {
        Ok(url) if url.has_host() => Some(url),
        _ => {
            errors.add("url", URL_INVALID);
            None
        }
    }
}
