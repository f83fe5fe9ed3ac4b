//! Error envelope parsing for failed API responses.
//!
//! The API reports failures as a JSON object with an optional `error` or
//! `message` field and an optional `errors` array of field-level issues:
//!
//! ```json
//! {"error": "Bad input", "errors": [{"loc": ["body", "title"], "msg": "required"}]}
//! ```

use serde_json::Value;

/// Maximum number of validation lines appended to an error message.
pub const MAX_VALIDATION_LINES: usize = 4;

/// Location prefixes that name the request part rather than a field.
const LOCATION_PREFIXES: [&str; 3] = ["body", "query", "path"];

/// A single field-level validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Path to the offending field, as reported by the server.
    pub loc: Vec<String>,
    /// Human-readable description.
    pub message: String,
}

impl ValidationIssue {
    /// Dotted field name with any leading `body`/`query`/`path` segment removed.
    pub fn field(&self) -> Option<String> {
        let mut segments = self.loc.as_slice();
        if let Some(first) = segments.first() {
            if segments.len() > 1 && LOCATION_PREFIXES.contains(&first.as_str()) {
                segments = &segments[1..];
            }
        }
        if segments.is_empty() {
            None
        } else {
            Some(segments.join("."))
        }
    }

    /// Formats the issue as `field: message`, or just `message` without a field.
    pub fn to_line(&self) -> String {
        match self.field() {
            Some(field) => format!("{field}: {}", self.message),
            None => self.message.clone(),
        }
    }
}

/// Extracts the `errors` array from a payload.
///
/// Entries may be plain strings or objects with `msg`/`message` and an
/// optional `loc` (array of strings or numbers, or a single string).
/// Entries without a message are skipped.
pub fn validation_issues(payload: &Value) -> Vec<ValidationIssue> {
    let Some(errors) = payload.get("errors").and_then(Value::as_array) else {
        return Vec::new();
    };

    errors.iter().filter_map(parse_issue).collect()
}

fn parse_issue(entry: &Value) -> Option<ValidationIssue> {
    if let Some(message) = entry.as_str() {
        return Some(ValidationIssue {
            loc: Vec::new(),
            message: message.to_string(),
        });
    }

    let message = non_empty_str(entry.get("msg")).or_else(|| non_empty_str(entry.get("message")))?;

    let loc = match entry.get("loc") {
        Some(Value::Array(parts)) => parts.iter().filter_map(segment).collect(),
        Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    };

    Some(ValidationIssue {
        loc,
        message: message.to_string(),
    })
}

fn segment(part: &Value) -> Option<String> {
    match part {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Builds the user-facing message for a failed response.
///
/// Uses the payload's `error` field, then `message`, then
/// `Request failed (<status>)`. Up to [`MAX_VALIDATION_LINES`] validation
/// lines are appended, one per line.
pub fn compose_error_message(status: u16, payload: Option<&Value>) -> String {
    let mut message = payload
        .and_then(|p| non_empty_str(p.get("error")).or_else(|| non_empty_str(p.get("message"))))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Request failed ({status})"));

    if let Some(payload) = payload {
        for issue in validation_issues(payload)
            .iter()
            .take(MAX_VALIDATION_LINES)
        {
            message.push('\n');
            message.push_str(&issue.to_line());
        }
    }

    message
}
