use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ServiceError;

/// Feedback attached to rejections that arrive without a usable reason.
pub const GENERIC_FEEDBACK: &str =
    "The review could not be completed. Re-check the output against every rubric criterion, fix any gaps, and resubmit.";

/// Outcome of one critique.
///
/// A rejection always carries at least one feedback line; the constructors
/// enforce it so the next attempt has something to act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "VerdictWire")]
pub struct Verdict {
    approved: bool,
    feedback: Vec<String>,
}

impl Verdict {
    pub fn approve() -> Self {
        Self {
            approved: true,
            feedback: Vec::new(),
        }
    }

    /// Approval with optional non-blocking remarks.
    pub fn approve_with<I, S>(notes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            approved: true,
            feedback: clean(notes),
        }
    }

    pub fn reject<I, S>(feedback: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut feedback = clean(feedback);
        if feedback.is_empty() {
            feedback.push(GENERIC_FEEDBACK.to_string());
        }
        Self {
            approved: false,
            feedback,
        }
    }

    /// Rejection used when the critique response could not be interpreted.
    pub fn malformed() -> Self {
        Self::reject([GENERIC_FEEDBACK])
    }

    pub fn approved(&self) -> bool {
        self.approved
    }

    pub fn feedback(&self) -> &[String] {
        &self.feedback
    }
}

/// Deserialized shape, routed through the constructors.
#[derive(Deserialize)]
struct VerdictWire {
    #[serde(default)]
    approved: bool,
    #[serde(default)]
    feedback: Vec<String>,
}

impl From<VerdictWire> for Verdict {
    fn from(wire: VerdictWire) -> Self {
        if wire.approved {
            Verdict::approve_with(wire.feedback)
        } else {
            Verdict::reject(wire.feedback)
        }
    }
}

fn clean<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items
        .into_iter()
        .map(Into::into)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Parse a manager response into a [`Verdict`].
///
/// Accepts `{"approved", "critique", "revision_instructions"}` as well as
/// `{"approved", "feedback": [..]}`, optionally wrapped in a markdown code
/// fence. A missing `approved` field counts as a rejection.
pub fn parse_verdict(raw: &str) -> Result<Verdict, ServiceError> {
    let body = strip_code_fence(raw.trim());
    if body.is_empty() {
        return Err(ServiceError::malformed("empty critique response"));
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| ServiceError::malformed(format!("critique is not valid JSON: {e}")))?;
    let Some(obj) = value.as_object() else {
        return Err(ServiceError::malformed("critique JSON is not an object"));
    };

    let approved = match obj.get("approved") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => false,
        Some(other) => {
            return Err(ServiceError::malformed(format!(
                "unexpected 'approved' value: {other}"
            )))
        }
    };

    let mut feedback = Vec::new();
    match obj.get("feedback") {
        Some(Value::Array(items)) => {
            feedback.extend(items.iter().filter_map(|v| v.as_str().map(str::to_string)))
        }
        Some(Value::String(s)) => feedback.push(s.clone()),
        _ => {}
    }
    for key in ["critique", "revision_instructions"] {
        if let Some(s) = obj.get(key).and_then(Value::as_str) {
            feedback.push(s.to_string());
        }
    }

    if approved {
        Ok(Verdict::approve_with(feedback))
    } else {
        Ok(Verdict::reject(feedback))
    }
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Drop an optional language tag on the opening fence.
    let rest = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
