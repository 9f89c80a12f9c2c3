use serde_json::Value;

use crate::waitlist::{dto::JoinRequest, repo_types::NewEntry};

pub const MISSING_FIELDS: &str = "Name and email are required";

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Reads an optional signup flag. Absent, null or unrecognised values are false.
fn flag(value: Option<Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true") || s == "1",
        _ => false,
    }
}

/// Turns a join request into an insertable entry, or `None` when name or
/// email is absent or empty.
pub fn validate_signup(req: JoinRequest) -> Option<NewEntry> {
    let name = present(req.name)?;
    let email = present(req.email)?;
    Some(NewEntry {
        name,
        email,
        phone: req.phone.unwrap_or_default(),
        beta_tester: flag(req.beta_tester),
        ambassador: flag(req.ambassador),
    })
}
