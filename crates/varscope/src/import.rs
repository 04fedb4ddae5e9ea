//! bulk import
//!
//! The import flow goes through three shapes:
//!
//! 1. a payload pasted or dropped by the user, parsed by [parse_import_payload] into ordered
//!    `key -> value` pairs. Either a flat JSON object or `.env` style `KEY=value` lines.
//! 2. flat form values the import table binds to, four fields per key (see [to_form_records]):
//!
//!    | field          | initial value   |
//!    |----------------|-----------------|
//!    | `{key}_key`    | key             |
//!    | `{key}_value`  | value           |
//!    | `{key}_scope`  | default scope   |
//!    | `{key}_secret` | `""` (not secret) |
//!
//! 3. the records submitted to the platform, produced by [format_for_submission] in the order of
//!    the keys passed in.
//!
//! A key whose fields are missing at submission time means the form and the key list went out of
//! sync. That is a bug in the caller and panics.
use crate::key_validation::{self, KeyIssue, KeyWarning};
use crate::scope::Scope;
use crate::variable::Variable;
use indexmap::IndexMap;
use serde::Serialize;

/// Flat form state, field name to raw value
pub type FormValues = IndexMap<String, String>;

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("Unable to parse JSON payload")]
    Json(#[from] serde_json::Error),
    #[error("JSON payload must be an object")]
    NotAnObject,
    #[error("Line {line} is not a KEY=value pair")]
    MissingSeparator { line: usize },
    #[error("Line {line} has an empty key")]
    EmptyKey { line: usize },
}

/// Parse a flat JSON object or `.env` lines into ordered key/value pairs
///
/// `.env` rules: one pair per line, blank lines and lines starting with `#` are skipped, the value
/// is everything after the first `=` (minus a trailing `\r`). Later duplicates replace the value of
/// earlier ones.
pub fn parse_import_payload(text: &str) -> Result<IndexMap<String, String>, ParseError> {
    if text.trim_start().starts_with('{') {
        return parse_json(text);
    }

    let mut parsed = IndexMap::new();
    for (index, line) in text.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            tracing::debug!(line = index + 1, "import line without separator");
            return Err(ParseError::MissingSeparator { line: index + 1 });
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(ParseError::EmptyKey { line: index + 1 });
        }

        parsed.insert(key.to_string(), value.to_string());
    }

    Ok(parsed)
}

fn parse_json(text: &str) -> Result<IndexMap<String, String>, ParseError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let serde_json::Value::Object(object) = value else {
        return Err(ParseError::NotAnObject);
    };

    Ok(object
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(value) => value,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

fn field(key: &str, suffix: &str) -> String {
    format!("{key}_{suffix}")
}

/// Expand parsed pairs into form values, every key at `default_scope` and not secret
pub fn to_form_records(parsed: &IndexMap<String, String>, default_scope: Scope) -> FormValues {
    let mut form = FormValues::with_capacity(parsed.len() * 4);
    for (key, value) in parsed {
        form.insert(field(key, "key"), key.clone());
        form.insert(field(key, "value"), value.clone());
        form.insert(field(key, "scope"), default_scope.as_str().to_string());
        form.insert(field(key, "secret"), String::new());
    }
    form
}

/// One variable of an import request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportVariable {
    pub name: String,
    pub value: String,
    pub scope: Scope,
    pub is_secret: bool,
}

fn required<'f>(form: &'f FormValues, key: &str, suffix: &str) -> &'f str {
    let name = field(key, suffix);
    form.get(&name)
        .map(String::as_str)
        .unwrap_or_else(|| panic!("import form has no field `{name}`"))
}

fn parse_secret(raw: &str) -> bool {
    match raw.trim() {
        "true" => true,
        "false" | "" => false,
        other => panic!("import form secret flag must be true or false, got `{other}`"),
    }
}

/// Read the form values of `keys` back into import records, in the order of `keys`
///
/// # Panic
/// Panics when a key lacks one of its four fields or holds an invalid scope/secret flag.
pub fn format_for_submission(form: &FormValues, keys: &[String]) -> Vec<ImportVariable> {
    keys.iter()
        .map(|key| ImportVariable {
            name: required(form, key, "key").trim().to_string(),
            value: required(form, key, "value").trim().to_string(),
            scope: required(form, key, "scope")
                .trim()
                .parse()
                .unwrap_or_else(|err| panic!("import form field `{key}_scope`: {err}")),
            is_secret: parse_secret(required(form, key, "secret")),
        })
        .collect()
}

/// Payload of the import mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRequest {
    /// Replace values of variables that already exist at the same scope
    pub overwrite: bool,
    pub vars: Vec<ImportVariable>,
}

impl ImportRequest {
    pub fn from_form(form: &FormValues, keys: &[String], overwrite: bool) -> Self {
        Self {
            overwrite,
            vars: format_for_submission(form, keys),
        }
    }
}

/// Set the scope of every row
pub fn change_scope_for_all(form: &mut FormValues, keys: &[String], scope: Scope) {
    for key in keys {
        form.insert(field(key, "scope"), scope.as_str().to_string());
    }
}

/// Set the secret flag of every row
pub fn set_secret_for_all(form: &mut FormValues, keys: &[String], is_secret: bool) {
    for key in keys {
        form.insert(field(key, "secret"), is_secret.to_string());
    }
}

/// Remove a row and its fields
pub fn delete_entry(form: &mut FormValues, keys: &mut Vec<String>, key: &str) {
    keys.retain(|existing| existing != key);
    for suffix in ["key", "value", "scope", "secret"] {
        form.shift_remove(&field(key, suffix));
    }
}

/// Validation state of one import row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowCheck {
    pub key: String,
    pub issue: Option<KeyIssue>,
    pub warning: Option<KeyWarning>,
}

impl RowCheck {
    pub fn is_valid(&self) -> bool {
        self.issue.is_none()
    }
}

/// Check the edited key of every row against the existing variables at the row's scope
pub fn check_rows(
    form: &FormValues,
    keys: &[String],
    existing: &[Variable],
    overwrite: bool,
    service_context: Option<Scope>,
) -> Vec<RowCheck> {
    keys.iter()
        .map(|key| {
            let name = form
                .get(&field(key, "key"))
                .map(|name| name.trim())
                .unwrap_or_default();
            let scope = form
                .get(&field(key, "scope"))
                .and_then(|scope| crate::scope::parse_lenient(scope));

            let issue =
                key_validation::check_key(name, existing, scope, service_context).err();
            let warning = issue.is_none().then(|| {
                key_validation::warning_for_key(name, existing, scope, overwrite, service_context)
            });

            RowCheck {
                key: key.clone(),
                issue,
                warning: warning.flatten(),
            }
        })
        .collect()
}
