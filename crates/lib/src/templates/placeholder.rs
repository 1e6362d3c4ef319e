//! Placeholder parsing and substitution for payload templates.
//!
//! Templates are plain text with `{{.Key}}` placeholders. Each key is looked
//! up in a JSON object of template data and replaced with its value.
//!
//! # Placeholder Format
//!
//! - `{{.Key}}` - the value of `Key` in the template data
//!
//! Whitespace inside the braces is ignored (`{{ .Key }}`). Strings are
//! inserted verbatim; numbers and booleans use their JSON spelling; arrays and
//! objects are inserted as compact JSON.
//!
//! # Escaping
//!
//! A single `{` passes through unchanged, so shell parameter expansions like
//! `${HOME}` need no escaping. Use `{{{{` to produce a literal `{{`.
//!
//! # Example
//!
//! ```
//! use appliance_lib::templates::placeholder::{parse, Segment};
//!
//! let segments = parse("registry={{.RegistryDomain}}").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("registry=".to_string()),
//!     Segment::Placeholder("RegistryDomain".to_string()),
//! ]);
//! ```

use serde_json::Value;
use thiserror::Error;

/// A segment of parsed template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no placeholders)
  Literal(String),

  /// A data key to be substituted
  Placeholder(String),
}

/// Errors that can occur during placeholder parsing or substitution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("malformed placeholder: {0}")]
  Malformed(String),

  #[error("unresolved key: {0}")]
  UnresolvedKey(String),
}

/// Parse a template into literal and placeholder segments.
///
/// # Errors
///
/// Returns an error if a placeholder is unclosed or is not of the `.Key` form.
pub fn parse(input: &str) -> Result<Vec<Segment>, PlaceholderError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut rest = input;
  let mut offset = 0;

  while let Some(start) = rest.find("{{") {
    literal.push_str(&rest[..start]);
    let after_open = &rest[start + 2..];

    // "{{{{" -> literal "{{"
    if let Some(tail) = after_open.strip_prefix("{{") {
      literal.push_str("{{");
      offset += start + 4;
      rest = tail;
      continue;
    }

    let Some(end) = after_open.find("}}") else {
      return Err(PlaceholderError::Unclosed(offset + start));
    };

    if !literal.is_empty() {
      segments.push(Segment::Literal(std::mem::take(&mut literal)));
    }
    segments.push(Segment::Placeholder(parse_placeholder_content(&after_open[..end])?));

    offset += start + 2 + end + 2;
    rest = &after_open[end + 2..];
  }

  literal.push_str(rest);
  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Parse the content between `{{` and `}}`.
fn parse_placeholder_content(content: &str) -> Result<String, PlaceholderError> {
  let key = content
    .trim()
    .strip_prefix('.')
    .ok_or_else(|| PlaceholderError::Malformed(format!("expected '.Key' in '{content}'")))?;

  if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
    return Err(PlaceholderError::Malformed(format!("invalid key in '{content}'")));
  }

  Ok(key.to_string())
}

/// Substitute all placeholders in `input` with values from `data`.
///
/// # Errors
///
/// Returns an error if parsing fails or a key is missing from `data`.
pub fn substitute(input: &str, data: &Value) -> Result<String, PlaceholderError> {
  let segments = parse(input)?;
  substitute_segments(&segments, data)
}

/// Substitute placeholders in pre-parsed segments.
pub fn substitute_segments(segments: &[Segment], data: &Value) -> Result<String, PlaceholderError> {
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Placeholder(key) => match data.get(key) {
        Some(Value::String(s)) => result.push_str(s),
        Some(Value::Null) => {}
        Some(other) => result.push_str(&other.to_string()),
        None => return Err(PlaceholderError::UnresolvedKey(key.clone())),
      },
    }
  }

  Ok(result)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn substitutes_strings_numbers_and_bools() {
    let data = json!({ "Domain": "registry.appliance.com", "Port": 5000, "IsBootstrapStep": true });
    let out = substitute("{{.Domain}}:{{ .Port }} bootstrap={{.IsBootstrapStep}}", &data).unwrap();
    assert_eq!(out, "registry.appliance.com:5000 bootstrap=true");
  }

  #[test]
  fn shell_expansions_pass_through() {
    let data = json!({ "Path": "/mnt/data" });
    let out = substitute("cp ${HOME}/x {{.Path}}; echo ${#ARR[@]}", &data).unwrap();
    assert_eq!(out, "cp ${HOME}/x /mnt/data; echo ${#ARR[@]}");
  }

  #[test]
  fn arrays_insert_as_json() {
    let data = json!({ "Images": [{ "url": "quay.io/x" }] });
    assert_eq!(substitute("{{.Images}}", &data).unwrap(), r#"[{"url":"quay.io/x"}]"#);
  }

  #[test]
  fn escaped_open_braces() {
    let data = json!({});
    assert_eq!(substitute("a {{{{ b", &data).unwrap(), "a {{ b");
  }

  #[test]
  fn no_placeholders_is_single_literal() {
    assert_eq!(parse("plain").unwrap(), vec![Segment::Literal("plain".to_string())]);
    assert!(parse("").unwrap().is_empty());
  }

  #[test]
  fn error_unclosed_placeholder() {
    let result = parse("abc {{.Key");
    assert!(matches!(result, Err(PlaceholderError::Unclosed(4))));
  }

  #[test]
  fn error_missing_dot() {
    let result = parse("{{Key}}");
    assert!(matches!(result, Err(PlaceholderError::Malformed(_))));
  }

  #[test]
  fn error_template_actions_unsupported() {
    let result = parse("{{if .IsBootstrapStep}}");
    assert!(matches!(result, Err(PlaceholderError::Malformed(_))));
  }

  #[test]
  fn error_unresolved_key() {
    let result = substitute("{{.Missing}}", &json!({ "Other": 1 }));
    assert_eq!(result, Err(PlaceholderError::UnresolvedKey("Missing".to_string())));
  }
}
