//! Loader for declarative constraint rule sets (YAML/TOML/JSON formats).
//!
//! This module parses rule set files into the strongly-typed `RuleSet`
//! structure. Every declaration field that a file leaves out gets the same
//! default the builders use.
//!
//! # Example
//!
//! ```rust
//! use constraints_parser::parse_yaml;
//!
//! let yaml = r#"
//! name: bookings
//! description: Booking request rules
//! rules:
//!   - kind: expression
//!     value: self.checkin < self.checkout
//!     node: [checkout]
//!   - kind: date_time
//!     field: created
//!     patterns: ["yyyy-MM-dd"]
//! "#;
//!
//! let rules = parse_yaml(yaml).expect("Failed to parse rule set");
//! assert_eq!(rules.name, "bookings");
//! assert_eq!(rules.rules.len(), 2);
//! ```

use constraints_core::RuleSet;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while loading a rule set.
#[derive(Debug, Error)]
pub enum ParserError {
    /// YAML parsing or deserialization failed
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),

    /// TOML parsing or deserialization failed
    #[error("Failed to parse TOML: {0}")]
    TomlError(String),

    /// JSON parsing or deserialization failed
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// File I/O error
    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Unsupported file format
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// Invalid file extension
    #[error("Invalid or missing file extension")]
    InvalidExtension,
}

/// Result type alias for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;

/// Supported rule set file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSetFormat {
    /// YAML format (.yml, .yaml)
    Yaml,
    /// TOML format (.toml)
    Toml,
    /// JSON format (.json)
    Json,
}

/// Parse a rule set from a YAML string.
///
/// # Example
///
/// ```rust
/// use constraints_parser::parse_yaml;
///
/// let yaml = r#"
/// name: empty
/// "#;
///
/// let rules = parse_yaml(yaml).unwrap();
/// assert!(rules.rules.is_empty());
/// ```
pub fn parse_yaml(content: &str) -> Result<RuleSet> {
    let rule_set: RuleSet = serde_yaml_ng::from_str(content)?;
    Ok(rule_set)
}

/// Parse a rule set from a TOML string.
///
/// Rules are written as an array of tables:
///
/// ```rust
/// use constraints_parser::parse_toml;
///
/// let toml = r#"
/// name = "bookings"
///
/// [[rules]]
/// kind = "query"
/// value = "SELECT 1 FROM rooms WHERE id = ?"
/// parameters = ["self.room_id"]
/// node = ["room_id"]
/// "#;
///
/// let rules = parse_toml(toml).unwrap();
/// assert_eq!(rules.rules[0].rule.kind(), "query");
/// ```
pub fn parse_toml(content: &str) -> Result<RuleSet> {
    let rule_set: RuleSet =
        toml::from_str(content).map_err(|e| ParserError::TomlError(e.to_string()))?;
    Ok(rule_set)
}

/// Parse a rule set from a JSON string.
pub fn parse_json(content: &str) -> Result<RuleSet> {
    let rule_set: RuleSet = serde_json::from_str(content)?;
    Ok(rule_set)
}

/// Detect the rule set format from a file path based on its extension.
///
/// # Supported Extensions
///
/// * `.yaml`, `.yml` → `RuleSetFormat::Yaml`
/// * `.toml` → `RuleSetFormat::Toml`
/// * `.json` → `RuleSetFormat::Json`
///
/// # Errors
///
/// Returns `ParserError::InvalidExtension` if the file has no extension.
/// Returns `ParserError::UnsupportedFormat` if the extension is not recognized.
pub fn detect_format(path: &Path) -> Result<RuleSetFormat> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or(ParserError::InvalidExtension)?;

    match extension.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(RuleSetFormat::Yaml),
        "toml" => Ok(RuleSetFormat::Toml),
        "json" => Ok(RuleSetFormat::Json),
        other => Err(ParserError::UnsupportedFormat(other.to_string())),
    }
}

/// Parse a rule set from a file with automatic format detection.
///
/// # Example
///
/// ```no_run
/// use constraints_parser::parse_file;
/// use std::path::Path;
///
/// let rules = parse_file(Path::new("rules/bookings.yml")).unwrap();
/// println!("Loaded {} rules from {}", rules.rules.len(), rules.name);
/// ```
pub fn parse_file(path: &Path) -> Result<RuleSet> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    let rule_set = match format {
        RuleSetFormat::Yaml => parse_yaml(&content),
        RuleSetFormat::Toml => parse_toml(&content),
        RuleSetFormat::Json => parse_json(&content),
    }?;

    debug!(
        path = %path.display(),
        format = ?format,
        rules = rule_set.rules.len(),
        "Loaded rule set '{}'",
        rule_set.name
    );
    Ok(rule_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use constraints_core::{
        DEFAULT_EXPRESSION_MESSAGE, DateTimeRuleBuilder, ExpressionRuleBuilder, ParserType,
        QueryRuleBuilder, ResolverStyle, RuleBinding, RuleDeclaration, RuleSetBuilder,
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_valid_yaml_minimal() {
        let yaml = r#"
name: minimal
"#;

        let rule_set = parse_yaml(yaml).expect("Failed to parse valid YAML");

        assert_eq!(rule_set.name, "minimal");
        assert_eq!(rule_set.description, None);
        assert!(rule_set.rules.is_empty());
    }

    #[test]
    fn test_parse_yaml_expression_rule() {
        let yaml = r#"
name: bookings
rules:
  - kind: expression
    value: max(self.adults, self.children) > 0
    when: self.adults != null
    target_name: booking
    node: [adults, count]
    message: "{value} failed"
    exceptional_value: false
    imports:
      statics: [core.math.Math.max]
"#;

        let rule_set = parse_yaml(yaml).expect("Failed to parse expression rule");
        let binding = &rule_set.rules[0];

        assert_eq!(binding.field, None);
        match &binding.rule {
            RuleDeclaration::Expression(rule) => {
                assert_eq!(rule.value, "max(self.adults, self.children) > 0");
                assert_eq!(rule.when, "self.adults != null");
                assert_eq!(rule.target_name, "booking");
                assert_eq!(rule.node, vec!["adults", "count"]);
                assert_eq!(rule.exceptional_value, Some(false));
                assert!(rule.imports.statics.contains("core.math.Math.max"));
                assert!(rule.imports.packages.is_empty());
            }
            other => panic!("expected expression rule, got {}", other.kind()),
        }
    }

    #[test]
    fn test_parse_yaml_date_time_rule_each() {
        let yaml = r#"
name: guests
rules:
  - kind: date_time
    field: birthdays
    each: true
    patterns: ["uuuu-MM-dd", "dd/MM/uuuu"]
    parser_type: structured
    resolver_style: strict
"#;

        let rule_set = parse_yaml(yaml).expect("Failed to parse date/time rule");
        let binding = &rule_set.rules[0];

        assert_eq!(binding.field.as_deref(), Some("birthdays"));
        assert!(binding.each);
        match &binding.rule {
            RuleDeclaration::DateTime(rule) => {
                assert_eq!(rule.patterns.len(), 2);
                assert_eq!(rule.parser_type, ParserType::Structured);
                assert_eq!(rule.resolver_style, ResolverStyle::Strict);
                assert!(!rule.lenient);
            }
            other => panic!("expected date/time rule, got {}", other.kind()),
        }
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let yaml = r#"
name: broken
rules: [
"#;

        let result = parse_yaml(yaml);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ParserError::YamlError(_)));
    }

    #[test]
    fn test_parse_yaml_unknown_kind() {
        let yaml = r#"
name: unknown
rules:
  - kind: regex
    value: ".*"
"#;

        assert!(parse_yaml(yaml).is_err());
    }

    #[test]
    fn test_parse_yaml_missing_required_fields() {
        let yaml = r#"
name: missing
rules:
  - kind: query
    parameters: [self.id]
"#;

        assert!(parse_yaml(yaml).is_err());
    }

    #[test]
    fn test_parse_toml_with_rules() {
        let toml = r#"
name = "inventory"
description = "Room inventory rules"

[[rules]]
kind = "query"
value = "SELECT 1 FROM rooms WHERE id = ? AND active"
parameters = ["self.room_id"]
data_source = "inventory"
node = ["room_id"]

[[rules]]
kind = "expression"
value = "self.nights >= 1"
"#;

        let rule_set = parse_toml(toml).expect("Failed to parse TOML");

        assert_eq!(rule_set.description.as_deref(), Some("Room inventory rules"));
        assert_eq!(rule_set.rules.len(), 2);
        match &rule_set.rules[0].rule {
            RuleDeclaration::Query(rule) => {
                assert_eq!(rule.parameters, vec!["self.room_id"]);
                assert_eq!(rule.data_source, "inventory");
                assert_eq!(rule.target_name, "self");
            }
            other => panic!("expected query rule, got {}", other.kind()),
        }
        match &rule_set.rules[1].rule {
            RuleDeclaration::Expression(rule) => {
                assert_eq!(rule.message, DEFAULT_EXPRESSION_MESSAGE);
            }
            other => panic!("expected expression rule, got {}", other.kind()),
        }
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = parse_toml("name = ");
        assert!(matches!(result.unwrap_err(), ParserError::TomlError(_)));
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "name": "json_rules",
            "rules": [
                {"kind": "date_time", "patterns": ["yyyy-MM-dd"], "lenient": true}
            ]
        }"#;

        let rule_set = parse_json(json).expect("Failed to parse JSON");
        match &rule_set.rules[0].rule {
            RuleDeclaration::DateTime(rule) => {
                assert!(rule.lenient);
                assert_eq!(rule.parser_type, ParserType::Legacy);
            }
            other => panic!("expected date/time rule, got {}", other.kind()),
        }
    }

    #[test]
    fn test_detect_format_yaml() {
        assert_eq!(detect_format(Path::new("rules.yaml")).unwrap(), RuleSetFormat::Yaml);
        assert_eq!(detect_format(Path::new("rules.YML")).unwrap(), RuleSetFormat::Yaml);
    }

    #[test]
    fn test_detect_format_toml_and_json() {
        assert_eq!(detect_format(Path::new("rules.toml")).unwrap(), RuleSetFormat::Toml);
        assert_eq!(detect_format(Path::new("rules.json")).unwrap(), RuleSetFormat::Json);
    }

    #[test]
    fn test_detect_format_unsupported() {
        let result = detect_format(Path::new("rules.xml"));
        assert!(matches!(
            result.unwrap_err(),
            ParserError::UnsupportedFormat(ext) if ext == "xml"
        ));
    }

    #[test]
    fn test_detect_format_no_extension() {
        let result = detect_format(Path::new("rules"));
        assert!(matches!(result.unwrap_err(), ParserError::InvalidExtension));
    }

    #[test]
    fn test_round_trip_yaml() {
        let original = RuleSetBuilder::new("round_trip")
            .description("Round trip")
            .rule(RuleBinding::target(
                ExpressionRuleBuilder::new("self.a < self.b")
                    .node("b")
                    .import_package("core.math")
                    .build(),
            ))
            .rule(RuleBinding::each(
                "dates",
                DateTimeRuleBuilder::new().pattern("yyyy-MM-dd").build(),
            ))
            .rule(RuleBinding::field(
                "room",
                QueryRuleBuilder::new("SELECT 1 FROM rooms WHERE id = ?")
                    .parameter("self")
                    .build(),
            ))
            .build();

        let yaml = serde_yaml_ng::to_string(&original).expect("Failed to serialize");
        let parsed = parse_yaml(&yaml).expect("Failed to parse");

        assert_eq!(parsed, original);
    }
}
