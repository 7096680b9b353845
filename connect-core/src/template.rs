//! Document templates with `{{name}}` placeholders.
//!
//! Rendering is a literal, global text replacement per declared variable:
//! no expressions, conditionals, loops or escaping. Placeholders that no
//! variable declares are left untouched. Rendering never enforces `required`
//! or validation rules; [`DocumentTemplate::validate`] exists so callers can
//! check input first.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{DocumentCategory, DocumentType};

wire_enum! {
    /// Input kind of a template variable.
    pub enum VariableKind {
        Text => "text",
        Number => "number",
        Date => "date",
        Email => "email",
        Select => "select",
        Boolean => "boolean",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateVariable {
    pub name: String,
    pub label: String,
    pub kind: VariableKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRule>,
}

impl TemplateVariable {
    pub fn new(name: impl Into<String>, kind: VariableKind) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            kind,
            required: false,
            default_value: None,
            options: Vec::new(),
            validation: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn validation(mut self, rule: ValidationRule) -> Self {
        self.validation = Some(rule);
        self
    }
}

/// A single failed check from [`DocumentTemplate::validate`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VariableViolation {
    #[error("{0} is required")]
    Missing(String),
    #[error("{name} must be at least {min} characters")]
    TooShort { name: String, min: usize },
    #[error("{name} must be at most {max} characters")]
    TooLong { name: String, max: usize },
    #[error("{0} must be a number")]
    NotANumber(String),
    #[error("{name} must be >= {min}")]
    BelowMinimum { name: String, min: f64 },
    #[error("{name} must be <= {max}")]
    AboveMaximum { name: String, max: f64 },
    #[error("{name} must be one of {options:?}")]
    NotAnOption { name: String, options: Vec<String> },
    #[error("{name} does not match {pattern}")]
    PatternMismatch { name: String, pattern: String },
    #[error("{name} has an invalid pattern: {reason}")]
    InvalidPattern { name: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub category: DocumentCategory,
    pub template_content: String,
    #[serde(default)]
    pub variables: Vec<TemplateVariable>,
    /// Name of the workflow template cloned onto generated documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    #[serde(default)]
    pub usage_count: u64,
}

impl DocumentTemplate {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        doc_type: DocumentType,
        category: DocumentCategory,
        template_content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            doc_type,
            category,
            template_content: template_content.into(),
            variables: Vec::new(),
            workflow_name: None,
            tags: Vec::new(),
            version: "1.0".to_string(),
            created_at: Utc::now(),
            created_by: "system".to_string(),
            usage_count: 0,
        }
    }

    pub fn with_variable(mut self, variable: TemplateVariable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn with_workflow(mut self, workflow_name: impl Into<String>) -> Self {
        self.workflow_name = Some(workflow_name.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Value used for `variable`: supplied, else default, else empty.
    fn resolve<'a>(variable: &'a TemplateVariable, values: &'a BTreeMap<String, String>) -> &'a str {
        values
            .get(&variable.name)
            .map(String::as_str)
            .or(variable.default_value.as_deref())
            .unwrap_or("")
    }

    /// Expand every declared placeholder in one left-to-right pass.
    ///
    /// Substituted values are copied verbatim and never rescanned, so a value
    /// containing `{{other}}` stays literal. Undeclared placeholders are kept.
    pub fn render(&self, values: &BTreeMap<String, String>) -> String {
        let mut out = String::with_capacity(self.template_content.len());
        let mut rest = self.template_content.as_str();
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let inner = &rest[start + 2..];
            let declared = inner
                .find("}}")
                .and_then(|end| self.variable(&inner[..end]).map(|v| (v, end)));
            match declared {
                Some((variable, end)) => {
                    out.push_str(Self::resolve(variable, values));
                    rest = &inner[end + 2..];
                }
                None => {
                    // Not a placeholder here; retry from the next brace.
                    out.push('{');
                    rest = &rest[start + 1..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn variable(&self, name: &str) -> Option<&TemplateVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Values after default fallback, keyed by variable name.
    pub fn resolved_values(&self, values: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        self.variables
            .iter()
            .map(|v| (v.name.clone(), Self::resolve(v, values).to_string()))
            .collect()
    }

    /// Check supplied values against `required`, options and validation rules.
    pub fn validate(&self, values: &BTreeMap<String, String>) -> Result<(), Vec<VariableViolation>> {
        let mut violations = Vec::new();
        for variable in &self.variables {
            let value = Self::resolve(variable, values);
            if value.is_empty() {
                if variable.required {
                    violations.push(VariableViolation::Missing(variable.name.clone()));
                }
                continue;
            }
            check_variable(variable, value, &mut violations);
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

fn check_variable(variable: &TemplateVariable, value: &str, violations: &mut Vec<VariableViolation>) {
    let name = &variable.name;
    if variable.kind == VariableKind::Select
        && !variable.options.is_empty()
        && !variable.options.iter().any(|o| o == value)
    {
        violations.push(VariableViolation::NotAnOption {
            name: name.clone(),
            options: variable.options.clone(),
        });
    }

    let numeric = if variable.kind == VariableKind::Number {
        match value.trim().parse::<f64>() {
            Ok(n) => Some(n),
            Err(_) => {
                violations.push(VariableViolation::NotANumber(name.clone()));
                None
            }
        }
    } else {
        None
    };

    let Some(rule) = &variable.validation else {
        return;
    };
    let length = value.chars().count();
    if let Some(min) = rule.min_length.filter(|min| length < *min) {
        violations.push(VariableViolation::TooShort { name: name.clone(), min });
    }
    if let Some(max) = rule.max_length.filter(|max| length > *max) {
        violations.push(VariableViolation::TooLong { name: name.clone(), max });
    }
    if let Some(n) = numeric {
        if let Some(min) = rule.min.filter(|min| n < *min) {
            violations.push(VariableViolation::BelowMinimum { name: name.clone(), min });
        }
        if let Some(max) = rule.max.filter(|max| n > *max) {
            violations.push(VariableViolation::AboveMaximum { name: name.clone(), max });
        }
    }
    if let Some(pattern) = &rule.pattern {
        match Regex::new(pattern) {
            Ok(re) if !re.is_match(value) => violations.push(VariableViolation::PatternMismatch {
                name: name.clone(),
                pattern: pattern.clone(),
            }),
            Ok(_) => {}
            Err(e) => violations.push(VariableViolation::InvalidPattern {
                name: name.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_on() -> DocumentTemplate {
        DocumentTemplate::new("tpl-sign", "Signature", DocumentType::Nda, DocumentCategory::Legal, "Signed on {{date}}")
            .with_variable(TemplateVariable::new("date", VariableKind::Date).default_value("2024-01-01"))
    }

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_default_used_when_value_absent() {
        assert_eq!(signed_on().render(&BTreeMap::new()), "Signed on 2024-01-01");
    }

    #[test]
    fn test_supplied_value_wins() {
        assert_eq!(signed_on().render(&values(&[("date", "2025-05-05")])), "Signed on 2025-05-05");
    }

    #[test]
    fn test_every_occurrence_replaced_and_missing_becomes_empty() {
        let tpl = DocumentTemplate::new(
            "t",
            "Greeting",
            DocumentType::Other,
            DocumentCategory::Internal,
            "{{name}}, {{name}}! [{{title}}] {{unknown}}",
        )
        .with_variable(TemplateVariable::new("name", VariableKind::Text))
        .with_variable(TemplateVariable::new("title", VariableKind::Text));
        assert_eq!(tpl.render(&values(&[("name", "Ada")])), "Ada, Ada! [] {{unknown}}");
    }

    #[test]
    fn test_supplied_values_are_not_expanded_again() {
        let tpl = DocumentTemplate::new(
            "t",
            "Memo",
            DocumentType::Other,
            DocumentCategory::Internal,
            "From {{author}} to {{recipient}} {{{recipient}}}",
        )
        .with_variable(TemplateVariable::new("author", VariableKind::Text))
        .with_variable(TemplateVariable::new("recipient", VariableKind::Text));
        let rendered = tpl.render(&values(&[("author", "{{recipient}}"), ("recipient", "Bob")]));
        assert_eq!(rendered, "From {{recipient}} to Bob {Bob}");
    }

    #[test]
    fn test_render_ignores_required_flag() {
        let tpl = DocumentTemplate::new("t", "T", DocumentType::Other, DocumentCategory::Internal, "To: {{party}}")
            .with_variable(TemplateVariable::new("party", VariableKind::Text).required());
        assert_eq!(tpl.render(&BTreeMap::new()), "To: ");
        assert_eq!(
            tpl.validate(&BTreeMap::new()),
            Err(vec![VariableViolation::Missing("party".into())])
        );
    }

    #[test]
    fn test_validate_rules() {
        let tpl = DocumentTemplate::new("t", "T", DocumentType::Proposal, DocumentCategory::Financial, "")
            .with_variable(
                TemplateVariable::new("seats", VariableKind::Number)
                    .validation(ValidationRule { min: Some(1.0), max: Some(500.0), ..ValidationRule::default() }),
            )
            .with_variable(
                TemplateVariable::new("code", VariableKind::Text).validation(ValidationRule {
                    min_length: Some(3),
                    pattern: Some("^[A-Z]+$".into()),
                    ..ValidationRule::default()
                }),
            )
            .with_variable(TemplateVariable::new("tier", VariableKind::Select).options(["starter", "growth"]));

        assert!(tpl
            .validate(&values(&[("seats", "25"), ("code", "ABC"), ("tier", "growth")]))
            .is_ok());

        let errors = tpl
            .validate(&values(&[("seats", "900"), ("code", "ab"), ("tier", "enterprise")]))
            .unwrap_err();
        assert!(errors.contains(&VariableViolation::AboveMaximum { name: "seats".into(), max: 500.0 }));
        assert!(errors.contains(&VariableViolation::TooShort { name: "code".into(), min: 3 }));
        assert!(errors.iter().any(|e| matches!(e, VariableViolation::PatternMismatch { .. })));
        assert!(errors.iter().any(|e| matches!(e, VariableViolation::NotAnOption { .. })));

        let errors = tpl.validate(&values(&[("seats", "many")])).unwrap_err();
        assert_eq!(errors, vec![VariableViolation::NotANumber("seats".into())]);
    }

    #[test]
    fn test_resolved_values_apply_defaults() {
        let resolved = signed_on().resolved_values(&BTreeMap::new());
        assert_eq!(resolved.get("date").map(String::as_str), Some("2024-01-01"));
    }
}
