//! Declarative per-step validation.
//!
//! A schema is a static list of field rules; each rule is an ordered list of checks and the
//! first failing check reports the field's message. Schemas read values through
//! [`FieldSource`], so the same machinery validates the intake form and the opportunity form.

mod constraint;
pub(crate) mod schemas;

use std::collections::BTreeMap;

use serde::Serialize;

pub use constraint::Constraint;
pub use schemas::schema_for;

use super::domain::ApplicationFormData;
use super::steps::{Step, StepKind, StepRegistry};

/// Borrowed view of a single form value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    Missing,
    Text(&'a str),
    Number(i64),
    Flag(bool),
    List(&'a [String]),
}

impl FieldValue<'_> {
    /// Optional fields with nothing entered are not checked.
    fn is_blank(&self) -> bool {
        match self {
            FieldValue::Missing => true,
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Number(_) | FieldValue::Flag(_) => false,
        }
    }
}

/// Anything that can hand values to a schema by field name.
pub trait FieldSource {
    fn field(&self, name: &str) -> FieldValue<'_>;
}

#[derive(Debug, Clone, Copy)]
pub struct Check {
    pub constraint: Constraint,
    pub message: &'static str,
}

impl Check {
    pub const fn new(constraint: Constraint, message: &'static str) -> Self {
        Self {
            constraint,
            message,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub optional: bool,
    pub checks: &'static [Check],
}

impl FieldRule {
    pub const fn required(field: &'static str, checks: &'static [Check]) -> Self {
        Self {
            field,
            optional: false,
            checks,
        }
    }

    pub const fn optional(field: &'static str, checks: &'static [Check]) -> Self {
        Self {
            field,
            optional: true,
            checks,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StepSchema {
    rules: &'static [FieldRule],
}

impl StepSchema {
    pub const fn new(rules: &'static [FieldRule]) -> Self {
        Self { rules }
    }

    pub const fn empty() -> Self {
        Self { rules: &[] }
    }

    pub fn rules(&self) -> &'static [FieldRule] {
        self.rules
    }

    /// Names of the fields a user must fill in for this schema to pass.
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules
            .iter()
            .filter(|rule| !rule.optional)
            .map(|rule| rule.field)
    }

    pub fn validate<S: FieldSource + ?Sized>(&self, source: &S) -> ValidationReport {
        let mut report = ValidationReport::passed();
        for rule in self.rules {
            let value = source.field(rule.field);
            if rule.optional && value.is_blank() {
                continue;
            }
            if let Some(check) = rule
                .checks
                .iter()
                .find(|check| !check.constraint.accepts(&value))
            {
                report.reject(rule.field, check.message);
            }
        }
        report
    }
}

/// Outcome of validating a step: pass/fail plus one message per failing field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: BTreeMap<String, String>,
}

impl ValidationReport {
    pub fn passed() -> Self {
        Self {
            valid: true,
            errors: BTreeMap::new(),
        }
    }

    pub fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.valid = false;
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn merge(&mut self, other: ValidationReport) {
        for (field, message) in other.errors {
            self.reject(&field, message);
        }
    }

    pub fn error_for(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }
}

/// Validate the fields owned by `step`. A step whose skip predicate holds has nothing to check.
pub fn validate_step(step: Step, form: &ApplicationFormData) -> ValidationReport {
    validate_step_in(&StepRegistry::standard(), step, form)
}

pub fn validate_step_in(
    registry: &StepRegistry,
    step: Step,
    form: &ApplicationFormData,
) -> ValidationReport {
    match registry.definition(step) {
        Some(definition) if !definition.is_skipped(form) => definition.schema.validate(form),
        _ => ValidationReport::passed(),
    }
}

/// Validate the union of every data step that applies on the branch `form` has taken.
pub fn validate_submission(form: &ApplicationFormData) -> ValidationReport {
    validate_submission_in(&StepRegistry::standard(), form)
}

pub fn validate_submission_in(
    registry: &StepRegistry,
    form: &ApplicationFormData,
) -> ValidationReport {
    let mut report = ValidationReport::passed();
    for definition in registry.definitions() {
        if definition.kind == StepKind::Data && !definition.is_skipped(form) {
            report.merge(definition.schema.validate(form));
        }
    }
    report
}
