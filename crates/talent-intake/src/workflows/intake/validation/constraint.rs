use std::sync::OnceLock;

use regex::Regex;

use super::FieldValue;

/// Single rule a field value must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Text or list must be non-empty; numbers must be present.
    Required,
    /// Minimum length in characters, not bytes.
    MinChars(usize),
    Email,
    OneOf(&'static [&'static str]),
    Range { min: i64, max: i64 },
    MinItems(usize),
    LiteralTrue,
}

impl Constraint {
    pub fn accepts(&self, value: &FieldValue<'_>) -> bool {
        match (self, value) {
            (Constraint::Required, FieldValue::Text(text)) => !text.is_empty(),
            (Constraint::Required, FieldValue::List(items)) => !items.is_empty(),
            (Constraint::Required, FieldValue::Number(_) | FieldValue::Flag(_)) => true,
            (Constraint::MinChars(min), FieldValue::Text(text)) => text.chars().count() >= *min,
            (Constraint::Email, FieldValue::Text(text)) => email_pattern().is_match(text),
            (Constraint::OneOf(options), FieldValue::Text(text)) => {
                options.iter().any(|option| option == text)
            }
            (Constraint::Range { min, max }, FieldValue::Number(number)) => {
                (*min..=*max).contains(number)
            }
            (Constraint::MinItems(min), FieldValue::List(items)) => items.len() >= *min,
            (Constraint::LiteralTrue, FieldValue::Flag(flag)) => *flag,
            _ => false,
        }
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9_'+\-]+(\.[A-Za-z0-9_'+\-]+)*@([A-Za-z0-9]([A-Za-z0-9\-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$",
        )
        .expect("email pattern compiles")
    })
}
