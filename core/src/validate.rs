//! Declarative field validation.
//!
//! Every model in this crate is checked at construction time against a small
//! schema: a list of [`Field`]s, each pairing a value with the rules it must
//! satisfy. Violations are aggregated per field rather than short-circuiting,
//! so a caller sees everything wrong with an entity at once.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Violations;

/// Characters accepted by [`Rule::Password`] beyond letters and digits.
const PASSWORD_SPECIALS: &str = "@$!%*#?&_";

#[derive(Debug, Clone, Copy)]
pub enum Value<'a> {
    Text(&'a str),
    Int(i64),
}

#[derive(Debug, Clone, Copy)]
pub enum Rule {
    LenMin(usize),
    LenMax(usize),
    /// Anchored pattern plus a human-readable description for the violation.
    Matches(&'static Lazy<Regex>, &'static str),
    OneOf(&'static [&'static str]),
    /// Inclusive integer bounds.
    Range(i64, i64),
    /// An empty text value skips the remaining rules instead of violating them.
    AllowEmpty,
    /// At least 8 characters with a letter, a digit, and a special character,
    /// drawn only from that alphabet. A dedicated predicate because the
    /// upstream rule is a lookahead regex, which `regex` does not support.
    Password,
}

pub struct Field<'a> {
    pub name: &'static str,
    pub value: Value<'a>,
    pub rules: &'a [Rule],
}

/// Evaluate all fields, collecting every violation.
pub fn validate(fields: &[Field<'_>]) -> Result<(), Violations> {
    let mut out = Violations::default();
    for field in fields {
        apply(field, &mut out);
    }
    if out.is_empty() {
        Ok(())
    } else {
        Err(out)
    }
}

fn apply(field: &Field<'_>, out: &mut Violations) {
    let allow_empty = field
        .rules
        .iter()
        .any(|rule| matches!(rule, Rule::AllowEmpty));

    if let Value::Text(s) = field.value {
        if s.is_empty() {
            if !allow_empty {
                out.push(field.name, "must not be empty");
            }
            return;
        }
    }

    for rule in field.rules {
        match (rule, field.value) {
            (Rule::LenMin(min), Value::Text(s)) => {
                if s.chars().count() < *min {
                    out.push(field.name, format!("must be at least {min} characters"));
                }
            }
            (Rule::LenMax(max), Value::Text(s)) => {
                if s.chars().count() > *max {
                    out.push(field.name, format!("must be at most {max} characters"));
                }
            }
            (Rule::Matches(pattern, what), Value::Text(s)) => {
                if !pattern.is_match(s) {
                    out.push(field.name, format!("must be {what}"));
                }
            }
            (Rule::OneOf(allowed), Value::Text(s)) => {
                if !allowed.iter().any(|candidate| *candidate == s) {
                    out.push(field.name, format!("must be one of {allowed:?}"));
                }
            }
            (Rule::Range(min, max), Value::Int(n)) => {
                if n < *min || n > *max {
                    out.push(field.name, format!("must be between {min} and {max}"));
                }
            }
            (Rule::Password, Value::Text(s)) => check_password(field.name, s, out),
            (Rule::AllowEmpty, _) => {}
            // A rule applied to a value of the wrong shape is a schema bug;
            // report it as a violation rather than panicking.
            (rule, value) => {
                out.push(field.name, format!("rule {rule:?} does not apply to {value:?}"));
            }
        }
    }
}

fn check_password(name: &'static str, s: &str, out: &mut Violations) {
    if s.chars().count() < 8 {
        out.push(name, "must be at least 8 characters");
    }
    if !s.chars().any(|c| c.is_ascii_alphabetic()) {
        out.push(name, "must contain a letter");
    }
    if !s.chars().any(|c| c.is_ascii_digit()) {
        out.push(name, "must contain a digit");
    }
    if !s.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        out.push(name, "must contain a special character");
    }
    if s.chars()
        .any(|c| !c.is_ascii_alphanumeric() && !PASSWORD_SPECIALS.contains(c))
    {
        out.push(name, "contains a character outside the allowed set");
    }
}
