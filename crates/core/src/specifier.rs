//! Boundary to the version-specifier grammar.
//!
//! The parser never interprets version ranges. It hands the specifier text
//! to a [`SpecifierParser`] and keeps whatever canonical string comes back.

use once_cell::sync::Lazy;
use regex::Regex;

pub trait SpecifierParser {
    /// Validate `text` and return its canonical form, or a message
    /// describing why it was rejected.
    fn parse_specifier(&self, text: &str) -> Result<String, String>;
}

impl<F> SpecifierParser for F
where
    F: Fn(&str) -> Result<String, String>,
{
    fn parse_specifier(&self, text: &str) -> Result<String, String> {
        self(text)
    }
}

static CLAUSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(~=|===|==|!=|<=|>=|<|>)\s*([A-Za-z0-9_.*+!-]+)$").expect("valid clause regex")
});

/// Structural check of a comma-separated specifier set: every clause is an
/// operator followed by a version-like token. Canonical form drops
/// whitespace and parentheses.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionSpecifierShape;

impl SpecifierParser for VersionSpecifierShape {
    fn parse_specifier(&self, text: &str) -> Result<String, String> {
        let trimmed = text.trim();
        let inner = match trimmed.strip_prefix('(') {
            Some(rest) => rest
                .strip_suffix(')')
                .ok_or_else(|| "Expected closing parenthesis".to_owned())?,
            None => trimmed,
        };

        let mut clauses = Vec::new();
        for clause in inner.split(',') {
            let clause = clause.trim();
            if clause.is_empty() {
                return Err("Expected a version specifier after ','".to_owned());
            }
            let caps = match CLAUSE_RE.captures(clause) {
                Some(caps) => caps,
                None => return Err(clause_hint(clause)),
            };
            clauses.push(format!("{}{}", &caps[1], &caps[2]));
        }
        Ok(clauses.join(","))
    }
}

fn clause_hint(clause: &str) -> String {
    if clause.starts_with('=') && !clause.starts_with("==") {
        "Hint: = is not a valid operator. Did you mean == ?".to_owned()
    } else {
        format!("Invalid version specifier: '{}'", clause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_strips_whitespace() {
        let p = VersionSpecifierShape;
        assert_eq!(p.parse_specifier("==1.0.0").unwrap(), "==1.0.0");
        assert_eq!(p.parse_specifier(" >= 2").unwrap(), ">=2");
        assert_eq!(p.parse_specifier(">=1.0, <2.0").unwrap(), ">=1.0,<2.0");
        assert_eq!(p.parse_specifier("(~=1.4)").unwrap(), "~=1.4");
        assert_eq!(p.parse_specifier("==1.*").unwrap(), "==1.*");
    }

    #[test]
    fn single_equals_gets_a_hint() {
        let err = VersionSpecifierShape.parse_specifier("=1.0").unwrap_err();
        assert_eq!(err, "Hint: = is not a valid operator. Did you mean == ?");
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(VersionSpecifierShape.parse_specifier(">=1.0 other").is_err());
        assert!(VersionSpecifierShape.parse_specifier(">=1.0,").is_err());
        assert!(VersionSpecifierShape.parse_specifier("$").is_err());
    }

    #[test]
    fn closures_are_specifier_parsers() {
        let permissive = |text: &str| -> Result<String, String> { Ok(text.trim().to_owned()) };
        assert_eq!(permissive.parse_specifier(" = 1 ").unwrap(), "= 1");
    }
}
