//! Classify one logical text segment as a directive or a requirement.
//!
//! The segment is broken into an args part (requirement text, never
//! shell-split so markers survive) and an options part (shell-split and
//! matched against the [`FlagTable`]).
use crate::ast::Options;
use crate::error::ReqFileError;
use crate::flags::FlagTable;
use crate::lexer;
use crate::specifier::SpecifierParser;
use tracing::debug;

pub mod options;
pub mod requirement;

pub use options::{accumulate, Accumulated, OptionError};
pub use requirement::{tokenize_editable, tokenize_requirement, RequirementSpec, TokenizeError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Requirement(RequirementSpec),
    Directive(Options),
}

/// Split at the first space-separated token that starts with `-`.
pub fn break_args_options(line: &str) -> (String, String) {
    let tokens: Vec<&str> = line.split(' ').collect();
    let split = tokens
        .iter()
        .position(|t| t.starts_with('-'))
        .unwrap_or(tokens.len());
    (tokens[..split].join(" "), tokens[split..].join(" "))
}

pub struct LineParser<'a> {
    flags: &'a FlagTable,
    specifiers: &'a dyn SpecifierParser,
}

impl<'a> LineParser<'a> {
    pub fn new(flags: &'a FlagTable, specifiers: &'a dyn SpecifierParser) -> Self {
        LineParser { flags, specifiers }
    }

    /// Parse one trimmed text segment from `file` at `line`.
    pub fn parse(&self, text: &str, file: &str, line: u32) -> Result<ParsedLine, ReqFileError> {
        let directive_err = |message: String| ReqFileError::DirectiveSyntax {
            file: file.to_owned(),
            line,
            message,
        };
        let multiple_err = |message: String| ReqFileError::MultipleSpecifiers {
            file: file.to_owned(),
            line,
            message,
        };

        let (args, opts) = break_args_options(text);
        let args = args.trim();
        let words = lexer::split_words(&opts)
            .map_err(|e| directive_err(format!("{} in options '{}'", e, opts)))?;
        let acc = accumulate(&words, self.flags).map_err(|e| {
            directive_err(format!("Invalid option '{}': {}", e.token, e.reason))
        })?;

        if !args.is_empty() {
            if let Some(editable) = acc.editables.first() {
                return Err(multiple_err(format!(
                    "Only one requirement per line is allowed: '{}' and editable '{}'",
                    args, editable
                )));
            }
            if let Some(extra) = acc.positionals.first() {
                return Err(multiple_err(format!(
                    "Only one requirement per line is allowed: '{}' and '{}'",
                    args, extra
                )));
            }
            if !acc.options.is_empty() {
                debug!(file, line, "ignoring directive options on a requirement line");
            }
            let mut spec = tokenize_requirement(args, self.specifiers)
                .map_err(|e| tokenize_err(e, args, file, line))?;
            spec.hash_options = acc.hashes;
            spec.global_options = acc.global_options;
            spec.install_options = acc.install_options;
            return Ok(ParsedLine::Requirement(spec));
        }

        if let Some(first) = acc.editables.first() {
            if acc.editables.len() > 1 || !acc.positionals.is_empty() {
                let others: Vec<&str> = acc
                    .editables
                    .iter()
                    .skip(1)
                    .chain(acc.positionals.iter())
                    .map(String::as_str)
                    .collect();
                return Err(multiple_err(format!(
                    "Only one requirement per line is allowed: editable '{}' and '{}'",
                    first,
                    others.join(" ")
                )));
            }
            if acc.has_requirement_options() || !acc.options.is_empty() {
                debug!(file, line, "ignoring options on an editable requirement line");
            }
            let spec =
                tokenize_editable(first).map_err(|e| tokenize_err(e, first, file, line))?;
            return Ok(ParsedLine::Requirement(spec));
        }

        if let Some(extra) = acc.positionals.first() {
            return Err(directive_err(format!("unexpected argument '{}'", extra)));
        }
        if acc.has_requirement_options() {
            debug!(file, line, "ignoring requirement options on a directive line");
        }
        Ok(ParsedLine::Directive(acc.options))
    }
}

fn tokenize_err(err: TokenizeError, text: &str, file: &str, line: u32) -> ReqFileError {
    match err {
        TokenizeError::Multiple(message) => ReqFileError::MultipleSpecifiers {
            file: file.to_owned(),
            line,
            message,
        },
        TokenizeError::Grammar(message) => ReqFileError::SpecifierGrammar {
            file: file.to_owned(),
            line,
            text: text.to_owned(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{OptionKey, OptionValue};
    use crate::specifier::VersionSpecifierShape;

    fn parse(text: &str) -> Result<ParsedLine, ReqFileError> {
        let flags = FlagTable::standard();
        LineParser::new(&flags, &VersionSpecifierShape).parse(text, "file", 1)
    }

    fn requirement(text: &str) -> RequirementSpec {
        match parse(text) {
            Ok(ParsedLine::Requirement(spec)) => spec,
            other => panic!("expected requirement, got {:?}", other),
        }
    }

    #[test]
    fn break_args_options_cases() {
        assert_eq!(break_args_options("--option"), ("".into(), "--option".into()));
        assert_eq!(break_args_options("arg arg"), ("arg arg".into(), "".into()));
        assert_eq!(break_args_options("arg arg -s"), ("arg arg".into(), "-s".into()));
        assert_eq!(
            break_args_options("arg arg --long"),
            ("arg arg".into(), "--long".into())
        );
    }

    #[test]
    fn requirement_with_hash() {
        let spec = requirement("pkg==1.0.0 --hash=somealgo:somehash");
        assert_eq!(spec.name.as_deref(), Some("pkg"));
        assert_eq!(spec.specifier.as_deref(), Some("==1.0.0"));
        assert_eq!(spec.hash_options, vec!["somealgo:somehash"]);
    }

    #[test]
    fn requirement_with_install_and_global_options() {
        let spec = requirement(
            "SomeProject --install-option=yo1 --install-option yo2 \
             --global-option=\"yo3\" --global-option \"yo4\"",
        );
        assert_eq!(spec.install_options, vec!["yo1", "yo2"]);
        assert_eq!(spec.global_options, vec!["yo3", "yo4"]);
    }

    #[test]
    fn malformed_hash_is_a_directive_error_naming_the_token() {
        let err = parse("pkg==1.0.0 --hash=somehash").unwrap_err();
        assert!(matches!(err, ReqFileError::DirectiveSyntax { .. }));
        assert!(err.to_string().contains("--hash=somehash"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn two_requirements_are_fatal() {
        let err = parse("req1 req2").unwrap_err();
        assert!(matches!(err, ReqFileError::MultipleSpecifiers { .. }));
        assert!(err.is_fatal());

        let err = parse("-e ./a -e ./b").unwrap_err();
        assert!(matches!(err, ReqFileError::MultipleSpecifiers { .. }));

        let err = parse("pkg --hash=a:b other").unwrap_err();
        assert!(matches!(err, ReqFileError::MultipleSpecifiers { .. }));
    }

    #[test]
    fn editable_line() {
        let spec = requirement("-e git+https://url#egg=SomeProject");
        assert!(spec.is_editable);
        assert_eq!(spec.name.as_deref(), Some("SomeProject"));

        let spec = requirement("--editable=./local --hash=sha256:abc");
        assert!(spec.is_editable);
        assert!(spec.hash_options.is_empty());
    }

    #[test]
    fn directive_line() {
        match parse("--extra-index-url url1").unwrap() {
            ParsedLine::Directive(options) => assert_eq!(
                options.get(&OptionKey::ExtraIndexUrls),
                Some(&OptionValue::List(vec!["url1".into()]))
            ),
            other => panic!("expected directive, got {:?}", other),
        }
    }

    #[test]
    fn bogus_flag_and_stray_argument() {
        let err = parse("--bogus").unwrap_err();
        assert!(matches!(err, ReqFileError::DirectiveSyntax { .. }));
        let err = parse("--pre stray").unwrap_err();
        assert!(err.to_string().contains("unexpected argument 'stray'"));
    }

    #[test]
    fn grammar_error_carries_text() {
        match parse("my-package=1.0").unwrap_err() {
            ReqFileError::SpecifierGrammar { text, .. } => assert_eq!(text, "my-package=1.0"),
            other => panic!("expected grammar error, got {:?}", other),
        }
    }
}
