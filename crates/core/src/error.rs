//! Error taxonomy for requirements file parsing.
//!
//! Every error is anchored to the manifest and logical line it came from.
//! Line `0` means the failure is not tied to a particular line, e.g. a root
//! manifest that cannot be read.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReqFileError {
    /// The manifest could not be read. Fatal for the whole resolution.
    #[error("Could not open requirements file: {target}: {reason} (from line {line} of {file})")]
    ContentRetrieval {
        file: String,
        line: u32,
        target: String,
        reason: String,
    },

    /// A malformed flag or flag value. Recorded as an invalid line.
    #[error("{message} (from line {line} of {file})")]
    DirectiveSyntax {
        file: String,
        line: u32,
        message: String,
    },

    /// More than one requirement on a single logical line. Fatal.
    #[error("{message} (from line {line} of {file})")]
    MultipleSpecifiers {
        file: String,
        line: u32,
        message: String,
    },

    /// The requirement text was rejected by the specifier grammar.
    #[error("Invalid requirement: '{text}' (from line {line} of {file})\n{message}")]
    SpecifierGrammar {
        file: String,
        line: u32,
        text: String,
        message: String,
    },

    /// A nested manifest includes one of the manifests currently being expanded.
    #[error("inclusion cycle detected: {chain} (from line {line} of {file})")]
    CyclicInclusion {
        file: String,
        line: u32,
        chain: String,
    },
}

impl ReqFileError {
    pub fn file(&self) -> &str {
        match self {
            ReqFileError::ContentRetrieval { file, .. }
            | ReqFileError::DirectiveSyntax { file, .. }
            | ReqFileError::MultipleSpecifiers { file, .. }
            | ReqFileError::SpecifierGrammar { file, .. }
            | ReqFileError::CyclicInclusion { file, .. } => file,
        }
    }

    pub fn line(&self) -> u32 {
        match self {
            ReqFileError::ContentRetrieval { line, .. }
            | ReqFileError::DirectiveSyntax { line, .. }
            | ReqFileError::MultipleSpecifiers { line, .. }
            | ReqFileError::SpecifierGrammar { line, .. }
            | ReqFileError::CyclicInclusion { line, .. } => *line,
        }
    }

    /// Fatal errors abort resolution; the others become invalid-line entries.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ReqFileError::ContentRetrieval { .. }
                | ReqFileError::MultipleSpecifiers { .. }
                | ReqFileError::CyclicInclusion { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReqFileError::ContentRetrieval { .. } => "content_retrieval",
            ReqFileError::DirectiveSyntax { .. } => "directive_syntax",
            ReqFileError::MultipleSpecifiers { .. } => "multiple_specifiers",
            ReqFileError::SpecifierGrammar { .. } => "specifier_grammar",
            ReqFileError::CyclicInclusion { .. } => "cyclic_inclusion",
        }
    }

    /// Serialize to the JSON shape the CLI prints: always `kind`, `file`,
    /// `line` and the rendered `message`.
    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "kind":    self.kind(),
            "file":    self.file(),
            "line":    self.line(),
            "message": self.to_string(),
        })
    }
}
