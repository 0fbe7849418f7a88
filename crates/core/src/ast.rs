//! Parsed entry types shared by the tokenizer, the resolver and callers.
//!
//! Every entry carries the [`RequirementLine`] it came from. Version
//! specifiers and environment markers are kept as opaque strings.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

// ──────────────────────────────────────────────
// Provenance
// ──────────────────────────────────────────────

/// A logical line of a manifest. `line_number` is the first physical line the
/// logical line was joined from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementLine {
    pub manifest_id: String,
    pub line_number: u32,
    pub raw_text: String,
}

impl RequirementLine {
    pub fn new(manifest_id: &str, line_number: u32, raw_text: impl Into<String>) -> Self {
        RequirementLine {
            manifest_id: manifest_id.to_owned(),
            line_number,
            raw_text: raw_text.into(),
        }
    }
}

// ──────────────────────────────────────────────
// Options
// ──────────────────────────────────────────────

/// Installer option destinations that may appear on a directive line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKey {
    IndexUrl,
    ExtraIndexUrls,
    NoIndex,
    FindLinks,
    NoBinary,
    OnlyBinary,
    PreferBinary,
    RequireHashes,
    Pre,
    TrustedHosts,
    UseFeatures,
    Requirements,
    Constraints,
}

impl OptionKey {
    pub fn as_str(self) -> &'static str {
        match self {
            OptionKey::IndexUrl => "index_url",
            OptionKey::ExtraIndexUrls => "extra_index_urls",
            OptionKey::NoIndex => "no_index",
            OptionKey::FindLinks => "find_links",
            OptionKey::NoBinary => "no_binary",
            OptionKey::OnlyBinary => "only_binary",
            OptionKey::PreferBinary => "prefer_binary",
            OptionKey::RequireHashes => "require_hashes",
            OptionKey::Pre => "pre",
            OptionKey::TrustedHosts => "trusted_hosts",
            OptionKey::UseFeatures => "use_features",
            OptionKey::Requirements => "requirements",
            OptionKey::Constraints => "constraints",
        }
    }

    /// Boolean switches: `--no-index`, `--pre`, ...
    pub fn is_switch(self) -> bool {
        matches!(
            self,
            OptionKey::NoIndex | OptionKey::PreferBinary | OptionKey::RequireHashes | OptionKey::Pre
        )
    }

    /// Keys whose values accumulate within one directive line.
    pub fn is_list(self) -> bool {
        !self.is_switch() && self != OptionKey::IndexUrl
    }

    /// Keys that name further manifests to resolve.
    pub fn is_nested(self) -> bool {
        matches!(self, OptionKey::Requirements | OptionKey::Constraints)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Flag(bool),
    Text(String),
    List(Vec<String>),
}

impl OptionValue {
    pub fn as_list(&self) -> &[String] {
        match self {
            OptionValue::List(items) => items,
            _ => &[],
        }
    }
}

pub type Options = BTreeMap<OptionKey, OptionValue>;

// ──────────────────────────────────────────────
// Entries
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementEntry {
    pub requirement_line: RequirementLine,
    /// Absent when the requirement is only identified by URL or path.
    pub name: Option<String>,
    pub extras: BTreeSet<String>,
    pub specifier: Option<String>,
    pub markers: Option<String>,
    pub url_or_path: Option<String>,
    pub is_editable: bool,
    pub is_constraint: bool,
    pub hash_options: Vec<String>,
    pub global_options: Vec<String>,
    pub install_options: Vec<String>,
}

/// One directive line's options. Never merged with other lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionEntry {
    pub requirement_line: RequirementLine,
    pub options: Options,
}

impl OptionEntry {
    pub fn get(&self, key: OptionKey) -> Option<&OptionValue> {
        self.options.get(&key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentEntry {
    pub requirement_line: RequirementLine,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidEntry {
    pub requirement_line: RequirementLine,
    pub error_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedEntry {
    Requirement(RequirementEntry),
    Option(OptionEntry),
    Comment(CommentEntry),
    Invalid(InvalidEntry),
}

impl ParsedEntry {
    pub fn requirement_line(&self) -> &RequirementLine {
        match self {
            ParsedEntry::Requirement(e) => &e.requirement_line,
            ParsedEntry::Option(e) => &e.requirement_line,
            ParsedEntry::Comment(e) => &e.requirement_line,
            ParsedEntry::Invalid(e) => &e.requirement_line,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ParsedEntry::Requirement(_) => "requirement",
            ParsedEntry::Option(_) => "option",
            ParsedEntry::Comment(_) => "comment",
            ParsedEntry::Invalid(_) => "invalid",
        }
    }
}
