//! reqparse-core: requirements file parsing library.
//!
//! Turns requirements manifests into a flat, provenance-annotated sequence
//! of parsed entries, expanding nested `-r`/`-c` manifests depth-first.
//!
//! # Public API
//!
//! Key types are re-exported at the crate root for convenience:
//!
//! - [`Resolver`] -- lazy, recursive manifest resolution
//! - [`parse_requirements()`] -- resolve with the default provider
//! - [`RequirementsFile`] -- entries grouped by kind, with text reassembly
//! - [`ReqFileError`] -- error type carrying file and line
//! - [`ContentProvider`] -- manifest retrieval seam, with filesystem,
//!   in-memory and HTTP implementations
//! - [`FlagTable`] -- declarative directive flag grammar
//! - Entry types: [`ParsedEntry`], [`RequirementEntry`], [`OptionEntry`],
//!   [`CommentEntry`], [`InvalidEntry`], [`RequirementLine`]
//!
//! The individual pipeline stages ([`preprocess`], [`parser`]) are public
//! for callers that only need part of it.

pub mod ast;
pub mod document;
pub mod error;
pub mod flags;
pub mod lexer;
pub mod parser;
pub mod preprocess;
pub mod resolve;
pub mod source;
pub mod specifier;

// ── Convenience re-exports: key types ────────────────────────────────

pub use ast::{
    CommentEntry, InvalidEntry, OptionEntry, OptionKey, OptionValue, Options, ParsedEntry,
    RequirementEntry, RequirementLine,
};
pub use document::RequirementsFile;
pub use error::ReqFileError;
pub use flags::FlagTable;
pub use source::{ContentProvider, DefaultProvider, FileSystemProvider, InMemoryProvider};
#[cfg(feature = "remote")]
pub use source::HttpProvider;
pub use specifier::{SpecifierParser, VersionSpecifierShape};

// ── Convenience re-exports: entry points ─────────────────────────────

pub use resolve::{parse_requirements, parse_requirements_with, Entries, ResolveOptions, Resolver};
