//! Manifest resolution: preprocess, classify and recursively expand nested
//! manifests into one flat, lazily produced entry sequence.
//!
//! Expansion is depth-first. A `-r`/`-c` directive splices the nested
//! manifest's entries in at the point of inclusion, followed by the
//! directive's own [`OptionEntry`].

use crate::ast::*;
use crate::error::ReqFileError;
use crate::flags::FlagTable;
use crate::parser::{LineParser, ParsedLine, RequirementSpec};
use crate::preprocess::{preprocess, Segment, Segments};
use crate::source::{is_remote, normalize_path, ContentProvider, DefaultProvider};
use crate::specifier::{SpecifierParser, VersionSpecifierShape};
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Expand `-r`/`-c` directives. When off they are yielded as plain
    /// option entries and never fetched.
    pub include_nested: bool,
    /// Fail on a manifest that includes itself along the active chain.
    pub detect_cycles: bool,
    pub flags: FlagTable,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            include_nested: true,
            detect_cycles: true,
            flags: FlagTable::standard(),
        }
    }
}

// ──────────────────────────────────────────────
// Relative references
// ──────────────────────────────────────────────

/// Resolve a nested manifest id against the manifest that includes it.
pub fn resolve_nested(parent: &str, child: &str) -> String {
    if is_remote(child) {
        return child.to_owned();
    }
    if is_remote(parent) {
        return match url::Url::parse(parent).and_then(|base| base.join(child)) {
            Ok(joined) => joined.to_string(),
            Err(_) => match parent.rfind('/') {
                Some(idx) => format!("{}{}", &parent[..=idx], child),
                None => child.to_owned(),
            },
        };
    }
    let child_path = Path::new(child);
    if child_path.is_absolute() {
        return child.to_owned();
    }
    match Path::new(parent).parent() {
        Some(dir) => dir.join(child_path).to_string_lossy().into_owned(),
        None => child.to_owned(),
    }
}

/// Lexical identity of a manifest, used for cycle detection when the
/// provider has no canonical identity for it.
pub fn normalize_id(manifest_id: &str) -> String {
    if is_remote(manifest_id) {
        match url::Url::parse(manifest_id) {
            Ok(url) => url.to_string(),
            Err(_) => manifest_id.to_owned(),
        }
    } else {
        normalize_path(Path::new(manifest_id))
            .to_string_lossy()
            .into_owned()
    }
}

// ──────────────────────────────────────────────
// Resolver
// ──────────────────────────────────────────────

/// Owns everything a resolution needs except the manifest content itself.
pub struct Resolver<'p> {
    provider: &'p dyn ContentProvider,
    options: ResolveOptions,
    specifiers: Box<dyn SpecifierParser + 'p>,
}

impl<'p> Resolver<'p> {
    pub fn new(provider: &'p dyn ContentProvider) -> Self {
        Resolver {
            provider,
            options: ResolveOptions::default(),
            specifiers: Box::new(VersionSpecifierShape),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_specifier_parser(mut self, parser: impl SpecifierParser + 'p) -> Self {
        self.specifiers = Box::new(parser);
        self
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Lazily resolve `manifest_id`. Content is only read once the returned
    /// iterator is polled, and again on every new call.
    pub fn resolve(&self, manifest_id: &str, is_constraint: bool) -> Entries<'_, 'p> {
        Entries {
            resolver: self,
            root: Some((manifest_id.to_owned(), is_constraint)),
            frames: Vec::new(),
            active: HashSet::new(),
            finished: false,
        }
    }

    fn open(
        &self,
        manifest_id: String,
        is_constraint: bool,
        origin: (&str, u32),
        active: &HashSet<String>,
        chain: &[Frame],
    ) -> Result<Frame, ReqFileError> {
        let key = self
            .provider
            .canonicalize(&manifest_id)
            .unwrap_or_else(|| normalize_id(&manifest_id));
        if self.options.detect_cycles && active.contains(&key) {
            let mut ids: Vec<&str> = chain.iter().map(|f| f.manifest_id.as_str()).collect();
            ids.push(&manifest_id);
            return Err(ReqFileError::CyclicInclusion {
                file: origin.0.to_owned(),
                line: origin.1,
                chain: ids.join(" \u{2192} "),
            });
        }

        debug!(manifest = %manifest_id, is_constraint, "opening manifest");
        let content = self.provider.get_content(&manifest_id).map_err(|e| {
            ReqFileError::ContentRetrieval {
                file: origin.0.to_owned(),
                line: origin.1,
                target: manifest_id.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Frame {
            manifest_id,
            key,
            is_constraint,
            segments: preprocess(&content),
            includes: VecDeque::new(),
            deferred: None,
        })
    }
}

/// Resolve with the default provider and options, collecting every entry.
pub fn parse_requirements(manifest_id: &str) -> Result<Vec<ParsedEntry>, ReqFileError> {
    parse_requirements_with(manifest_id, &DefaultProvider::default(), ResolveOptions::default())
}

/// Resolve with an explicit provider and options, collecting every entry.
pub fn parse_requirements_with(
    manifest_id: &str,
    provider: &dyn ContentProvider,
    options: ResolveOptions,
) -> Result<Vec<ParsedEntry>, ReqFileError> {
    Resolver::new(provider)
        .with_options(options)
        .resolve(manifest_id, false)
        .collect()
}

// ──────────────────────────────────────────────
// Entry iterator
// ──────────────────────────────────────────────

struct Include {
    manifest_id: String,
    is_constraint: bool,
    line: u32,
}

/// One manifest being expanded.
struct Frame {
    manifest_id: String,
    key: String,
    is_constraint: bool,
    segments: Segments,
    /// Nested manifests still to expand for the current directive.
    includes: VecDeque<Include>,
    /// The directive's own entry, released after its includes.
    deferred: Option<OptionEntry>,
}

/// Flattened entries of a manifest and everything it includes.
///
/// Yields `Err` at most once, for a fatal error; the sequence ends there.
pub struct Entries<'r, 'p> {
    resolver: &'r Resolver<'p>,
    root: Option<(String, bool)>,
    frames: Vec<Frame>,
    active: HashSet<String>,
    finished: bool,
}

impl Entries<'_, '_> {
    fn push(&mut self, frame: Frame) {
        self.active.insert(frame.key.clone());
        self.frames.push(frame);
    }

    fn pop(&mut self) {
        if let Some(frame) = self.frames.pop() {
            self.active.remove(&frame.key);
        }
    }

    fn fail(&mut self, err: ReqFileError) -> Option<Result<ParsedEntry, ReqFileError>> {
        self.finished = true;
        self.frames.clear();
        self.active.clear();
        Some(Err(err))
    }

    /// Turn one segment of the top frame into an entry, or queue its
    /// nested manifests and return `None`.
    fn classify(&mut self, segment: Segment) -> Result<Option<ParsedEntry>, ReqFileError> {
        let resolver = self.resolver;
        let Some(frame) = self.frames.last_mut() else {
            return Ok(None);
        };
        let (line_number, text) = match segment {
            Segment::Comment { line_number, text } => {
                trace!(manifest = %frame.manifest_id, line = line_number, "comment");
                let requirement_line =
                    RequirementLine::new(&frame.manifest_id, line_number, text.as_str());
                return Ok(Some(ParsedEntry::Comment(CommentEntry {
                    requirement_line,
                    text,
                })));
            }
            Segment::Text { line_number, text } => (line_number, text),
        };

        let requirement_line =
            RequirementLine::new(&frame.manifest_id, line_number, text.as_str());
        let parser = LineParser::new(&resolver.options.flags, resolver.specifiers.as_ref());
        let parsed = match parser.parse(&text, &frame.manifest_id, line_number) {
            Ok(parsed) => parsed,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                trace!(manifest = %frame.manifest_id, line = line_number, "invalid line");
                return Ok(Some(ParsedEntry::Invalid(InvalidEntry {
                    requirement_line,
                    error_message: err.to_string(),
                })));
            }
        };

        match parsed {
            ParsedLine::Requirement(spec) => {
                trace!(manifest = %frame.manifest_id, line = line_number, "requirement");
                Ok(Some(ParsedEntry::Requirement(requirement_entry(
                    requirement_line,
                    spec,
                    frame.is_constraint,
                ))))
            }
            ParsedLine::Directive(options) => {
                trace!(manifest = %frame.manifest_id, line = line_number, "directive");
                let entry = OptionEntry {
                    requirement_line,
                    options,
                };
                if !resolver.options.include_nested {
                    return Ok(Some(ParsedEntry::Option(entry)));
                }
                let nested = [
                    (OptionKey::Requirements, frame.is_constraint),
                    (OptionKey::Constraints, true),
                ];
                for (key, is_constraint) in nested {
                    for child in entry.get(key).map(OptionValue::as_list).unwrap_or_default() {
                        let manifest_id = resolve_nested(&frame.manifest_id, child);
                        debug!(
                            parent = %frame.manifest_id,
                            line = line_number,
                            nested = %manifest_id,
                            is_constraint,
                            "expanding nested manifest"
                        );
                        frame.includes.push_back(Include {
                            manifest_id,
                            is_constraint,
                            line: line_number,
                        });
                    }
                }
                if frame.includes.is_empty() {
                    return Ok(Some(ParsedEntry::Option(entry)));
                }
                frame.deferred = Some(entry);
                Ok(None)
            }
        }
    }
}

fn requirement_entry(
    requirement_line: RequirementLine,
    spec: RequirementSpec,
    is_constraint: bool,
) -> RequirementEntry {
    RequirementEntry {
        requirement_line,
        name: spec.name,
        extras: spec.extras,
        specifier: spec.specifier,
        markers: spec.markers,
        url_or_path: spec.url_or_path,
        is_editable: spec.is_editable,
        is_constraint,
        hash_options: spec.hash_options,
        global_options: spec.global_options,
        install_options: spec.install_options,
    }
}

impl Iterator for Entries<'_, '_> {
    type Item = Result<ParsedEntry, ReqFileError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if let Some((manifest_id, is_constraint)) = self.root.take() {
            let origin = manifest_id.clone();
            let opened = self.resolver.open(
                manifest_id,
                is_constraint,
                (origin.as_str(), 0),
                &self.active,
                &self.frames,
            );
            match opened {
                Ok(frame) => self.push(frame),
                Err(err) => return self.fail(err),
            }
        }

        loop {
            let Some(frame) = self.frames.last_mut() else {
                self.finished = true;
                return None;
            };

            if let Some(include) = frame.includes.pop_front() {
                let parent = frame.manifest_id.clone();
                let opened = self.resolver.open(
                    include.manifest_id,
                    include.is_constraint,
                    (parent.as_str(), include.line),
                    &self.active,
                    &self.frames,
                );
                match opened {
                    Ok(child) => self.push(child),
                    Err(err) => return self.fail(err),
                }
                continue;
            }

            if let Some(entry) = frame.deferred.take() {
                return Some(Ok(ParsedEntry::Option(entry)));
            }

            let Some(segment) = frame.segments.next() else {
                debug!(manifest = %frame.manifest_id, "manifest done");
                self.pop();
                continue;
            };

            match self.classify(segment) {
                Ok(Some(entry)) => return Some(Ok(entry)),
                Ok(None) => continue,
                Err(err) => return self.fail(err),
            }
        }
    }
}

impl std::iter::FusedIterator for Entries<'_, '_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryProvider;

    #[test]
    fn nested_ids_resolve_against_parent() {
        assert_eq!(resolve_nested("reqs.txt", "other.txt"), "other.txt");
        assert_eq!(
            resolve_nested("parent/reqs.txt", "other.txt"),
            "parent/other.txt"
        );
        assert_eq!(
            resolve_nested("parent/reqs.txt", "/abs/other.txt"),
            "/abs/other.txt"
        );
        assert_eq!(
            resolve_nested("http://me.com/me/reqs.txt", "reqs-2.txt"),
            "http://me.com/me/reqs-2.txt"
        );
        assert_eq!(
            resolve_nested("http://me.com/me/reqs.txt", "/abs/reqs.txt"),
            "http://me.com/abs/reqs.txt"
        );
        assert_eq!(
            resolve_nested("parent/reqs.txt", "https://other.com/reqs.txt"),
            "https://other.com/reqs.txt"
        );
    }

    #[test]
    fn cycle_keys_are_lexical() {
        assert_eq!(normalize_id("./a/../reqs.txt"), "reqs.txt");
        assert_eq!(
            normalize_id("http://me.com/a/../reqs.txt"),
            "http://me.com/reqs.txt"
        );
    }

    #[test]
    fn entries_are_lazy() {
        let provider = InMemoryProvider::new().with("reqs.txt", "first\n-r missing.txt\n");
        let resolver = Resolver::new(&provider);
        let mut entries = resolver.resolve("reqs.txt", false);
        let first = entries.next().unwrap().unwrap();
        assert_eq!(first.kind(), "requirement");
        assert!(entries.next().unwrap().is_err());
        assert!(entries.next().is_none());
    }

    #[test]
    fn constraint_flag_is_inherited_through_requirements() {
        let provider = InMemoryProvider::new()
            .with("root.txt", "-c cons.txt\n")
            .with("cons.txt", "-r more.txt\n")
            .with("more.txt", "pkg\n");
        let entries = parse_requirements_with("root.txt", &provider, ResolveOptions::default())
            .unwrap();
        match &entries[0] {
            ParsedEntry::Requirement(req) => {
                assert!(req.is_constraint);
                assert_eq!(req.requirement_line.manifest_id, "more.txt");
            }
            other => panic!("expected requirement, got {:?}", other),
        }
    }
}
