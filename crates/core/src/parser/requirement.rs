//! Requirement specifier tokenizing.
//!
//! Splits the args part of a line into name, extras, specifier, markers and
//! URL or path. Specifier text goes through the configured
//! [`SpecifierParser`]; markers are kept verbatim.

use crate::specifier::SpecifierParser;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequirementSpec {
    pub name: Option<String>,
    pub extras: BTreeSet<String>,
    pub specifier: Option<String>,
    pub markers: Option<String>,
    pub url_or_path: Option<String>,
    pub is_editable: bool,
    pub hash_options: Vec<String>,
    pub global_options: Vec<String>,
    pub install_options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// A second requirement follows the first one.
    Multiple(String),
    /// The text does not have the shape of a requirement.
    Grammar(String),
}

static NAME_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*").expect("valid name regex"));
static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?$").expect("valid name regex")
});
static SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9+.-]*):").expect("valid scheme regex"));
static EGG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[#&]egg=([^&]*)").expect("valid egg regex"));
static EXTRAS_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)(\[[^\]]+\])$").expect("valid extras regex"));

const ARCHIVE_EXTENSIONS: &[&str] = &[
    ".zip", ".whl", ".tar.gz", ".tgz", ".tar", ".tar.bz2", ".tbz", ".tar.xz", ".txz", ".tlz",
    ".tar.lz", ".tar.lzma",
];

const VCS_SCHEMES: &[&str] = &["git", "hg", "svn", "bzr"];

/// `true` for `http`, `https`, `file`, `ftp` and VCS URLs (`git+https:`...).
pub fn is_url(text: &str) -> bool {
    let Some(caps) = SCHEME_RE.captures(text) else {
        return false;
    };
    let scheme = caps[1].to_ascii_lowercase();
    if matches!(scheme.as_str(), "http" | "https" | "file" | "ftp") {
        return true;
    }
    let vcs = scheme.split('+').next().unwrap_or_default();
    VCS_SCHEMES.contains(&vcs)
}

pub fn is_archive_file(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    ARCHIVE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

fn looks_like_path(token: &str) -> bool {
    token.starts_with('.')
        || token.starts_with('/')
        || token.starts_with('~')
        || token.contains('/')
        || token.contains('\\')
        || is_archive_file(token)
}

fn multiple(text: &str) -> TokenizeError {
    TokenizeError::Multiple(format!(
        "Only one requirement per line is allowed: '{}'",
        text
    ))
}

fn parse_extras(list: &str) -> Result<BTreeSet<String>, TokenizeError> {
    let mut extras = BTreeSet::new();
    for item in list.split(',') {
        let item = item.trim();
        if !NAME_RE.is_match(item) {
            return Err(TokenizeError::Grammar(format!(
                "Invalid extra name: '{}'",
                item
            )));
        }
        extras.insert(item.to_owned());
    }
    Ok(extras)
}

fn parse_markers(text: &str) -> Result<String, TokenizeError> {
    let markers = text.trim();
    if markers.is_empty() {
        return Err(TokenizeError::Grammar(
            "Expected marker expression after ';'".to_owned(),
        ));
    }
    Ok(markers.to_owned())
}

/// Strip a trailing `[extras]` from a path or URL.
fn strip_extras(location: &str) -> Result<(&str, BTreeSet<String>), TokenizeError> {
    match EXTRAS_SUFFIX_RE.captures(location) {
        Some(caps) => {
            let (Some(base), Some(bracketed)) = (caps.get(1), caps.get(2)) else {
                return Ok((location, BTreeSet::new()));
            };
            let list = &bracketed.as_str()[1..bracketed.as_str().len() - 1];
            Ok((base.as_str(), parse_extras(list)?))
        }
        None => Ok((location, BTreeSet::new())),
    }
}

/// Name and extras carried by a `#egg=name[extras]` fragment.
fn egg_fragment(location: &str) -> Result<Option<(String, BTreeSet<String>)>, TokenizeError> {
    let Some(caps) = EGG_RE.captures(location) else {
        return Ok(None);
    };
    let value = caps[1].trim();
    if value.is_empty() {
        return Ok(None);
    }
    let (name, extras) = strip_extras(value)?;
    if !NAME_RE.is_match(name) {
        return Err(TokenizeError::Grammar(format!(
            "Invalid egg fragment name: '{}'",
            name
        )));
    }
    Ok(Some((name.to_owned(), extras)))
}

fn location_spec(location: &str) -> Result<RequirementSpec, TokenizeError> {
    let (location, mut extras) = strip_extras(location)?;
    let mut spec = RequirementSpec {
        url_or_path: Some(location.to_owned()),
        ..RequirementSpec::default()
    };
    if let Some((name, egg_extras)) = egg_fragment(location)? {
        spec.name = Some(name);
        extras.extend(egg_extras);
    }
    spec.extras = extras;
    Ok(spec)
}

/// Tokenize the value of `-e`/`--editable`. No specifier parsing happens;
/// the value is a URL or path with optional extras and egg fragment.
pub fn tokenize_editable(value: &str) -> Result<RequirementSpec, TokenizeError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(TokenizeError::Grammar(
            "Expected a path or URL after -e".to_owned(),
        ));
    }
    let mut spec = location_spec(value)?;
    spec.is_editable = true;
    Ok(spec)
}

/// Tokenize a bare URL or path requirement.
fn tokenize_location(text: &str) -> Result<RequirementSpec, TokenizeError> {
    // markers in a URL need a space before ';' since ';' is legal in URLs
    let separator = if is_url(text) { "; " } else { ";" };
    let (location, markers) = match text.split_once(separator) {
        Some((location, markers)) => (location.trim(), Some(parse_markers(markers)?)),
        None => (text, None),
    };
    if location.split_whitespace().count() > 1 {
        return Err(multiple(location));
    }
    let mut spec = location_spec(location)?;
    spec.markers = markers;
    Ok(spec)
}

fn starts_named_with_url(text: &str) -> bool {
    let Some(m) = NAME_PREFIX_RE.find(text) else {
        return false;
    };
    let mut rest = text[m.end()..].trim_start();
    if rest.starts_with('[') {
        match rest.find(']') {
            Some(end) => rest = rest[end + 1..].trim_start(),
            None => return false,
        }
    }
    rest.starts_with('@')
}

/// `true` when a whitespace-separated token of the specifier text starts a
/// new requirement instead of continuing the current clause. A token may
/// only continue a clause that is still waiting for its version (`>= 2`,
/// `>=1.0, <2`).
fn has_second_requirement(specifier: &str) -> bool {
    let mut awaiting_version = false;
    for token in specifier.split_whitespace() {
        let starts_requirement = token.starts_with(|c: char| c.is_ascii_alphanumeric())
            || is_url(token)
            || token.starts_with('.')
            || token.starts_with('/');
        if starts_requirement && !awaiting_version {
            return true;
        }
        awaiting_version =
            token.ends_with(|c: char| matches!(c, '<' | '>' | '=' | '!' | '~' | ',' | '('));
    }
    false
}

/// Tokenize `name[extras] specifier ; markers` or `name[extras] @ url ; markers`.
fn tokenize_named(
    text: &str,
    specifiers: &dyn SpecifierParser,
) -> Result<RequirementSpec, TokenizeError> {
    let name = NAME_PREFIX_RE
        .find(text)
        .map(|m| m.as_str())
        .ok_or_else(|| {
            TokenizeError::Grammar("Expected package name at the start of the requirement".to_owned())
        })?;
    if !NAME_RE.is_match(name) {
        return Err(TokenizeError::Grammar(format!(
            "Invalid package name: '{}'",
            name
        )));
    }

    let mut spec = RequirementSpec {
        name: Some(name.to_owned()),
        ..RequirementSpec::default()
    };
    let mut rest = text[name.len()..].trim_start();

    if let Some(bracketed) = rest.strip_prefix('[') {
        let end = bracketed.find(']').ok_or_else(|| {
            TokenizeError::Grammar("Expected closing bracket for extras".to_owned())
        })?;
        spec.extras = parse_extras(&bracketed[..end])?;
        rest = bracketed[end + 1..].trim_start();
    }

    if let Some(after_at) = rest.strip_prefix('@') {
        let after_at = after_at.trim_start();
        let (url, tail) = match after_at.find(char::is_whitespace) {
            Some(idx) => (&after_at[..idx], after_at[idx..].trim()),
            None => (after_at, ""),
        };
        if url.is_empty() {
            return Err(TokenizeError::Grammar("Expected URL after '@'".to_owned()));
        }
        spec.url_or_path = Some(url.to_owned());
        if !tail.is_empty() {
            match tail.strip_prefix(';') {
                Some(markers) => spec.markers = Some(parse_markers(markers)?),
                None => return Err(multiple(text)),
            }
        }
        return Ok(spec);
    }

    let (specifier, markers) = match rest.split_once(';') {
        Some((specifier, markers)) => (specifier.trim(), Some(parse_markers(markers)?)),
        None => (rest.trim(), None),
    };
    if !specifier.is_empty() {
        if has_second_requirement(specifier) {
            return Err(multiple(text));
        }
        let canonical = specifiers
            .parse_specifier(specifier)
            .map_err(TokenizeError::Grammar)?;
        spec.specifier = Some(canonical);
    }
    spec.markers = markers;
    Ok(spec)
}

/// Tokenize the args part of a requirement line.
pub fn tokenize_requirement(
    text: &str,
    specifiers: &dyn SpecifierParser,
) -> Result<RequirementSpec, TokenizeError> {
    let text = text.trim();
    let first = text.split_whitespace().next().unwrap_or_default();
    if !starts_named_with_url(text) && (is_url(first) || looks_like_path(first)) {
        return tokenize_location(text);
    }
    tokenize_named(text, specifiers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specifier::VersionSpecifierShape;

    fn tokenize(text: &str) -> Result<RequirementSpec, TokenizeError> {
        tokenize_requirement(text, &VersionSpecifierShape)
    }

    #[test]
    fn name_and_specifier() {
        let spec = tokenize("pkg==1.0.0").unwrap();
        assert_eq!(spec.name.as_deref(), Some("pkg"));
        assert_eq!(spec.specifier.as_deref(), Some("==1.0.0"));
        assert!(spec.url_or_path.is_none());
        assert!(spec.markers.is_none());
    }

    #[test]
    fn spaces_in_specifier_are_canonicalized() {
        let spec = tokenize("SomeProject >= 2").unwrap();
        assert_eq!(spec.name.as_deref(), Some("SomeProject"));
        assert_eq!(spec.specifier.as_deref(), Some(">=2"));
    }

    #[test]
    fn extras_and_markers() {
        let spec = tokenize("requests[security, socks]>=2.8.1 ; python_version < '3.8'").unwrap();
        assert_eq!(spec.name.as_deref(), Some("requests"));
        let extras: Vec<_> = spec.extras.iter().map(String::as_str).collect();
        assert_eq!(extras, vec!["security", "socks"]);
        assert_eq!(spec.specifier.as_deref(), Some(">=2.8.1"));
        assert_eq!(spec.markers.as_deref(), Some("python_version < '3.8'"));
    }

    #[test]
    fn name_at_url() {
        let spec =
            tokenize("SomeProject @ https://url/SomeProject-py2-py3-none-any.whl").unwrap();
        assert_eq!(spec.name.as_deref(), Some("SomeProject"));
        assert_eq!(
            spec.url_or_path.as_deref(),
            Some("https://url/SomeProject-py2-py3-none-any.whl")
        );
        assert!(spec.specifier.is_none());
    }

    #[test]
    fn name_at_url_without_spaces() {
        let spec = tokenize("pkg[extra]@https://host/pkg.zip ; os_name == 'nt'").unwrap();
        assert_eq!(spec.name.as_deref(), Some("pkg"));
        assert!(spec.extras.contains("extra"));
        assert_eq!(spec.url_or_path.as_deref(), Some("https://host/pkg.zip"));
        assert_eq!(spec.markers.as_deref(), Some("os_name == 'nt'"));
    }

    #[test]
    fn bare_url_with_egg_fragment_supplies_the_name() {
        let spec = tokenize("https://example.com/foo.tar.gz#egg=wat").unwrap();
        assert_eq!(spec.name.as_deref(), Some("wat"));
        assert_eq!(
            spec.url_or_path.as_deref(),
            Some("https://example.com/foo.tar.gz#egg=wat")
        );
    }

    #[test]
    fn bare_url_without_name() {
        let spec = tokenize("https://example.com/foo.tar.gz").unwrap();
        assert!(spec.name.is_none());
        assert_eq!(spec.url_or_path.as_deref(), Some("https://example.com/foo.tar.gz"));
    }

    #[test]
    fn local_path_with_extras_and_markers() {
        let spec = tokenize("./downloads/numpy-1.9.2.whl[fast];sys_platform=='linux'").unwrap();
        assert!(spec.name.is_none());
        assert_eq!(spec.url_or_path.as_deref(), Some("./downloads/numpy-1.9.2.whl"));
        assert!(spec.extras.contains("fast"));
        assert_eq!(spec.markers.as_deref(), Some("sys_platform=='linux'"));
    }

    #[test]
    fn two_requirements_on_one_line() {
        assert!(matches!(tokenize("req1 req2"), Err(TokenizeError::Multiple(_))));
        assert!(matches!(
            tokenize("./a.whl ./b.whl"),
            Err(TokenizeError::Multiple(_))
        ));
        assert!(matches!(
            tokenize("pkg @ https://x/pkg.zip other"),
            Err(TokenizeError::Multiple(_))
        ));
    }

    #[test]
    fn second_requirement_after_a_specifier() {
        for text in [
            "pkg==1.0 other",
            "pkg>=1.0 ./b.whl",
            "pkg==1.0 https://x/y.whl",
            "pkg == 1.0 other",
            "pkg>=1.0, <2 other ; python_version > '3'",
        ] {
            assert!(
                matches!(tokenize(text), Err(TokenizeError::Multiple(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn spaced_clauses_are_one_specifier() {
        assert_eq!(tokenize("pkg >= 1.0").unwrap().specifier.as_deref(), Some(">=1.0"));
        assert_eq!(
            tokenize("pkg>=1.0, <2").unwrap().specifier.as_deref(),
            Some(">=1.0,<2")
        );
        assert_eq!(
            tokenize("pkg>=1.0 , <2").unwrap().specifier.as_deref(),
            Some(">=1.0,<2")
        );
        assert_eq!(
            tokenize("pkg ( >=1.0 )").unwrap().specifier.as_deref(),
            Some(">=1.0")
        );
    }

    #[test]
    fn markers_are_forwarded_verbatim() {
        let spec = tokenize("req1==1.0 ; python_version > '3' and extra == 'x y'").unwrap();
        assert_eq!(
            spec.markers.as_deref(),
            Some("python_version > '3' and extra == 'x y'")
        );
    }

    #[test]
    fn single_equals_is_a_grammar_error() {
        match tokenize("my-package=1.0") {
            Err(TokenizeError::Grammar(msg)) => {
                assert_eq!(msg, "Hint: = is not a valid operator. Did you mean == ?")
            }
            other => panic!("expected grammar error, got {:?}", other),
        }
    }

    #[test]
    fn unclosed_extras_and_empty_markers_are_grammar_errors() {
        assert!(matches!(tokenize("pkg[extra"), Err(TokenizeError::Grammar(_))));
        assert!(matches!(tokenize("pkg==1.0;"), Err(TokenizeError::Grammar(_))));
        assert!(matches!(tokenize("pkg-"), Err(TokenizeError::Grammar(_))));
    }

    #[test]
    fn editable_vcs_url() {
        let spec = tokenize_editable("git+https://url#egg=SomeProject").unwrap();
        assert!(spec.is_editable);
        assert_eq!(spec.name.as_deref(), Some("SomeProject"));
        assert_eq!(spec.url_or_path.as_deref(), Some("git+https://url#egg=SomeProject"));
        assert!(spec.specifier.is_none());
    }

    #[test]
    fn editable_local_path_with_extras() {
        let spec = tokenize_editable("./project[dev,test]").unwrap();
        assert!(spec.is_editable);
        assert!(spec.name.is_none());
        assert_eq!(spec.url_or_path.as_deref(), Some("./project"));
        assert_eq!(spec.extras.len(), 2);
    }

    #[test]
    fn url_detection() {
        assert!(is_url("https://example.com/x"));
        assert!(is_url("git+ssh://git@github.com/x.git"));
        assert!(is_url("file:///tmp/x"));
        assert!(!is_url("C:\\path\\x"));
        assert!(!is_url("pkg==1.0"));
        assert!(is_archive_file("Foo-1.0.TAR.GZ"));
    }
}
