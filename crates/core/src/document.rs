//! Whole-manifest view: entries grouped by kind, and text reassembly.

use crate::ast::*;
use crate::error::ReqFileError;
use crate::resolve::{ResolveOptions, Resolver};
use crate::source::ContentProvider;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequirementsFile {
    pub requirements: Vec<RequirementEntry>,
    pub options: Vec<OptionEntry>,
    pub invalid_lines: Vec<InvalidEntry>,
    pub comments: Vec<CommentEntry>,
}

impl RequirementsFile {
    /// Group a resolved entry sequence, keeping encounter order per group.
    pub fn from_entries(entries: impl IntoIterator<Item = ParsedEntry>) -> Self {
        let mut file = RequirementsFile::default();
        for entry in entries {
            match entry {
                ParsedEntry::Requirement(e) => file.requirements.push(e),
                ParsedEntry::Option(e) => file.options.push(e),
                ParsedEntry::Invalid(e) => file.invalid_lines.push(e),
                ParsedEntry::Comment(e) => file.comments.push(e),
            }
        }
        file
    }

    /// Resolve `manifest_id` with `options`. Pass
    /// `ResolveOptions::default()` to expand `-r`/`-c` includes, or use
    /// [`RequirementsFile::parse_single`] to read one manifest on its own.
    pub fn parse(
        manifest_id: &str,
        provider: &dyn ContentProvider,
        options: ResolveOptions,
    ) -> Result<Self, ReqFileError> {
        let resolver = Resolver::new(provider).with_options(options);
        let entries = resolver
            .resolve(manifest_id, false)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_entries(entries))
    }

    /// Parse one manifest without fetching the manifests it includes; its
    /// `-r`/`-c` lines are kept as option entries.
    pub fn parse_single(
        manifest_id: &str,
        provider: &dyn ContentProvider,
    ) -> Result<Self, ReqFileError> {
        let options = ResolveOptions {
            include_nested: false,
            ..ResolveOptions::default()
        };
        Self::parse(manifest_id, provider, options)
    }

    /// Reassemble manifest text from the stored logical lines. Lines come out
    /// in line-number order; a comment sharing its line number with the
    /// previous line is appended to it.
    pub fn dumps(&self) -> String {
        let mut lines: Vec<(&RequirementLine, bool)> = self
            .requirements
            .iter()
            .map(|e| &e.requirement_line)
            .chain(self.invalid_lines.iter().map(|e| &e.requirement_line))
            .chain(self.options.iter().map(|e| &e.requirement_line))
            .map(|line| (line, false))
            .chain(self.comments.iter().map(|e| (&e.requirement_line, true)))
            .collect();
        lines.sort_by_key(|(line, is_comment)| (line.line_number, *is_comment));

        let mut dumped: Vec<String> = Vec::with_capacity(lines.len());
        let mut previous_line_number = 0;
        for (line, is_comment) in lines {
            let trailing = is_comment && line.line_number == previous_line_number;
            previous_line_number = line.line_number;
            if trailing {
                if let Some(last) = dumped.last_mut() {
                    last.push(' ');
                    last.push_str(&line.raw_text);
                    continue;
                }
            }
            dumped.push(line.raw_text.clone());
        }

        let mut out = String::new();
        for line in dumped {
            out.push_str(&line);
            out.push('\n');
        }
        out
    }

    pub fn is_valid(&self) -> bool {
        self.invalid_lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryProvider;

    fn parse(content: &str) -> RequirementsFile {
        let provider = InMemoryProvider::new().with("reqs.txt", content);
        RequirementsFile::parse("reqs.txt", &provider, ResolveOptions::default()).unwrap()
    }

    #[test]
    fn groups_by_kind() {
        let file = parse("# top\n-i https://pypi.org/simple\npkg==1.0 # pinned\nbad=1\n");
        assert_eq!(file.requirements.len(), 1);
        assert_eq!(file.options.len(), 1);
        assert_eq!(file.invalid_lines.len(), 1);
        assert_eq!(file.comments.len(), 2);
        assert!(!file.is_valid());
    }

    #[test]
    fn dumps_reattaches_trailing_comments() {
        let file = parse("# top\n\npkg==1.0   # pinned\n--pre\n");
        assert_eq!(file.dumps(), "# top\npkg==1.0 # pinned\n--pre\n");
    }

    #[test]
    fn dumps_uses_logical_lines() {
        let file = parse("pkg\\\n>=1.0\nother\n");
        assert_eq!(file.requirements[0].specifier.as_deref(), Some(">=1.0"));
        assert_eq!(file.dumps(), "pkg>=1.0\nother\n");
    }

    #[test]
    fn parse_single_keeps_includes_as_options() {
        let provider = InMemoryProvider::new().with("reqs.txt", "-r missing.txt\npkg\n");
        let file = RequirementsFile::parse_single("reqs.txt", &provider).unwrap();
        assert_eq!(file.requirements.len(), 1);
        assert_eq!(file.options.len(), 1);
        assert_eq!(file.dumps(), "-r missing.txt\npkg\n");

        assert!(RequirementsFile::parse("reqs.txt", &provider, ResolveOptions::default()).is_err());
    }

    #[test]
    fn serializes_to_json() {
        let file = parse("pkg[extra]==1.0\n");
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["requirements"][0]["name"], "pkg");
        assert_eq!(json["requirements"][0]["extras"][0], "extra");
        assert_eq!(json["requirements"][0]["requirement_line"]["line_number"], 1);
    }
}
