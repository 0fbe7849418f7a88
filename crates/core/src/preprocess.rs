//! Physical lines -> logical lines -> text and comment segments.
//!
//! Both stages are lazy iterator adapters over owned `(line_number, text)`
//! pairs, so a manifest is only walked as far as the caller pulls.

/// A 1-based physical or logical line number and its text.
pub type NumberedLine = (u32, String);

const ESCAPE: char = '\\';
const COMMENT: char = '#';

/// One half of a logical line, carrying the logical line's number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text { line_number: u32, text: String },
    Comment { line_number: u32, text: String },
}

impl Segment {
    pub fn line_number(&self) -> u32 {
        match self {
            Segment::Text { line_number, .. } | Segment::Comment { line_number, .. } => *line_number,
        }
    }
}

pub type Segments = SplitComments<JoinLines<std::vec::IntoIter<NumberedLine>>>;

/// Split, join and comment-split manifest content.
pub fn preprocess(content: &str) -> Segments {
    SplitComments::new(JoinLines::new(number_lines(content).into_iter()))
}

/// Number physical lines from 1 and drop blank ones.
pub fn number_lines(content: &str) -> Vec<NumberedLine> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| (idx as u32 + 1, line.to_owned()))
        .collect()
}

fn is_comment_line(line: &str) -> bool {
    line.trim_start().starts_with(COMMENT)
}

/// The line without its trailing escape, or `None` when the line does not
/// request continuation. Comment lines never continue.
fn strip_escape(line: &str) -> Option<&str> {
    if is_comment_line(line) {
        return None;
    }
    line.trim_end().strip_suffix(ESCAPE)
}

// ──────────────────────────────────────────────
// Continuation joiner
// ──────────────────────────────────────────────

/// Joins lines ending in `\` with the lines after them. A comment line may
/// terminate a continuation chain but never extends it.
pub struct JoinLines<I: Iterator<Item = NumberedLine>> {
    lines: I,
}

impl<I: Iterator<Item = NumberedLine>> JoinLines<I> {
    pub fn new(lines: I) -> Self {
        JoinLines { lines }
    }
}

impl<I: Iterator<Item = NumberedLine>> Iterator for JoinLines<I> {
    type Item = NumberedLine;

    fn next(&mut self) -> Option<NumberedLine> {
        let (line_number, first) = self.lines.next()?;
        let mut joined = match strip_escape(&first) {
            Some(head) => head.to_owned(),
            None => return Some((line_number, first)),
        };

        for (_, next) in self.lines.by_ref() {
            if is_comment_line(&next) {
                // keep the marker separated so the comment splitter sees it
                joined.push(' ');
                joined.push_str(&next);
                break;
            }
            match strip_escape(&next) {
                Some(head) => joined.push_str(head),
                None => {
                    joined.push_str(&next);
                    break;
                }
            }
        }
        Some((line_number, joined))
    }
}

// ──────────────────────────────────────────────
// Comment splitter
// ──────────────────────────────────────────────

/// Byte offset of the first `#` that starts a comment: at the start of the
/// line or preceded by whitespace.
pub fn comment_start(line: &str) -> Option<usize> {
    let mut prev: Option<char> = None;
    for (idx, c) in line.char_indices() {
        if c == COMMENT && prev.map_or(true, char::is_whitespace) {
            return Some(idx);
        }
        prev = Some(c);
    }
    None
}

/// Split one logical line into trimmed text and comment parts. Empty parts
/// are `None`.
pub fn split_comment(line: &str) -> (Option<&str>, Option<&str>) {
    let (text, comment) = match comment_start(line) {
        Some(idx) => (&line[..idx], Some(&line[idx..])),
        None => (line, None),
    };
    let text = Some(text.trim()).filter(|t| !t.is_empty());
    let comment = comment.map(str::trim).filter(|c| !c.is_empty());
    (text, comment)
}

pub struct SplitComments<I: Iterator<Item = NumberedLine>> {
    lines: I,
    pending: Option<Segment>,
}

impl<I: Iterator<Item = NumberedLine>> SplitComments<I> {
    pub fn new(lines: I) -> Self {
        SplitComments {
            lines,
            pending: None,
        }
    }
}

impl<I: Iterator<Item = NumberedLine>> Iterator for SplitComments<I> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        if let Some(segment) = self.pending.take() {
            return Some(segment);
        }
        loop {
            let (line_number, line) = self.lines.next()?;
            let (text, comment) = split_comment(&line);
            let comment = comment.map(|c| Segment::Comment {
                line_number,
                text: c.to_owned(),
            });
            match text {
                Some(t) => {
                    self.pending = comment;
                    return Some(Segment::Text {
                        line_number,
                        text: t.to_owned(),
                    });
                }
                None => {
                    if comment.is_some() {
                        return comment;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line_number: u32, text: &str) -> Segment {
        Segment::Text {
            line_number,
            text: text.to_owned(),
        }
    }

    fn comment(line_number: u32, text: &str) -> Segment {
        Segment::Comment {
            line_number,
            text: text.to_owned(),
        }
    }

    fn joined(lines: &[&str]) -> Vec<NumberedLine> {
        let numbered = lines
            .iter()
            .enumerate()
            .map(|(i, l)| (i as u32 + 1, l.to_string()));
        JoinLines::new(numbered).collect()
    }

    #[test]
    fn comment_absorbs_continuation_and_halts() {
        let segments: Vec<_> = preprocess("a \\\n# c \\\nb\n").collect();
        assert_eq!(segments, vec![text(1, "a"), comment(1, "# c \\"), text(3, "b")]);
    }

    #[test]
    fn comment_after_escape_without_space() {
        let segments: Vec<_> = preprocess("req1\\\n# comment\n").collect();
        assert_eq!(segments, vec![text(1, "req1"), comment(1, "# comment")]);
    }

    #[test]
    fn comment_terminates_chain_before_next_requirement() {
        let segments: Vec<_> = preprocess("req1 \\\n# comment\nreq2\n").collect();
        assert_eq!(
            segments,
            vec![text(1, "req1"), comment(1, "# comment"), text(3, "req2")]
        );
    }

    #[test]
    fn joins_take_first_line_number() {
        let lines = joined(&[
            "line 1",
            "line 2:1 \\",
            "line 2:2",
            "line 3:1 \\",
            "line 3:2 \\",
            "line 3:3",
            "line 4",
        ]);
        assert_eq!(
            lines,
            vec![
                (1, "line 1".to_string()),
                (2, "line 2:1 line 2:2".to_string()),
                (4, "line 3:1 line 3:2 line 3:3".to_string()),
                (7, "line 4".to_string()),
            ]
        );
    }

    #[test]
    fn dangling_escape_on_last_line_is_dropped() {
        let lines = joined(&["line 1", "line 2 \\"]);
        assert_eq!(
            lines,
            vec![(1, "line 1".to_string()), (2, "line 2 ".to_string())]
        );
    }

    #[test]
    fn trailing_whitespace_after_escape_still_continues() {
        let lines = joined(&["--extra-index-url url1 \\  ", "--extra-index-url url2"]);
        assert_eq!(
            lines,
            vec![(1, "--extra-index-url url1 --extra-index-url url2".to_string())]
        );
    }

    #[test]
    fn comment_line_with_escape_does_not_start_a_chain() {
        let lines = joined(&["# note \\", "pkg"]);
        assert_eq!(
            lines,
            vec![(1, "# note \\".to_string()), (2, "pkg".to_string())]
        );
    }

    #[test]
    fn blank_lines_are_dropped_but_keep_numbering() {
        let segments: Vec<_> = preprocess("\n  \nreq1\n\nreq2").collect();
        assert_eq!(segments, vec![text(3, "req1"), text(5, "req2")]);
    }

    #[test]
    fn hash_inside_token_is_not_a_comment() {
        let segments: Vec<_> =
            preprocess("https://example.com/foo.tar.gz#egg=wat # Comment ").collect();
        assert_eq!(
            segments,
            vec![
                text(1, "https://example.com/foo.tar.gz#egg=wat"),
                comment(1, "# Comment"),
            ]
        );
    }

    #[test]
    fn comment_only_line_has_no_text() {
        assert_eq!(split_comment("   # just a note  "), (None, Some("# just a note")));
        assert_eq!(split_comment("pkg==1.0"), (Some("pkg==1.0"), None));
    }
}
