//! Proposed-content diff rendering
//!
//! Shows a reviewer how the proposed content relates to the original
//! snapshot. Three cases, checked in order: pure append (the common
//! "learned traits added to an existing prompt" shape), word-by-word
//! rewrite, or no change at all.
//!
//! The word diff is positional: words are compared at the same index,
//! not aligned by edit distance. A reordering edit therefore marks more
//! words than a minimal diff would. This matches the behavior reviewers
//! already know; do not "fix" it to an LCS diff.

use serde::Serialize;

/// Whether a span of rendered text is carried over or newly introduced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Unchanged,
    Added,
}

/// One contiguous span of the rendered proposed content.
///
/// Concatenating all segment texts reproduces the rendered content, so
/// separators belong to the segment they precede.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffSegment {
    pub kind: SegmentKind,
    pub text: String,
}

/// Which of the three rendering cases matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Identical,
    Append,
    Words,
}

/// Rendered relationship between original and proposed content
#[derive(Debug, Clone, Serialize)]
pub struct RenderedDiff {
    pub kind: DiffKind,
    pub segments: Vec<DiffSegment>,
}

/// A prefix of a rendered diff bounded to a display length
#[derive(Debug, Clone, Serialize)]
pub struct DiffPreview {
    pub segments: Vec<DiffSegment>,
    /// True when content was cut off; the caller offers an expand toggle
    pub has_more: bool,
}

/// Compute the rendered diff between an original snapshot and the
/// proposed replacement.
pub fn diff(original: &str, proposed: &str) -> RenderedDiff {
    if proposed == original {
        let segments = if original.is_empty() {
            Vec::new()
        } else {
            vec![DiffSegment {
                kind: SegmentKind::Unchanged,
                text: original.to_string(),
            }]
        };
        return RenderedDiff {
            kind: DiffKind::Identical,
            segments,
        };
    }

    if proposed.len() > original.len() && proposed.starts_with(original) {
        let mut segments = Vec::with_capacity(2);
        if !original.is_empty() {
            segments.push(DiffSegment {
                kind: SegmentKind::Unchanged,
                text: original.to_string(),
            });
        }
        segments.push(DiffSegment {
            kind: SegmentKind::Added,
            text: proposed[original.len()..].to_string(),
        });
        return RenderedDiff {
            kind: DiffKind::Append,
            segments,
        };
    }

    // Positional word comparison; whitespace runs normalize to one space
    let original_words: Vec<&str> = original.split_whitespace().collect();
    let mut segments: Vec<DiffSegment> = Vec::new();

    for (i, word) in proposed.split_whitespace().enumerate() {
        let kind = if original_words.get(i) == Some(&word) {
            SegmentKind::Unchanged
        } else {
            SegmentKind::Added
        };
        let mut text = String::new();
        if i > 0 {
            text.push(' ');
        }
        text.push_str(word);

        match segments.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(&text),
            _ => segments.push(DiffSegment { kind, text }),
        }
    }

    RenderedDiff {
        kind: DiffKind::Words,
        segments,
    }
}

impl RenderedDiff {
    /// Just the newly introduced text
    pub fn added_text(&self) -> String {
        self.segments
            .iter()
            .filter(|s| s.kind == SegmentKind::Added)
            .map(|s| s.text.as_str())
            .collect()
    }

    /// Plain-text render with added spans wrapped in «» markers
    pub fn annotate(&self) -> String {
        annotate_segments(&self.segments)
    }

    /// A prefix of the render bounded to `max_chars` characters.
    ///
    /// Truncation happens on character boundaries and keeps the cut
    /// segment's kind, so a partially shown added span still reads as
    /// added.
    pub fn preview(&self, max_chars: usize) -> DiffPreview {
        let mut remaining = max_chars;
        let mut segments = Vec::new();
        let mut has_more = false;

        for segment in &self.segments {
            if remaining == 0 {
                has_more = true;
                break;
            }
            let char_count = segment.text.chars().count();
            if char_count <= remaining {
                segments.push(segment.clone());
                remaining -= char_count;
            } else {
                let text: String = segment.text.chars().take(remaining).collect();
                segments.push(DiffSegment {
                    kind: segment.kind,
                    text,
                });
                remaining = 0;
                has_more = true;
            }
        }

        DiffPreview { segments, has_more }
    }
}

impl DiffPreview {
    /// Plain-text render with added spans wrapped in «» markers
    pub fn annotate(&self) -> String {
        annotate_segments(&self.segments)
    }
}

fn annotate_segments(segments: &[DiffSegment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment.kind {
            SegmentKind::Unchanged => out.push_str(&segment.text),
            SegmentKind::Added => {
                out.push('«');
                out.push_str(&segment.text);
                out.push('»');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_case() {
        let d = diff("Hello", "Hello world");
        assert_eq!(d.kind, DiffKind::Append);
        assert_eq!(d.segments.len(), 2);
        assert_eq!(d.segments[0].kind, SegmentKind::Unchanged);
        assert_eq!(d.segments[0].text, "Hello");
        assert_eq!(d.segments[1].kind, SegmentKind::Added);
        assert_eq!(d.segments[1].text, " world");
    }

    #[test]
    fn test_append_from_empty_original() {
        let d = diff("", "forbidden word: yyds");
        assert_eq!(d.kind, DiffKind::Append);
        assert_eq!(d.segments.len(), 1);
        assert_eq!(d.added_text(), "forbidden word: yyds");
    }

    #[test]
    fn test_word_replace_case() {
        let d = diff("a b c", "a x c");
        assert_eq!(d.kind, DiffKind::Words);
        assert_eq!(
            d.segments,
            vec![
                DiffSegment {
                    kind: SegmentKind::Unchanged,
                    text: "a".into()
                },
                DiffSegment {
                    kind: SegmentKind::Added,
                    text: " x".into()
                },
                DiffSegment {
                    kind: SegmentKind::Unchanged,
                    text: " c".into()
                },
            ]
        );
    }

    #[test]
    fn test_word_diff_is_positional_not_minimal() {
        // inserting a word at the front shifts every position; everything
        // after the insert reads as new
        let d = diff("b c", "a b c");
        assert_eq!(d.kind, DiffKind::Words);
        assert!(d.segments.iter().all(|s| s.kind == SegmentKind::Added));
    }

    #[test]
    fn test_shorter_proposed_marks_nothing() {
        // positional diff has no concept of deletion
        let d = diff("a b c", "a b");
        assert_eq!(d.kind, DiffKind::Words);
        assert!(d.segments.iter().all(|s| s.kind == SegmentKind::Unchanged));
    }

    #[test]
    fn test_identical_no_highlighting() {
        let d = diff("same text", "same text");
        assert_eq!(d.kind, DiffKind::Identical);
        assert_eq!(d.segments.len(), 1);
        assert_eq!(d.segments[0].kind, SegmentKind::Unchanged);

        let empty = diff("", "");
        assert_eq!(empty.kind, DiffKind::Identical);
        assert!(empty.segments.is_empty());
    }

    #[test]
    fn test_annotate_marks_added_spans() {
        assert_eq!(diff("Hello", "Hello world").annotate(), "Hello« world»");
        assert_eq!(diff("a b c", "a x c").annotate(), "a« x» c");
    }

    #[test]
    fn test_preview_truncates_inside_added_span() {
        let d = diff("Hello", "Hello world");
        let p = d.preview(8);
        assert!(p.has_more);
        assert_eq!(p.segments.len(), 2);
        assert_eq!(p.segments[1].kind, SegmentKind::Added);
        assert_eq!(p.segments[1].text, " wo");
        assert_eq!(p.annotate(), "Hello« wo»");
    }

    #[test]
    fn test_preview_counts_characters_not_bytes() {
        let d = diff("", "你好世界");
        let p = d.preview(2);
        assert!(p.has_more);
        assert_eq!(p.segments[0].text, "你好");
    }

    #[test]
    fn test_preview_of_short_content_is_complete() {
        let d = diff("Hello", "Hello world");
        let p = d.preview(100);
        assert!(!p.has_more);
        assert_eq!(p.annotate(), d.annotate());
    }
}
