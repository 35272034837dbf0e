//! Extracted page text with positions

use crate::document::Rect;
use crate::lines::{split_lines, LinePolicy};

/// Character position information for text search
#[derive(Clone, Debug)]
pub struct CharInfo {
    /// X coordinate of the glyph origin in page units
    pub x: f32,
    /// The character
    pub c: char,
}

/// One line as laid out by the PDF engine
#[derive(Clone, Debug)]
pub struct LineBounds {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    /// Characters in this line with their positions
    pub chars: Vec<CharInfo>,
}

impl LineBounds {
    pub fn text(&self) -> String {
        self.chars.iter().map(|ch| ch.c).collect()
    }

    fn rect(&self) -> Rect {
        Rect::new(self.x0, self.y0, self.x1, self.y1)
    }

    /// Horizontal sub-rect covering `chars[start..end]`
    fn span_rect(&self, start: usize, end: usize) -> Rect {
        let x0 = self.chars.get(start).map_or(self.x0, |ch| ch.x);
        let x1 = self.chars.get(end).map_or(self.x1, |ch| ch.x);
        Rect::new(x0, self.y0, x1.max(x0), self.y1)
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of one page: engine lines with positions, and reveal lines derived
/// from them.
#[derive(Debug, Default)]
pub struct PageText {
    pub line_bounds: Vec<LineBounds>,
    pub lines: Vec<String>,
}

impl PageText {
    pub fn new(line_bounds: Vec<LineBounds>, policy: LinePolicy) -> Self {
        let joined = line_bounds
            .iter()
            .map(LineBounds::text)
            .collect::<Vec<_>>()
            .join("\n");
        let lines = split_lines(&joined, policy);
        Self { line_bounds, lines }
    }

    /// Locate `needle` on the page.
    ///
    /// Exact substring hits within a line produce tight boxes. When there are
    /// none, whitespace-normalized matches fall back to whole-line boxes, and
    /// finally lines that are themselves contained in the needle are used.
    pub fn find(&self, needle: &str) -> Vec<Rect> {
        let needle_norm = normalize(needle);
        if needle_norm.is_empty() {
            return Vec::new();
        }

        let target: Vec<char> = needle.chars().collect();
        let exact: Vec<Rect> = self
            .line_bounds
            .iter()
            .flat_map(|line| {
                let chars: Vec<char> = line.chars.iter().map(|ch| ch.c).collect();
                char_matches(&chars, &target)
                    .into_iter()
                    .map(|start| line.span_rect(start, start + target.len()))
                    .collect::<Vec<_>>()
            })
            .collect();
        if !exact.is_empty() {
            return exact;
        }

        let normalized: Vec<Rect> = self
            .line_bounds
            .iter()
            .filter(|line| normalize(&line.text()).contains(&needle_norm))
            .map(LineBounds::rect)
            .collect();
        if !normalized.is_empty() {
            return normalized;
        }

        self.line_bounds
            .iter()
            .filter(|line| {
                let text = normalize(&line.text());
                !text.is_empty() && needle_norm.contains(&text)
            })
            .map(LineBounds::rect)
            .collect()
    }
}

/// Start offsets of non-overlapping occurrences of `target` in `haystack`
fn char_matches(haystack: &[char], target: &[char]) -> Vec<usize> {
    let mut hits = Vec::new();
    if target.is_empty() || target.len() > haystack.len() {
        return hits;
    }
    let mut i = 0;
    while i + target.len() <= haystack.len() {
        if haystack[i..i + target.len()] == *target {
            hits.push(i);
            i += target.len();
        } else {
            i += 1;
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, y: f32) -> LineBounds {
        let chars = text
            .chars()
            .enumerate()
            .map(|(i, c)| CharInfo {
                x: 10.0 + i as f32 * 5.0,
                c,
            })
            .collect();
        LineBounds {
            x0: 10.0,
            y0: y,
            x1: 10.0 + text.chars().count() as f32 * 5.0,
            y1: y + 12.0,
            chars,
        }
    }

    #[test]
    fn lines_follow_policy() {
        let text = PageText::new(
            vec![line("Heading", 0.0), line("   ", 12.0), line("Body  text", 24.0)],
            LinePolicy::SkipBlank,
        );
        assert_eq!(text.lines, vec!["Heading", "Body text"]);

        let text = PageText::new(vec![line("a", 0.0), line("", 12.0)], LinePolicy::KeepAll);
        assert_eq!(text.lines, vec!["a", ""]);
    }

    #[test]
    fn exact_match_gives_tight_box() {
        let text = PageText::new(vec![line("hello world", 0.0)], LinePolicy::SkipBlank);
        let rects = text.find("world");
        assert_eq!(rects, vec![Rect::new(40.0, 0.0, 65.0, 12.0)]);
    }

    #[test]
    fn normalized_match_falls_back_to_line_box() {
        let text = PageText::new(vec![line("Body  text", 24.0)], LinePolicy::SkipBlank);
        assert_eq!(text.find("Body text"), vec![Rect::new(10.0, 24.0, 60.0, 36.0)]);
    }

    #[test]
    fn partial_match_uses_contained_lines() {
        let text = PageText::new(
            vec![line("first half", 0.0), line("second half", 12.0)],
            LinePolicy::SkipBlank,
        );
        let rects = text.find("first half second half");
        assert_eq!(rects.len(), 2);
    }

    #[test]
    fn missing_text_has_no_boxes() {
        let text = PageText::new(vec![line("abc", 0.0)], LinePolicy::SkipBlank);
        assert!(text.find("xyz").is_empty());
        assert!(text.find("  ").is_empty());
    }

    #[test]
    fn char_matches_are_non_overlapping() {
        let hay: Vec<char> = "aaaa".chars().collect();
        let target: Vec<char> = "aa".chars().collect();
        assert_eq!(char_matches(&hay, &target), vec![0, 2]);
    }
}
