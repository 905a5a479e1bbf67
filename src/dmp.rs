//! Diff-match-patch text patches.
//!
//! Only the parts the patch engine needs: parsing the textual patch format and
//! applying hunks. Hunks are located by exact match at the expected position,
//! falling back to the nearest exact occurrence of their context. All offsets
//! count `char`s.

use regex::Regex;

use crate::errors::{Result, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOp {
    Delete,
    Equal,
    Insert,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextPatch {
    pub diffs: Vec<(DiffOp, String)>,
    pub start1: usize,
    pub start2: usize,
    pub length1: usize,
    pub length2: usize,
}

impl TextPatch {
    /// Text the hunk expects to find: equalities and deletions.
    fn source_text(&self) -> String {
        self.diffs
            .iter()
            .filter(|(op, _)| *op != DiffOp::Insert)
            .map(|(_, text)| text.as_str())
            .collect()
    }

    /// Text the hunk leaves behind: equalities and insertions.
    fn target_text(&self) -> String {
        self.diffs
            .iter()
            .filter(|(op, _)| *op != DiffOp::Delete)
            .map(|(_, text)| text.as_str())
            .collect()
    }
}

const HEADER: &str = r"^@@ -(\d+),?(\d*) \+(\d+),?(\d*) @@$";

fn invalid(message: impl Into<String>) -> StoreError {
    StoreError::InvalidPatchText(message.into())
}

/// Start and length from a header coordinate pair, following the format's
/// conventions: no length means one char at `start - 1`, a zero length keeps
/// `start` as is.
fn coordinates(start: &str, length: &str) -> Result<(usize, usize)> {
    let start: usize = start
        .parse()
        .map_err(|_| invalid(format!("bad start `{start}`")))?;
    match length {
        "" => Ok((start.saturating_sub(1), 1)),
        "0" => Ok((start, 0)),
        n => {
            let n: usize = n.parse().map_err(|_| invalid(format!("bad length `{n}`")))?;
            Ok((start.saturating_sub(1), n))
        }
    }
}

pub fn patch_from_text(text: &str) -> Result<Vec<TextPatch>> {
    let header = Regex::new(HEADER).map_err(|e| invalid(e.to_string()))?;
    let mut patches = Vec::new();
    let mut lines = text.split('\n').peekable();

    while let Some(line) = lines.next() {
        if line.is_empty() {
            continue;
        }
        let caps = header
            .captures(line)
            .ok_or_else(|| invalid(format!("invalid patch string: {line}")))?;
        let (start1, length1) = coordinates(&caps[1], &caps[2])?;
        let (start2, length2) = coordinates(&caps[3], &caps[4])?;
        let mut patch = TextPatch {
            start1,
            start2,
            length1,
            length2,
            ..Default::default()
        };

        while let Some(&body) = lines.peek() {
            let mut chars = body.chars();
            let op = match chars.next() {
                None => {
                    lines.next();
                    continue;
                }
                Some('@') => break,
                Some('-') => DiffOp::Delete,
                Some('+') => DiffOp::Insert,
                Some(' ') => DiffOp::Equal,
                Some(sign) => return Err(invalid(format!("invalid patch mode '{sign}'"))),
            };
            let decoded = urlencoding::decode(chars.as_str())
                .map_err(|e| invalid(format!("bad escape in `{body}`: {e}")))?;
            patch.diffs.push((op, decoded.into_owned()));
            lines.next();
        }

        patches.push(patch);
    }

    Ok(patches)
}

/// Apply `patches` to `text`, returning the new text and whether each hunk applied.
pub fn apply(patches: &[TextPatch], text: &str) -> (String, Vec<bool>) {
    let mut chars: Vec<char> = text.chars().collect();
    let mut results = Vec::with_capacity(patches.len());
    // Drift between expected and actual positions caused by earlier hunks.
    let mut delta: i64 = 0;

    for patch in patches {
        let expected = (patch.start2 as i64 + delta).max(0) as usize;
        let source: Vec<char> = patch.source_text().chars().collect();

        match locate(&chars, &source, expected) {
            Some(start) => {
                delta = start as i64 - expected as i64;
                let target: Vec<char> = patch.target_text().chars().collect();
                chars.splice(start..start + source.len(), target);
                results.push(true);
            }
            None => {
                delta -= patch.length2 as i64 - patch.length1 as i64;
                results.push(false);
            }
        }
    }

    (chars.into_iter().collect(), results)
}

/// Exact match at `expected`, else the occurrence closest to it.
fn locate(text: &[char], pattern: &[char], expected: usize) -> Option<usize> {
    let expected = expected.min(text.len());
    if pattern.is_empty() {
        return Some(expected);
    }
    if text.len() < pattern.len() {
        return None;
    }
    if text[expected..].starts_with(pattern) {
        return Some(expected);
    }
    text.windows(pattern.len())
        .enumerate()
        .filter(|(_, window)| *window == pattern)
        .map(|(i, _)| i)
        .min_by_key(|i| i.abs_diff(expected))
}
