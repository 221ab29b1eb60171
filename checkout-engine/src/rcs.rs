//! Ed-style line diff apply/invert, the algorithmic core of RCS delta
//! storage: trunk revisions are kept as the diff needed to turn a revision's
//! *successor* text back into its own text, so walking from the head down to
//! any trunk ancestor is a chain of `apply_diff` calls.
//!
//! Byte-exact: lines are split on `\n` only, `\r` (if present) travels with
//! its line, and whether the text ends in a trailing newline is tracked
//! explicitly rather than assumed, so a revision whose true content has no
//! final newline doesn't gain a spurious one on reconstruction.

use std::str;

/// A text buffer produced by applying (or about to have applied to it) a
/// sequence of ed commands. Holds the line-oriented working form during
/// construction and exposes the flattened bytes once done.
pub struct RcsStream {
    lines: Vec<Vec<u8>>,
    has_trailing_newline: bool,
}

#[derive(Debug, Clone)]
enum Command {
    Add { line: usize, count: usize, text: Vec<Vec<u8>> },
    Delete { line: usize, count: usize },
}

impl RcsStream {
    pub fn new(text: Vec<u8>) -> Self {
        let has_trailing_newline = text.is_empty() || text.ends_with(b"\n");
        Self { lines: split_lines(&text), has_trailing_newline }
    }

    pub fn get_text(&self) -> Vec<u8> {
        join_lines(&self.lines, self.has_trailing_newline)
    }

    pub fn into_text(self) -> Vec<u8> {
        join_lines(&self.lines, self.has_trailing_newline)
    }

    /// Applies an ed-style diff (`a<line> <count>` / `d<line> <count>`,
    /// 1-based line numbers referring to positions in the text as it stood
    /// at the start of this diff) to this stream's current text, producing
    /// the resulting text as a new `RcsStream`.
    pub fn apply_diff(&self, diff: &[u8]) -> Result<RcsStream, String> {
        let (commands, marker) = parse_commands(diff)?;
        let mut output: Vec<Vec<u8>> = Vec::with_capacity(self.lines.len());
        let mut cursor = 0usize; // next unconsumed line index in self.lines, 0-based

        for command in &commands {
            match command {
                Command::Add { line, count, text } => {
                    let line = *line;
                    // Insert after pre-diff line `line`; copy through
                    // everything up to and including it first.
                    if line > self.lines.len() {
                        return Err(format!(
                            "add command references line {} past end of text ({} lines)",
                            line,
                            self.lines.len()
                        ));
                    }
                    while cursor < line {
                        output.push(self.lines[cursor].clone());
                        cursor += 1;
                    }
                    debug_assert_eq!(text.len(), *count);
                    output.extend(text.iter().cloned());
                }
                Command::Delete { line, count } => {
                    let (line, count) = (*line, *count);
                    if line == 0 || line > self.lines.len() {
                        return Err(format!(
                            "delete command references line {} out of range ({} lines)",
                            line,
                            self.lines.len()
                        ));
                    }
                    while cursor < line - 1 {
                        output.push(self.lines[cursor].clone());
                        cursor += 1;
                    }
                    let end = (line - 1 + count).min(self.lines.len());
                    cursor = end;
                }
            }
        }
        // Whether the catch-up copy below will run at all decides where the
        // new text's last line comes from: an untouched copy of this
        // stream's own tail (so it inherits this stream's trailing-newline
        // state), or fresh content introduced by the final command (whose
        // trailing-newline state has to come from the marker or, lacking
        // one, from whether the raw diff bytes themselves end in `\n`).
        let tail_copied_from_self = cursor < self.lines.len();
        while cursor < self.lines.len() {
            output.push(self.lines[cursor].clone());
            cursor += 1;
        }

        let has_trailing_newline = marker.unwrap_or_else(|| {
            if tail_copied_from_self {
                self.has_trailing_newline
            } else {
                match commands.last() {
                    Some(Command::Add { .. }) => diff.ends_with(b"\n"),
                    _ => true,
                }
            }
        });

        Ok(RcsStream { lines: output, has_trailing_newline })
    }

    /// Computes the inverse of `apply_diff(diff)`: a diff that, applied to
    /// the post-diff text, reproduces this stream's current (pre-diff)
    /// text. Used by the recorder to store trunk revisions as reverse
    /// deltas from the head.
    ///
    /// Inverse command line numbers must reference the *output* text's
    /// running length at the point each original command took effect, not
    /// the original text's numbering: once one command has already
    /// inserted or deleted lines earlier in the same diff, the two
    /// numberings diverge.
    pub fn invert_diff(&self, diff: &[u8]) -> Result<Vec<u8>, String> {
        let (commands, _) = parse_commands(diff)?;
        let mut inverse = Vec::new();
        let mut cursor = 0usize; // position in self.lines (pre-diff text)
        let mut output_len = 0usize; // running length of the text being produced

        for command in &commands {
            match command {
                Command::Add { line, count, .. } => {
                    let (line, count) = (*line, *count);
                    if line > self.lines.len() {
                        return Err(format!(
                            "add command references line {} past end of text ({} lines)",
                            line,
                            self.lines.len()
                        ));
                    }
                    output_len += line - cursor;
                    cursor = line;

                    // The inverse must delete these `count` lines, which
                    // will sit immediately after `output_len` once inserted.
                    inverse.extend_from_slice(format!("d{} {}\n", output_len + 1, count).as_bytes());
                }
                Command::Delete { line, count } => {
                    let (line, count) = (*line, *count);
                    if line == 0 || line > self.lines.len() {
                        return Err(format!(
                            "delete command references line {} out of range ({} lines)",
                            line,
                            self.lines.len()
                        ));
                    }
                    output_len += (line - 1) - cursor;
                    cursor = line - 1;

                    let end = (cursor + count).min(self.lines.len());
                    let removed = &self.lines[cursor..end];

                    inverse.extend_from_slice(format!("a{} {}\n", output_len, removed.len()).as_bytes());
                    for removed_line in removed {
                        inverse.extend_from_slice(removed_line);
                        inverse.push(b'\n');
                    }

                    cursor = end;
                }
            }
        }

        // Record this stream's own trailing-newline state so that applying
        // the inverse back reproduces it exactly, instead of leaving the
        // forward direction to guess at a text it never actually saw whole.
        inverse.extend_from_slice(format!("n{}\n", self.has_trailing_newline as u8).as_bytes());

        Ok(inverse)
    }
}

/// Parses an ed-style diff into its commands plus an optional trailing
/// newline marker (`n0`/`n1`), emitted by [`RcsStream::invert_diff`] to
/// pin down precisely the text it reconstructs. Diffs from other sources
/// (i.e. native RCS deltatext) carry no such marker; callers fall back to
/// structural inference in that case.
fn parse_commands(diff: &[u8]) -> Result<(Vec<Command>, Option<bool>), String> {
    let mut commands = Vec::new();
    let mut trailing_newline = None;
    let mut lines = diff.split(|&b| b == b'\n');
    loop {
        let header = match lines.next() {
            Some(line) if !line.is_empty() => line,
            _ => break,
        };
        let header = str::from_utf8(header).map_err(|_| "non-utf8 command header".to_string())?;
        let (tag, rest) = header.split_at(1);
        if tag == "n" {
            trailing_newline = Some(match rest {
                "0" => false,
                "1" => true,
                other => return Err(format!("invalid trailing-newline marker {:?}", other)),
            });
            continue;
        }
        let mut parts = rest.trim().split_whitespace();
        let line: usize = parts
            .next()
            .ok_or_else(|| format!("missing line number in command {:?}", header))?
            .parse()
            .map_err(|_| format!("invalid line number in command {:?}", header))?;
        let count: usize = parts
            .next()
            .ok_or_else(|| format!("missing count in command {:?}", header))?
            .parse()
            .map_err(|_| format!("invalid count in command {:?}", header))?;

        match tag {
            "a" => {
                let mut text = Vec::with_capacity(count);
                for _ in 0..count {
                    let body_line = lines
                        .next()
                        .ok_or_else(|| "truncated add command body".to_string())?;
                    text.push(body_line.to_vec());
                }
                commands.push(Command::Add { line, count, text });
            }
            "d" => commands.push(Command::Delete { line, count }),
            other => return Err(format!("unknown command tag {:?}", other)),
        }
    }
    Ok((commands, trailing_newline))
}

fn split_lines(text: &[u8]) -> Vec<Vec<u8>> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<Vec<u8>> = text.split(|&b| b == b'\n').map(|l| l.to_vec()).collect();
    // A trailing `\n` produces one empty trailing split element; drop it so
    // line count matches the conventional "number of newline-terminated
    // lines" reading used by ed commands. A text with no trailing newline
    // keeps its last partial line as-is.
    if text.ends_with(b"\n") {
        lines.pop();
    }
    lines
}

fn join_lines(lines: &[Vec<u8>], has_trailing_newline: bool) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        out.extend_from_slice(line);
        if i + 1 < lines.len() || has_trailing_newline {
            out.push(b'\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_diff_handles_mixed_delete_then_add() {
        let stream = RcsStream::new(b"c\n".to_vec());
        let result = stream.apply_diff(b"d1 1\na1 1\nb\n").unwrap();
        assert_eq!(result.into_text(), b"b\n".to_vec());
    }

    #[test]
    fn invert_diff_round_trips_scenario_s1() {
        let head = RcsStream::new(b"c\n".to_vec());
        let diff = b"d1 1\na1 1\nb\n";
        let child = head.apply_diff(diff).unwrap();
        assert_eq!(child.get_text(), b"b\n".to_vec());

        let inverse = head.invert_diff(diff).unwrap();
        let restored = child.apply_diff(&inverse).unwrap();
        assert_eq!(restored.into_text(), b"c\n".to_vec());
    }

    #[test]
    fn apply_diff_pure_insert_at_end() {
        let stream = RcsStream::new(b"a\nb\n".to_vec());
        let result = stream.apply_diff(b"a2 1\nc\n").unwrap();
        assert_eq!(result.into_text(), b"a\nb\nc\n".to_vec());
    }

    #[test]
    fn apply_diff_pure_delete_middle() {
        let stream = RcsStream::new(b"a\nb\nc\n".to_vec());
        let result = stream.apply_diff(b"d2 1\n").unwrap();
        assert_eq!(result.into_text(), b"a\nc\n".to_vec());
    }

    #[test]
    fn new_preserves_missing_trailing_newline() {
        let stream = RcsStream::new(b"a\nb".to_vec());
        assert_eq!(stream.get_text(), b"a\nb".to_vec());
    }

    #[test]
    fn apply_diff_untouched_tail_inherits_missing_trailing_newline() {
        let stream = RcsStream::new(b"a\nb".to_vec());
        let result = stream.apply_diff(b"a0 1\nz\n").unwrap();
        assert_eq!(result.into_text(), b"z\na\nb".to_vec());
    }

    #[test]
    fn apply_diff_fresh_tail_without_newline_marker_follows_diff_bytes() {
        let stream = RcsStream::new(b"a\nb\n".to_vec());
        let result = stream.apply_diff(b"d2 1\na2 1\nc").unwrap();
        assert_eq!(result.into_text(), b"a\nc".to_vec());
    }

    #[test]
    fn invert_diff_round_trips_missing_trailing_newline() {
        let head = RcsStream::new(b"a\nb".to_vec());
        let diff = b"d2 1\na2 1\nc\n";
        let child = head.apply_diff(diff).unwrap();
        assert_eq!(child.get_text(), b"a\nc\n".to_vec());

        let inverse = head.invert_diff(diff).unwrap();
        let restored = child.apply_diff(&inverse).unwrap();
        assert_eq!(restored.into_text(), b"a\nb".to_vec());
    }
}
