//! Chunked input and the resumable parse contract.
use crate::config::DEFAULT_MAX_PARSE_DEPTH;
use crate::error::ParseError;

/// A position in the overall stream, carried across chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    /// Byte offset from the start of the stream.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

impl Default for Mark {
    fn default() -> Self {
        Mark {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl Mark {
    fn advance(&mut self, c: char) {
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

/// One chunk of text offered to a parser.
///
/// A chunk is either followed by more input (`Input::new`) or is the final one
/// (`Input::last`). Rules see one character at a time through [`Input::head`] and
/// consume it with [`Input::step`].
#[derive(Debug, Clone)]
pub struct Input<'a> {
    chunk: &'a str,
    index: usize,
    last: bool,
    mark: Mark,
    /// Nesting level of the rule being fed. Every feed descends from the outermost
    /// rule, so this is rebuilt on each call and never carried across chunks.
    depth: usize,
    max_depth: usize,
}

impl<'a> Input<'a> {
    /// A chunk that more input will follow.
    pub fn new(chunk: &'a str) -> Self {
        Input::resume(chunk, Mark::default(), false)
    }

    /// The final chunk of a stream.
    pub fn last(chunk: &'a str) -> Self {
        Input::resume(chunk, Mark::default(), true)
    }

    /// Continues a stream whose previous chunks ended at `mark`.
    pub fn resume(chunk: &'a str, mark: Mark, last: bool) -> Self {
        Input {
            chunk,
            index: 0,
            last,
            mark,
            depth: 0,
            max_depth: DEFAULT_MAX_PARSE_DEPTH,
        }
    }

    /// Limits how deeply brackets, markup, selector steps and operators may nest.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Enters a nested rule.
    pub fn descend(&mut self) -> Result<(), ParseError> {
        self.check_depth(1)?;
        self.depth += 1;
        Ok(())
    }

    pub fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Fails if `levels` more levels below the current rule would pass the limit.
    pub fn check_depth(&self, levels: usize) -> Result<(), ParseError> {
        if self.depth + levels <= self.max_depth {
            return Ok(());
        }
        let Mark {
            offset,
            line,
            column,
        } = self.mark;
        Err(ParseError::TooDeep {
            max: self.max_depth,
            span: (offset, 0).into(),
            line,
            column,
        })
    }

    pub fn head(&self) -> Option<char> {
        self.chunk[self.index..].chars().next()
    }

    pub fn step(&mut self) {
        if let Some(c) = self.head() {
            self.index += c.len_utf8();
            self.mark.advance(c);
        }
    }

    /// A character is available.
    pub fn is_cont(&self) -> bool {
        self.index < self.chunk.len()
    }

    /// This chunk is exhausted but more input may follow.
    pub fn is_empty(&self) -> bool {
        !self.is_cont() && !self.last
    }

    /// The final chunk is exhausted.
    pub fn is_done(&self) -> bool {
        !self.is_cont() && self.last
    }

    pub fn is_last(&self) -> bool {
        self.last
    }

    pub fn mark(&self) -> Mark {
        self.mark
    }

    pub fn remaining(&self) -> &'a str {
        &self.chunk[self.index..]
    }

    /// Describes what was found at the current position instead of `expected`.
    pub fn error(&self, expected: impl Into<String>) -> ParseError {
        let expected = expected.into();
        let Mark {
            offset,
            line,
            column,
        } = self.mark;
        match self.head() {
            Some(found) => ParseError::UnexpectedChar {
                found,
                expected,
                span: (offset, found.len_utf8()).into(),
                line,
                column,
            },
            None => ParseError::UnexpectedEnd {
                expected,
                span: (offset, 0).into(),
                line,
                column,
            },
        }
    }
}

/// Outcome of feeding a rule that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress<T> {
    /// The chunk was consumed and the rule needs more input.
    Pending,
    /// The rule finished. Characters after the match are left in the input.
    Done(T),
}

impl<T> Progress<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Progress<U> {
        match self {
            Progress::Pending => Progress::Pending,
            Progress::Done(value) => Progress::Done(f(value)),
        }
    }
}

/// A grammar rule that can be suspended at any character boundary.
///
/// The rule value itself is the continuation: everything needed to resume lives in
/// its fields, so feeding the same text split differently yields the same result.
/// A rule returns `Pending` only once it has consumed every character of a chunk
/// that is not the last, and never returns `Pending` for a finished stream.
pub trait Parse {
    type Output;

    fn feed(&mut self, input: &mut Input<'_>) -> Result<Progress<Self::Output>, ParseError>;
}

/// Returns the head character, or `None` after reporting what to do when there is none.
///
/// Used at the top of a rule's loop: `Ok(None)` means the chunk is exhausted and more
/// may follow, so the caller should return `Pending`.
pub(crate) fn head_or_end(input: &Input<'_>, expected: &str) -> Result<Option<char>, ParseError> {
    match input.head() {
        Some(c) => Ok(Some(c)),
        None if input.is_done() => Err(input.error(expected)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_states() {
        let mut input = Input::new("ab");
        assert!(input.is_cont());
        input.step();
        input.step();
        assert!(input.is_empty());
        assert!(!input.is_done());

        let input = Input::last("");
        assert!(input.is_done());
    }

    #[test]
    fn test_mark_tracks_lines() {
        let mut input = Input::last("a\né");
        input.step();
        input.step();
        assert_eq!(
            input.mark(),
            Mark {
                offset: 2,
                line: 2,
                column: 1
            }
        );
        input.step();
        assert_eq!(input.mark().offset, 4);
        assert_eq!(input.mark().column, 2);
    }

    #[test]
    fn test_depth_limit() {
        let mut input = Input::last("{").with_max_depth(2);
        assert!(input.descend().is_ok());
        assert!(input.descend().is_ok());
        assert_eq!(input.depth(), 2);
        assert!(matches!(
            input.descend(),
            Err(ParseError::TooDeep { max: 2, .. })
        ));
        input.ascend();
        assert!(input.check_depth(1).is_ok());
        assert!(input.check_depth(2).is_err());
    }

    #[test]
    fn test_error_at_end() {
        let input = Input::last("");
        assert!(matches!(
            input.error("value"),
            ParseError::UnexpectedEnd { .. }
        ));
    }
}
