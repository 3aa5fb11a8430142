//! The parser interface, the shared parser handle and the parse entry points.

use std::{fmt, sync::Arc};

use bumpalo::Bump;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    cfg::CfExpr,
    error::{DesugarError, Failure, ParseError},
    result::{ParseResult, ParseState},
    stream::{Endianness, InputStream},
    token::{Records, Token},
};

/// The result of running a single parser.
pub type PResult<'a, R> = Result<Token<'a, R>, Failure>;

/// The interface every combinator implements.
///
/// Implementations are immutable once constructed: `parse` takes `&self`
/// and all per-parse state lives in the [`ParseState`].
pub trait Parse<R: Records = ()>: fmt::Debug + Send + Sync {
    /// Attempts to parse at the current cursor position.
    ///
    /// On success the cursor has been advanced past exactly the consumed
    /// input. On failure the cursor may have moved; callers that go on to
    /// try something else restore a saved cursor first.
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R>;

    /// Whether this parser's language is regular.
    fn is_valid_regular(&self) -> bool {
        false
    }

    /// Whether this parser's language is context-free.
    fn is_valid_cf(&self) -> bool {
        false
    }

    /// Lowers this parser to a [`CfExpr`].
    ///
    /// Parsers outside the context-free fragment return
    /// [`DesugarError::Unsupported`].
    fn desugar(&self) -> Result<CfExpr, DesugarError>;
}

/// Options for a top-level parse.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParseOptions {
    /// The endianness the cursor starts with.
    pub endianness: Endianness,

    /// Fail unless the grammar consumes the entire input.
    pub require_end: bool,
}

impl ParseOptions {
    /// Sets the starting endianness.
    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Sets whether the entire input must be consumed.
    pub fn require_end(mut self, require_end: bool) -> Self {
        self.require_end = require_end;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            endianness: Endianness::NETWORK,
            require_end: false,
        }
    }
}

/// A shared, immutable parser.
///
/// Cloning is cheap. Parsers may be used from several threads at once, each
/// parse with its own arena.
pub struct Parser<R: Records = ()> {
    inner: Arc<dyn Parse<R>>,
}

impl<R: Records> Parser<R> {
    /// Wraps a combinator implementation.
    pub fn new<P>(parser: P) -> Self
    where
        P: Parse<R> + 'static,
    {
        Parser {
            inner: Arc::new(parser),
        }
    }

    pub(crate) fn as_arc(&self) -> &Arc<dyn Parse<R>> {
        &self.inner
    }

    /// Runs this parser as a sub-parser of the current parse.
    #[inline]
    pub fn run<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        self.inner.parse(state)
    }

    /// Runs this parser and restores the cursor if it fails.
    pub fn attempt<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        let start = state.save();
        let res = self.run(state);
        if res.is_err() {
            state.restore(start);
        }
        res
    }

    /// Whether this parser's language is regular.
    pub fn is_valid_regular(&self) -> bool {
        self.inner.is_valid_regular()
    }

    /// Whether this parser's language is context-free.
    pub fn is_valid_cf(&self) -> bool {
        self.inner.is_valid_cf()
    }

    /// Lowers this parser to a [`CfExpr`], if it is context-free.
    ///
    /// The lowered form accepts every input this parser accepts with
    /// [`ParseOptions::require_end`], but it may accept more: it knows
    /// nothing of ordered choice, greedy repetition or semantic actions.
    pub fn lower(&self) -> Result<CfExpr, DesugarError> {
        self.inner.desugar()
    }

    /// Parses `input`, allocating the result in `arena`.
    ///
    /// The arena may be shared with other results; reset it with
    /// [`Bump::reset`] once nothing borrows from it any more.
    ///
    /// ## Example
    /// ```
    /// use rivet::{bumpalo::Bump, length_value, sequence, uint16, uint8, Parser, Token};
    ///
    /// let grammar: Parser = sequence(vec![uint16(), length_value(uint8(), uint8())]);
    /// let bump = Bump::new();
    ///
    /// let res = grammar.parse(&[0x00, 0x01, 0x02, 0x0a, 0x0b], &bump).unwrap();
    /// assert_eq!(res.bit_length(), 40);
    /// assert_eq!(res.ast().field(0), Some(&Token::uint(1, 16)));
    ///
    /// assert!(grammar.parse(&[0x00, 0x01, 0x05, 0x0a], &bump).is_none());
    /// ```
    pub fn parse<'a>(&self, input: &[u8], arena: &'a Bump) -> Option<ParseResult<'a, R>> {
        self.try_parse(input, arena).ok()
    }

    /// Parses `input`, reporting why a failed parse failed.
    pub fn try_parse<'a>(
        &self,
        input: &[u8],
        arena: &'a Bump,
    ) -> Result<ParseResult<'a, R>, ParseError> {
        self.parse_with(input, arena, &ParseOptions::default())
    }

    /// Parses `input` with explicit options.
    pub fn parse_with<'a>(
        &self,
        input: &[u8],
        arena: &'a Bump,
        options: &ParseOptions,
    ) -> Result<ParseResult<'a, R>, ParseError> {
        let mut state = ParseState::new(InputStream::new(input, options.endianness), arena);
        trace!(len = input.len(), ?options, "parse");

        let outcome = self.run(&mut state);
        let stream = state.input();
        let err = match outcome {
            Ok(_) if options.require_end && !stream.is_at_end() => ParseError::TrailingInput {
                consumed_bits: stream.position_bits(),
                available_bits: stream.len_bits(),
            },
            Ok(ast) => return Ok(ParseResult::new(ast, stream.position_bits(), arena)),
            Err(Failure::Overrun) => ParseError::Overrun {
                available_bits: stream.len_bits(),
            },
            Err(Failure::NoMatch) => ParseError::NoMatch {
                furthest_bit: state.furthest_bits(),
            },
        };

        debug!(%err, "parse failed");
        Err(err)
    }

    /// Parses `input` in a fresh arena that is dropped when `f` returns.
    ///
    /// Nothing borrowed from the arena can escape `f`, so on failure there
    /// is no way to observe partially built trees.
    pub fn with_arena<T, F>(&self, input: &[u8], f: F) -> T
    where
        F: for<'a> FnOnce(Option<ParseResult<'a, R>>) -> T,
    {
        let bump = Bump::new();
        f(self.parse(input, &bump))
    }
}

impl<R: Records> Clone for Parser<R> {
    fn clone(&self) -> Self {
        Parser {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Records> fmt::Debug for Parser<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::*;

    #[test]
    fn test_require_end() {
        let p: Parser = uint8();
        let bump = Bump::new();

        assert!(p.parse(&[1, 2], &bump).is_some());

        let opts = ParseOptions::default().require_end(true);
        assert_eq!(
            p.parse_with(&[1, 2], &bump, &opts).err(),
            Some(ParseError::TrailingInput {
                consumed_bits: 8,
                available_bits: 16
            })
        );
        assert!(p.parse_with(&[1], &bump, &opts).is_ok());
    }

    #[test]
    fn test_error_kinds() {
        let bump = Bump::new();
        assert_eq!(
            uint16::<()>().try_parse(&[1], &bump).err(),
            Some(ParseError::Overrun { available_bits: 8 })
        );
        assert!(matches!(
            ch::<()>(b'a').try_parse(b"b", &bump),
            Err(ParseError::NoMatch { .. })
        ));
    }

    #[test]
    fn test_no_match_reports_furthest_position() {
        let bump = Bump::new();
        // The choice backtracks to the start, but the first alternative got
        // through the 'a' and rejected the byte after it.
        let p: Parser = choice(vec![sequence(vec![ch(b'a'), ch(b'b')]), ch(b'x')]);
        let err = p.try_parse(b"ac", &bump).err();
        assert_eq!(err, Some(ParseError::NoMatch { furthest_bit: 16 }));
        assert_eq!(
            err.map(|e| e.to_string()),
            Some("input did not match the grammar (got as far as bit 16)".to_owned())
        );

        let q: Parser = many1(ch(b'a'));
        assert_eq!(
            q.try_parse(b"b", &bump).err(),
            Some(ParseError::NoMatch { furthest_bit: 8 })
        );
    }

    #[test]
    fn test_options_endianness() {
        let bump = Bump::new();
        let opts = ParseOptions::default().endianness(Endianness::LITTLE);
        let res = uint16::<()>().parse_with(&[0x01, 0x02], &bump, &opts);
        assert_eq!(res.map(|r| r.ast()).ok(), Some(Token::uint(0x0201, 16)));
    }

    #[test]
    fn test_with_arena() {
        let p: Parser = sequence(vec![uint8(), uint8()]);
        let n = p.with_arena(&[3, 4], |res| res.and_then(|r| r.ast().field(1)?.as_uint()));
        assert_eq!(n, Some(4));
        assert!(p.with_arena(&[3], |res| res.is_none()));
    }

    #[test]
    fn test_lowered_form_accepts_more() {
        let bump = Bump::new();
        let opts = ParseOptions::default().require_end(true);

        // Greedy repetition leaves nothing for the trailing byte.
        let greedy: Parser = sequence(vec![many(ch(b'a')), ch(b'a')]);
        assert!(greedy.is_valid_regular());
        assert!(greedy.parse_with(b"aa", &bump, &opts).is_err());
        assert!(greedy.lower().unwrap().accepts(b"aa"));

        // Ordered choice commits to the shorter literal.
        let ordered: Parser = sequence(vec![choice(vec![token("a"), token("ab")]), ch(b'c')]);
        assert!(ordered.parse_with(b"abc", &bump, &opts).is_err());
        assert!(ordered.parse_with(b"ac", &bump, &opts).is_ok());
        let lowered = ordered.lower().unwrap();
        assert!(lowered.accepts(b"abc"));
        assert!(lowered.accepts(b"ac"));
    }

    #[test]
    fn test_parsers_are_shareable() {
        fn assert_send_sync<T: Send + Sync>(_: &T) {}
        assert_send_sync(&sequence::<()>(vec![uint8()]));
    }
}
