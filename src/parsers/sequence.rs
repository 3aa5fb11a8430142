//! Sequencing, and single-parser wrappers that do not backtrack.

use std::fmt;

use crate::{
    cfg::CfExpr,
    charset::ByteSet,
    error::DesugarError,
    parser::{PResult, Parse, Parser},
    result::ParseState,
    stream::Endianness,
    token::{Records, Token},
};

use super::{all_cf, all_regular, lower_all};

struct Sequence<R: Records> {
    parsers: Vec<Parser<R>>,
}

impl<R: Records> fmt::Debug for Sequence<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sequence").field(&self.parsers).finish()
    }
}

impl<R: Records> Parse<R> for Sequence<R> {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        let mut out = state.token_vec();
        for p in &self.parsers {
            let tok = p.run(state)?;
            if !tok.is_ignore() {
                out.push(tok);
            }
        }
        Ok(Token::Seq(out.into_bump_slice()))
    }

    fn is_valid_regular(&self) -> bool {
        all_regular(&self.parsers)
    }

    fn is_valid_cf(&self) -> bool {
        all_cf(&self.parsers)
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        lower_all(&self.parsers).map(CfExpr::Seq)
    }
}

/// Matches each parser in turn, yielding a [`Token::Seq`] of their results.
///
/// [`Token::Ignore`] results are left out of the sequence.
pub fn sequence<R: Records>(parsers: impl IntoIterator<Item = Parser<R>>) -> Parser<R> {
    Parser::new(Sequence {
        parsers: parsers.into_iter().collect(),
    })
}

/// A sequence that yields only one of its results.
struct Pick<R: Records> {
    parsers: Vec<Parser<R>>,
    keep: usize,
}

impl<R: Records> fmt::Debug for Pick<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pick")
            .field("parsers", &self.parsers)
            .field("keep", &self.keep)
            .finish()
    }
}

impl<R: Records> Parse<R> for Pick<R> {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        let mut kept = Token::Ignore;
        for (i, p) in self.parsers.iter().enumerate() {
            let tok = p.run(state)?;
            if i == self.keep {
                kept = tok;
            }
        }
        Ok(kept)
    }

    fn is_valid_regular(&self) -> bool {
        all_regular(&self.parsers)
    }

    fn is_valid_cf(&self) -> bool {
        all_cf(&self.parsers)
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        lower_all(&self.parsers).map(CfExpr::Seq)
    }
}

/// Matches `p` then `q`, yielding `p`'s result.
pub fn left<R: Records>(p: Parser<R>, q: Parser<R>) -> Parser<R> {
    Parser::new(Pick {
        parsers: vec![p, q],
        keep: 0,
    })
}

/// Matches `p` then `q`, yielding `q`'s result.
pub fn right<R: Records>(p: Parser<R>, q: Parser<R>) -> Parser<R> {
    Parser::new(Pick {
        parsers: vec![p, q],
        keep: 1,
    })
}

/// Matches `p`, `x`, then `q`, yielding `x`'s result.
pub fn middle<R: Records>(p: Parser<R>, x: Parser<R>, q: Parser<R>) -> Parser<R> {
    Parser::new(Pick {
        parsers: vec![p, x, q],
        keep: 1,
    })
}

struct Ignore<R: Records> {
    p: Parser<R>,
}

impl<R: Records> fmt::Debug for Ignore<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ignore").field(&self.p).finish()
    }
}

impl<R: Records> Parse<R> for Ignore<R> {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        self.p.run(state)?;
        Ok(Token::Ignore)
    }

    fn is_valid_regular(&self) -> bool {
        self.p.is_valid_regular()
    }

    fn is_valid_cf(&self) -> bool {
        self.p.is_valid_cf()
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        self.p.lower()
    }
}

/// Matches `p`, but yields [`Token::Ignore`] so that enclosing sequences
/// drop the result.
pub fn ignore<R: Records>(p: Parser<R>) -> Parser<R> {
    Parser::new(Ignore { p })
}

fn ascii_whitespace() -> ByteSet {
    ByteSet::from(&b" \t\n\x0b\x0c\r"[..])
}

struct Whitespace<R: Records> {
    p: Parser<R>,
}

impl<R: Records> fmt::Debug for Whitespace<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Whitespace").field(&self.p).finish()
    }
}

impl<R: Records> Parse<R> for Whitespace<R> {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        let ws = ascii_whitespace();
        loop {
            let before = state.save();
            match state.read_byte() {
                Ok(b) if ws.contains(b) => {}
                _ => {
                    state.restore(before);
                    break;
                }
            }
        }
        self.p.run(state)
    }

    fn is_valid_regular(&self) -> bool {
        self.p.is_valid_regular()
    }

    fn is_valid_cf(&self) -> bool {
        self.p.is_valid_cf()
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        let skip = CfExpr::Repeat {
            inner: Box::new(CfExpr::Byte(ascii_whitespace())),
            min: 0,
            max: None,
        };
        Ok(CfExpr::Seq(vec![skip, self.p.lower()?]))
    }
}

/// Skips ASCII whitespace bytes, then matches `p`.
pub fn whitespace<R: Records>(p: Parser<R>) -> Parser<R> {
    Parser::new(Whitespace { p })
}

struct WithEndianness<R: Records> {
    endianness: Endianness,
    p: Parser<R>,
}

impl<R: Records> fmt::Debug for WithEndianness<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WithEndianness")
            .field("endianness", &self.endianness)
            .field("p", &self.p)
            .finish()
    }
}

impl<R: Records> Parse<R> for WithEndianness<R> {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        let outer = state.input().endianness();
        state.input_mut().set_endianness(self.endianness);
        let res = self.p.run(state);
        state.input_mut().set_endianness(outer);
        res
    }

    fn is_valid_regular(&self) -> bool {
        self.p.is_valid_regular()
    }

    fn is_valid_cf(&self) -> bool {
        self.p.is_valid_cf()
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        self.p.lower()
    }
}

/// Matches `p` with integer reads using `endianness`.
///
/// ## Example
/// ```
/// # use rivet::{bumpalo::Bump, uint16, with_endianness, Endianness, Parser, Token};
/// let le16: Parser = with_endianness(Endianness::LITTLE, uint16());
/// let bump = Bump::new();
/// assert_eq!(le16.parse(&[0x34, 0x12], &bump).unwrap().ast(), Token::uint(0x1234, 16));
/// ```
pub fn with_endianness<R: Records>(endianness: Endianness, p: Parser<R>) -> Parser<R> {
    Parser::new(WithEndianness { endianness, p })
}
