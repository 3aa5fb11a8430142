//! Combinators whose behaviour depends on a parsed integer.

use std::fmt;

use tracing::trace;

use crate::{
    cfg::CfExpr,
    error::{DesugarError, Failure},
    parser::{PResult, Parse, Parser},
    result::ParseState,
    token::{Records, Token},
};

struct LengthValue<R: Records> {
    length: Parser<R>,
    value: Parser<R>,
}

impl<R: Records> fmt::Debug for LengthValue<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LengthValue")
            .field("length", &self.length)
            .field("value", &self.value)
            .finish()
    }
}

impl<R: Records> Parse<R> for LengthValue<R> {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        let count = crate::bt!(self.length.run(state)?.as_uint());

        let mut out = state.token_vec();
        for i in 0..count {
            let before = state.input().position_bits();
            let tok = self.value.run(state)?;
            if !tok.is_ignore() {
                out.push(tok);
            }

            // A value that matches without consuming input would match in
            // place for every remaining count, which the input cannot bound.
            if i + 1 < count && state.input().position_bits() == before {
                trace!(count, position = before, "length_value element is zero width");
                return Err(Failure::NoMatch);
            }
        }
        Ok(Token::Seq(out.into_bump_slice()))
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        Err(DesugarError::unsupported("length_value"))
    }
}

/// Reads an unsigned count with `length`, then exactly that many `value`s,
/// yielding them as a [`Token::Seq`].
///
/// Fails with [`Failure::NoMatch`] if `length` yields anything but a
/// [`Token::UInt`]. Input that ends before the last value is an overrun.
///
/// Every value but the last must consume input. A value that matches
/// without consuming anything fails the parse with [`Failure::NoMatch`]
/// while values remain, so a huge declared count over a zero-width value
/// cannot run on indefinitely.
///
/// ## Example
/// ```
/// # use rivet::{bumpalo::Bump, length_value, uint8, Parser};
/// let bump = Bump::new();
/// let label: Parser = length_value(uint8(), uint8());
/// let res = label.parse(b"\x03www", &bump).unwrap();
/// assert_eq!(res.ast().seq_bytes().map(|b| b.collect::<Vec<u8>>()), Some(b"www".to_vec()));
/// ```
pub fn length_value<R: Records>(length: Parser<R>, value: Parser<R>) -> Parser<R> {
    Parser::new(LengthValue { length, value })
}

struct IntRange<R: Records> {
    p: Parser<R>,
    lo: i64,
    hi: i64,
}

impl<R: Records> fmt::Debug for IntRange<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntRange")
            .field("p", &self.p)
            .field("lo", &self.lo)
            .field("hi", &self.hi)
            .finish()
    }
}

impl<R: Records> Parse<R> for IntRange<R> {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        let tok = self.p.run(state)?;
        let v = crate::bt!(tok.as_int());
        if (i128::from(self.lo)..=i128::from(self.hi)).contains(&v) {
            Ok(tok)
        } else {
            Err(Failure::NoMatch)
        }
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        Err(DesugarError::unsupported("int_range"))
    }
}

/// Matches `p`, which must yield an integer in `lo..=hi`.
///
/// Signed and unsigned results are compared by value, so `int_range(uint64(), -1, 5)`
/// accepts `0..=5`.
pub fn int_range<R: Records>(p: Parser<R>, lo: i64, hi: i64) -> Parser<R> {
    Parser::new(IntRange { p, lo, hi })
}
