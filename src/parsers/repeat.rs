//! Repetition and optional elements.

use std::fmt;

use crate::{
    cfg::CfExpr,
    error::{DesugarError, Failure},
    parser::{PResult, Parse, Parser},
    result::ParseState,
    token::{Records, Token},
};

struct Repeat<R: Records> {
    p: Parser<R>,
    sep: Option<Parser<R>>,
    min: usize,
    max: Option<usize>,
}

impl<R: Records> fmt::Debug for Repeat<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repeat")
            .field("p", &self.p)
            .field("sep", &self.sep)
            .field("min", &self.min)
            .field("max", &self.max)
            .finish()
    }
}

impl<R: Records> Repeat<R> {
    /// Runs one iteration, separator included.
    fn step<'i, 'a>(&self, state: &mut ParseState<'i, 'a>, first: bool) -> PResult<'a, R> {
        if let (false, Some(sep)) = (first, &self.sep) {
            sep.run(state)?;
        }
        self.p.run(state)
    }
}

impl<R: Records> Parse<R> for Repeat<R> {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        let mut out = state.token_vec();
        let mut count = 0;
        let mut stopped = Failure::NoMatch;

        while self.max.map_or(true, |max| count < max) {
            let before = state.save();
            match self.step(state, count == 0) {
                Ok(tok) => {
                    if !tok.is_ignore() {
                        out.push(tok);
                    }
                    count += 1;

                    // An unbounded loop over a zero-width match would never end.
                    let zero_width =
                        state.input().position_bits() == before.position_bits();
                    if zero_width && self.max.is_none() && count >= self.min {
                        break;
                    }
                }
                Err(e) => {
                    state.restore(before);
                    stopped = e;
                    break;
                }
            }
        }

        if count < self.min {
            return Err(stopped);
        }
        Ok(Token::Seq(out.into_bump_slice()))
    }

    fn is_valid_regular(&self) -> bool {
        self.p.is_valid_regular() && self.sep.as_ref().map_or(true, Parser::is_valid_regular)
    }

    fn is_valid_cf(&self) -> bool {
        self.p.is_valid_cf() && self.sep.as_ref().map_or(true, Parser::is_valid_cf)
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        let p = self.p.lower()?;
        let sep = match &self.sep {
            None => {
                return Ok(CfExpr::Repeat {
                    inner: Box::new(p),
                    min: self.min,
                    max: self.max,
                })
            }
            Some(sep) => sep.lower()?,
        };

        // p (sep p)*, optionally empty.
        let tail = CfExpr::Repeat {
            inner: Box::new(CfExpr::Seq(vec![sep, p.clone()])),
            min: self.min.saturating_sub(1),
            max: self.max.map(|m| m.saturating_sub(1)),
        };
        let list = CfExpr::Seq(vec![p, tail]);
        Ok(if self.min == 0 {
            CfExpr::Choice(vec![CfExpr::Epsilon, list])
        } else {
            list
        })
    }
}

/// Matches `p` as many times as possible, yielding a [`Token::Seq`].
///
/// An iteration that consumes nothing is kept and ends the repetition.
pub fn many<R: Records>(p: Parser<R>) -> Parser<R> {
    Parser::new(Repeat {
        p,
        sep: None,
        min: 0,
        max: None,
    })
}

/// Like [`many`], but requires at least one match.
pub fn many1<R: Records>(p: Parser<R>) -> Parser<R> {
    Parser::new(Repeat {
        p,
        sep: None,
        min: 1,
        max: None,
    })
}

/// Matches `p` exactly `n` times.
pub fn repeat_n<R: Records>(p: Parser<R>, n: usize) -> Parser<R> {
    Parser::new(Repeat {
        p,
        sep: None,
        min: n,
        max: Some(n),
    })
}

/// Matches zero or more `p`, separated by `sep`.
///
/// Separator results are dropped. A trailing separator is left unconsumed.
pub fn sep_by<R: Records>(p: Parser<R>, sep: Parser<R>) -> Parser<R> {
    Parser::new(Repeat {
        p,
        sep: Some(sep),
        min: 0,
        max: None,
    })
}

/// Like [`sep_by`], but requires at least one `p`.
pub fn sep_by1<R: Records>(p: Parser<R>, sep: Parser<R>) -> Parser<R> {
    Parser::new(Repeat {
        p,
        sep: Some(sep),
        min: 1,
        max: None,
    })
}

struct Optional<R: Records> {
    p: Parser<R>,
}

impl<R: Records> fmt::Debug for Optional<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Optional").field(&self.p).finish()
    }
}

impl<R: Records> Parse<R> for Optional<R> {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        Ok(self.p.attempt(state).unwrap_or(Token::None))
    }

    fn is_valid_regular(&self) -> bool {
        self.p.is_valid_regular()
    }

    fn is_valid_cf(&self) -> bool {
        self.p.is_valid_cf()
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        Ok(CfExpr::Repeat {
            inner: Box::new(self.p.lower()?),
            min: 0,
            max: Some(1),
        })
    }
}

/// Matches `p` if possible. When `p` fails, consumes nothing and yields
/// [`Token::None`].
pub fn optional<R: Records>(p: Parser<R>) -> Parser<R> {
    Parser::new(Optional { p })
}
