//! Ordered choice and its exclusion variants.

use std::fmt;

use tracing::trace;

use crate::{
    cfg::CfExpr,
    error::{DesugarError, Failure},
    parser::{PResult, Parse, Parser},
    result::ParseState,
    token::Records,
};

use super::{all_cf, all_regular, lower_all};

struct Choice<R: Records> {
    alternatives: Vec<Parser<R>>,
}

impl<R: Records> fmt::Debug for Choice<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Choice").field(&self.alternatives).finish()
    }
}

impl<R: Records> Parse<R> for Choice<R> {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        let start = state.save();
        let mut failure: Option<Failure> = None;

        for (i, alt) in self.alternatives.iter().enumerate() {
            match alt.run(state) {
                Ok(tok) => {
                    trace!(alternative = i, "choice matched");
                    return Ok(tok);
                }
                Err(e) => {
                    state.restore(start);
                    failure = Some(failure.map_or(e, |f| f.merge(e)));
                }
            }
        }

        Err(failure.unwrap_or(Failure::NoMatch))
    }

    fn is_valid_regular(&self) -> bool {
        all_regular(&self.alternatives)
    }

    fn is_valid_cf(&self) -> bool {
        all_cf(&self.alternatives)
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        lower_all(&self.alternatives).map(CfExpr::Choice)
    }
}

/// Tries each alternative in order from the same start, yielding the first
/// that matches.
///
/// An empty choice never matches. When every alternative fails, the failure
/// is [`Failure::Overrun`] only if every alternative ran out of input.
pub fn choice<R: Records>(alternatives: impl IntoIterator<Item = Parser<R>>) -> Parser<R> {
    Parser::new(Choice {
        alternatives: alternatives.into_iter().collect(),
    })
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Exclusion {
    /// Reject when the excluded parser matches at least as much.
    NotShorter,
    /// Reject when the excluded parser matches exactly as much.
    SameLength,
}

struct Exclude<R: Records> {
    p: Parser<R>,
    q: Parser<R>,
    mode: Exclusion,
}

impl<R: Records> fmt::Debug for Exclude<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exclude")
            .field("p", &self.p)
            .field("q", &self.q)
            .field("mode", &self.mode)
            .finish()
    }
}

impl<R: Records> Parse<R> for Exclude<R> {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        let start = state.save();
        let tok = self.p.run(state)?;
        let after = state.save();

        state.restore(start);
        let excluded = match self.q.run(state) {
            Ok(_) => {
                let q_len = state.input().position_bits();
                let p_len = after.position_bits();
                match self.mode {
                    Exclusion::NotShorter => q_len >= p_len,
                    Exclusion::SameLength => q_len == p_len,
                }
            }
            Err(_) => false,
        };

        if excluded {
            state.restore(start);
            return Err(Failure::NoMatch);
        }

        state.restore(after);
        Ok(tok)
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        Err(DesugarError::unsupported(match self.mode {
            Exclusion::NotShorter => "butnot",
            Exclusion::SameLength => "difference",
        }))
    }
}

/// Matches `p`, unless `q` also matches from the same start and consumes at
/// least as much input.
pub fn butnot<R: Records>(p: Parser<R>, q: Parser<R>) -> Parser<R> {
    Parser::new(Exclude {
        p,
        q,
        mode: Exclusion::NotShorter,
    })
}

/// Matches `p`, unless `q` also matches from the same start and consumes
/// exactly the same input.
pub fn difference<R: Records>(p: Parser<R>, q: Parser<R>) -> Parser<R> {
    Parser::new(Exclude {
        p,
        q,
        mode: Exclusion::SameLength,
    })
}
