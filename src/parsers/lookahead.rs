//! Zero-width lookahead.

use std::fmt;

use tracing::trace;

use crate::{
    cfg::CfExpr,
    error::{DesugarError, Failure},
    parser::{PResult, Parse, Parser},
    result::ParseState,
    token::{Records, Token},
};

struct Lookahead<R: Records> {
    p: Parser<R>,
    negate: bool,
}

impl<R: Records> fmt::Debug for Lookahead<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lookahead")
            .field("p", &self.p)
            .field("negate", &self.negate)
            .finish()
    }
}

impl<R: Records> Parse<R> for Lookahead<R> {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        let start = state.save();
        let matched = self.p.run(state).is_ok();
        state.restore(start);
        trace!(
            position = start.position_bits(),
            matched,
            negate = self.negate,
            "lookahead"
        );

        if matched != self.negate {
            Ok(Token::Ignore)
        } else {
            Err(Failure::NoMatch)
        }
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        Err(DesugarError::unsupported(if self.negate { "not" } else { "and" }))
    }
}

/// Succeeds, consuming nothing, if `p` matches here.
///
/// The cursor is restored whether or not `p` matches, and `p`'s result is
/// discarded.
pub fn and<R: Records>(p: Parser<R>) -> Parser<R> {
    Parser::new(Lookahead { p, negate: false })
}

/// Succeeds, consuming nothing, if `p` does not match here.
pub fn not<R: Records>(p: Parser<R>) -> Parser<R> {
    Parser::new(Lookahead { p, negate: true })
}
