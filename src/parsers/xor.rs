use std::fmt;

use tracing::trace;

use crate::{
    cfg::CfExpr,
    error::{DesugarError, Failure},
    parser::{PResult, Parse, Parser},
    result::ParseState,
    token::Records,
};

struct Xor<R: Records> {
    p1: Parser<R>,
    p2: Parser<R>,
}

impl<R: Records> fmt::Debug for Xor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Xor").field(&self.p1).field(&self.p2).finish()
    }
}

impl<R: Records> Parse<R> for Xor<R> {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        let start = state.save();

        let r1 = self.p1.run(state);
        let after1 = state.save();

        state.restore(start);
        let r2 = self.p2.run(state);

        match (r1, r2) {
            (Err(e1), Err(e2)) => {
                state.restore(start);
                Err(e1.merge(e2))
            }
            (Err(_), Ok(tok)) => Ok(tok),
            (Ok(tok), Err(_)) => {
                state.restore(after1);
                Ok(tok)
            }
            (Ok(_), Ok(_)) => {
                trace!(
                    position = start.position_bits(),
                    "xor rejected: both alternatives matched"
                );
                state.restore(start);
                Err(Failure::NoMatch)
            }
        }
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        Err(DesugarError::unsupported("xor"))
    }
}

/// Matches exactly one of `p1` and `p2`.
///
/// Both are tried from the same start. If both match, the input is
/// ambiguous and `xor` fails; on any failure the cursor is left at the start.
///
/// ## Example
/// ```
/// # use rivet::{bumpalo::Bump, ch, uint8, xor, Parser};
/// let bump = Bump::new();
/// let p: Parser = xor(ch(b'a'), ch(b'b'));
/// assert!(p.parse(b"a", &bump).is_some());
///
/// let ambiguous: Parser = xor(uint8(), ch(b'a'));
/// assert!(ambiguous.parse(b"a", &bump).is_none());
/// assert!(ambiguous.parse(b"z", &bump).is_some());
/// ```
pub fn xor<R: Records>(p1: Parser<R>, p2: Parser<R>) -> Parser<R> {
    Parser::new(Xor { p1, p2 })
}
