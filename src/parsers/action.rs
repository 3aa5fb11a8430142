//! Semantic actions and validations.
//!
//! An action runs after its sub-parser succeeds and replaces the sub-parser's
//! token with its own. It sees the sub-parse as a [`ParseResult`], so it can
//! allocate records in the parse arena, or even run another grammar over
//! bytes it has pulled out of the tree:
//!
//! ```
//! use std::collections::HashMap;
//!
//! use rivet::{action, bumpalo::Bump, length_value, sequence, uint16, uint8, Parser, Token};
//!
//! // A tagged payload: one tag byte, then a length-prefixed body whose
//! // grammar depends on the tag.
//! let mut bodies: HashMap<u64, Parser> = HashMap::new();
//! bodies.insert(1, uint16());
//! bodies.insert(2, sequence(vec![uint8(), uint8()]));
//!
//! let tagged: Parser = action(
//!     sequence(vec![uint8(), length_value(uint8(), uint8())]),
//!     move |res| {
//!         let [tag, body] = res.ast().as_array::<2>()?;
//!         let grammar = bodies.get(&tag.as_uint()?)?;
//!         let raw: Vec<u8> = body.seq_bytes()?.collect();
//!         Some(grammar.parse(&raw, res.arena())?.ast())
//!     },
//! );
//!
//! let bump = Bump::new();
//! let res = tagged.parse(&[1, 2, 0x12, 0x34], &bump).unwrap();
//! assert_eq!(res.ast(), Token::uint(0x1234, 16));
//! assert!(tagged.parse(&[3, 0], &bump).is_none());
//! ```

use std::fmt;

use crate::{
    cfg::CfExpr,
    error::{DesugarError, Failure},
    parser::{PResult, Parse, Parser},
    result::{ParseResult, ParseState},
    token::{Records, Token},
};

type ActionFn<R> = dyn for<'a> Fn(&ParseResult<'a, R>) -> Option<Token<'a, R>> + Send + Sync;
type PredicateFn<R> = dyn for<'a> Fn(&ParseResult<'a, R>) -> bool + Send + Sync;

/// Runs `p` and packages what it consumed as a [`ParseResult`].
fn sub_parse<'i, 'a, R: Records>(
    p: &Parser<R>,
    state: &mut ParseState<'i, 'a>,
) -> Result<ParseResult<'a, R>, Failure> {
    let start = state.input().position_bits();
    let ast = p.run(state)?;
    let len = state.input().position_bits() - start;
    Ok(ParseResult::new(ast, len, state.arena()))
}

struct Action<R: Records> {
    p: Parser<R>,
    f: Box<ActionFn<R>>,
}

impl<R: Records> fmt::Debug for Action<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("p", &self.p)
            .finish_non_exhaustive()
    }
}

impl<R: Records> Parse<R> for Action<R> {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        let res = sub_parse(&self.p, state)?;
        Ok(crate::bt!((self.f)(&res)))
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

/// Matches `p`, then replaces its result with `f`'s.
///
/// When `f` returns `None` the match is rejected with [`Failure::NoMatch`].
/// Actions only ever see successful sub-parses and cannot move the cursor.
///
/// ## Example
/// ```
/// # use rivet::{action, bumpalo::Bump, many1, ch_range, Parser, Token};
/// let number: Parser = action(many1(ch_range(b'0', b'9')), |res| {
///     let n = res
///         .ast()
///         .seq_bytes()?
///         .try_fold(0u64, |n, d| n.checked_mul(10)?.checked_add(u64::from(d - b'0')))?;
///     Some(Token::uint(n, 64))
/// });
///
/// let bump = Bump::new();
/// assert_eq!(number.parse(b"1234", &bump).unwrap().ast(), Token::uint(1234, 64));
/// ```
pub fn action<R, F>(p: Parser<R>, f: F) -> Parser<R>
where
    R: Records,
    F: for<'a> Fn(&ParseResult<'a, R>) -> Option<Token<'a, R>> + Send + Sync + 'static,
{
    Parser::new(Action {
        p,
        f: Box::new(f),
    })
}

struct AttrBool<R: Records> {
    p: Parser<R>,
    pred: Box<PredicateFn<R>>,
}

impl<R: Records> fmt::Debug for AttrBool<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttrBool")
            .field("p", &self.p)
            .finish_non_exhaustive()
    }
}

impl<R: Records> Parse<R> for AttrBool<R> {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        let res = sub_parse(&self.p, state)?;
        if (self.pred)(&res) {
            Ok(res.ast())
        } else {
            Err(Failure::NoMatch)
        }
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

/// Matches `p` and keeps its result only if `pred` holds for it.
///
/// This is where invariants between fields belong, such as a count field
/// that must agree with the length of a later list.
pub fn attr_bool<R, F>(p: Parser<R>, pred: F) -> Parser<R>
where
    R: Records,
    F: for<'a> Fn(&ParseResult<'a, R>) -> bool + Send + Sync + 'static,
{
    Parser::new(AttrBool {
        p,
        pred: Box::new(pred),
    })
}
