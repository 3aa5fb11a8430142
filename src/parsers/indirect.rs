//! Late-bound parsers for recursive grammars.

use std::{
    fmt,
    sync::{Arc, OnceLock, Weak},
};

use tracing::warn;

use crate::{
    cfg::CfExpr,
    error::{DesugarError, Failure},
    parser::{PResult, Parse, Parser},
    result::ParseState,
    token::Records,
};

type Slot<R> = Arc<OnceLock<Weak<dyn Parse<R>>>>;

/// A forward reference to a parser that is not built yet.
///
/// Grammars are immutable once built, so a rule that refers to itself needs
/// a placeholder: build the rule using [`parser`](Self::parser), then
/// [`bind`](Self::bind) the placeholder to the finished rule.
///
/// The placeholder holds its target weakly, so binding a rule into itself
/// does not leak it. The bound parser must be kept alive by its owner; once
/// it is dropped, the placeholder never matches.
///
/// ## Example
/// ```
/// # use rivet::{bumpalo::Bump, ch, choice, middle, Indirect, Parser};
/// // nested = "(" nested ")" | "x"
/// let inner: Indirect = Indirect::new();
/// let nested: Parser = choice(vec![
///     middle(ch(b'('), inner.parser(), ch(b')')),
///     ch(b'x'),
/// ]);
/// inner.bind(&nested).unwrap();
///
/// let bump = Bump::new();
/// assert!(nested.parse(b"((x))", &bump).is_some());
/// assert!(nested.parse(b"((x)", &bump).is_none());
/// ```
pub struct Indirect<R: Records = ()> {
    slot: Slot<R>,
}

impl<R: Records> Indirect<R> {
    /// Creates an unbound placeholder.
    pub fn new() -> Self {
        Indirect {
            slot: Arc::new(OnceLock::new()),
        }
    }

    /// A parser that defers to whatever this placeholder is bound to.
    ///
    /// Until then it never matches.
    pub fn parser(&self) -> Parser<R> {
        Parser::new(Deferred {
            slot: Arc::clone(&self.slot),
        })
    }

    /// Binds the placeholder to `target`.
    ///
    /// A placeholder can be bound only once; later attempts hand `target`
    /// back unchanged.
    pub fn bind(&self, target: &Parser<R>) -> Result<(), Parser<R>> {
        self.slot
            .set(Arc::downgrade(target.as_arc()))
            .map_err(|_| target.clone())
    }

    /// Whether [`bind`](Self::bind) has been called.
    pub fn is_bound(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl<R: Records> Default for Indirect<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Records> Clone for Indirect<R> {
    fn clone(&self) -> Self {
        Indirect {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<R: Records> fmt::Debug for Indirect<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Indirect")
            .field("bound", &self.is_bound())
            .finish()
    }
}

struct Deferred<R: Records> {
    slot: Slot<R>,
}

// The target usually contains this parser, so printing it would recurse.
impl<R: Records> fmt::Debug for Deferred<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Indirect")
    }
}

impl<R: Records> Parse<R> for Deferred<R> {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        match self.slot.get().and_then(Weak::upgrade) {
            Some(target) => target.parse(state),
            None => {
                warn!(
                    bound = self.slot.get().is_some(),
                    "indirect parser has no live target"
                );
                Err(Failure::NoMatch)
            }
        }
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        Err(DesugarError::unsupported("indirect"))
    }
}
