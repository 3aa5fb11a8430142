//! Failure and error types.
//!
//! Parse-time failure comes in two flavours, both of which simply cause the
//! enclosing combinator to backtrack: [`Failure::NoMatch`] and
//! [`Failure::Overrun`]. They only become an error value at the top-level
//! entry points, as a [`ParseError`]. Lowering a grammar has its own error
//! type, [`DesugarError`], since asking to lower a combinator that cannot be
//! lowered is a property of the grammar and not of any input.

use thiserror::Error;

/// Why a parser did not match at the current position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
pub enum Failure {
    /// The input at the current position is not a valid construct.
    #[error("no match")]
    NoMatch,

    /// The parser needed more input than was available.
    #[error("unexpected end of input")]
    Overrun,
}

impl Failure {
    /// Combines the failures of two alternatives tried from the same start.
    ///
    /// The result is `Overrun` only if both alternatives ran out of input.
    pub fn merge(self, other: Failure) -> Failure {
        match (self, other) {
            (Failure::Overrun, Failure::Overrun) => Failure::Overrun,
            _ => Failure::NoMatch,
        }
    }
}

/// The outcome of a failed top-level parse.
///
/// Offsets are absolute bit positions in the input.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The grammar did not match the input.
    #[error("input did not match the grammar (got as far as bit {furthest_bit})")]
    NoMatch {
        /// The furthest position the cursor reached, over every alternative
        /// tried, before the parse gave up.
        furthest_bit: u64,
    },

    /// The input ended before the grammar was satisfied.
    #[error("input ended after {available_bits} bits before the grammar was satisfied")]
    Overrun {
        /// Total number of bits in the input.
        available_bits: u64,
    },

    /// The grammar matched, but end of input was required and input remains.
    #[error("grammar matched {consumed_bits} of {available_bits} bits, but end of input was required")]
    TrailingInput {
        /// Number of bits consumed by the grammar.
        consumed_bits: u64,

        /// Total number of bits in the input.
        available_bits: u64,
    },
}

/// A combinator could not be lowered to a [`CfExpr`](crate::cfg::CfExpr).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DesugarError {
    /// The combinator's language is not expressible, or not yet supported,
    /// as a regular or context-free fragment.
    #[error("`{combinator}` cannot be lowered to a context-free form")]
    Unsupported {
        /// Name of the offending combinator.
        combinator: &'static str,
    },
}

impl DesugarError {
    pub(crate) fn unsupported(combinator: &'static str) -> Self {
        DesugarError::Unsupported { combinator }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge() {
        use Failure::*;
        assert_eq!(Overrun.merge(Overrun), Overrun);
        assert_eq!(Overrun.merge(NoMatch), NoMatch);
        assert_eq!(NoMatch.merge(Overrun), NoMatch);
        assert_eq!(NoMatch.merge(NoMatch), NoMatch);
    }

    #[test]
    fn test_display() {
        let e = DesugarError::unsupported("xor");
        assert_eq!(
            e.to_string(),
            "`xor` cannot be lowered to a context-free form"
        );

        let e = ParseError::TrailingInput {
            consumed_bits: 8,
            available_bits: 16,
        };
        assert_eq!(
            e.to_string(),
            "grammar matched 8 of 16 bits, but end of input was required"
        );
    }
}
