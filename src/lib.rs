#![warn(missing_docs)]

//! A backtracking parser-combinator toolkit for binary formats.
//!
//! Grammars are trees of [`Parser`] values built once from the combinators in
//! this crate and then shared, across threads if need be, to parse any
//! number of inputs. Input is read at bit granularity with a configurable
//! [`Endianness`], so packed protocol headers can be described as directly as
//! byte-oriented formats.
//!
//! Every parse allocates its result tree in a caller-provided
//! [`bumpalo::Bump`]. [`Token`]s are small `Copy` values pointing into that
//! arena; a tree of any shape is released by resetting or dropping the arena.
//!
//! ```
//! use rivet::{bits, bumpalo::Bump, ignore, length_value, sequence, uint16, uint8, Parser, Token};
//!
//! // A 16-bit id, a 4-bit version, 4 reserved bits, then a counted list.
//! let grammar: Parser = sequence(vec![
//!     uint16(),
//!     bits(4, false),
//!     ignore(bits(4, false)),
//!     length_value(uint8(), uint8()),
//! ]);
//!
//! let bump = Bump::new();
//! let res = grammar.parse(&[0xbe, 0xef, 0x40, 0x02, 0x0a, 0x0b], &bump).unwrap();
//! let [id, version, body] = res.ast().as_array::<3>().unwrap();
//! assert_eq!(id.as_uint(), Some(0xbeef));
//! assert_eq!(version.as_uint(), Some(4));
//! assert_eq!(body.as_seq().map(<[_]>::len), Some(2));
//! ```
//!
//! Parsers in the regular or context-free fragment can also be lowered to a
//! [`CfExpr`] with [`Parser::lower`]; lookahead, exclusion and data-dependent
//! combinators report [`DesugarError::Unsupported`] instead.

pub use bumpalo;

pub mod cfg;
pub use cfg::CfExpr;

pub mod charset;
pub use charset::ByteSet;

pub mod error;
pub use error::{DesugarError, Failure, ParseError};

pub mod parser;
pub use parser::{PResult, Parse, ParseOptions, Parser};

pub mod parsers;
pub use parsers::*;

pub mod result;
pub use result::{ParseResult, ParseState};

pub mod stream;
pub use stream::{BitOrder, ByteOrder, Endianness, InputStream};

pub mod token;
pub use token::{Records, Token, TokenKind};

/// Shorthand for backtracking, similar to the `?` operator.
///
/// Takes an expression yielding `Option<T>` as its sole argument.
/// `bt!(Some(val))` yields `val`, while `bt!(None)` causes the calling
/// function to return `Err(Failure::NoMatch)`. This is the usual way for a
/// hand-written [`Parse`] implementation to reject a token of the wrong
/// shape.
///
/// ## Example
/// ```
/// use rivet::{bt, ParseState, PResult, Token};
///
/// fn even<'i, 'a>(state: &mut ParseState<'i, 'a>) -> PResult<'a, ()> {
///     let byte = state.read_byte()?;
///     bt!((byte % 2 == 0).then(|| ()));
///     Ok(Token::uint(u64::from(byte), 8))
/// }
/// ```
#[macro_export]
macro_rules! bt {
    ($e:expr) => {
        match $e {
            Some(val) => val,
            None => return Err($crate::Failure::NoMatch),
        }
    };
}
