//! Leaf parsers: literals, bytes, bit fields and end of input.

use crate::{
    cfg::CfExpr,
    charset::ByteSet,
    error::{DesugarError, Failure},
    parser::{PResult, Parse, Parser},
    result::ParseState,
    token::{Records, Token},
};

#[derive(Debug)]
struct Literal {
    bytes: Vec<u8>,
}

impl<R: Records> Parse<R> for Literal {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        for &expected in &self.bytes {
            if state.read_byte()? != expected {
                return Err(Failure::NoMatch);
            }
        }
        Ok(Token::Bytes(state.arena().alloc_slice_copy(&self.bytes)))
    }

    fn is_valid_regular(&self) -> bool {
        true
    }

    fn is_valid_cf(&self) -> bool {
        true
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        Ok(CfExpr::Literal(self.bytes.clone()))
    }
}

/// Matches the literal `bytes`, yielding them as a [`Token::Bytes`].
pub fn token<R: Records>(bytes: impl AsRef<[u8]>) -> Parser<R> {
    Parser::new(Literal {
        bytes: bytes.as_ref().to_vec(),
    })
}

#[derive(Debug)]
struct OneOf {
    set: ByteSet,
}

impl<R: Records> Parse<R> for OneOf {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        let b = state.read_byte()?;
        if self.set.contains(b) {
            Ok(Token::uint(u64::from(b), 8))
        } else {
            Err(Failure::NoMatch)
        }
    }

    fn is_valid_regular(&self) -> bool {
        true
    }

    fn is_valid_cf(&self) -> bool {
        true
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        Ok(CfExpr::Byte(self.set))
    }
}

/// Matches the single byte `b`.
pub fn ch<R: Records>(b: u8) -> Parser<R> {
    in_set(ByteSet::single(b))
}

/// Matches a single byte in `lo..=hi`.
pub fn ch_range<R: Records>(lo: u8, hi: u8) -> Parser<R> {
    in_set(ByteSet::range(lo..=hi))
}

/// Matches a single byte in `set`.
pub fn in_set<R: Records>(set: ByteSet) -> Parser<R> {
    Parser::new(OneOf { set })
}

/// Matches a single byte not in `set`.
pub fn not_in<R: Records>(set: ByteSet) -> Parser<R> {
    in_set(set.complement())
}

#[derive(Debug)]
struct Bits {
    len: u32,
    signed: bool,
}

impl<R: Records> Parse<R> for Bits {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        let raw = state.read_bits(self.len, self.signed)?;
        Ok(if self.signed {
            Token::sint(raw as i64, self.len as u8)
        } else {
            Token::uint(raw, self.len as u8)
        })
    }

    fn is_valid_regular(&self) -> bool {
        self.len % 8 == 0
    }

    fn is_valid_cf(&self) -> bool {
        self.len % 8 == 0
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        if self.len % 8 == 0 {
            Ok(CfExpr::any_bytes(self.len as usize / 8))
        } else {
            Err(DesugarError::unsupported("bits"))
        }
    }
}

/// Reads a `len`-bit integer using the cursor's current endianness.
///
/// # Panics
///
/// Panics if `len` is not in `1..=64`.
pub fn bits<R: Records>(len: u32, signed: bool) -> Parser<R> {
    assert!(
        (1..=64).contains(&len),
        "bit field length must be between 1 and 64, got {}",
        len
    );
    Parser::new(Bits { len, signed })
}

macro_rules! int_parsers {
    ( $( $(#[$doc:meta])* $name:ident => ($len:expr, $signed:expr) ),* $(,)? ) => {
        $(
            $(#[$doc])*
            pub fn $name<R: Records>() -> Parser<R> {
                bits($len, $signed)
            }
        )*
    };
}

int_parsers! {
    /// Reads an 8-bit signed integer.
    int8 => (8, true),
    /// Reads a 16-bit signed integer.
    int16 => (16, true),
    /// Reads a 32-bit signed integer.
    int32 => (32, true),
    /// Reads a 64-bit signed integer.
    int64 => (64, true),
    /// Reads an 8-bit unsigned integer.
    uint8 => (8, false),
    /// Reads a 16-bit unsigned integer.
    uint16 => (16, false),
    /// Reads a 32-bit unsigned integer.
    uint32 => (32, false),
    /// Reads a 64-bit unsigned integer.
    uint64 => (64, false),
}

#[derive(Debug)]
struct End;

impl<R: Records> Parse<R> for End {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        if state.input().is_at_end() {
            Ok(Token::Ignore)
        } else {
            Err(Failure::NoMatch)
        }
    }

    fn is_valid_regular(&self) -> bool {
        true
    }

    fn is_valid_cf(&self) -> bool {
        true
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        Ok(CfExpr::End)
    }
}

/// Succeeds, consuming nothing, only at the end of input.
pub fn end_p<R: Records>() -> Parser<R> {
    Parser::new(End)
}

#[derive(Debug)]
struct Nothing;

impl<R: Records> Parse<R> for Nothing {
    fn parse<'i, 'a>(&self, _state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        Err(Failure::NoMatch)
    }

    fn is_valid_regular(&self) -> bool {
        true
    }

    fn is_valid_cf(&self) -> bool {
        true
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        Ok(CfExpr::Choice(Vec::new()))
    }
}

/// Never matches.
pub fn nothing_p<R: Records>() -> Parser<R> {
    Parser::new(Nothing)
}

#[derive(Debug)]
struct Epsilon;

impl<R: Records> Parse<R> for Epsilon {
    fn parse<'i, 'a>(&self, _state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        Ok(Token::Ignore)
    }

    fn is_valid_regular(&self) -> bool {
        true
    }

    fn is_valid_cf(&self) -> bool {
        true
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        Ok(CfExpr::Epsilon)
    }
}

/// Always matches, consuming nothing.
pub fn epsilon_p<R: Records>() -> Parser<R> {
    Parser::new(Epsilon)
}

#[cfg(feature = "regex")]
#[derive(Debug)]
struct Pattern {
    re: ::regex::bytes::Regex,
}

#[cfg(feature = "regex")]
impl<R: Records> Parse<R> for Pattern {
    fn parse<'i, 'a>(&self, state: &mut ParseState<'i, 'a>) -> PResult<'a, R> {
        let rest = crate::bt!(state.input().rest());
        let m = crate::bt!(self.re.find(rest));
        let matched = state.arena().alloc_slice_copy(m.as_bytes());
        state.input_mut().skip_bytes(m.end());
        Ok(Token::Bytes(matched))
    }

    fn desugar(&self) -> Result<CfExpr, DesugarError> {
        Err(DesugarError::unsupported("regex"))
    }
}

/// Matches `pattern` at the cursor, which must be on a byte boundary.
///
/// The pattern is anchored at the cursor and matched against raw bytes, so
/// `(?-u)` classes can match any byte value.
///
/// ## Example
/// ```
/// # use rivet::{bumpalo::Bump, regex, Parser, Token};
/// let digits: Parser = regex("[0-9]+").unwrap();
/// let bump = Bump::new();
/// let res = digits.parse(b"2048 bytes", &bump).unwrap();
/// assert_eq!(res.ast(), Token::Bytes(b"2048"));
/// assert!(digits.parse(b"x2048", &bump).is_none());
/// ```
#[cfg(feature = "regex")]
pub fn regex<R: Records>(pattern: &str) -> Result<Parser<R>, ::regex::Error> {
    let re = ::regex::bytes::Regex::new(&format!("^(?:{})", pattern))?;
    Ok(Parser::new(Pattern { re }))
}

#[cfg(test)]
mod tests {
    use bumpalo::Bump;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parsers::test_util::{ast, run_at};

    #[test]
    fn test_token() {
        let bump = Bump::new();
        let p: Parser = token("GET");
        assert_eq!(ast(p.parse(b"GET /", &bump)), Some(Token::Bytes(b"GET")));
        assert!(p.parse(b"GEX", &bump).is_none());
        assert_eq!(run_at(&p, b"GE", &bump).0, Err(Failure::Overrun));
    }

    #[test]
    fn test_single_bytes() {
        let bump = Bump::new();
        let a: Parser = ch(b'a');
        let digit: Parser = ch_range(b'0', b'9');
        let not_digit: Parser = not_in(ByteSet::range(b'0'..=b'9'));

        assert_eq!(ast(a.parse(b"a", &bump)), Some(Token::uint(0x61, 8)));
        assert!(a.parse(b"b", &bump).is_none());
        assert_eq!(ast(digit.parse(b"7", &bump)), Some(Token::uint(u64::from(b'7'), 8)));
        assert!(digit.parse(b"x", &bump).is_none());
        assert!(not_digit.parse(b"x", &bump).is_some());
        assert!(not_digit.parse(b"7", &bump).is_none());
    }

    #[test]
    fn test_integers() {
        let bump = Bump::new();
        let input = [0xff, 0xfe, 0x00, 0x01];

        let u: Parser = uint16();
        let i: Parser = int16();
        let u32p: Parser = uint32();
        assert_eq!(ast(u.parse(&input, &bump)), Some(Token::uint(0xfffe, 16)));
        assert_eq!(ast(i.parse(&input, &bump)), Some(Token::sint(-2, 16)));
        assert_eq!(ast(u32p.parse(&input, &bump)), Some(Token::uint(0xfffe_0001, 32)));
        assert!(uint64::<()>().parse(&input, &bump).is_none());
    }

    #[test]
    fn test_bit_fields() {
        let bump = Bump::new();
        let p: Parser = crate::parsers::sequence(vec![bits(1, false), bits(4, false), bits(3, true)]);
        let res = p.parse(&[0b1_0110_111], &bump).map(|r| (r.ast(), r.bit_length()));
        let elems = [Token::uint(1, 1), Token::uint(0b0110, 4), Token::sint(-1, 3)];
        assert_eq!(res, Some((Token::Seq(&elems), 8)));
    }

    #[test]
    #[should_panic(expected = "bit field length")]
    fn test_bits_rejects_zero_width() {
        let _: Parser = bits(0, false);
    }

    #[test]
    fn test_end_nothing_epsilon() {
        let bump = Bump::new();
        let end: Parser = end_p();
        assert_eq!(ast(end.parse(b"", &bump)), Some(Token::Ignore));
        assert!(end.parse(b"x", &bump).is_none());

        assert!(nothing_p::<()>().parse(b"x", &bump).is_none());

        let (res, pos) = run_at(&epsilon_p(), b"x", &bump);
        assert_eq!(res, Ok(Token::Ignore));
        assert_eq!(pos, 0);
    }

    #[test]
    fn test_classification() {
        let byte: Parser = uint8();
        let nibble: Parser = bits(4, false);
        assert!(byte.is_valid_regular() && byte.is_valid_cf());
        assert_eq!(byte.lower(), Ok(CfExpr::any_bytes(1)));
        assert!(!nibble.is_valid_cf());
        assert_eq!(nibble.lower(), Err(DesugarError::unsupported("bits")));
        assert_eq!(
            token::<()>("ok").lower(),
            Ok(CfExpr::Literal(b"ok".to_vec()))
        );
    }

    #[cfg(feature = "regex")]
    #[test]
    fn test_regex_requires_alignment() {
        let bump = Bump::new();
        let p: Parser = crate::parsers::right(bits(4, false), regex("[a-z]+").unwrap());
        assert!(p.parse(b"abc", &bump).is_none());
        assert!(!p.is_valid_cf());
    }
}
