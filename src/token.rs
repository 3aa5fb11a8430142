//! The `Token` type and its associated traits.

use std::{convert::Infallible, fmt};

/// A trait naming the user record type a grammar's semantic actions produce.
///
/// Records live in the parse arena and may borrow from it, hence the
/// lifetime-generic associated type. The record type will typically be an
/// `enum` whose discriminant acts as the record's type tag.
///
/// Grammars without semantic records use `()`, whose record type is
/// uninhabited.
///
/// ## Example
/// ```
/// use rivet::Records;
///
/// #[derive(Debug, PartialEq)]
/// enum Geometry<'a> {
///     Point { x: u64, y: u64 },
///     Path(&'a [Geometry<'a>]),
/// }
///
/// struct Shapes;
///
/// impl Records for Shapes {
///     type Record<'a> = Geometry<'a>;
/// }
/// ```
pub trait Records: 'static {
    /// The record type, borrowing from an arena with lifetime `'a`.
    type Record<'a>: fmt::Debug + PartialEq + 'a;
}

impl Records for () {
    type Record<'a> = Infallible;
}

/// The tag of a [`Token`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// See [`Token::None`].
    None,
    /// See [`Token::Ignore`].
    Ignore,
    /// See [`Token::Bytes`].
    Bytes,
    /// See [`Token::SInt`].
    SInt,
    /// See [`Token::UInt`].
    UInt,
    /// See [`Token::Seq`].
    Seq,
    /// See [`Token::User`].
    User,
}

/// A value produced by a successful parse.
///
/// Tokens are small and `Copy`: composite variants point into the parse
/// arena. An integer token holds its value widened to 64 bits together with
/// the width of the field it was read from.
pub enum Token<'a, R: Records = ()> {
    /// An optional element that was absent.
    None,

    /// A structurally present element with no semantic payload, such as a
    /// reserved field or a lookahead. Sequences drop these.
    Ignore,

    /// A run of bytes.
    Bytes(&'a [u8]),

    /// A signed integer, sign-extended from a field of `bits` bits.
    SInt {
        /// The value.
        value: i64,
        /// The width of the field the value was read from.
        bits: u8,
    },

    /// An unsigned integer read from a field of `bits` bits.
    UInt {
        /// The value.
        value: u64,
        /// The width of the field the value was read from.
        bits: u8,
    },

    /// An ordered sequence of tokens.
    Seq(&'a [Token<'a, R>]),

    /// A record built by a semantic action.
    User(&'a R::Record<'a>),
}

impl<'a, R: Records> Token<'a, R> {
    /// An unsigned integer token of the given width.
    pub fn uint(value: u64, bits: u8) -> Self {
        Token::UInt { value, bits }
    }

    /// A signed integer token of the given width.
    pub fn sint(value: i64, bits: u8) -> Self {
        Token::SInt { value, bits }
    }

    /// The tag of this token.
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::None => TokenKind::None,
            Token::Ignore => TokenKind::Ignore,
            Token::Bytes(_) => TokenKind::Bytes,
            Token::SInt { .. } => TokenKind::SInt,
            Token::UInt { .. } => TokenKind::UInt,
            Token::Seq(_) => TokenKind::Seq,
            Token::User(_) => TokenKind::User,
        }
    }

    /// Whether this token is [`Token::Ignore`].
    pub fn is_ignore(&self) -> bool {
        matches!(self, Token::Ignore)
    }

    /// The value of an unsigned integer token.
    pub fn as_uint(&self) -> Option<u64> {
        match *self {
            Token::UInt { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The value of a signed integer token.
    pub fn as_sint(&self) -> Option<i64> {
        match *self {
            Token::SInt { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The value of either kind of integer token, widened so that every
    /// value of both kinds is representable.
    pub fn as_int(&self) -> Option<i128> {
        match *self {
            Token::UInt { value, .. } => Some(i128::from(value)),
            Token::SInt { value, .. } => Some(i128::from(value)),
            _ => None,
        }
    }

    /// The field width, in bits, of either kind of integer token.
    pub fn int_width(&self) -> Option<u8> {
        match *self {
            Token::UInt { bits, .. } | Token::SInt { bits, .. } => Some(bits),
            _ => None,
        }
    }

    /// The contents of a byte token.
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match *self {
            Token::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The elements of a sequence token.
    pub fn as_seq(&self) -> Option<&'a [Token<'a, R>]> {
        match *self {
            Token::Seq(s) => Some(s),
            _ => None,
        }
    }

    /// The elements of a sequence token of exactly `N` elements.
    ///
    /// This is the usual way for an action to take apart a fixed record:
    /// `let [id, flags, count] = tok.as_array()?;`
    pub fn as_array<const N: usize>(&self) -> Option<&'a [Token<'a, R>; N]> {
        self.as_seq().and_then(|s| s.try_into().ok())
    }

    /// The `i`th element of a sequence token.
    pub fn field(&self, i: usize) -> Option<&'a Token<'a, R>> {
        self.as_seq().and_then(|s| s.get(i))
    }

    /// The record of a user token.
    pub fn user(&self) -> Option<&'a R::Record<'a>> {
        match *self {
            Token::User(r) => Some(r),
            _ => None,
        }
    }

    /// Reads a sequence of unsigned integers that each fit in a byte.
    ///
    /// Returns `None` if this is not a sequence or any element is not such
    /// an integer.
    pub fn seq_bytes(&self) -> Option<impl Iterator<Item = u8> + 'a> {
        let seq = self.as_seq()?;
        if !seq.iter().all(|t| matches!(t, Token::UInt { value, .. } if *value <= 0xff)) {
            return None;
        }
        Some(seq.iter().filter_map(Token::as_uint).map(|v| v as u8))
    }
}

impl<'a, R: Records> Clone for Token<'a, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, R: Records> Copy for Token<'a, R> {}

impl<'a, R: Records> fmt::Debug for Token<'a, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::None => write!(f, "None"),
            Token::Ignore => write!(f, "Ignore"),
            Token::Bytes(b) => f.debug_tuple("Bytes").field(b).finish(),
            Token::SInt { value, bits } => write!(f, "SInt({}: i{})", value, bits),
            Token::UInt { value, bits } => write!(f, "UInt({}: u{})", value, bits),
            Token::Seq(s) => f.debug_list().entries(s.iter()).finish(),
            Token::User(r) => f.debug_tuple("User").field(r).finish(),
        }
    }
}

impl<'a, R: Records> PartialEq for Token<'a, R> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Token::None, Token::None) | (Token::Ignore, Token::Ignore) => true,
            (Token::Bytes(a), Token::Bytes(b)) => a == b,
            (Token::SInt { value: a, bits: m }, Token::SInt { value: b, bits: n }) => {
                a == b && m == n
            }
            (Token::UInt { value: a, bits: m }, Token::UInt { value: b, bits: n }) => {
                a == b && m == n
            }
            (Token::Seq(a), Token::Seq(b)) => a == b,
            (Token::User(a), Token::User(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Rec {
        Pair(u64, u64),
    }

    struct Recs;

    impl Records for Recs {
        type Record<'a> = Rec;
    }

    #[test]
    fn test_accessors_check_tag() {
        let t: Token = Token::uint(7, 8);
        assert_eq!(t.kind(), TokenKind::UInt);
        assert_eq!(t.int_width(), Some(8));
        assert_eq!(t.as_uint(), Some(7));
        assert_eq!(t.as_sint(), None);
        assert_eq!(t.as_int(), Some(7));
        assert!(t.as_seq().is_none());
        assert!(t.field(0).is_none());

        let s: Token = Token::sint(-3, 4);
        assert_eq!(s.as_sint(), Some(-3));
        assert_eq!(s.int_width(), Some(4));
        assert_eq!(s.as_int(), Some(-3));
        assert!(s.as_uint().is_none());
    }

    #[test]
    fn test_seq_access() {
        let elems: [Token; 3] = [Token::uint(1, 8), Token::uint(2, 8), Token::uint(300, 16)];
        let seq = Token::Seq(&elems);
        assert_eq!(seq.field(1), Some(&Token::uint(2, 8)));
        assert!(seq.as_array::<2>().is_none());
        let [a, _, c] = seq.as_array::<3>().copied().unwrap_or([Token::None; 3]);
        assert_eq!(a, Token::uint(1, 8));
        assert_eq!(c, Token::uint(300, 16));

        // 300 does not fit in a byte.
        assert!(seq.seq_bytes().is_none());
        let small = Token::Seq(&elems[..2]);
        assert_eq!(small.seq_bytes().map(|b| b.collect::<Vec<_>>()), Some(vec![1u8, 2]));
    }

    #[test]
    fn test_user_records() {
        let rec = Rec::Pair(1, 2);
        let t: Token<Recs> = Token::User(&rec);
        assert_eq!(t.kind(), TokenKind::User);
        assert_eq!(t.user(), Some(&Rec::Pair(1, 2)));
        assert_eq!(t, Token::User(&Rec::Pair(1, 2)));
        assert_ne!(t, Token::uint(1, 8));
        assert_eq!(format!("{:?}", t), "User(Pair(1, 2))");
    }

    #[test]
    fn test_width_is_part_of_the_value() {
        let narrow: Token = Token::uint(1, 1);
        let wide: Token = Token::uint(1, 16);
        assert_ne!(narrow, wide);
        assert_eq!(narrow.as_uint(), wide.as_uint());

        // Widths survive inside sequences, where no bit length is at hand.
        let fields = [narrow, wide, Token::sint(-1, 3)];
        let widths: Vec<_> = Token::<()>::Seq(&fields)
            .as_seq()
            .unwrap_or(&[])
            .iter()
            .filter_map(Token::int_width)
            .collect();
        assert_eq!(widths, [1, 16, 3]);
    }

    #[test]
    fn test_debug() {
        let elems: [Token; 2] = [Token::Bytes(b"ab"), Token::None];
        assert_eq!(format!("{:?}", Token::Seq(&elems)), "[Bytes([97, 98]), None]");

        let ints: [Token; 2] = [Token::uint(5, 3), Token::sint(-2, 16)];
        assert_eq!(format!("{:?}", Token::Seq(&ints)), "[UInt(5: u3), SInt(-2: i16)]");
    }
}
