//! Parse state and parse results.

use std::fmt;

use bumpalo::{collections::Vec as BumpVec, Bump};

use crate::{
    error::Failure,
    stream::InputStream,
    token::{Records, Token},
};

/// The mutable state threaded through one parse: the cursor and the arena.
///
/// Combinators that backtrack do so with [`save`](Self::save) and
/// [`restore`](Self::restore); both are plain copies of the cursor.
pub struct ParseState<'i, 'a> {
    input: InputStream<'i>,
    arena: &'a Bump,
    furthest: u64,
}

impl<'i, 'a> ParseState<'i, 'a> {
    /// Creates a parse state over `input`, allocating from `arena`.
    pub fn new(input: InputStream<'i>, arena: &'a Bump) -> Self {
        ParseState {
            input,
            arena,
            furthest: 0,
        }
    }

    /// The cursor.
    pub fn input(&self) -> &InputStream<'i> {
        &self.input
    }

    /// The cursor, for reading.
    pub fn input_mut(&mut self) -> &mut InputStream<'i> {
        &mut self.input
    }

    /// A copy of the cursor to restore later.
    pub fn save(&self) -> InputStream<'i> {
        self.input
    }

    /// Moves the cursor back to a saved position.
    pub fn restore(&mut self, saved: InputStream<'i>) {
        self.furthest = self.furthest.max(self.input.position_bits());
        self.input = saved;
    }

    /// The furthest bit position the cursor has reached so far, counting
    /// positions it was later restored from.
    pub fn furthest_bits(&self) -> u64 {
        self.furthest.max(self.input.position_bits())
    }

    /// Reads `count` bits from the cursor as an integer.
    ///
    /// Running out of input is reported as [`Failure::Overrun`].
    pub fn read_bits(&mut self, count: u32, signed: bool) -> Result<u64, Failure> {
        self.input.read_bits(count, signed).ok_or(Failure::Overrun)
    }

    /// Reads the next eight bits from the cursor.
    pub fn read_byte(&mut self) -> Result<u8, Failure> {
        self.input.read_byte().ok_or(Failure::Overrun)
    }

    /// The arena every token of this parse is allocated from.
    pub fn arena(&self) -> &'a Bump {
        self.arena
    }

    /// Starts an arena-backed list of tokens.
    pub fn token_vec<R: Records>(&self) -> BumpVec<'a, Token<'a, R>> {
        BumpVec::new_in(self.arena)
    }
}

impl<'i, 'a> fmt::Debug for ParseState<'i, 'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseState")
            .field("input", &self.input)
            .field("arena_bytes", &self.arena.allocated_bytes())
            .finish()
    }
}

/// The outcome of a successful parse.
///
/// A result borrows the arena it was built in, so it cannot outlive it.
/// Semantic actions receive one of these for the sub-parse they wrap.
pub struct ParseResult<'a, R: Records = ()> {
    ast: Token<'a, R>,
    bit_length: u64,
    arena: &'a Bump,
}

impl<'a, R: Records> ParseResult<'a, R> {
    pub(crate) fn new(ast: Token<'a, R>, bit_length: u64, arena: &'a Bump) -> Self {
        ParseResult {
            ast,
            bit_length,
            arena,
        }
    }

    /// The parsed token tree.
    pub fn ast(&self) -> Token<'a, R> {
        self.ast
    }

    /// The number of bits consumed.
    pub fn bit_length(&self) -> u64 {
        self.bit_length
    }

    /// The arena the tree lives in.
    pub fn arena(&self) -> &'a Bump {
        self.arena
    }

    /// Allocates a user record in the arena and wraps it in a token.
    pub fn make_user(&self, record: R::Record<'a>) -> Token<'a, R> {
        Token::User(self.arena.alloc(record))
    }

    /// Allocates a sequence token in the arena.
    pub fn make_seq<I>(&self, tokens: I) -> Token<'a, R>
    where
        I: IntoIterator<Item = Token<'a, R>>,
        I::IntoIter: ExactSizeIterator,
    {
        Token::Seq(self.arena.alloc_slice_fill_iter(tokens))
    }

    /// Allocates a byte token in the arena.
    pub fn make_bytes<I>(&self, bytes: I) -> Token<'a, R>
    where
        I: IntoIterator<Item = u8>,
    {
        let mut buf = BumpVec::new_in(self.arena);
        buf.extend(bytes);
        Token::Bytes(buf.into_bump_slice())
    }

    /// Allocates an arbitrary value in the arena, for building records that
    /// contain slices of other records.
    pub fn alloc_slice<T, I>(&self, items: I) -> &'a [T]
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        self.arena.alloc_slice_fill_iter(items)
    }
}

impl<'a, R: Records> Clone for ParseResult<'a, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, R: Records> Copy for ParseResult<'a, R> {}

impl<'a, R: Records> fmt::Debug for ParseResult<'a, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseResult")
            .field("ast", &self.ast)
            .field("bit_length", &self.bit_length)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::Endianness;

    #[test]
    fn test_save_restore() {
        let bump = Bump::new();
        let mut state = ParseState::new(InputStream::new(&[1, 2, 3], Endianness::NETWORK), &bump);
        let saved = state.save();
        assert_eq!(state.input_mut().read_byte(), Some(1));
        assert_eq!(state.input().index(), 1);
        state.restore(saved);
        assert_eq!(state.input().index(), 0);
        assert_eq!(state.furthest_bits(), 8);

        state.input_mut().read_bits(4, false);
        assert_eq!(state.furthest_bits(), 8);
    }

    #[test]
    fn test_builders() {
        let bump = Bump::new();
        let res: ParseResult = ParseResult::new(Token::Ignore, 0, &bump);

        let seq = res.make_seq(vec![Token::uint(1, 8), Token::uint(2, 8)]);
        assert_eq!(seq.as_seq().map(<[_]>::len), Some(2));

        let bytes = res.make_bytes(b"hi".iter().copied());
        assert_eq!(bytes.as_bytes(), Some(&b"hi"[..]));

        let words: &[&str] = res.alloc_slice(vec!["a", "b"]);
        assert_eq!(words, ["a", "b"]);
    }
}
