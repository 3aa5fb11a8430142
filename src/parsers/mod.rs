//! The built-in parsers and combinators.
//!
//! Every function here builds a [`Parser`](crate::Parser); none of them
//! touch an arena. Grammars are usually built once and then reused for many
//! inputs.

mod action;
mod choice;
mod indirect;
mod length_value;
mod lookahead;
mod primitives;
mod repeat;
mod sequence;
mod xor;

pub use action::{action, attr_bool};
pub use choice::{butnot, choice, difference};
pub use indirect::Indirect;
pub use length_value::{int_range, length_value};
pub use lookahead::{and, not};
pub use primitives::{
    bits, ch, ch_range, end_p, epsilon_p, in_set, int16, int32, int64, int8, not_in, nothing_p,
    token, uint16, uint32, uint64, uint8,
};
#[cfg(feature = "regex")]
pub use primitives::regex;
pub use repeat::{many, many1, optional, repeat_n, sep_by, sep_by1};
pub use sequence::{ignore, left, middle, right, sequence, whitespace, with_endianness};
pub use xor::xor;

use crate::{cfg::CfExpr, error::DesugarError, parser::Parser, token::Records};

fn all_regular<R: Records>(parsers: &[Parser<R>]) -> bool {
    parsers.iter().all(Parser::is_valid_regular)
}

fn all_cf<R: Records>(parsers: &[Parser<R>]) -> bool {
    parsers.iter().all(Parser::is_valid_cf)
}

fn lower_all<R: Records>(parsers: &[Parser<R>]) -> Result<Vec<CfExpr>, DesugarError> {
    parsers.iter().map(Parser::lower).collect()
}
