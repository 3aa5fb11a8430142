//! The lowered grammar form produced by desugaring.
//!
//! A [`CfExpr`] describes only the syntactic language of a parser: semantic
//! actions and validations are left to whatever backend executes the lowered
//! form. The recognizer here runs the expression over a byte slice by
//! tracking the set of positions reachable so far, so it never backtracks.
//!
//! The lowered form reads choice as unordered and repetition as
//! non-greedy, while parsers commit to the first alternative that matches
//! and repeat as often as they can. A lowered grammar therefore accepts
//! every input its parser accepts in full, and possibly more:
//! `sequence(vec![many(ch(b'a')), ch(b'a')])` never matches, since `many`
//! leaves no `a` behind, yet its lowered form accepts `"aa"`.

use std::{collections::BTreeSet, fmt};

use crate::charset::ByteSet;

/// A grammar expression over bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CfExpr {
    /// Matches the empty string.
    Epsilon,

    /// Matches the empty string at the end of input only.
    End,

    /// Matches one byte in the set.
    Byte(ByteSet),

    /// Matches exactly these bytes.
    Literal(Vec<u8>),

    /// Matches each element in order.
    Seq(Vec<CfExpr>),

    /// Matches any one alternative. An empty choice matches nothing.
    Choice(Vec<CfExpr>),

    /// Matches `inner` between `min` and `max` times.
    Repeat {
        /// The repeated expression.
        inner: Box<CfExpr>,
        /// Minimum number of repetitions.
        min: usize,
        /// Maximum number of repetitions, if bounded.
        max: Option<usize>,
    },
}

type Positions = BTreeSet<usize>;

impl CfExpr {
    /// `n` arbitrary bytes.
    pub fn any_bytes(n: usize) -> CfExpr {
        CfExpr::Repeat {
            inner: Box::new(CfExpr::Byte(ByteSet::full())),
            min: n,
            max: Some(n),
        }
    }

    /// Whether the expression matches the whole of `input`.
    pub fn accepts(&self, input: &[u8]) -> bool {
        self.match_lengths(input).contains(&input.len())
    }

    /// Every prefix length of `input` the expression matches.
    pub fn match_lengths(&self, input: &[u8]) -> Positions {
        self.step(input, &Positions::from([0]))
    }

    fn step(&self, input: &[u8], from: &Positions) -> Positions {
        match self {
            CfExpr::Epsilon => from.clone(),
            CfExpr::End => from.iter().copied().filter(|&p| p == input.len()).collect(),
            CfExpr::Byte(set) => from
                .iter()
                .filter(|&&p| input.get(p).map_or(false, |&b| set.contains(b)))
                .map(|p| p + 1)
                .collect(),
            CfExpr::Literal(lit) => from
                .iter()
                .filter(|&&p| input[p..].starts_with(lit))
                .map(|p| p + lit.len())
                .collect(),
            CfExpr::Seq(items) => {
                let mut current = from.clone();
                for item in items {
                    if current.is_empty() {
                        break;
                    }
                    current = item.step(input, &current);
                }
                current
            }
            CfExpr::Choice(alts) => alts.iter().flat_map(|a| a.step(input, from)).collect(),
            CfExpr::Repeat { inner, min, max } => {
                let mut current = from.clone();
                for _ in 0..*min {
                    if current.is_empty() {
                        return current;
                    }
                    current = inner.step(input, &current);
                }

                let mut reached = current.clone();
                let mut frontier = current;
                let mut count = *min;
                while !frontier.is_empty() && max.map_or(true, |m| count < m) {
                    let next = inner.step(input, &frontier);
                    frontier = next.difference(&reached).copied().collect();
                    reached.extend(frontier.iter().copied());
                    count += 1;
                }
                reached
            }
        }
    }
}

impl fmt::Display for CfExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[CfExpr], sep: &str) -> fmt::Result {
            write!(f, "(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, "{}", sep)?;
                }
                write!(f, "{}", item)?;
            }
            write!(f, ")")
        }

        match self {
            CfExpr::Epsilon => write!(f, "ε"),
            CfExpr::End => write!(f, "$"),
            CfExpr::Byte(set) if *set == ByteSet::full() => write!(f, "."),
            CfExpr::Byte(set) => write!(f, "{:?}", set),
            CfExpr::Literal(lit) => write!(f, "\"{}\"", lit.escape_ascii()),
            CfExpr::Seq(items) => join(f, items, " "),
            CfExpr::Choice(alts) => join(f, alts, " | "),
            CfExpr::Repeat { inner, min, max } => match (*min, *max) {
                (0, None) => write!(f, "{}*", inner),
                (1, None) => write!(f, "{}+", inner),
                (0, Some(1)) => write!(f, "{}?", inner),
                (m, None) => write!(f, "{}{{{},}}", inner, m),
                (m, Some(n)) if m == n => write!(f, "{}{{{}}}", inner, m),
                (m, Some(n)) => write!(f, "{}{{{},{}}}", inner, m, n),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> CfExpr {
        CfExpr::Literal(s.as_bytes().to_vec())
    }

    #[test]
    fn test_literal_and_seq() {
        let e = CfExpr::Seq(vec![lit("ab"), CfExpr::Byte(ByteSet::range(b'0'..=b'9'))]);
        assert!(e.accepts(b"ab7"));
        assert!(!e.accepts(b"ab"));
        assert!(!e.accepts(b"abx"));
        assert_eq!(e.match_lengths(b"ab7zz"), Positions::from([3]));
    }

    #[test]
    fn test_choice_is_unordered() {
        let e = CfExpr::Choice(vec![lit("a"), lit("ab")]);
        assert_eq!(e.match_lengths(b"ab"), Positions::from([1, 2]));
        assert!(CfExpr::Choice(vec![]).match_lengths(b"").is_empty());
    }

    #[test]
    fn test_repeat() {
        let star = CfExpr::Repeat {
            inner: Box::new(lit("a")),
            min: 0,
            max: None,
        };
        assert_eq!(star.match_lengths(b"aab"), Positions::from([0, 1, 2]));

        let bounded = CfExpr::Repeat {
            inner: Box::new(lit("a")),
            min: 2,
            max: Some(3),
        };
        assert_eq!(bounded.match_lengths(b"aaaa"), Positions::from([2, 3]));
        assert!(!bounded.accepts(b"a"));

        // A nullable body must not loop.
        let nullable = CfExpr::Repeat {
            inner: Box::new(CfExpr::Epsilon),
            min: 0,
            max: None,
        };
        assert!(nullable.accepts(b""));
    }

    #[test]
    fn test_end() {
        let e = CfExpr::Seq(vec![CfExpr::any_bytes(2), CfExpr::End]);
        assert!(e.accepts(b"xy"));
        assert!(e.match_lengths(b"xyz").is_empty());
    }

    #[test]
    fn test_display() {
        let e = CfExpr::Seq(vec![
            lit("GET "),
            CfExpr::Repeat {
                inner: Box::new(CfExpr::Byte(ByteSet::range(b'a'..=b'z'))),
                min: 1,
                max: None,
            },
            CfExpr::Choice(vec![CfExpr::any_bytes(2), CfExpr::End]),
        ]);
        assert_eq!(e.to_string(), "(\"GET \" {0x61-0x7a}+ (.{2} | $))");
    }
}
