//! String abstractions: the prefix domain and the brick domain.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::analysis::{Lattice, NonRelationalDomain};
use crate::il::{BinaryOp, Constant};
use crate::Error;

/// Abstracts a string by the longest prefix it is known to start with.
///
/// The empty prefix carries no information and is identified with top, so
/// `Prefix::new("")` normalizes to `Top`. Joining two prefixes keeps their
/// longest common prefix; the chain of common prefixes only ever shortens,
/// so the default widening terminates.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Prefix {
    Top,
    Prefix(String),
    Bottom,
}

impl Prefix {
    pub fn new<S: Into<String>>(prefix: S) -> Prefix {
        let prefix = prefix.into();
        if prefix.is_empty() {
            Prefix::Top
        } else {
            Prefix::Prefix(prefix)
        }
    }

    /// The known prefix, if any.
    pub fn prefix(&self) -> Option<&str> {
        match self {
            Prefix::Prefix(prefix) => Some(prefix),
            _ => None,
        }
    }

    fn common_prefix(lhs: &str, rhs: &str) -> String {
        lhs.chars()
            .zip(rhs.chars())
            .take_while(|(l, r)| l == r)
            .map(|(l, _)| l)
            .collect()
    }
}

impl Lattice for Prefix {
    fn top() -> Self {
        Prefix::Top
    }

    fn bottom() -> Self {
        Prefix::Bottom
    }

    fn is_top(&self) -> bool {
        *self == Prefix::Top
    }

    fn is_bottom(&self) -> bool {
        *self == Prefix::Bottom
    }

    fn lub_aux(&self, other: &Self) -> Result<Self, Error> {
        match (self, other) {
            (Prefix::Prefix(lhs), Prefix::Prefix(rhs)) => {
                Ok(Prefix::new(Prefix::common_prefix(lhs, rhs)))
            }
            _ => Ok(Prefix::Top),
        }
    }

    fn less_or_equal_aux(&self, other: &Self) -> Result<bool, Error> {
        match (self, other) {
            // A longer prefix describes fewer strings.
            (Prefix::Prefix(lhs), Prefix::Prefix(rhs)) => Ok(lhs.starts_with(rhs.as_str())),
            _ => Ok(false),
        }
    }
}

impl NonRelationalDomain for Prefix {
    fn eval_constant(constant: &Constant) -> Self {
        match constant {
            Constant::Str(value) => Prefix::new(value.clone()),
            _ => Prefix::Top,
        }
    }

    fn eval_binary(op: BinaryOp, lhs: &Self, _rhs: &Self) -> Result<Self, Error> {
        match op {
            // Concatenation preserves the left operand's prefix.
            BinaryOp::StrConcat => Ok(lhs.clone()),
            _ => Ok(Prefix::Top),
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Prefix::Top => write!(f, "⊤"),
            Prefix::Prefix(prefix) => write!(f, "\"{}\"*", prefix),
            Prefix::Bottom => write!(f, "⊥"),
        }
    }
}

/// Widening bound on the size of a brick's string set.
const MAX_STRINGS: usize = 10;
/// Widening bound on a brick's repetition indices.
const MAX_REPETITIONS: u32 = 10;

/// Abstracts a string as a brick [S]^(min,max): between `min` and `max`
/// concatenations of strings drawn from the finite set `S`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Brick {
    Top,
    Brick {
        strings: BTreeSet<String>,
        min: u32,
        max: u32,
    },
    Bottom,
}

impl Brick {
    pub fn new(strings: BTreeSet<String>, min: u32, max: u32) -> Brick {
        Brick::Brick { strings, min, max }
    }

    /// The brick abstracting exactly one string.
    pub fn exact<S: Into<String>>(string: S) -> Brick {
        let mut strings = BTreeSet::new();
        strings.insert(string.into());
        Brick::Brick {
            strings,
            min: 1,
            max: 1,
        }
    }

    /// Every concrete string this brick represents: all concatenations of
    /// `min` to `max` picks from the string set. Exponential in `max`, only
    /// meant for small bricks.
    pub fn reps(&self) -> Option<BTreeSet<String>> {
        let (strings, min, max) = match self {
            Brick::Brick { strings, min, max } => (strings, *min, *max),
            _ => return None,
        };
        let mut result = BTreeSet::new();
        let mut current: BTreeSet<String> = BTreeSet::new();
        current.insert(String::new());
        for length in 0..=max {
            if length >= min {
                result.extend(current.iter().cloned());
            }
            if length == max {
                break;
            }
            let mut next = BTreeSet::new();
            for partial in &current {
                for string in strings {
                    next.insert(format!("{}{}", partial, string));
                }
            }
            current = next;
        }
        Some(result)
    }
}

impl Lattice for Brick {
    fn top() -> Self {
        Brick::Top
    }

    fn bottom() -> Self {
        Brick::Bottom
    }

    fn is_top(&self) -> bool {
        *self == Brick::Top
    }

    fn is_bottom(&self) -> bool {
        *self == Brick::Bottom
    }

    fn lub_aux(&self, other: &Self) -> Result<Self, Error> {
        match (self, other) {
            (
                Brick::Brick { strings, min, max },
                Brick::Brick {
                    strings: other_strings,
                    min: other_min,
                    max: other_max,
                },
            ) => {
                let strings = strings.union(other_strings).cloned().collect();
                Ok(Brick::Brick {
                    strings,
                    min: (*min).min(*other_min),
                    max: (*max).max(*other_max),
                })
            }
            _ => Ok(Brick::Top),
        }
    }

    fn widening_aux(&self, other: &Self) -> Result<Self, Error> {
        match self.lub_aux(other)? {
            Brick::Brick { strings, min, max } => {
                if strings.len() > MAX_STRINGS || max > MAX_REPETITIONS {
                    Ok(Brick::Top)
                } else {
                    Ok(Brick::Brick { strings, min, max })
                }
            }
            other => Ok(other),
        }
    }

    fn less_or_equal_aux(&self, other: &Self) -> Result<bool, Error> {
        match (self, other) {
            (
                Brick::Brick { strings, min, max },
                Brick::Brick {
                    strings: other_strings,
                    min: other_min,
                    max: other_max,
                },
            ) => Ok(strings.is_subset(other_strings)
                && *other_min <= *min
                && *max <= *other_max),
            _ => Ok(false),
        }
    }
}

impl NonRelationalDomain for Brick {
    fn eval_constant(constant: &Constant) -> Self {
        match constant {
            Constant::Str(value) => Brick::exact(value.clone()),
            _ => Brick::Top,
        }
    }
}

impl fmt::Display for Brick {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Brick::Top => write!(f, "⊤"),
            Brick::Brick { strings, min, max } => {
                write!(f, "[")?;
                for (i, string) in strings.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "\"{}\"", string)?;
                }
                write!(f, "]^({},{})", min, max)
            }
            Brick::Bottom => write!(f, "⊥"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Environment;
    use crate::il::{expr_str, expr_var, var, BinaryOp, Expression};

    #[test]
    fn prefix_lub_is_longest_common_prefix() {
        let lhs = Prefix::new("interpolation");
        let rhs = Prefix::new("interpreter");
        assert_eq!(lhs.lub(&rhs).unwrap(), Prefix::new("interp"));
        // No common prefix is no information.
        assert_eq!(Prefix::new("abc").lub(&Prefix::new("xyz")).unwrap(), Prefix::Top);
    }

    #[test]
    fn prefix_ordering() {
        assert!(Prefix::new("abcd").less_or_equal(&Prefix::new("ab")).unwrap());
        assert!(!Prefix::new("ab").less_or_equal(&Prefix::new("abcd")).unwrap());
        assert!(Prefix::new("ab").less_or_equal(&Prefix::Top).unwrap());
    }

    #[test]
    fn prefix_concat_keeps_the_left_prefix() {
        let env = Environment::<Prefix>::top()
            .assign(&var("greeting"), &expr_str("hello "))
            .unwrap();
        let concatenated = Expression::binary(
            BinaryOp::StrConcat,
            expr_var("greeting"),
            expr_var("name"),
        );
        assert_eq!(env.eval(&concatenated).unwrap(), Prefix::new("hello "));
    }

    #[test]
    fn empty_prefix_normalizes_to_top() {
        assert_eq!(Prefix::new(""), Prefix::Top);
        assert!(Prefix::new("").is_top());
        assert_eq!(Prefix::new("").prefix(), None);
        assert_eq!(Prefix::new("ab").prefix(), Some("ab"));
    }

    #[test]
    fn brick_reps_expands_repetitions() {
        let mut strings = BTreeSet::new();
        strings.insert("a".to_string());
        let brick = Brick::new(strings, 2, 3);
        let reps = brick.reps().unwrap();
        let expected: BTreeSet<String> =
            ["aa", "aaa"].iter().map(|s| s.to_string()).collect();
        assert_eq!(reps, expected);
    }

    #[test]
    fn brick_lub_unions_and_stretches_bounds() {
        let lhs = Brick::exact("a");
        let rhs = Brick::new(
            ["b".to_string()].into_iter().collect(),
            0,
            2,
        );
        let joined = lhs.lub(&rhs).unwrap();
        assert_eq!(
            joined,
            Brick::new(
                ["a".to_string(), "b".to_string()].into_iter().collect(),
                0,
                2
            )
        );
        assert!(lhs.less_or_equal(&joined).unwrap());
        assert!(rhs.less_or_equal(&joined).unwrap());
    }

    #[test]
    fn brick_widening_collapses_past_bounds() {
        let mut big = BTreeSet::new();
        for i in 0..16 {
            big.insert(format!("s{}", i));
        }
        let lhs = Brick::exact("a");
        let rhs = Brick::new(big, 1, 1);
        assert_eq!(lhs.widening(&rhs).unwrap(), Brick::Top);

        let lhs = Brick::new(["a".to_string()].into_iter().collect(), 1, 4);
        let rhs = Brick::new(["a".to_string()].into_iter().collect(), 1, 100);
        assert_eq!(lhs.widening(&rhs).unwrap(), Brick::Top);
    }
}
