//! Comparison operators available to structured filters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    In,
    Nin,
}

impl Comparator {
    pub const ALL: [Comparator; 9] = [
        Comparator::Eq,
        Comparator::Ne,
        Comparator::Gt,
        Comparator::Gte,
        Comparator::Lt,
        Comparator::Lte,
        Comparator::Like,
        Comparator::In,
        Comparator::Nin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Eq => "eq",
            Comparator::Ne => "ne",
            Comparator::Gt => "gt",
            Comparator::Gte => "gte",
            Comparator::Lt => "lt",
            Comparator::Lte => "lte",
            Comparator::Like => "like",
            Comparator::In => "in",
            Comparator::Nin => "nin",
        }
    }

    /// `in` and `nin` take a list of values
    pub fn takes_list(&self) -> bool {
        matches!(self, Comparator::In | Comparator::Nin)
    }

    /// Whether the comparator needs an ordering on the field's values
    pub fn is_ordering(&self) -> bool {
        matches!(self, Comparator::Gt | Comparator::Gte | Comparator::Lt | Comparator::Lte)
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        Comparator::ALL
            .into_iter()
            .find(|c| c.as_str() == lowered)
            .ok_or_else(|| format!("unknown comparator '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("GTE".parse::<Comparator>().unwrap(), Comparator::Gte);
        assert_eq!("nin".parse::<Comparator>().unwrap(), Comparator::Nin);
        assert!("contains".parse::<Comparator>().is_err());
    }

    #[test]
    fn test_list_and_ordering_groups() {
        assert!(Comparator::In.takes_list());
        assert!(!Comparator::Eq.takes_list());
        assert!(Comparator::Lt.is_ordering());
        assert!(!Comparator::Like.is_ordering());
    }
}
