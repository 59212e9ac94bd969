//! Aggregation operators understood by sFlow-RT.
//!
//! A metric name may be prefixed with an operator (`avg:load_one`) to tell
//! the server how to combine values across agents. The client never parses
//! metric strings it is given; this type only helps callers write them.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Aggregation {
    /// Used by the server when no prefix is given.
    #[default]
    Max,
    Min,
    Sum,
    Avg,
    Var,
    Sdev,
    Med,
    Q1,
    Q2,
    Q3,
    Iqr,
    Any,
}

impl Aggregation {
    pub const ALL: [Aggregation; 12] = [
        Aggregation::Max,
        Aggregation::Min,
        Aggregation::Sum,
        Aggregation::Avg,
        Aggregation::Var,
        Aggregation::Sdev,
        Aggregation::Med,
        Aggregation::Q1,
        Aggregation::Q2,
        Aggregation::Q3,
        Aggregation::Iqr,
        Aggregation::Any,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Aggregation::Max => "max",
            Aggregation::Min => "min",
            Aggregation::Sum => "sum",
            Aggregation::Avg => "avg",
            Aggregation::Var => "var",
            Aggregation::Sdev => "sdev",
            Aggregation::Med => "med",
            Aggregation::Q1 => "q1",
            Aggregation::Q2 => "q2",
            Aggregation::Q3 => "q3",
            Aggregation::Iqr => "iqr",
            Aggregation::Any => "any",
        }
    }

    /// Prefix `metric` with this operator: `Avg.apply("load_one")` is
    /// `"avg:load_one"`.
    pub fn apply(self, metric: &str) -> String {
        format!("{}:{metric}", self.as_str())
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aggregation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Aggregation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| Error::UnknownAggregation(s.to_string()))
    }
}
