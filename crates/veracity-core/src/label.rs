//! The fixed two-class label space.
//!
//! Index order is part of the model contract: a classifier trained with class
//! `0 = FAKE` and `1 = REAL` must declare exactly that ordering, and bundle
//! loading rejects anything else.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LabelError {
    #[error("unknown label {0:?} (expected FAKE or REAL)")]
    Unknown(String),
    #[error("label index {0} out of range")]
    IndexOutOfRange(usize),
}

/// News authenticity label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Fake,
    Real,
}

impl Label {
    /// Number of labels in the space.
    pub const COUNT: usize = 2;

    /// All labels in index order.
    pub const ALL: [Label; Label::COUNT] = [Label::Fake, Label::Real];

    /// Stable integer index of this label.
    pub fn index(self) -> usize {
        match self {
            Self::Fake => 0,
            Self::Real => 1,
        }
    }

    pub fn from_index(index: usize) -> Result<Self, LabelError> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(LabelError::IndexOutOfRange(index))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fake => "FAKE",
            Self::Real => "REAL",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Label {
    type Err = LabelError;

    /// Case-insensitive; also accepts the numeric class ids `0` and `1`
    /// that scikit-learn artifacts commonly carry.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("fake") {
            return Ok(Self::Fake);
        }
        if trimmed.eq_ignore_ascii_case("real") {
            return Ok(Self::Real);
        }
        match trimmed.parse::<usize>() {
            Ok(index) => Self::from_index(index),
            Err(_) => Err(LabelError::Unknown(s.to_string())),
        }
    }
}
