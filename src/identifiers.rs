//! Identifier types for value-table keys and board coordinates.
//!
//! A [`StateKey`] names a (canonicalized) board seen from one agent's point of
//! view, an [`ActionKey`] names a square as `"{x}|{y}"`. Both are opaque strings
//! to the value table and serialize as plain JSON strings.

use std::{borrow::Borrow, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Separator between the x and y halves of an action key.
pub const DELIMITER: char = '|';

/// Key of a board state in the value table.
///
/// Produced by [`crate::tictactoe::symmetry::hash_board`]: one character per
/// cell in row-major order, `a` for the agent's own marks, `b` for the
/// opponent's and `0` for empty squares.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateKey(String);

impl StateKey {
    /// Create a new state key.
    ///
    /// # Examples
    ///
    /// ```
    /// use qtoe::identifiers::StateKey;
    ///
    /// let key = StateKey::new("a000b0000");
    /// assert_eq!(key.as_str(), "a000b0000");
    /// ```
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert the key into its inner String.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<&str> for StateKey {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Borrow<str> for StateKey {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<String> for StateKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for StateKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for StateKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Key of a square (action) in the value table, formatted `"{x}|{y}"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionKey(String);

impl ActionKey {
    /// Create an action key from a raw string without validation.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert the key into its inner String.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Decode the key into a coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAction`] if the key is not two unsigned
    /// integers separated by `|`.
    pub fn coord(&self) -> Result<Coord, Error> {
        self.0.parse()
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<&str> for ActionKey {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Borrow<str> for ActionKey {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for ActionKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<Coord> for ActionKey {
    fn from(coord: Coord) -> Self {
        coord.key()
    }
}

/// A square on the board: `x` is the column, `y` the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Encode as an action key.
    pub fn key(self) -> ActionKey {
        ActionKey(format!("{}{DELIMITER}{}", self.x, self.y))
    }

    /// Check the coordinate lies on a `size`x`size` board.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ActionOutOfBounds`] otherwise.
    pub fn within(self, size: usize) -> Result<Self, Error> {
        if self.x < size && self.y < size {
            Ok(self)
        } else {
            Err(Error::ActionOutOfBounds {
                x: self.x,
                y: self.y,
                size,
            })
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{DELIMITER}{}", self.x, self.y)
    }
}

impl FromStr for Coord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidAction {
            action: s.to_string(),
        };
        let (x, y) = s.split_once(DELIMITER).ok_or_else(invalid)?;
        let x = x.trim().parse().map_err(|_| invalid())?;
        let y = y.trim().parse().map_err(|_| invalid())?;
        Ok(Coord { x, y })
    }
}
