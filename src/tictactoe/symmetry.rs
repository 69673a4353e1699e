//! Board canonicalization under the symmetries of the square
//!
//! A board is keyed from one agent's point of view and reduced to the first
//! of its eight symmetric images that the value table already knows. The
//! search order is fixed, so once a representative is registered every
//! later lookup of an equivalent board resolves to it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::board::{Board, Cell, Symbol};
use crate::identifiers::{Coord, StateKey};

/// Something that can answer "is this state key already registered?".
pub trait KnownStates {
    fn contains_state(&self, key: &str) -> bool;
}

impl KnownStates for HashSet<StateKey> {
    fn contains_state(&self, key: &str) -> bool {
        self.contains(key)
    }
}

/// Un-normalized key of a board: row-major, `a` = mine, `b` = opponent, `0` = empty.
pub fn hash_board(board: &Board, me: Symbol) -> StateKey {
    let key: String = board
        .cells()
        .map(|cell| match cell {
            Cell::Empty => '0',
            cell if cell == me.to_cell() => 'a',
            _ => 'b',
        })
        .collect();
    StateKey::new(key)
}

/// Rotate a board 90° clockwise `turns` times (taken mod 4).
pub fn rotate(board: &Board, turns: u8) -> Board {
    let last = board.last_index();
    let mut rotated = board.clone();
    for _ in 0..turns % 4 {
        // new[x][last - y] = old[y][x]
        rotated = rotated.remap(|x, y| (y, last - x));
    }
    rotated
}

/// Mirror every row when `do_flip` is set.
pub fn flip(board: &Board, do_flip: bool) -> Board {
    if !do_flip {
        return board.clone();
    }
    let last = board.last_index();
    board.remap(|x, y| (last - x, y))
}

/// One element of the symmetry group: an optional mirror followed by
/// clockwise quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transform {
    /// Clockwise quarter turns (0-3)
    pub rotations: u8,
    /// Whether rows are mirrored before rotating
    pub flipped: bool,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        rotations: 0,
        flipped: false,
    };

    /// Order in which candidates are tried by [`canonicalize`].
    pub const SEARCH_ORDER: [Transform; 8] = [
        Transform::new(3, false),
        Transform::new(2, false),
        Transform::new(1, false),
        Transform::new(0, false),
        Transform::new(3, true),
        Transform::new(2, true),
        Transform::new(1, true),
        Transform::new(0, true),
    ];

    pub const fn new(rotations: u8, flipped: bool) -> Self {
        Transform {
            rotations: rotations % 4,
            flipped,
        }
    }

    /// Apply to a whole board
    pub fn apply(&self, board: &Board) -> Board {
        rotate(&flip(board, self.flipped), self.rotations)
    }

    /// Map a real coordinate into the transformed board
    pub fn forward(&self, coord: Coord, size: usize) -> Coord {
        let last = size - 1;
        let mut c = coord;
        if self.flipped {
            c.x = last - c.x;
        }
        for _ in 0..self.rotations {
            c = Coord::new(last - c.y, c.x);
        }
        c
    }

    /// Map a coordinate of the transformed board back to the real board
    pub fn reverse(&self, coord: Coord, size: usize) -> Coord {
        let last = size - 1;
        let mut c = coord;
        for _ in 0..(4 - self.rotations) % 4 {
            c = Coord::new(last - c.y, c.x);
        }
        if self.flipped {
            c.x = last - c.x;
        }
        c
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Canonicalization result for one decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub transform: Transform,
    /// Key of the transformed board
    pub key: StateKey,
    /// Side length the transform was computed for
    pub size: usize,
}

impl Mutation {
    /// The identity mutation, keyed by the un-normalized hash
    pub fn identity(board: &Board, me: Symbol) -> Self {
        Mutation {
            transform: Transform::IDENTITY,
            key: hash_board(board, me),
            size: board.size(),
        }
    }

    /// Forward (`reverse == false`): real → canonical.
    /// Reverse (`reverse == true`): canonical → real.
    pub fn mutate_action(&self, action: Coord, reverse: bool) -> Coord {
        if reverse {
            self.transform.reverse(action, self.size)
        } else {
            self.transform.forward(action, self.size)
        }
    }
}

/// Find the first symmetric image of `board` already present in `known`.
///
/// The untransformed board is tried first, then [`Transform::SEARCH_ORDER`].
/// Returns `None` if no image is registered; the caller then keys the state
/// by [`hash_board`], which registers the identity image as canonical.
pub fn canonicalize(board: &Board, known: &impl KnownStates, me: Symbol) -> Option<Mutation> {
    let identity = Mutation::identity(board, me);
    if known.contains_state(identity.key.as_str()) {
        return Some(identity);
    }
    Transform::SEARCH_ORDER.iter().find_map(|transform| {
        let key = hash_board(&transform.apply(board), me);
        known.contains_state(key.as_str()).then(|| Mutation {
            transform: *transform,
            key,
            size: board.size(),
        })
    })
}

/// [`canonicalize`], falling back to the identity mutation.
pub fn locate(board: &Board, known: &impl KnownStates, me: Symbol) -> Mutation {
    canonicalize(board, known, me).unwrap_or_else(|| Mutation::identity(board, me))
}
