//! Per-square maximum-likelihood decoding.

use crate::board_state::{square_index, BoardState};
use crate::orientation::Orientation;
use crate::piece_class::PieceClass;
use crate::probabilities::{FrameProbabilities, SquareProbabilities, NUM_CLASSES, NUM_SQUARES};

/// Distributions re-indexed by board square (a1 = 0 .. h8 = 63).
pub type SquareTable = [SquareProbabilities; NUM_SQUARES];

/// Remap capture order onto board squares.
pub fn by_square(frame: &FrameProbabilities, orientation: Orientation) -> SquareTable {
    let mut table = [SquareProbabilities::new([0.0; NUM_CLASSES]); NUM_SQUARES];
    for (square, probs) in orientation.squares().zip(frame.iter()) {
        table[square_index(square)] = *probs;
    }
    table
}

/// Most likely label on every square, independently. No legality or
/// inventory check happens here.
pub fn decode(frame: &FrameProbabilities, orientation: Orientation) -> BoardState {
    decode_table(&by_square(frame, orientation))
}

pub(crate) fn decode_table(table: &SquareTable) -> BoardState {
    let mut squares = [PieceClass::Empty; NUM_SQUARES];
    for (class, probs) in squares.iter_mut().zip(table.iter()) {
        *class = probs.most_likely();
    }
    BoardState::from_squares(squares)
}

/// Sum over all squares of the probability the classifier gave to the
/// label `state` puts there.
pub fn score(state: &BoardState, table: &SquareTable) -> f32 {
    state
        .iter()
        .map(|(square, class)| table[square_index(square)].get(class))
        .sum()
}
