//! A committed board: exactly one label per square.

use std::fmt;
use std::str::FromStr;

use shakmaty::{Board, File, Rank, Square};

use crate::error::VisionError;
use crate::piece_class::PieceClass;
use crate::probabilities::NUM_SQUARES;

/// Board-only position (no turn, castling or en-passant fields).
///
/// Squares are stored a1 = 0 .. h8 = 63. Values are produced wholesale,
/// by the decoder or from a rules-engine board, and never edited in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoardState {
    squares: [PieceClass; NUM_SQUARES],
}

/// a1 = 0, b1 = 1, .. h8 = 63.
pub fn square_index(square: Square) -> usize {
    square.rank() as usize * 8 + square.file() as usize
}

pub fn square_from_index(index: usize) -> Square {
    Square::from_coords(File::new((index % 8) as u32), Rank::new((index / 8) as u32))
}

impl BoardState {
    pub(crate) fn from_squares(squares: [PieceClass; NUM_SQUARES]) -> Self {
        Self { squares }
    }

    pub fn from_board(board: &Board) -> Self {
        let mut squares = [PieceClass::Empty; NUM_SQUARES];
        for (i, class) in squares.iter_mut().enumerate() {
            *class = PieceClass::from_piece(board.piece_at(square_from_index(i)));
        }
        Self { squares }
    }

    pub fn to_board(&self) -> Board {
        let mut board = Board::empty();
        for (i, class) in self.squares.iter().enumerate() {
            if let Some(piece) = class.piece() {
                board.set_piece_at(square_from_index(i), piece);
            }
        }
        board
    }

    pub fn piece_at(&self, square: Square) -> PieceClass {
        self.squares[square_index(square)]
    }

    /// `(square, label)` for all 64 squares, a1 first.
    pub fn iter(&self) -> impl Iterator<Item = (Square, PieceClass)> + '_ {
        self.squares
            .iter()
            .enumerate()
            .map(|(i, class)| (square_from_index(i), *class))
    }

    pub fn count(&self, class: PieceClass) -> usize {
        self.squares.iter().filter(|c| **c == class).count()
    }

    /// Piece placement field of a FEN, rank 8 first.
    pub fn board_fen(&self) -> String {
        let mut fen = String::with_capacity(72);
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.squares[rank * 8 + file].fen_char() {
                    Some(c) => {
                        if empty > 0 {
                            fen.push(char::from(b'0' + empty));
                            empty = 0;
                        }
                        fen.push(c);
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push(char::from(b'0' + empty));
            }
            if rank > 0 {
                fen.push('/');
            }
        }
        fen
    }
}

impl FromStr for BoardState {
    type Err = VisionError;

    /// Accepts a board-only FEN, or a full FEN whose first field is used.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let placement = s.split_whitespace().next().unwrap_or("");
        let invalid = |reason: &str| VisionError::BoardFen {
            fen: s.to_string(),
            reason: reason.to_string(),
        };

        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(invalid("expected 8 ranks"));
        }

        let mut squares = [PieceClass::Empty; NUM_SQUARES];
        for (i, row) in ranks.iter().enumerate() {
            let rank = 7 - i;
            let mut file = 0usize;
            for c in row.chars() {
                if let Some(skip) = c.to_digit(10) {
                    if !(1..=8).contains(&skip) {
                        return Err(invalid("empty-square run out of range"));
                    }
                    file += skip as usize;
                } else {
                    let class = PieceClass::from_fen_char(c).ok_or_else(|| invalid("unknown piece letter"))?;
                    if file >= 8 {
                        return Err(invalid("rank too long"));
                    }
                    squares[rank * 8 + file] = class;
                    file += 1;
                }
                if file > 8 {
                    return Err(invalid("rank too long"));
                }
            }
            if file != 8 {
                return Err(invalid("rank too short"));
            }
        }
        Ok(Self { squares })
    }
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.board_fen())
    }
}

impl From<&Board> for BoardState {
    fn from(board: &Board) -> Self {
        BoardState::from_board(board)
    }
}
