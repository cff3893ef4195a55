//! The 13 labels a square can carry.

use serde::{Deserialize, Serialize};
use shakmaty::{Color, Piece, Role};

/// One piece-or-empty label.
///
/// Declaration order is the classifier's distribution layout. The decoder's
/// exact-tie preference is [`PieceClass::tie_rank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PieceClass {
    Empty,
    WhitePawn,
    WhiteKnight,
    WhiteBishop,
    WhiteRook,
    WhiteQueen,
    WhiteKing,
    BlackPawn,
    BlackKnight,
    BlackBishop,
    BlackRook,
    BlackQueen,
    BlackKing,
}

impl PieceClass {
    pub const ALL: [PieceClass; 13] = [
        PieceClass::Empty,
        PieceClass::WhitePawn,
        PieceClass::WhiteKnight,
        PieceClass::WhiteBishop,
        PieceClass::WhiteRook,
        PieceClass::WhiteQueen,
        PieceClass::WhiteKing,
        PieceClass::BlackPawn,
        PieceClass::BlackKnight,
        PieceClass::BlackBishop,
        PieceClass::BlackRook,
        PieceClass::BlackQueen,
        PieceClass::BlackKing,
    ];

    /// Position of this label inside a 13-element distribution.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Lower wins an exact tie: empty first, then roles pawn to king, white
    /// before black within a role.
    pub fn tie_rank(self) -> u8 {
        match self.piece() {
            None => 0,
            Some(piece) => {
                let colour = match piece.color {
                    Color::White => 0,
                    Color::Black => 1,
                };
                piece.role as u8 * 2 - 1 + colour
            }
        }
    }

    pub fn from_piece(piece: Option<Piece>) -> Self {
        let Some(piece) = piece else {
            return PieceClass::Empty;
        };
        match (piece.color, piece.role) {
            (Color::White, Role::Pawn) => PieceClass::WhitePawn,
            (Color::White, Role::Knight) => PieceClass::WhiteKnight,
            (Color::White, Role::Bishop) => PieceClass::WhiteBishop,
            (Color::White, Role::Rook) => PieceClass::WhiteRook,
            (Color::White, Role::Queen) => PieceClass::WhiteQueen,
            (Color::White, Role::King) => PieceClass::WhiteKing,
            (Color::Black, Role::Pawn) => PieceClass::BlackPawn,
            (Color::Black, Role::Knight) => PieceClass::BlackKnight,
            (Color::Black, Role::Bishop) => PieceClass::BlackBishop,
            (Color::Black, Role::Rook) => PieceClass::BlackRook,
            (Color::Black, Role::Queen) => PieceClass::BlackQueen,
            (Color::Black, Role::King) => PieceClass::BlackKing,
        }
    }

    pub fn piece(self) -> Option<Piece> {
        let (color, role) = match self {
            PieceClass::Empty => return None,
            PieceClass::WhitePawn => (Color::White, Role::Pawn),
            PieceClass::WhiteKnight => (Color::White, Role::Knight),
            PieceClass::WhiteBishop => (Color::White, Role::Bishop),
            PieceClass::WhiteRook => (Color::White, Role::Rook),
            PieceClass::WhiteQueen => (Color::White, Role::Queen),
            PieceClass::WhiteKing => (Color::White, Role::King),
            PieceClass::BlackPawn => (Color::Black, Role::Pawn),
            PieceClass::BlackKnight => (Color::Black, Role::Knight),
            PieceClass::BlackBishop => (Color::Black, Role::Bishop),
            PieceClass::BlackRook => (Color::Black, Role::Rook),
            PieceClass::BlackQueen => (Color::Black, Role::Queen),
            PieceClass::BlackKing => (Color::Black, Role::King),
        };
        Some(Piece { color, role })
    }

    /// FEN letter, `None` for an empty square.
    pub fn fen_char(self) -> Option<char> {
        let c = match self {
            PieceClass::Empty => return None,
            PieceClass::WhitePawn => 'P',
            PieceClass::WhiteKnight => 'N',
            PieceClass::WhiteBishop => 'B',
            PieceClass::WhiteRook => 'R',
            PieceClass::WhiteQueen => 'Q',
            PieceClass::WhiteKing => 'K',
            PieceClass::BlackPawn => 'p',
            PieceClass::BlackKnight => 'n',
            PieceClass::BlackBishop => 'b',
            PieceClass::BlackRook => 'r',
            PieceClass::BlackQueen => 'q',
            PieceClass::BlackKing => 'k',
        };
        Some(c)
    }

    pub fn from_fen_char(c: char) -> Option<Self> {
        PieceClass::ALL
            .into_iter()
            .find(|class| class.fen_char() == Some(c))
    }
}
