//! Can one standard physical chess set show this board?

use shakmaty::{Board, CastlingMode, Chess, Color, FromSetup, PositionError, Role, Setup};
use thiserror::Error;

use crate::board_state::BoardState;

/// Highest count of each non-pawn, non-king role a single set provides.
const MAX_PER_ROLE: usize = 2;

const MAX_PAWNS: usize = 8;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidBoard {
    #[error("position is not legal with either side to move")]
    Unreachable,

    #[error("{color:?} has {count} {role:?}s, more than one set provides")]
    TooMany { color: Color, role: Role, count: usize },

    #[error("{color:?} shows more promoted pieces than missing pawns")]
    PromotionMismatch { color: Color },
}

#[derive(Debug, Default, Clone, Copy)]
struct Inventory {
    pawns: usize,
    knights: usize,
    rooks: usize,
    queens: usize,
    light_bishops: usize,
    dark_bishops: usize,
}

impl Inventory {
    fn of(board: &Board, color: Color) -> Self {
        let own = board.by_color(color);
        let count = |role: Role| (board.by_role(role) & own).count();
        let mut inventory = Inventory {
            pawns: count(Role::Pawn),
            knights: count(Role::Knight),
            rooks: count(Role::Rook),
            queens: count(Role::Queen),
            ..Inventory::default()
        };
        for square in board.by_role(Role::Bishop) & own {
            // a1 is dark: light squares have odd file + rank.
            if (square.file() as usize + square.rank() as usize) % 2 == 1 {
                inventory.light_bishops += 1;
            } else {
                inventory.dark_bishops += 1;
            }
        }
        inventory
    }

    fn bishops(&self) -> usize {
        self.light_bishops + self.dark_bishops
    }

    /// Two bishops on the same square colour means one was promoted.
    fn has_promoted_bishop(&self) -> bool {
        self.light_bishops == 2 || self.dark_bishops == 2
    }
}

/// Position is legal for at least one side to move. Turn is not visible in
/// the image, so both are tried. Material is left to the inventory rules.
fn reachable(board: &Board) -> bool {
    [Color::White, Color::Black].into_iter().any(|turn| {
        let mut setup = Setup::empty();
        setup.board = board.clone();
        setup.turn = turn;
        Chess::from_setup(setup, CastlingMode::Standard)
            .or_else(PositionError::ignore_too_much_material)
            .is_ok()
    })
}

fn check_inventory(board: &Board, color: Color) -> Result<(), InvalidBoard> {
    let inventory = Inventory::of(board, color);

    if inventory.pawns > MAX_PAWNS {
        return Err(InvalidBoard::TooMany { color, role: Role::Pawn, count: inventory.pawns });
    }
    for (role, count) in [
        (Role::Rook, inventory.rooks),
        (Role::Knight, inventory.knights),
        (Role::Bishop, inventory.bishops()),
        (Role::Queen, inventory.queens),
    ] {
        if count > MAX_PER_ROLE {
            return Err(InvalidBoard::TooMany { color, role, count });
        }
    }

    let second_queen = inventory.queens == 2;
    let promoted_bishop = inventory.has_promoted_bishop();
    let mismatch = match inventory.pawns {
        7 => second_queen && promoted_bishop,
        8 => second_queen || promoted_bishop,
        _ => false,
    };
    if mismatch {
        return Err(InvalidBoard::PromotionMismatch { color });
    }
    Ok(())
}

/// Check `board` against one standard set, rules in order: reachability,
/// per-role ceiling, promotion consistency.
pub fn validate(board: &Board) -> Result<(), InvalidBoard> {
    if !reachable(board) {
        return Err(InvalidBoard::Unreachable);
    }
    check_inventory(board, Color::White)?;
    check_inventory(board, Color::Black)?;
    Ok(())
}

pub fn is_physically_valid(state: &BoardState) -> bool {
    validate(&state.to_board()).is_ok()
}
