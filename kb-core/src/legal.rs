//! Legal action mask generation.

use crate::state::{GameState, Phase, A};

/// Legality of each column index for the fixed action space A=3.
pub type LegalMask = [bool; A];

/// Columns the current player may place into.
///
/// Empty mask unless a die is pending placement (`Phase::Playing`).
pub fn legal_columns(s: &GameState) -> LegalMask {
    let mut legal = [false; A];
    if s.phase != Phase::Playing {
        return legal;
    }
    let board = &s.boards[s.current_player as usize];
    for (c, ok) in legal.iter_mut().enumerate() {
        *ok = board.column_free_slot(c).is_some();
    }
    legal
}

pub fn legal_count(mask: &LegalMask) -> usize {
    mask.iter().filter(|&&ok| ok).count()
}

/// First legal column in enumeration order, if any.
pub fn first_legal(mask: &LegalMask) -> Option<u8> {
    mask.iter().position(|&ok| ok).map(|i| i as u8)
}
