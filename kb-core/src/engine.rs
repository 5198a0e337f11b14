//! Game rules engine: state transitions for 1v1 Knucklebones.
//!
//! This module is the single place that evolves `GameState` via rules. All
//! transitions are value-in/value-out; chance sampling lives in `chance`.

use crate::legal::legal_columns;
use crate::scoring::{board_score, VALUE_NORM};
use crate::state::{Board, GameState, Phase, A, SLOTS};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("illegal column {col} in current state")]
    IllegalColumn { col: u8 },
    #[error("invalid state: {msg}")]
    InvalidState { msg: &'static str },
}

/// Create a canonical initial game state (player 0 to move, roll pending).
pub fn initial_state() -> GameState {
    GameState {
        boards: [Board::default(), Board::default()],
        die: 0,
        phase: Phase::Rolling,
        current_player: 0,
    }
}

pub fn is_terminal(s: &GameState) -> bool {
    s.phase == Phase::Ended
}

/// Apply a chance outcome: the rolled die becomes pending for placement.
pub fn apply_roll(mut state: GameState, die: u8) -> Result<GameState, ApplyError> {
    if state.phase != Phase::Rolling {
        return Err(ApplyError::InvalidState {
            msg: "roll applied outside Rolling phase",
        });
    }
    if !(1..=6).contains(&die) {
        return Err(ApplyError::InvalidState {
            msg: "die value must be in 1..=6",
        });
    }
    state.die = die;
    state.phase = Phase::Playing;
    Ok(state)
}

/// Place the pending die in column `col` for the current player.
///
/// Placement destroys all opponent dice of equal value in the same column
/// (remaining dice compact toward slot 0). The game ends when the placing
/// player's board is full; otherwise the turn passes with a fresh roll
/// pending.
pub fn apply_move(mut state: GameState, col: u8) -> Result<GameState, ApplyError> {
    if state.phase != Phase::Playing {
        return Err(ApplyError::InvalidState {
            msg: "move applied outside Playing phase",
        });
    }
    if state.die == 0 {
        return Err(ApplyError::InvalidState {
            msg: "no pending die to place",
        });
    }
    let legal = legal_columns(&state);
    let c = col as usize;
    if c >= A || !legal[c] {
        return Err(ApplyError::IllegalColumn { col });
    }

    let p = state.current_player as usize;
    let die = state.die;
    let slot = state.boards[p]
        .column_free_slot(c)
        .ok_or(ApplyError::IllegalColumn { col })?;
    state.boards[p].cols[c][slot] = die;

    // Destroy matching opponent dice in the same column, then compact.
    let opp_col = &mut state.boards[1 - p].cols[c];
    let mut packed = [0u8; SLOTS];
    let mut k = 0usize;
    for &d in opp_col.iter() {
        if d != 0 && d != die {
            packed[k] = d;
            k += 1;
        }
    }
    *opp_col = packed;

    state.die = 0;
    if state.boards[p].is_full() {
        state.phase = Phase::Ended;
    } else {
        state.current_player = 1u8.saturating_sub(state.current_player);
        state.phase = Phase::Rolling;
    }
    Ok(state)
}

/// Winning player by total board score, or `None` for a draw.
pub fn winner(s: &GameState) -> Option<u8> {
    let s0 = board_score(&s.boards[0]);
    let s1 = board_score(&s.boards[1]);
    match s0.cmp(&s1) {
        std::cmp::Ordering::Greater => Some(0),
        std::cmp::Ordering::Less => Some(1),
        std::cmp::Ordering::Equal => None,
    }
}

/// Game outcome from `pov` player's perspective: +1 win, -1 loss, 0 draw.
pub fn terminal_value(s: &GameState, pov: u8) -> f32 {
    match winner(s) {
        Some(w) if w == pov => 1.0,
        Some(_) => -1.0,
        None => 0.0,
    }
}

/// Cheap positional estimate from `pov` player's perspective.
///
/// Normalized score difference, clamped to [-1, 1]. Stands in for the learned
/// evaluator when none is present and terminates degenerate search paths.
pub fn heuristic_value(s: &GameState, pov: u8) -> f32 {
    debug_assert!(pov <= 1);
    let me = board_score(&s.boards[pov as usize]);
    let opp = board_score(&s.boards[(1 - pov) as usize]);
    (((me - opp) as f32) / VALUE_NORM).clamp(-1.0, 1.0)
}
