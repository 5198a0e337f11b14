//! Feature encoding implementation for schema v1.

use crate::schema::{F, SCORE_DIFF_INDEX};
use kb_core::{heuristic_value, Board, GameState, COLS, SLOTS};

fn push_cells(out: &mut [f32], offset: &mut usize, b: &Board) {
    for c in 0..COLS {
        for s in 0..SLOTS {
            out[*offset] = (b.cols[c][s] as f32) / 6.0;
            *offset += 1;
        }
    }
}

fn push_occupancy(out: &mut [f32], offset: &mut usize, b: &Board) {
    for c in 0..COLS {
        for s in 0..SLOTS {
            out[*offset] = if b.cols[c][s] != 0 { 1.0 } else { 0.0 };
            *offset += 1;
        }
    }
}

/// Encode state into feature vector v1, from POV of `current_player`.
pub fn encode_state_v1(s: &GameState) -> [f32; F] {
    assert!(s.current_player <= 1, "current_player must be 0 or 1");
    let me = &s.boards[s.current_player as usize];
    let opp = &s.boards[(1 - s.current_player) as usize];

    let mut out = [0.0f32; F];
    let mut off = 0usize;

    push_cells(&mut out, &mut off, me);
    push_cells(&mut out, &mut off, opp);
    push_occupancy(&mut out, &mut off, me);
    push_occupancy(&mut out, &mut off, opp);

    // Pending die one-hot (all zeros while a roll is pending).
    for face in 1u8..=6 {
        out[off] = if s.die == face { 1.0 } else { 0.0 };
        off += 1;
    }

    out[off] = heuristic_value(s, s.current_player);
    off += 1;

    debug_assert_eq!(off, F);
    debug_assert_eq!(off - 1, SCORE_DIFF_INDEX);
    out
}
