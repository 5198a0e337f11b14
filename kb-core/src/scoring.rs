//! Column scoring: matching dice in a column multiply.

use crate::state::{Board, SLOTS};

/// Normalization scale for heuristic score differences.
///
/// Board totals rarely exceed ~80 in real play even though the theoretical
/// maximum is 162; 40 keeps mid-game differences inside [-1, 1] without
/// saturating early.
pub const VALUE_NORM: f32 = 40.0;

/// Score of one column: each face `v` appearing `c` times contributes `v*c*c`.
pub fn column_score(col: &[u8; SLOTS]) -> i32 {
    let mut counts = [0i32; 6];
    for &d in col {
        if d != 0 {
            debug_assert!((1..=6).contains(&d));
            counts[(d - 1) as usize] += 1;
        }
    }
    counts
        .iter()
        .enumerate()
        .map(|(i, &c)| (i as i32 + 1) * c * c)
        .sum()
}

/// Total board score: sum of column scores.
pub fn board_score(b: &Board) -> i32 {
    b.cols.iter().map(column_score).sum()
}
