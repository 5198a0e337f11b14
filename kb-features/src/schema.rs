//! Feature schema v1.
//!
//! A stable, versioned feature vector consumed by the policy-value evaluator.
//! Encoding is from the POV of `current_player`.
//!
//! ### Layout (v1)
//! Let `my` mean the encoded current player, `opp` the other.
//!
//! - **my_cells**: 9 floats, die value / 6 per (column, slot), 0.0 if empty
//! - **opp_cells**: 9 floats
//! - **my_occupied**: 9 floats, 1.0 if the slot holds a die
//! - **opp_occupied**: 9 floats
//! - **die_onehot**: 6 floats for a pending die 1..6, all zero while rolling
//! - **score_diff_norm**: 1 float, (my score - opp score) / VALUE_NORM,
//!   clamped to [-1, 1]
//!
//! Total: F = 43.

/// Increment this whenever the feature layout changes.
pub const FEATURE_SCHEMA_ID: u32 = 1;

/// Feature vector length for schema v1.
pub const F: usize = 43;

/// Index of the normalized score difference scalar.
pub const SCORE_DIFF_INDEX: usize = 42;
