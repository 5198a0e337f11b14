//! kb-features: Feature schema + canonical encoding.

pub mod encode;
pub mod schema;

pub use encode::encode_state_v1;
pub use schema::{F, FEATURE_SCHEMA_ID, SCORE_DIFF_INDEX};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use kb_core::{apply_move, apply_roll, initial_state, Phase};

    #[test]
    fn version_is_nonempty() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn initial_state_encodes_to_zeros() {
        let e = encode_state_v1(&initial_state());
        assert!(e.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn pending_die_is_one_hot() {
        let s = apply_roll(initial_state(), 3).unwrap();
        let e = encode_state_v1(&s);
        let die_slice = &e[36..42];
        assert_eq!(die_slice, [0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn swap_players_encoding_is_consistent() {
        // Play a couple of moves so boards are asymmetric.
        let mut s = initial_state();
        s = apply_move(apply_roll(s, 5).unwrap(), 0).unwrap();
        s = apply_move(apply_roll(s, 2).unwrap(), 1).unwrap();
        s = apply_roll(s, 6).unwrap();
        assert_eq!(s.phase, Phase::Playing);

        // Swapping boards and flipping current_player yields identical encoding.
        let e1 = encode_state_v1(&s);
        let e2 = encode_state_v1(&s.swap_players());
        assert_eq!(e1, e2);
    }

    #[test]
    fn score_diff_feature_matches_heuristic() {
        let mut s = initial_state();
        s = apply_move(apply_roll(s, 5).unwrap(), 0).unwrap();
        s = apply_roll(s, 2).unwrap();
        let e = encode_state_v1(&s);
        assert_eq!(e[SCORE_DIFF_INDEX], kb_core::heuristic_value(&s, 1));
    }
}
