//! kb-selfplay: Episode driver.
//!
//! Plays complete games by repeatedly calling the search engine, resolving
//! chance events between decisions, and emits one training triple per
//! decision once the outcome is known.

use kb_core::{
    apply_move, apply_roll, initial_state, is_terminal, terminal_value, Phase,
    TemperatureSchedule, TurnContext, A,
};
use kb_features::{encode_state_v1, F};
use kb_infer::Oracle;
use kb_mcts::{Mcts, MctsConfig, MctsError, SearchError};
use thiserror::Error;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// One training sample: encoded decision state, visit-count policy target,
/// and the final outcome from the deciding player's perspective.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySample {
    pub features: [f32; F],
    pub pi: [f32; A],
    pub z: f32,
}

#[derive(Debug, Error)]
pub enum EpisodeError {
    #[error("invalid search config: {0}")]
    Config(#[from] MctsError),
    #[error("search failed: {0}")]
    Search(#[from] SearchError),
    #[error("illegal transition while playing out the episode")]
    IllegalTransition,
}

struct PendingSample {
    features: [f32; F],
    pi: [f32; A],
    mover: u8,
}

/// Play one complete game and return its training triples.
///
/// Chance phases are resolved from the episode's seeded stream; each decision
/// runs a full search at the move-indexed temperature from `schedule`. The
/// final outcome is assigned per sample from that sample's mover's POV.
pub fn play_episode(
    oracle: &impl Oracle,
    mcts_cfg: MctsConfig,
    schedule: &TemperatureSchedule,
    seed: u64,
) -> Result<Vec<ReplaySample>, EpisodeError> {
    let mut ctx = TurnContext::new(seed);
    let mut mcts = Mcts::new(MctsConfig {
        seed: seed ^ 0x9E37_79B9_7F4A_7C15,
        ..mcts_cfg
    })?;

    let mut state = initial_state();
    let mut traj: Vec<PendingSample> = Vec::new();
    let mut move_count = 0u32;

    while !is_terminal(&state) {
        if state.phase == Phase::Rolling {
            let die = ctx.roll_die();
            state = apply_roll(state, die).map_err(|_| EpisodeError::IllegalTransition)?;
            continue;
        }

        mcts.set_temperature(schedule.temperature_for_move(move_count));
        let res = mcts.search(&state, &mut ctx, oracle)?;

        traj.push(PendingSample {
            features: encode_state_v1(&state),
            pi: res.pi,
            mover: state.current_player,
        });

        state = apply_move(state, res.action).map_err(|_| EpisodeError::IllegalTransition)?;
        move_count += 1;
    }

    let samples = traj
        .into_iter()
        .map(|ps| ReplaySample {
            features: ps.features,
            pi: ps.pi,
            z: terminal_value(&state, ps.mover),
        })
        .collect();
    Ok(samples)
}
