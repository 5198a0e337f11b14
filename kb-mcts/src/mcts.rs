//! PUCT search with batched leaf evaluation.
//!
//! One `search` call owns its tree exclusively: the arena is cleared and the
//! root rebuilt for every decision (no cross-move reuse). Simulations run in
//! waves; every selection increments visit counts on the way down (virtual
//! loss), and each wave resolves its collected leaves through a single
//! batched evaluator call. Chance states are resolved in place by sampling;
//! dice never get tree nodes of their own.

use crate::arena::Arena;
use crate::node::{Node, NodeId};
use kb_core::{
    apply_move, apply_roll, first_legal, heuristic_value, is_terminal, legal_columns, legal_count,
    terminal_value, GameState, LegalMask, Phase, TurnContext, A,
};
use kb_features::encode_state_v1;
use kb_infer::{Features, Oracle, OracleError};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use thiserror::Error;

#[derive(Debug, Clone, Copy)]
pub struct MctsConfig {
    /// PUCT exploration constant.
    pub c_puct: f32,
    /// Simulation budget per decision.
    pub simulations: u32,
    /// Maximum leaves collected per evaluation wave.
    pub batch_size: usize,
    /// Executed-move temperature; 0 picks the most-visited action.
    pub temperature: f32,
    /// Seed for executed-move sampling at temperature > 0.
    pub seed: u64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            c_puct: 1.5,
            simulations: 800,
            batch_size: 64,
            temperature: 1.0,
            seed: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum MctsError {
    #[error("invalid config: {msg}")]
    InvalidConfig { msg: &'static str },
}

#[derive(Debug, Error)]
pub enum SearchError {
    /// A broken evaluator invalidates the whole decision; not recovered.
    #[error("oracle failure during search: {0}")]
    Oracle(#[from] OracleError),
}

#[derive(Debug, Default, Clone)]
pub struct SearchStats {
    pub node_count: usize,
    pub expansions: u32,
    /// Paths terminated by heuristic fallback (illegal move or dead end).
    pub fallbacks: u32,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub action: u8,
    /// Visit-count distribution over the action space (training target).
    pub pi: [f32; A],
    pub stats: SearchStats,
}

enum PathEnd {
    /// Value already expressed from the root player's POV.
    Resolved { value: f32 },
    Leaf { node: NodeId, state: GameState },
}

pub struct Mcts {
    cfg: MctsConfig,
    arena: Arena,
    stats: SearchStats,
    rng: ChaCha8Rng,
}

impl Mcts {
    pub fn new(cfg: MctsConfig) -> Result<Self, MctsError> {
        if !(cfg.c_puct.is_finite() && cfg.c_puct > 0.0) {
            return Err(MctsError::InvalidConfig {
                msg: "c_puct must be finite and > 0",
            });
        }
        if cfg.simulations == 0 {
            return Err(MctsError::InvalidConfig {
                msg: "simulations must be > 0",
            });
        }
        if cfg.batch_size == 0 {
            return Err(MctsError::InvalidConfig {
                msg: "batch_size must be > 0",
            });
        }
        if !(cfg.temperature.is_finite() && cfg.temperature >= 0.0) {
            return Err(MctsError::InvalidConfig {
                msg: "temperature must be finite and >= 0",
            });
        }
        Ok(Self {
            cfg,
            arena: Arena::with_capacity(1024),
            stats: SearchStats::default(),
            rng: ChaCha8Rng::seed_from_u64(cfg.seed),
        })
    }

    /// Adjust the executed-move temperature between decisions.
    pub fn set_temperature(&mut self, t: f32) {
        debug_assert!(t.is_finite() && t >= 0.0);
        self.cfg.temperature = t;
    }

    /// Run the full simulation budget for one decision.
    ///
    /// Returns the chosen action and the visit-count distribution. States
    /// with no legal action yield a degenerate `(0, zeros)` result; a single
    /// legal action short-circuits without spending simulations or touching
    /// the evaluator.
    pub fn search(
        &mut self,
        root_state: &GameState,
        ctx: &mut TurnContext,
        oracle: &impl Oracle,
    ) -> Result<SearchResult, SearchError> {
        self.stats = SearchStats::default();

        let legal = legal_columns(root_state);
        match legal_count(&legal) {
            0 => {
                return Ok(SearchResult {
                    action: 0,
                    pi: [0.0; A],
                    stats: self.stats.clone(),
                })
            }
            1 => {
                let action = first_legal(&legal).unwrap_or(0);
                let mut pi = [0.0; A];
                pi[action as usize] = 1.0;
                return Ok(SearchResult {
                    action,
                    pi,
                    stats: self.stats.clone(),
                });
            }
            _ => {}
        }

        self.arena.clear();
        let root_id = self.arena.push(Node::new(0.0));
        self.expand(root_id, root_state, oracle)?;

        let root_player = root_state.current_player;
        let mut remaining = self.cfg.simulations;
        while remaining > 0 {
            let wave = remaining.min(self.cfg.batch_size as u32);

            let mut paths: Vec<Vec<NodeId>> = Vec::with_capacity(wave as usize);
            let mut leaf_movers: Vec<u8> = Vec::with_capacity(wave as usize);
            let mut leaf_feats: Vec<Features> = Vec::with_capacity(wave as usize);

            for _ in 0..wave {
                let (path, end) = self.select_path(root_id, root_state, root_player, ctx);
                match end {
                    PathEnd::Resolved { value } => self.backpropagate(&path, value),
                    PathEnd::Leaf { node, state } => {
                        self.expand(node, &state, oracle)?;
                        if self.arena.get(node).children.is_empty() {
                            // Dead end even after expansion.
                            self.stats.fallbacks += 1;
                            self.backpropagate(&path, heuristic_value(&state, root_player));
                        } else {
                            leaf_movers.push(state.current_player);
                            leaf_feats.push(encode_state_v1(&state));
                            paths.push(path);
                        }
                    }
                }
            }

            // One batched evaluator call amortizes the wave's leaves.
            if !leaf_feats.is_empty() {
                let evals = oracle.infer_batch(&leaf_feats)?;
                for ((path, mover), ev) in paths.iter().zip(leaf_movers).zip(evals) {
                    let mut v = ev.value.clamp(-1.0, 1.0);
                    if mover != root_player {
                        v = -v;
                    }
                    self.backpropagate(path, v);
                }
            }

            remaining -= wave;
        }

        self.stats.node_count = self.arena.len();
        Ok(self.select_root_action(root_id))
    }

    /// Walk from the root to a leaf, terminal, or fallback point.
    ///
    /// Visit counts are incremented immediately on the way down so that
    /// later selections in the same wave are discouraged from piling onto a
    /// leaf whose value is still pending.
    fn select_path(
        &mut self,
        root_id: NodeId,
        root_state: &GameState,
        root_player: u8,
        ctx: &mut TurnContext,
    ) -> (Vec<NodeId>, PathEnd) {
        let mut node_id = root_id;
        let mut state = *root_state;
        let mut path = vec![node_id];

        loop {
            self.arena.get_mut(node_id).visits += 1;

            if is_terminal(&state) {
                let value = terminal_value(&state, root_player);
                return (path, PathEnd::Resolved { value });
            }

            if state.phase == Phase::Rolling {
                let die = ctx.roll_die();
                match apply_roll(state, die) {
                    Ok(next) => {
                        state = next;
                        continue;
                    }
                    Err(_) => {
                        self.stats.fallbacks += 1;
                        let value = heuristic_value(&state, root_player);
                        return (path, PathEnd::Resolved { value });
                    }
                }
            }

            if self.arena.get(node_id).children.is_empty() {
                return (path, PathEnd::Leaf { node: node_id, state });
            }

            let Some((action, child_id)) = self.select_child(node_id) else {
                self.stats.fallbacks += 1;
                let value = heuristic_value(&state, root_player);
                return (path, PathEnd::Resolved { value });
            };

            match apply_move(state, action) {
                Ok(next) => {
                    state = next;
                    node_id = child_id;
                    path.push(node_id);
                }
                Err(_) => {
                    // Non-fatal: score what we have instead of crashing.
                    self.stats.fallbacks += 1;
                    let value = heuristic_value(&state, root_player);
                    return (path, PathEnd::Resolved { value });
                }
            }
        }
    }

    /// Best child by PUCT; strict `>` keeps the first (insertion-order) child
    /// on ties.
    fn select_child(&self, node_id: NodeId) -> Option<(u8, NodeId)> {
        let node = self.arena.get(node_id);
        let parent_visits = node.visits;

        let mut best: Option<(u8, NodeId)> = None;
        let mut best_score = f32::NEG_INFINITY;
        for &(action, child_id) in &node.children {
            let score = self
                .arena
                .get(child_id)
                .puct_score(parent_visits, self.cfg.c_puct);
            if score > best_score {
                best_score = score;
                best = Some((action, child_id));
            }
        }
        best
    }

    /// Create one child per legal action with oracle-derived priors.
    fn expand(
        &mut self,
        node_id: NodeId,
        state: &GameState,
        oracle: &impl Oracle,
    ) -> Result<(), SearchError> {
        let legal = legal_columns(state);
        if legal_count(&legal) == 0 {
            return Ok(());
        }

        let ev = oracle.infer(&encode_state_v1(state))?;
        let priors = mask_and_renormalize(&ev.policy, &legal);

        let mut children = Vec::with_capacity(legal_count(&legal));
        for (a, &ok) in legal.iter().enumerate() {
            if ok {
                let child = self.arena.push(Node::new(priors[a]));
                children.push((a as u8, child));
            }
        }
        self.arena.get_mut(node_id).children = children;
        self.stats.expansions += 1;
        Ok(())
    }

    /// Add `value` along the path. Visit counts were already taken during
    /// selection and are not touched here.
    fn backpropagate(&mut self, path: &[NodeId], value: f32) {
        for &id in path {
            self.arena.get_mut(id).total_value += value;
        }
    }

    fn select_root_action(&mut self, root_id: NodeId) -> SearchResult {
        let child_visits: Vec<(u8, u32)> = self
            .arena
            .get(root_id)
            .children
            .iter()
            .map(|&(a, c)| (a, self.arena.get(c).visits))
            .collect();

        let mut pi = [0.0f32; A];
        for &(a, n) in &child_visits {
            pi[a as usize] = n as f32;
        }

        let t = self.cfg.temperature;
        if t == 0.0 {
            // Deterministic: highest visit count, first in order on ties.
            let mut best_action = 0u8;
            let mut best_visits = u32::MIN;
            let mut seen = false;
            for &(a, n) in &child_visits {
                if !seen || n > best_visits {
                    seen = true;
                    best_visits = n;
                    best_action = a;
                }
            }
            let mut one_hot = [0.0f32; A];
            one_hot[best_action as usize] = 1.0;
            return SearchResult {
                action: best_action,
                pi: one_hot,
                stats: self.stats.clone(),
            };
        }

        // Sample from visits^(1/t), returning the tempered distribution as
        // the training target.
        let inv_t = 1.0 / t;
        let mut sum = 0.0f32;
        for v in &mut pi {
            if *v > 0.0 {
                *v = v.powf(inv_t);
                sum += *v;
            }
        }
        if !(sum.is_finite() && sum > 0.0) {
            // Degenerate visits (all zero or overflowed powf): uniform over
            // the root's children.
            let n = child_visits.len().max(1) as f32;
            pi = [0.0; A];
            for &(a, _) in &child_visits {
                pi[a as usize] = 1.0 / n;
            }
        } else {
            for v in &mut pi {
                *v /= sum;
            }
        }

        let r: f32 = self.rng.gen();
        let mut acc = 0.0f32;
        let mut action: Option<u8> = None;
        for (a, &p) in pi.iter().enumerate() {
            if p <= 0.0 {
                continue;
            }
            acc += p;
            if r <= acc {
                action = Some(a as u8);
                break;
            }
        }
        // Numeric edge case: fall back to argmax of pi.
        let action = action.unwrap_or_else(|| {
            pi.iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i as u8)
                .unwrap_or(0)
        });

        SearchResult {
            action,
            pi,
            stats: self.stats.clone(),
        }
    }
}

/// Mask a raw policy to the legal set and renormalize. Falls back to uniform
/// over legal actions when the evaluator put zero mass on all of them.
pub(crate) fn mask_and_renormalize(policy: &[f32; A], legal: &LegalMask) -> [f32; A] {
    let mut out = [0.0f32; A];
    let mut sum = 0.0f32;
    for (a, &ok) in legal.iter().enumerate() {
        if ok && policy[a].is_finite() && policy[a] > 0.0 {
            out[a] = policy[a];
            sum += policy[a];
        }
    }
    if sum.is_finite() && sum > 0.0 {
        for v in &mut out {
            *v /= sum;
        }
        return out;
    }
    let n = legal_count(legal);
    if n == 0 {
        return out;
    }
    let u = 1.0 / (n as f32);
    for (a, &ok) in legal.iter().enumerate() {
        if ok {
            out[a] = u;
        }
    }
    out
}
