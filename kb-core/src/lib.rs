//! kb-core: Knucklebones rules, scoring, state representation, and configuration.

pub mod chance;
pub mod config;
pub mod engine;
pub mod legal;
pub mod scoring;
pub mod state;

pub use chance::TurnContext;
pub use config::{Config, ConfigError, TemperatureSchedule};
pub use engine::{
    apply_move, apply_roll, heuristic_value, initial_state, is_terminal, terminal_value, winner,
    ApplyError,
};
pub use legal::{first_legal, legal_columns, legal_count, LegalMask};
pub use scoring::{board_score, column_score, VALUE_NORM};
pub use state::{Board, GameState, Phase, A, COLS, SLOTS};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
