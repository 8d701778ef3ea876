//! The noctua pipeline driver, state, persistence, the file-presence
//! wrapper, the event emitter, and the stage prompt builders.

pub mod config;
pub mod diagnosis;
pub mod driver;
pub mod events;
pub mod file_presence;
pub mod persistence;
pub mod prompts;
pub mod state;
pub mod structured_output;
pub mod workspace;

pub use config::{PipelineOptions, StageBudgets, DEFAULT_EXPLORE_MAX_TURNS, DEFAULT_MAX_REPAIR_ATTEMPTS};
pub use driver::run_pipeline;
pub use events::{NullPipelineObserver, PipelineObserver};
pub use persistence::{append_debug_log, load_state, save_state};
pub use state::{PipelineState, StateInvariantViolation};
pub use workspace::Workspace;
