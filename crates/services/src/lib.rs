#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod practice;
pub mod progress;
pub mod resolver;

pub use walkthrough_core::Clock;

pub use config::EngineConfig;
pub use error::{PersistenceWarning, ProgressError, ResolveError, SessionError};
pub use practice::{PracticeService, PracticeSession, SubmitOutcome};
pub use progress::{Completion, ProgressAggregator};
pub use resolver::{ResolvedScript, ScriptResolver, ScriptSource};
