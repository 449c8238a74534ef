//! Guess-the-creature game module
//!
//! This module contains the round engine and the seams it talks through:
//! - Record model fetched from the remote API
//! - Record/sprite source (HTTP in production, stubs in tests)
//! - Presenter for publishing the challenge and collecting selections
//! - Round lifecycle and resolution

pub mod record;
pub mod error;
pub mod source;
pub mod presenter;
pub mod engine;

pub use record::Record;
pub use error::{ConfigError, GameError, PresentationError, UpstreamError};
pub use source::{HttpRecordSource, RecordSource, Sprite};
pub use presenter::{ChoiceOption, Content, MessageHandle, Presenter, Reply, Responder, SelectionEvent, TriggerContext, Visibility};
pub use engine::{Outcome, Presentation, Round, RoundConfig, RoundEngine, RoundHandle, RoundReport};
