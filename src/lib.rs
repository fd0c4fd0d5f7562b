pub mod api;
pub mod app;
pub mod chat;
pub mod config;
pub mod extract;
pub mod output;
pub mod progress;
pub mod save;

pub use api::{CompletionResult, Provider, ProviderKind, ProviderRegistry, ResponseEngine};
pub use app::{Session, TurnOutcome};
pub use chat::{ConversationTurn, Role, HISTORY_WINDOW};
pub use config::Config;
pub use extract::CodeArtifact;
pub use save::{SaveDirective, Staging};
