use std::path::PathBuf;

use crate::api::{CompletionResult, ResponseEngine};
use crate::chat::{ConversationTurn, Role};
use crate::extract;
use crate::save::{self, SaveDirective, SaveReport, Staging};

/// What one user turn produced, ready for display.
#[derive(Debug)]
pub enum TurnOutcome {
    /// A provider reply; `staged` artifacts were extracted and staged.
    Reply { text: String, staged: usize },
    /// The provider call failed; the conversation continues.
    Error(String),
    /// A save follow-up was executed and the staging slot cleared.
    Saved {
        directive: SaveDirective,
        report: SaveReport,
    },
    /// A save was requested with nothing staged.
    NothingToSave,
}

/// One conversation: engine, append-only history, and the single staging
/// slot. Mutated only between turns, single writer.
pub struct Session {
    engine: ResponseEngine,
    history: Vec<ConversationTurn>,
    staging: Staging,
    base_dir: PathBuf,
}

impl Session {
    pub fn new(engine: ResponseEngine, base_dir: PathBuf) -> Self {
        Self {
            engine,
            history: Vec::new(),
            staging: Staging::default(),
            base_dir,
        }
    }

    pub fn engine(&self) -> &ResponseEngine {
        &self.engine
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn staged_count(&self) -> usize {
        self.staging.len()
    }

    /// A follow-up is a save instruction only while code is staged AND the
    /// text carries a placement keyword; anything else is ordinary input.
    pub fn is_save_followup(&self, input: &str) -> bool {
        self.staging.is_staged() && save::is_save_request(input)
    }

    pub async fn handle_input(&mut self, input: &str) -> TurnOutcome {
        if self.is_save_followup(input) {
            self.save_staged(input)
        } else {
            self.chat_turn(input).await
        }
    }

    /// Takes the whole staged set (the slot empties unconditionally, so a
    /// stale follow-up can never write twice), resolves the directive and
    /// writes the batch.
    pub fn save_staged(&mut self, followup: &str) -> TurnOutcome {
        let Some(artifacts) = self.staging.take() else {
            return TurnOutcome::NothingToSave;
        };
        let directive = save::resolve(followup);
        tracing::info!(
            directory = %directive.directory,
            count = artifacts.len(),
            "saving staged artifacts"
        );
        let report = save::execute_save(&directive, &artifacts, &self.base_dir);
        TurnOutcome::Saved { directive, report }
    }

    async fn chat_turn(&mut self, input: &str) -> TurnOutcome {
        let result = self.engine.respond(input, &self.history).await;
        match result {
            CompletionResult::Reply(text) => {
                let staged = self.ingest_reply(input, &text);
                TurnOutcome::Reply { text, staged }
            }
            CompletionResult::Failed { reason, .. } => {
                self.history
                    .push(ConversationTurn::new(Role::User, input.to_string()));
                TurnOutcome::Error(reason)
            }
        }
    }

    /// Appends both turns to history and stages any extracted artifacts.
    /// A reply with code supersedes whatever was staged before; a reply
    /// without code leaves the slot untouched.
    pub fn ingest_reply(&mut self, input: &str, reply: &str) -> usize {
        self.history
            .push(ConversationTurn::new(Role::User, input.to_string()));
        self.history
            .push(ConversationTurn::new(Role::Assistant, reply.to_string()));

        let artifacts = extract::extract(reply);
        let staged = artifacts.len();
        self.staging.stage(artifacts);
        staged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Provider, ProviderKind, ProviderRegistry};
    use crate::config::Config;

    fn session_without_credentials() -> Session {
        let registry = ProviderRegistry::new(
            vec![Provider::new(
                ProviderKind::Groq,
                "llama-3.1-8b-instant".to_string(),
                None,
                String::new(),
            )],
            Some(ProviderKind::Groq),
        );
        let engine = ResponseEngine::new(registry, &Config::default());
        Session::new(engine, std::env::temp_dir())
    }

    #[test]
    fn save_keywords_alone_do_not_trigger_without_staging() {
        let session = session_without_credentials();
        assert!(!session.is_save_followup("yes, save it"));
    }

    #[test]
    fn reply_with_code_stages_and_arms_the_follow_up() {
        let mut session = session_without_credentials();
        let staged = session.ingest_reply("write add", "```python\ndef add(a, b):\n    return a + b\n```");
        assert_eq!(staged, 1);
        assert!(session.is_save_followup("put it in my projects folder"));
        assert!(!session.is_save_followup("thanks, that explains it"));
        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn code_free_reply_keeps_the_previous_staging() {
        let mut session = session_without_credentials();
        session.ingest_reply("write add", "```python\ndef add(): pass\n```");
        let staged = session.ingest_reply("explain it", "It adds two numbers.");
        assert_eq!(staged, 0);
        assert_eq!(session.staged_count(), 1);
    }

    #[test]
    fn slot_empties_after_a_save_and_repeat_finds_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut session = session_without_credentials();
        session.base_dir = dir.path().to_path_buf();
        session.ingest_reply("write add", "```python\ndef add(): pass\n```");

        let outcome = session.save_staged("save it, call it calc.py");
        match outcome {
            TurnOutcome::Saved { report, .. } => assert_eq!(report.saved.len(), 1),
            other => panic!("expected Saved, got {other:?}"),
        }
        assert_eq!(session.staged_count(), 0);

        let again = session.save_staged("save it, call it calc.py");
        assert!(matches!(again, TurnOutcome::NothingToSave));
    }

    #[tokio::test]
    async fn missing_credentials_fail_the_turn_but_keep_history() {
        let mut session = session_without_credentials();
        let outcome = session.handle_input("hello").await;
        match outcome {
            TurnOutcome::Error(reason) => assert!(reason.contains("No AI providers configured")),
            other => panic!("expected Error, got {other:?}"),
        }
        // The user turn is still recorded after the failed result.
        assert_eq!(session.history().len(), 1);
    }
}
