// ABOUTME: Natural-language inventory query package
// ABOUTME: Intent classification and templated answers over read-only snapshots

pub mod context;
pub mod intent;
pub mod responder;

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;

use context::ChatContext;
use intent::extract_intent;
use responder::{AnswerGenerator, TemplateResponder};

pub use context::{ComponentBrief, LoanBrief, StatsBrief};
pub use intent::{IntentKind, QueryIntent};
pub use responder::ChatAnswer;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Storage error: {0}")]
    Storage(#[from] labstock_storage::StorageError),
    #[error("Answer generation failed: {0}")]
    Generation(String),
}

pub type ChatResult<T> = Result<T, ChatError>;

/// Read-only question answering over the live inventory.
///
/// Loads fresh snapshots with plain reads (never through the lifecycle
/// operations, never mutating), classifies the question, and hands both to an
/// `AnswerGenerator`. The default generator is the built-in template
/// responder; an external LLM client can be slotted in behind the same trait.
pub struct ChatService {
    pool: SqlitePool,
    generator: Box<dyn AnswerGenerator>,
}

impl ChatService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            generator: Box::new(TemplateResponder),
        }
    }

    pub fn with_generator(pool: SqlitePool, generator: Box<dyn AnswerGenerator>) -> Self {
        Self { pool, generator }
    }

    pub async fn answer(&self, question: &str) -> ChatResult<(ChatAnswer, QueryIntent)> {
        let context = ChatContext::load(&self.pool).await?;
        let intent = extract_intent(question, &context);
        debug!("Chat intent {:?} for question: {}", intent.kind, question);

        let answer = self.generator.generate(question, &intent, &context).await?;
        Ok((answer, intent))
    }

    /// Classification without generating an answer.
    pub async fn classify(&self, question: &str) -> ChatResult<QueryIntent> {
        let context = ChatContext::load(&self.pool).await?;
        Ok(extract_intent(question, &context))
    }
}
