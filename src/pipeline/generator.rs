//! Grounded answer synthesis.

use std::sync::Arc;

use super::error::GenerationFailure;
use crate::completion::CompletionClient;

pub(crate) const GENERATE_INSTRUCTION: &str = "Only answer based on context. If the context \
does not contain the answer, say so instead of guessing.";

/// Returned when the backend answers with empty content.
pub const NO_ANSWER: &str = "No answer found.";

/// Returned without a backend call when retrieval produced no context.
pub const NO_CONTEXT_ANSWER: &str =
    "No relevant context was found in this repository to answer the question.";

/// Produces the final answer from the filtered context.
pub struct AnswerGenerator {
    completion: Arc<dyn CompletionClient>,
}

impl AnswerGenerator {
    /// Create a generator backed by the given completion client.
    pub fn new(completion: Arc<dyn CompletionClient>) -> Self {
        Self { completion }
    }

    /// Answer `query` using only `context`.
    pub async fn generate(&self, query: &str, context: &str) -> Result<String, GenerationFailure> {
        if context.trim().is_empty() {
            tracing::debug!("No context available; skipping generation backend");
            return Ok(NO_CONTEXT_ANSWER.to_string());
        }

        let prompt = format!("Context:\n{context}\n\nQuery: {query}");
        let answer = self.completion.complete(GENERATE_INSTRUCTION, &prompt).await?;
        if answer.trim().is_empty() {
            return Ok(NO_ANSWER.to_string());
        }
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::ScriptedCompletion;

    #[tokio::test]
    async fn sends_context_and_query() {
        let completion = Arc::new(
            ScriptedCompletion::new().on(GENERATE_INSTRUCTION, "Login is handled in auth.rs."),
        );
        let generator = AnswerGenerator::new(completion.clone());

        let answer = generator
            .generate("Where is login?", "auth.rs has login()")
            .await
            .expect("answer");

        assert_eq!(answer, "Login is handled in auth.rs.");
        assert_eq!(
            completion.calls_for(GENERATE_INSTRUCTION),
            vec!["Context:\nauth.rs has login()\n\nQuery: Where is login?"]
        );
    }

    #[tokio::test]
    async fn empty_reply_becomes_no_answer() {
        let completion = Arc::new(ScriptedCompletion::new().on(GENERATE_INSTRUCTION, ""));
        let generator = AnswerGenerator::new(completion);

        let answer = generator.generate("q", "ctx").await.expect("answer");
        assert_eq!(answer, NO_ANSWER);
    }

    #[tokio::test]
    async fn empty_context_skips_backend() {
        let completion = Arc::new(ScriptedCompletion::new().failing(GENERATE_INSTRUCTION));
        let generator = AnswerGenerator::new(completion.clone());

        let answer = generator.generate("q", "  ").await.expect("answer");

        assert_eq!(answer, NO_CONTEXT_ANSWER);
        assert!(completion.calls_for(GENERATE_INSTRUCTION).is_empty());
    }

    #[tokio::test]
    async fn backend_failure_is_fatal() {
        let completion = Arc::new(ScriptedCompletion::new().failing(GENERATE_INSTRUCTION));
        let generator = AnswerGenerator::new(completion);

        let error = generator.generate("q", "ctx").await.expect_err("failure");
        assert!(error.to_string().contains("connection refused"));
    }
}
