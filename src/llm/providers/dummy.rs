//! Dummy LLM provider — answers offline from the prompt it is given.
//!
//! Replies with the first sentence of the first context passage (the text
//! under the first `--- From ... ---` header). Used for tests and for running
//! the console without a model.

use crate::llm::ProviderError;

const PASSAGE_HEADER: &str = "--- From ";
const NO_CONTEXT: &str = "I cannot answer this based on the provided documents.";

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, prompt: &str, image: Option<&[u8]>) -> Result<String, ProviderError> {
        let mut reply = match first_passage_sentence(prompt) {
            Some(sentence) => format!("[dummy] {sentence}"),
            None => format!("[dummy] {NO_CONTEXT}"),
        };
        if let Some(bytes) = image {
            reply.push_str(&format!(" [image: {} bytes]", bytes.len()));
        }
        Ok(reply)
    }
}

fn first_passage_sentence(prompt: &str) -> Option<String> {
    let mut lines = prompt.lines().skip_while(|l| !l.starts_with(PASSAGE_HEADER));
    lines.next()?;
    let body = lines.find(|l| !l.trim().is_empty())?.trim();
    let end = body
        .char_indices()
        .find(|(_, c)| matches!(c, '.' | '!' | '?'))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(body.len());
    Some(body[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answers_from_first_passage() {
        let prompt = "Rules.\n\nDOCUMENT CONTEXT:\n--- From a.txt (Chunk 1) ---\nAlice met Bob. Then more.\n\nQuestion: who?";
        let p = DummyProvider;
        assert_eq!(p.complete(prompt, None).await.unwrap(), "[dummy] Alice met Bob.");
    }

    #[tokio::test]
    async fn no_passage_declines() {
        let p = DummyProvider;
        let out = p.complete("Question: anything?", None).await.unwrap();
        assert!(out.contains("cannot answer"));
    }

    #[tokio::test]
    async fn image_size_reported() {
        let p = DummyProvider;
        let out = p.complete("", Some(&[1u8, 2, 3][..])).await.unwrap();
        assert!(out.ends_with("[image: 3 bytes]"));
    }
}
