//! Prompt template service.
//!
//! Stores prompt templates through a [`PromptStore`] and renders them. The
//! optional LLM provider backs [`PromptService::enhance`].

use crate::llm::LlmProvider;
use crate::models::{Prompt, PromptId};
use crate::storage::PromptStore;
use crate::{Error, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;

/// Prompt template operations.
pub struct PromptService {
    store: Arc<dyn PromptStore>,
    llm: Option<Arc<dyn LlmProvider>>,
}

impl PromptService {
    /// Creates a service without an LLM.
    #[must_use]
    pub fn new(store: Arc<dyn PromptStore>) -> Self {
        Self { store, llm: None }
    }

    /// Attaches an LLM provider for prompt enhancement.
    #[must_use]
    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Lists prompts, optionally restricted to those carrying `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompts cannot be read.
    pub fn list(&self, tag: Option<&str>) -> Result<Vec<Prompt>> {
        let mut prompts = self.store.prompts()?;
        if let Some(tag) = tag {
            prompts.retain(|p| p.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)));
        }
        prompts.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));
        Ok(prompts)
    }

    /// Finds a prompt by id, or by exact title when no id matches.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompts cannot be read.
    pub fn get(&self, id_or_title: &str) -> Result<Option<Prompt>> {
        let prompts = self.store.prompts()?;
        let by_id = prompts.iter().position(|p| p.id.as_str() == id_or_title);
        let index = by_id.or_else(|| prompts.iter().position(|p| p.title == id_or_title));
        Ok(index.and_then(|i| prompts.into_iter().nth(i)))
    }

    /// Creates and stores a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the title or content is blank.
    pub fn create(&self, title: &str, content: &str, tags: Vec<String>) -> Result<Prompt> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("prompt title is required".to_string()));
        }
        if content.trim().is_empty() {
            return Err(Error::InvalidInput("prompt content is required".to_string()));
        }
        let prompt = Prompt::new(title, content).with_tags(tags);
        tracing::info!(prompt_id = %prompt.id, title = %prompt.title, "Saving prompt");
        self.store.save_prompt(prompt)
    }

    /// Replaces a prompt's content, bumping `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the prompt does not exist.
    pub fn update_content(&self, id: &PromptId, content: &str) -> Result<Prompt> {
        let mut prompt = self
            .store
            .prompts()?
            .into_iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| Error::not_found("prompt", id))?;
        prompt.content = content.to_string();
        prompt.updated_at = Utc::now();
        self.store.save_prompt(prompt)
    }

    /// Deletes a prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompts cannot be written.
    pub fn delete(&self, id: &PromptId) -> Result<bool> {
        self.store.delete_prompt(id)
    }

    /// Renders a stored prompt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown prompt and
    /// [`Error::InvalidInput`] when variables are missing.
    pub fn render(&self, id_or_title: &str, values: &HashMap<String, String>) -> Result<String> {
        let prompt = self
            .get(id_or_title)?
            .ok_or_else(|| Error::not_found("prompt", id_or_title))?;
        prompt.render(values)
    }

    /// Asks the LLM to rewrite a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for blank text or when no LLM is
    /// attached, or the provider's error.
    pub fn enhance(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("prompt text is required".to_string()));
        }
        let llm = self
            .llm
            .as_ref()
            .ok_or_else(|| Error::InvalidInput("no LLM provider configured".to_string()))?;
        llm.enhance_prompt(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryKeyValueStore, WorkspaceStore};

    struct EchoLlm;

    impl LlmProvider for EchoLlm {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn complete(&self, prompt: &str) -> Result<String> {
            Ok(format!("echo: {prompt}"))
        }
    }

    fn service() -> PromptService {
        let store = Arc::new(WorkspaceStore::new(Arc::new(MemoryKeyValueStore::new())));
        PromptService::new(store)
    }

    #[test]
    fn test_create_and_render_by_title() {
        let service = service();
        service
            .create("Greeting", "Hello {{name}}", vec!["demo".to_string()])
            .expect("create");

        let values = HashMap::from([("name".to_string(), "Ada".to_string())]);
        let rendered = service.render("Greeting", &values).expect("render");
        assert_eq!(rendered, "Hello Ada");

        let err = service.render("Greeting", &HashMap::new()).expect_err("missing");
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_create_rejects_blank_fields() {
        let service = service();
        assert!(service.create("  ", "body", Vec::new()).is_err());
        assert!(service.create("Title", " ", Vec::new()).is_err());
        assert!(service.list(None).expect("list").is_empty());
    }

    #[test]
    fn test_list_filters_by_tag() {
        let service = service();
        service
            .create("b", "x", vec!["Work".to_string()])
            .expect("create b");
        service.create("a", "y", Vec::new()).expect("create a");

        assert_eq!(service.list(None).expect("list").len(), 2);
        let tagged = service.list(Some("work")).expect("list");
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].title, "b");
    }

    #[test]
    fn test_update_content_and_delete() {
        let service = service();
        let prompt = service.create("t", "old", Vec::new()).expect("create");
        let updated = service.update_content(&prompt.id, "new").expect("update");
        assert_eq!(updated.content, "new");
        assert!(updated.updated_at >= prompt.updated_at);

        assert!(service.delete(&prompt.id).expect("delete"));
        assert!(service.update_content(&prompt.id, "x").is_err());
    }

    #[test]
    fn test_enhance_requires_llm() {
        let service = service();
        assert!(matches!(
            service.enhance("write a poem"),
            Err(Error::InvalidInput(_))
        ));

        let service = service.with_llm(Arc::new(EchoLlm));
        let enhanced = service.enhance("write a poem").expect("enhance");
        assert!(enhanced.starts_with("echo: "));
        assert!(enhanced.contains("write a poem"));
    }
}
