pub mod prompt;
pub mod session;

use tracing::{debug, info, warn};

use crate::utils::pdf::TextExtractor;
use crate::utils::proxy_client::ChatBackend;
use prompt::{initial_summary_prompt, question_prompt, summary_prompt, SummaryLength};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Text that stands in for the document when extraction fails.
pub const EXTRACTION_FALLBACK_TEXT: &str = "Error parsing PDF. Please try again.";

/// Text of the most recently dropped document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DocumentState {
    #[default]
    Empty,
    Extracted(String),
    Failed { reason: String },
}

impl DocumentState {
    /// Text placed after the instruction in every prompt.
    ///
    /// A failed extraction still yields the fallback text, so later prompts
    /// carry it exactly as they would carry real content.
    pub fn context(&self) -> &str {
        match self {
            Self::Empty => "",
            Self::Extracted(text) => text,
            Self::Failed { .. } => EXTRACTION_FALLBACK_TEXT,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.context().is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DroppedFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl DroppedFile {
    pub fn is_pdf(&self) -> bool {
        let mime = self.content_type.split(';').next().unwrap_or("").trim();
        mime.eq_ignore_ascii_case(PDF_CONTENT_TYPE)
    }
}

/// Everything the page shows.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub input: String,
    pub response: String,
    pub document: DocumentState,
    pub summary_length: SummaryLength,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

/// Turns user actions into prompts, sends them, and keeps [`ViewState`] current.
///
/// Every action takes `&mut self` and runs to completion before the next one
/// starts, so a response can never land on state that a later action has
/// already replaced.
pub struct InteractionController<B, E> {
    backend: B,
    extractor: E,
    state: ViewState,
}

impl<B: ChatBackend, E: TextExtractor> InteractionController<B, E> {
    pub fn new(backend: B, extractor: E) -> Self {
        Self {
            backend,
            extractor,
            state: ViewState::default(),
        }
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.state.input = input.into();
    }

    /// Handles a drop. Only the first PDF among `files` is used; returns
    /// `false` when there was none, in which case nothing else happens.
    ///
    /// The document is kept only once its first summary has come back; if
    /// either extraction or that request fails, the fallback text takes its
    /// place and the previous result stays on screen.
    pub async fn on_drop(&mut self, files: Vec<DroppedFile>) -> bool {
        let Some(file) = files.into_iter().find(DroppedFile::is_pdf) else {
            debug!("Ignoring drop without a PDF");
            return false;
        };

        info!("Reading PDF {} ({} bytes)", file.name, file.bytes.len());
        self.state.is_loading = true;

        match self.extractor.extract(&file.bytes) {
            Ok(text) => {
                let prompt = initial_summary_prompt(&text);
                self.state.document = match self.send(prompt).await {
                    Ok(()) => DocumentState::Extracted(text),
                    Err(reason) => DocumentState::Failed { reason },
                };
            }
            Err(e) => {
                warn!("Error parsing PDF {}: {}", file.name, e);
                self.state.document = DocumentState::Failed {
                    reason: e.to_string(),
                };
                self.state.is_loading = false;
            }
        }

        true
    }

    /// Submits the input field: a question when it has text, a summary
    /// request otherwise. The field is cleared either way.
    pub async fn on_submit(&mut self) {
        let input = std::mem::take(&mut self.state.input);
        let context = self.state.document.context();

        let prompt = if input.is_empty() {
            summary_prompt(self.state.summary_length, context)
        } else {
            question_prompt(&input, context)
        };

        let _ = self.send(prompt).await;
    }

    /// Selects a new summary length and re-summarizes the stored document,
    /// if there is one.
    pub async fn on_summary_length_change(&mut self, length: SummaryLength) {
        self.state.summary_length = length;

        if self.state.document.is_empty() {
            debug!("Summary length set to {} with no document loaded", length);
            return;
        }

        let prompt = summary_prompt(length, self.state.document.context());
        let _ = self.send(prompt).await;
    }

    /// Loading -> Idle around one request. Only a successful reply replaces
    /// the displayed result; a failure is returned and kept in `last_error`.
    async fn send(&mut self, prompt: String) -> Result<(), String> {
        self.state.is_loading = true;

        let result = match self.backend.call_chat(&prompt).await {
            Ok(content) => {
                self.state.response = content;
                self.state.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!("Chat request failed: {}", e);
                let reason = e.to_string();
                self.state.last_error = Some(reason.clone());
                Err(reason)
            }
        };

        self.state.is_loading = false;
        result
    }
}
