use std::path::Path;

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, error, info};

use super::prompt::SummaryLength;
use super::{
    DocumentState, DroppedFile, InteractionController, ViewState, EXTRACTION_FALLBACK_TEXT,
    PDF_CONTENT_TYPE,
};
use crate::utils::pdf::{has_pdf_header, TextExtractor};
use crate::utils::proxy_client::ChatBackend;

const LOADING_LINE: &str = "Loading...";

/// One line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Empty text summarizes, anything else is a question.
    Submit(String),
    Length(SummaryLength),
    Quit,
    Invalid(String),
}

/// Slash commands are matched on the trimmed line; anything else is submitted
/// exactly as typed, so a line of spaces is still a question.
pub fn parse_command(line: &str) -> SessionCommand {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(rest) = line.trim().strip_prefix('/') {
        let mut parts = rest.split_whitespace();
        return match (parts.next(), parts.next()) {
            (Some("quit" | "exit"), None) => SessionCommand::Quit,
            (Some("length"), Some(value)) => match value.parse::<SummaryLength>() {
                Ok(length) => SessionCommand::Length(length),
                Err(e) => SessionCommand::Invalid(e),
            },
            _ => SessionCommand::Invalid(format!("unknown command: {}", line.trim())),
        };
    }

    SessionCommand::Submit(line.to_string())
}

/// Reads a file from disk the way a browser hands over a dropped file: name,
/// declared content type, and bytes.
pub async fn load_dropped_file(path: &Path) -> Result<DroppedFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let by_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    let content_type = if by_extension || has_pdf_header(&bytes) {
        PDF_CONTENT_TYPE
    } else {
        "application/octet-stream"
    };

    Ok(DroppedFile {
        name: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        content_type: content_type.to_string(),
        bytes,
    })
}

/// Lines describing the current view.
pub fn render(state: &ViewState) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(err) = &state.last_error {
        lines.push(format!("Error: {}", err));
    }
    if !state.response.is_empty() {
        lines.push(format!("Summary ({}):", state.summary_length));
        lines.push(state.response.clone());
    }

    lines
}

/// Line-oriented stand-in for the browser page.
pub struct Session<R, W> {
    reader: FramedRead<BufReader<R>, LinesCodec>,
    writer: FramedWrite<W, LinesCodec>,
}

impl Session<tokio::io::Stdin, tokio::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> Session<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: FramedRead::new(BufReader::new(reader), LinesCodec::new()),
            writer: FramedWrite::new(writer, LinesCodec::new()),
        }
    }

    #[cfg(test)]
    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }

    /// Drops `file` (if any) into the controller, then handles commands until
    /// `/quit` or end of input.
    pub async fn run<B, E>(
        &mut self,
        controller: &mut InteractionController<B, E>,
        file: Option<DroppedFile>,
    ) -> Result<()>
    where
        B: ChatBackend,
        E: TextExtractor,
    {
        if let Some(file) = file {
            if file.is_pdf() {
                self.write("Reading PDF...").await?;
            }
            if controller.on_drop(vec![file]).await {
                if let DocumentState::Failed { reason } = &controller.state().document {
                    let notice = format!("{} ({})", EXTRACTION_FALLBACK_TEXT, reason);
                    self.write(&notice).await?;
                }
                self.show(controller.state()).await?;
            } else {
                self.write("Not a PDF, nothing to read").await?;
            }
        }

        self.write("Enter a question, an empty line to summarize, /length <short|medium|long>, or /quit")
            .await?;

        while let Some(line) = self.reader.next().await {
            let line = line.context("failed to read input line")?;
            debug!("Received: {}", line);

            match parse_command(&line) {
                SessionCommand::Quit => break,
                SessionCommand::Invalid(message) => {
                    self.write(&message).await?;
                    continue;
                }
                SessionCommand::Length(length) => {
                    // Only a loaded document triggers a new summary
                    if !controller.state().document.is_empty() {
                        self.write(LOADING_LINE).await?;
                    }
                    controller.on_summary_length_change(length).await;
                }
                SessionCommand::Submit(input) => {
                    self.write(LOADING_LINE).await?;
                    controller.set_input(input);
                    controller.on_submit().await;
                }
            }

            self.show(controller.state()).await?;
        }

        info!("Session ended");
        Ok(())
    }

    async fn show(&mut self, state: &ViewState) -> Result<()> {
        for line in render(state) {
            self.write(&line).await?;
        }
        Ok(())
    }

    async fn write(&mut self, line: &str) -> Result<()> {
        if let Err(e) = self.writer.send(line).await {
            error!("Error writing output: {}", e);
            return Err(e.into());
        }
        Ok(())
    }
}
