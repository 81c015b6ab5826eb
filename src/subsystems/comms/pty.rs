//! PTY (console) comms channel — reads lines from stdin, routes slash
//! commands to the document operations and everything else to chat.
//!
//! Runs until the `shutdown` token is cancelled (Ctrl-C) or stdin is closed.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::subsystems::agents::{ChatRequest, RagAgent};
use crate::subsystems::retrieval::RagVariant;

const HELP: &str = "\
commands:
  /upload <path> [mime]   add a text document
  /delete <doc_id>        remove a document
  /docs                   list documents
  /select <ids...>|all    restrict chat to documents
  /variant [name]         show or set basic | kg | hybrid
  /history                show this session's transcript
  /health                 store and session counters
  /help                   this text
anything else is sent as a question";

// ── Command parsing ──────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Upload { path: &'a str, mime: &'a str },
    Delete(&'a str),
    Docs,
    Select(Vec<&'a str>),
    Variant(Option<&'a str>),
    History,
    Health,
    Help,
    Chat(&'a str),
}

fn parse_line(line: &str) -> Result<Command<'_>, String> {
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Chat(line));
    };
    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();
    match (name, args.as_slice()) {
        ("upload", &[path]) => Ok(Command::Upload { path, mime: "" }),
        ("upload", &[path, mime]) => Ok(Command::Upload { path, mime }),
        ("delete", &[id]) => Ok(Command::Delete(id)),
        ("docs", &[]) => Ok(Command::Docs),
        ("select", ids) if !ids.is_empty() => Ok(Command::Select(ids.to_vec())),
        ("variant", &[]) => Ok(Command::Variant(None)),
        ("variant", &[v]) => Ok(Command::Variant(Some(v))),
        ("history", &[]) => Ok(Command::History),
        ("health", &[]) => Ok(Command::Health),
        ("help", &[]) => Ok(Command::Help),
        _ => Err(format!("unknown or malformed command '/{rest}' (try /help)")),
    }
}

// ── PtyChannel ───────────────────────────────────────────────────────────────

pub struct PtyChannel {
    channel_id: String,
    agent: Arc<RagAgent>,
    session_id: String,
    variant: RagVariant,
}

impl PtyChannel {
    pub fn new(channel_id: impl Into<String>, agent: Arc<RagAgent>) -> Self {
        let variant = agent.default_variant();
        Self {
            channel_id: channel_id.into(),
            agent,
            session_id: uuid::Uuid::now_v7().to_string(),
            variant,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Execute one input line and return the text to print. Errors from the
    /// agent are rendered, not propagated, so one bad command never ends the
    /// console.
    pub async fn handle_line(&mut self, line: &str) -> String {
        let command = match parse_line(line) {
            Ok(c) => c,
            Err(msg) => return msg,
        };
        match self.dispatch(command).await {
            Ok(out) => out,
            Err(e) => format!("error: {e}"),
        }
    }

    async fn dispatch(&mut self, command: Command<'_>) -> Result<String, AppError> {
        match command {
            Command::Upload { path, mime } => {
                let bytes = tokio::fs::read(path).await?;
                let filename = Path::new(path)
                    .file_name()
                    .and_then(|f| f.to_str())
                    .unwrap_or(path);
                let id = self.agent.upload_bytes(&bytes, filename, mime)?;
                Ok(format!("uploaded {filename} as {id}"))
            }
            Command::Delete(id) => Ok(if self.agent.delete(id)? {
                format!("deleted {id}")
            } else {
                format!("no document {id}")
            }),
            Command::Docs => {
                let docs = self.agent.list_documents()?;
                if docs.is_empty() {
                    return Ok("no documents".into());
                }
                Ok(docs
                    .iter()
                    .map(|d| format!("{}  {}  ({} chunks, {})", d.id, d.filename, d.chunk_count, d.mime))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            Command::Select(ids) => {
                let ids: Vec<String> = if ids == ["all"] {
                    self.agent.list_documents()?.into_iter().map(|d| d.id).collect()
                } else {
                    ids.into_iter().map(str::to_string).collect()
                };
                self.agent.select_documents(&self.session_id, &ids)?;
                Ok(format!("{} document(s) selected", ids.len()))
            }
            Command::Variant(None) => Ok(format!("variant: {}", self.variant)),
            Command::Variant(Some(v)) => {
                self.variant = RagVariant::from_str(v)?;
                Ok(format!("variant: {}", self.variant))
            }
            Command::History => {
                let history = self.agent.session_history(&self.session_id)?;
                if history.is_empty() {
                    return Ok("no messages yet".into());
                }
                Ok(history
                    .iter()
                    .map(|m| format!("{}: {}", m.role.label(), m.content))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            Command::Health => {
                let report = self.agent.health()?;
                serde_json::to_string_pretty(&report)
                    .map_err(|e| AppError::Validation(format!("health: {e}")))
            }
            Command::Help => Ok(HELP.to_string()),
            Command::Chat(message) => {
                let resp = self
                    .agent
                    .chat(ChatRequest {
                        message: message.to_string(),
                        session_id: self.session_id.clone(),
                        document_ids: Vec::new(),
                        variant: Some(self.variant),
                        image_data: None,
                    })
                    .await?;
                if resp.is_rejected {
                    return Ok(format!(
                        "[rejected] {}",
                        resp.rejection_reason.unwrap_or_default()
                    ));
                }
                if resp.sources.is_empty() {
                    Ok(resp.response)
                } else {
                    Ok(format!("{}\n  sources: {}", resp.response, resp.sources.join(", ")))
                }
            }
        }
    }

    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), AppError> {
        info!(channel_id = %self.channel_id, session_id = %self.session_id, "pty channel started");
        println!("─────────────────────────────────");
        println!(" docchat console  (Ctrl-C to quit, /help for commands)");
        println!("─────────────────────────────────");

        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();

        loop {
            print!("> ");
            use std::io::Write as _;
            let _ = std::io::stdout().flush();

            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    println!("\n[pty] shutdown signal received, closing console");
                    info!("pty channel shutting down");
                    break;
                }

                line = lines.next_line() => {
                    match line {
                        Err(e) => {
                            warn!("pty read error: {e}");
                            break;
                        }
                        Ok(None) => {
                            info!("pty stdin closed");
                            break;
                        }
                        Ok(Some(input)) => {
                            let input = input.trim();
                            if input.is_empty() { continue; }
                            debug!(len = input.len(), "pty received line");
                            let reply = self.handle_line(input).await;
                            println!("{reply}");
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
