//! lenmark Language Server Protocol implementation.
//!
//! Keeps the highlighter hot in memory and hands sentence length spans to
//! editors as semantic tokens or through the `lenmark/spans` request.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use lenmark_core::{compute, Category, Config, Highlighter, LineIndex, Settings, Span};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::{Error as RpcError, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing_subscriber::EnvFilter;

const CMD_TOGGLE: &str = "lenmark.toggle";
const CMD_ENABLE: &str = "lenmark.enable";
const CMD_DISABLE: &str = "lenmark.disable";

fn token_type_name(category: Category) -> &'static str {
    match category {
        Category::Mini => "lenmarkMini",
        Category::Short => "lenmarkShort",
        Category::Medium => "lenmarkMedium",
        Category::Long => "lenmarkLong",
    }
}

fn legend() -> SemanticTokensLegend {
    SemanticTokensLegend {
        token_types: Category::ALL
            .iter()
            .map(|c| SemanticTokenType::new(token_type_name(*c)))
            .collect(),
        token_modifiers: Vec::new(),
    }
}

/// Document state cached by the server.
struct DocumentState {
    content: String,
    version: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpansParams {
    text_document: TextDocumentIdentifier,
    #[serde(default)]
    range: Option<Range>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpanItem {
    range: Range,
    category: Category,
    words: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpansResponse {
    version: i32,
    enabled: bool,
    spans: Vec<SpanItem>,
}

fn to_lsp_position(index: &LineIndex<'_>, byte_offset: usize) -> Position {
    let pos = index.position(byte_offset);
    Position {
        line: pos.line as u32,
        character: pos.character as u32,
    }
}

/// Byte range of the whole lines touched by `range`.
fn viewport(index: &LineIndex<'_>, range: Range) -> std::ops::Range<usize> {
    index.line_span(range.start.line as usize, range.end.line as usize)
}

/// Spans for the whole text, or only for the lines under `range`.
fn spans_in(text: &str, settings: &Settings, range: Option<Range>) -> Vec<Span> {
    match range {
        None => compute(text, settings, 0),
        Some(range) => {
            let window = viewport(&LineIndex::new(text), range);
            compute(&text[window.clone()], settings, window.start)
        }
    }
}

/// Delta-encode spans as LSP semantic tokens. Spans never cross a line.
fn semantic_tokens(text: &str, spans: &[Span]) -> Vec<SemanticToken> {
    let index = LineIndex::new(text);
    let mut tokens = Vec::with_capacity(spans.len());
    let (mut prev_line, mut prev_start) = (0usize, 0usize);
    for span in spans {
        let start = index.position(span.start);
        let end = index.position(span.end);
        if end.line != start.line || end.character <= start.character {
            continue;
        }
        let delta_line = start.line - prev_line;
        let delta_start = if delta_line == 0 {
            start.character - prev_start
        } else {
            start.character
        };
        tokens.push(SemanticToken {
            delta_line: delta_line as u32,
            delta_start: delta_start as u32,
            length: (end.character - start.character) as u32,
            token_type: span.category as u32,
            token_modifiers_bitset: 0,
        });
        prev_line = start.line;
        prev_start = start.character;
    }
    tokens
}

fn command_target(params: &ExecuteCommandParams) -> Option<Url> {
    match params.arguments.first()? {
        Value::String(uri) => Url::parse(uri).ok(),
        Value::Object(map) => map
            .get("uri")
            .and_then(Value::as_str)
            .and_then(|uri| Url::parse(uri).ok()),
        _ => None,
    }
}

/// lenmark Language Server backend.
struct Backend {
    client: Client,
    highlighter: RwLock<Arc<Highlighter>>,
    documents: DashMap<Url, DocumentState>,
    /// Per-document highlighting switch. Survives close/reopen.
    enabled: DashMap<Url, bool>,
    enabled_by_default: RwLock<bool>,
    workspace_root: RwLock<Option<PathBuf>>,
    config_path: RwLock<Option<PathBuf>>,
    forced_profile: RwLock<Option<String>>,
}

impl Backend {
    fn new(client: Client) -> Self {
        let highlighter =
            Highlighter::new(Config::default()).expect("default config always compiles");
        Self {
            client,
            highlighter: RwLock::new(Arc::new(highlighter)),
            documents: DashMap::new(),
            enabled: DashMap::new(),
            enabled_by_default: RwLock::new(true),
            workspace_root: RwLock::new(None),
            config_path: RwLock::new(None),
            forced_profile: RwLock::new(None),
        }
    }

    async fn reload_highlighter(&self) -> anyhow::Result<()> {
        let workspace_root = self.workspace_root.read().await.clone();
        let configured = self.config_path.read().await.clone();
        let resolved = match (configured, workspace_root) {
            (Some(path), _) => path,
            (None, Some(root)) => root.join(lenmark_core::CONFIG_FILE_NAME),
            (None, None) => return Ok(()),
        };

        let cfg = Config::load_or_default(&resolved)?;
        let highlighter = Highlighter::new(cfg)?;
        *self.highlighter.write().await = Arc::new(highlighter);
        *self.config_path.write().await = Some(resolved.clone());

        tracing::info!(path = %resolved.display(), "config loaded");
        self.client
            .log_message(
                MessageType::INFO,
                format!("lenmark config loaded: {}", resolved.display()),
            )
            .await;

        Ok(())
    }

    async fn reload_and_refresh(&self) {
        if let Err(err) = self.reload_highlighter().await {
            tracing::error!("failed to load config: {err:#}");
            self.client
                .log_message(MessageType::ERROR, format!("Failed to load config: {err:#}"))
                .await;
        }
        self.refresh().await;
    }

    async fn refresh(&self) {
        if let Err(err) = self.client.semantic_tokens_refresh().await {
            tracing::debug!("client rejected semantic token refresh: {err}");
        }
    }

    async fn apply_settings(&self, map: &serde_json::Map<String, Value>) {
        if let Some(Value::String(config_path)) = map.get("configPath") {
            if config_path.trim().is_empty() {
                *self.config_path.write().await = None;
            } else {
                let configured = PathBuf::from(config_path);
                if configured.is_absolute() {
                    *self.config_path.write().await = Some(configured);
                } else if let Some(root) = self.workspace_root.read().await.clone() {
                    *self.config_path.write().await = Some(root.join(configured));
                }
            }
        }
        if let Some(Value::String(profile)) = map.get("profile") {
            if profile.trim().is_empty() {
                *self.forced_profile.write().await = None;
            } else {
                *self.forced_profile.write().await = Some(profile.clone());
            }
        }
        if let Some(Value::Bool(enabled)) = map.get("enabledByDefault") {
            *self.enabled_by_default.write().await = *enabled;
        }
    }

    async fn is_enabled(&self, uri: &Url) -> bool {
        match self.enabled.get(uri) {
            Some(entry) => *entry,
            None => *self.enabled_by_default.read().await,
        }
    }

    async fn profile_for_uri(&self, highlighter: &Highlighter, uri: &Url) -> String {
        if let Some(forced) = self.forced_profile.read().await.clone() {
            if !forced.trim().is_empty() {
                return forced;
            }
        }

        let Some(path) = uri.to_file_path().ok() else {
            return highlighter.default_profile().to_string();
        };
        let root = self.workspace_root.read().await.clone();
        let relative = match root {
            Some(root) => path
                .strip_prefix(&root)
                .unwrap_or(path.as_path())
                .to_path_buf(),
            None => path.clone(),
        };
        let relative_str = relative
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "/");
        highlighter.profile_for_path(&relative_str).to_string()
    }

    /// Spans for an open document, with its version and enabled flag.
    /// Disabled documents yield no spans.
    async fn document_spans(
        &self,
        uri: &Url,
        range: Option<Range>,
    ) -> Option<(String, Vec<Span>, i32, bool)> {
        let highlighter = self.highlighter.read().await.clone();
        let profile = self.profile_for_uri(&highlighter, uri).await;
        let enabled = self.is_enabled(uri).await;

        let (content, version) = {
            let doc = self.documents.get(uri)?;
            (doc.content.clone(), doc.version)
        };
        if !enabled {
            return Some((content, Vec::new(), version, false));
        }

        let settings = match highlighter.profile(&profile) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!("{err}; falling back to default profile");
                highlighter.settings()
            }
        };
        let spans = spans_in(&content, settings, range);
        tracing::trace!(%uri, count = spans.len(), "computed spans");
        Some((content, spans, version, true))
    }

    async fn set_enabled(&self, uri: Url, state: Option<bool>) -> bool {
        let next = match state {
            Some(state) => state,
            None => !self.is_enabled(&uri).await,
        };
        self.enabled.insert(uri, next);
        next
    }

    /// Handler for the `lenmark/spans` request.
    async fn spans(&self, params: SpansParams) -> Result<SpansResponse> {
        let uri = params.text_document.uri;
        let Some((content, spans, version, enabled)) =
            self.document_spans(&uri, params.range).await
        else {
            return Err(RpcError::invalid_params(format!("document not open: {uri}")));
        };
        let index = LineIndex::new(&content);
        let spans = spans
            .iter()
            .map(|span| SpanItem {
                range: Range {
                    start: to_lsp_position(&index, span.start),
                    end: to_lsp_position(&index, span.end),
                },
                category: span.category,
                words: span.words,
            })
            .collect();
        Ok(SpansResponse {
            version,
            enabled,
            spans,
        })
    }

    fn is_config_path(config_path: Option<&Path>, candidate: &Url) -> bool {
        match config_path {
            Some(config_path) => candidate
                .to_file_path()
                .is_ok_and(|path| path == config_path),
            None => candidate.path().ends_with(lenmark_core::CONFIG_FILE_NAME),
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(root_uri) = params.root_uri.or_else(|| {
            params
                .workspace_folders
                .as_ref()
                .and_then(|folders| folders.first().map(|f| f.uri.clone()))
        }) {
            if let Ok(path) = root_uri.to_file_path() {
                *self.workspace_root.write().await = Some(path);
            }
        }

        if let Some(Value::Object(map)) = params.initialization_options {
            self.apply_settings(&map).await;
        }

        if let Err(err) = self.reload_highlighter().await {
            self.client
                .log_message(MessageType::ERROR, format!("Failed to load config: {err:#}"))
                .await;
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                semantic_tokens_provider: Some(
                    SemanticTokensServerCapabilities::SemanticTokensOptions(
                        SemanticTokensOptions {
                            work_done_progress_options: WorkDoneProgressOptions::default(),
                            legend: legend(),
                            range: Some(true),
                            full: Some(SemanticTokensFullOptions::Bool(true)),
                        },
                    ),
                ),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![
                        CMD_TOGGLE.to_string(),
                        CMD_ENABLE.to_string(),
                        CMD_DISABLE.to_string(),
                    ],
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "lenmark Language Server".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "lenmark LSP initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.insert(
            uri,
            DocumentState {
                content: params.text_document.text,
                version: params.text_document.version,
            },
        );
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        // With FULL sync, we get the complete new content
        if let Some(change) = params.content_changes.into_iter().last() {
            self.documents.insert(
                uri,
                DocumentState {
                    content: change.text,
                    version,
                },
            );
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let config_path = self.config_path.read().await.clone();
        if Self::is_config_path(config_path.as_deref(), &params.text_document.uri) {
            self.reload_and_refresh().await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.documents.remove(&params.text_document.uri);
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        if let Value::Object(map) = params.settings {
            self.apply_settings(&map).await;
        }
        self.reload_and_refresh().await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let config_path = self.config_path.read().await.clone();
        let should_reload = params
            .changes
            .iter()
            .any(|change| Self::is_config_path(config_path.as_deref(), &change.uri));
        if should_reload {
            self.reload_and_refresh().await;
        }
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        let uri = params.text_document.uri;
        let Some((content, spans, _, _)) = self.document_spans(&uri, None).await else {
            return Ok(None);
        };
        Ok(Some(SemanticTokensResult::Tokens(SemanticTokens {
            result_id: None,
            data: semantic_tokens(&content, &spans),
        })))
    }

    async fn semantic_tokens_range(
        &self,
        params: SemanticTokensRangeParams,
    ) -> Result<Option<SemanticTokensRangeResult>> {
        let uri = params.text_document.uri;
        let Some((content, spans, _, _)) = self.document_spans(&uri, Some(params.range)).await
        else {
            return Ok(None);
        };
        Ok(Some(SemanticTokensRangeResult::Tokens(SemanticTokens {
            result_id: None,
            data: semantic_tokens(&content, &spans),
        })))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        let state = match params.command.as_str() {
            CMD_TOGGLE => None,
            CMD_ENABLE => Some(true),
            CMD_DISABLE => Some(false),
            other => {
                return Err(RpcError::invalid_params(format!("unknown command `{other}`")));
            }
        };
        let Some(uri) = command_target(&params) else {
            return Err(RpcError::invalid_params("expected a document URI argument"));
        };
        let enabled = self.set_enabled(uri.clone(), state).await;
        tracing::debug!(%uri, enabled, "highlighting switched");
        self.refresh().await;
        Ok(Some(json!({ "uri": uri, "enabled": enabled })))
    }
}

#[tokio::main]
async fn main() {
    // stdout carries JSON-RPC; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("LENMARK_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(Backend::new)
        .custom_method("lenmark/spans", Backend::spans)
        .finish();
    Server::new(stdin, stdout, socket).serve(service).await;
}
