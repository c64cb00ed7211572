//! Command implementations.

use std::io::{self, Write};

use playground_client::{
    generate_chat_message, ChatClient, ClientError, CompletionBackend, GenerationHandler,
    NoopHandler,
};
use playground_core::{
    decode_share, encode_share, group_by_date, ChatId, ChatOptions, ChatState, ChatStore,
    Comparison, Message, ModelCatalog, ModelInfo, Role, Settings, Usage, Version,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{load_settings, save_settings, Config};
use crate::error::CliError;
use crate::render::{format_chat, format_message, StreamPrinter};
use crate::store::JsonFileStore;

/// Per-invocation option overrides for a chat.
#[derive(Debug, Clone, Default)]
pub struct OptionOverrides {
    pub model: Option<String>,
    pub system: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub seed: Option<u64>,
    pub json: bool,
    pub safe_prompt: bool,
}

impl OptionOverrides {
    pub fn apply(&self, options: &mut ChatOptions) {
        if let Some(model) = &self.model {
            options.model = model.clone();
        }
        if let Some(system) = &self.system {
            options.system_prompt = Some(system.clone());
        }
        if let Some(temperature) = self.temperature {
            options.temperature = temperature;
        }
        if let Some(top_p) = self.top_p {
            options.top_p = top_p;
        }
        if self.max_tokens.is_some() {
            options.max_tokens = self.max_tokens;
        }
        if self.seed.is_some() {
            options.seed = self.seed;
        }
        options.json |= self.json;
        options.safe_prompt |= self.safe_prompt;
    }
}

/// Everything a command needs: resolved config, settings and storage.
pub struct App {
    pub config: Config,
    pub settings: Settings,
    pub store: JsonFileStore,
}

impl App {
    pub fn open(config: Config) -> Result<Self, CliError> {
        let settings = load_settings(&config.settings_path())?;
        let store = JsonFileStore::open(config.chats_dir())?;
        Ok(Self {
            config,
            settings,
            store,
        })
    }

    fn client(&self) -> Result<ChatClient, CliError> {
        Ok(ChatClient::new(self.config.client_config(&self.settings)?))
    }

    fn load_chat(&self, id: &str) -> Result<ChatState, CliError> {
        let mut chat = self
            .store
            .load(&ChatId::new(id))?
            .ok_or_else(|| CliError::ChatNotFound(id.to_string()))?;
        chat.options.migrate_system_message(&mut chat.messages);
        Ok(chat)
    }

    /// `chat`: one-shot when a prompt is given, otherwise read turns from stdin.
    pub async fn chat(
        &mut self,
        prompt: Option<String>,
        chat_id: Option<String>,
        overrides: &OptionOverrides,
        save: bool,
    ) -> Result<(), CliError> {
        let mut chat = match &chat_id {
            Some(id) => self.load_chat(id)?,
            None => ChatState::new(self.settings.chat_options()),
        };
        overrides.apply(&mut chat.options);

        let client = self.client()?;
        let model = resolve_model(&client, &chat.options.model).await;
        info!(chat_id = %chat.id, model = %model.id, "Chat session");

        if let Some(prompt) = prompt {
            let result = self.interactive_turn(&client, &mut chat, &model, prompt).await;
            if save {
                self.store.save(&chat)?;
            }
            return result;
        }

        eprintln!("Chat {} with {}. /exit to quit.", chat.id, model.id);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            eprint!("> ");
            io::stderr().flush()?;

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else {
                break;
            };
            let line = line.trim();
            match line {
                "" => continue,
                "/exit" | "/quit" => break,
                _ => {}
            }

            let result = self
                .interactive_turn(&client, &mut chat, &model, line.to_string())
                .await;
            if save {
                self.store.save(&chat)?;
            }
            if let Err(e) = result {
                report(&e);
            }
        }
        Ok(())
    }

    async fn interactive_turn(
        &self,
        client: &ChatClient,
        chat: &mut ChatState,
        model: &ModelInfo,
        prompt: String,
    ) -> Result<(), CliError> {
        let watch = CtrlCWatch::start();
        let printer = StreamPrinter::new(io::stdout(), io::stderr());
        let result = ask(client, chat, model, prompt, &watch.cancel, &printer).await;
        printer.finish()?;
        result.map(|_| ())
    }

    /// `regenerate`: add a new version to the chat's last answer.
    pub async fn regenerate(&mut self, id: &str) -> Result<(), CliError> {
        let mut chat = self.load_chat(id)?;
        let client = self.client()?;
        let model = resolve_model(&client, &chat.options.model).await;

        let watch = CtrlCWatch::start();
        let printer = StreamPrinter::new(io::stdout(), io::stderr());
        let result = regenerate_last(&client, &mut chat, &model, &watch.cancel, &printer).await;
        printer.finish()?;
        self.store.save(&chat)?;
        result.map(|_| ())
    }

    /// `compare`: send one prompt to two models side by side.
    pub async fn compare(
        &mut self,
        prompt: String,
        model_b: String,
        overrides: &OptionOverrides,
        sync: bool,
        save: bool,
    ) -> Result<(), CliError> {
        let mut options = self.settings.chat_options();
        overrides.apply(&mut options);

        let mut comparison = Comparison::new(options);
        comparison.chat_b.options.model = model_b;
        comparison.sync_options = sync;
        comparison.sync_options();

        let client = self.client()?;
        let watch = CtrlCWatch::start();
        let (a, b) = compare_turn(&client, &mut comparison, prompt, &watch.cancel).await;

        for (chat, result) in [(&comparison.chat_a, a), (&comparison.chat_b, b)] {
            println!("=== {} ===", chat.options.model);
            if let Some(answer) = chat.messages.messages().last() {
                println!("{}", format_message(answer));
            }
            if let Err(e) = result {
                report(&e);
            }
            println!();
        }

        if save {
            self.store.save(&comparison.chat_a)?;
            self.store.save(&comparison.chat_b)?;
        }
        Ok(())
    }

    /// `models`: list models available to the configured key.
    pub async fn models(&self) -> Result<(), CliError> {
        let client = self.client()?;
        let mut cards = client.list_models().await?;
        cards.sort_by(|a, b| a.id.cmp(&b.id));

        println!("{:<36}  {:<10}  CAPABILITIES", "ID", "REASONING");
        println!("{}", "-".repeat(72));
        for card in cards {
            let info = card.to_model_info();
            let mut capabilities = Vec::new();
            if info.capabilities.vision {
                capabilities.push("vision");
            }
            if info.capabilities.transcribe {
                capabilities.push("transcribe");
            }
            let reasoning = format!("{:?}", info.reasoning_mode());
            println!(
                "{:<36}  {:<10}  {}",
                info.id,
                reasoning,
                capabilities.join(", ")
            );
        }
        Ok(())
    }

    /// `history`: saved chats grouped by day.
    pub fn history(&self) -> Result<(), CliError> {
        let chats = self.store.list()?;
        if chats.is_empty() {
            println!("No saved chats.");
            return Ok(());
        }
        for group in group_by_date(&chats) {
            println!("{}", group.label);
            for chat in group.items {
                println!("  {}  {}", chat.id, history_title(chat));
            }
        }
        Ok(())
    }

    pub fn show(&self, id: &str) -> Result<(), CliError> {
        let chat = self.load_chat(id)?;
        println!("{}", format_chat(&chat));
        Ok(())
    }

    pub fn delete(&mut self, id: &str) -> Result<(), CliError> {
        if !self.store.delete(&ChatId::new(id))? {
            return Err(CliError::ChatNotFound(id.to_string()));
        }
        println!("Deleted {id}");
        Ok(())
    }

    /// `share`: print a token carrying the chat's visible versions.
    pub fn share(&self, id: &str) -> Result<(), CliError> {
        let chat = self.load_chat(id)?;
        println!("{}", encode_share(&chat)?);
        Ok(())
    }

    /// `open-share`: print a shared chat, optionally keeping it as a new chat.
    pub fn open_share(&mut self, token: &str, save: bool) -> Result<(), CliError> {
        let mut chat = decode_share(token)?;
        chat.options.migrate_system_message(&mut chat.messages);
        println!("{}", format_chat(&chat));

        if save {
            chat.as_new_chat();
            self.store.save(&chat)?;
            eprintln!("Saved as {}", chat.id);
        }
        Ok(())
    }

    /// `settings`: update any given values and print the result.
    pub fn update_settings(&mut self, changes: SettingsChanges) -> Result<(), CliError> {
        if !changes.is_empty() {
            let mut settings = self.settings.clone();
            if let Some(model) = changes.model {
                settings.model = model;
            }
            if let Some(temperature) = changes.temperature {
                settings.temperature = temperature;
            }
            if let Some(seed) = changes.seed {
                settings.seed = Some(seed);
            }
            if let Some(endpoint) = changes.endpoint {
                settings.endpoint = Some(endpoint).filter(|e| !e.is_empty());
            }
            self.settings = settings.sanitize();
            save_settings(&self.config.settings_path(), &self.settings)?;
        }
        println!("{}", serde_json::to_string_pretty(&self.settings)?);
        Ok(())
    }
}

/// Values given to the `settings` command.
#[derive(Debug, Default)]
pub struct SettingsChanges {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub seed: Option<i64>,
    pub endpoint: Option<String>,
}

impl SettingsChanges {
    fn is_empty(&self) -> bool {
        self.model.is_none()
            && self.temperature.is_none()
            && self.seed.is_none()
            && self.endpoint.is_none()
    }
}

/// Cancels its token on Ctrl-C while alive.
struct CtrlCWatch {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl CtrlCWatch {
    fn start() -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        });
        Self { cancel, task }
    }
}

impl Drop for CtrlCWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn report(error: &CliError) {
    match error {
        CliError::Client(e) => eprintln!("{}\n{}", e.user_message(), e.details().text),
        other => eprintln!("Error: {other}"),
    }
}

fn history_title(chat: &ChatState) -> String {
    const MAX: usize = 60;
    let title = chat
        .title()
        .map(|t| t.lines().next().unwrap_or_default().to_string())
        .unwrap_or_else(|| "(untitled)".to_string());
    if title.chars().count() > MAX {
        let short: String = title.chars().take(MAX).collect();
        format!("{short}...")
    } else {
        title
    }
}

/// Capability record for `id` from the endpoint's model list, inferred from
/// the id when the list is unavailable.
pub async fn resolve_model<B>(backend: &B, id: &str) -> ModelInfo
where
    B: CompletionBackend + ?Sized,
{
    match backend.list_models().await {
        Ok(cards) => {
            let mut catalog = ModelCatalog::new();
            for card in &cards {
                catalog.insert(card.to_model_info());
            }
            catalog.get_or_infer(id)
        }
        Err(e) => {
            warn!(error = %e, model = %id, "Could not list models, inferring capabilities");
            ModelInfo::infer(id)
        }
    }
}

/// Append a user turn and stream the answer into a new assistant message.
pub async fn ask<B, H>(
    backend: &B,
    chat: &mut ChatState,
    model: &ModelInfo,
    prompt: String,
    cancel: &CancellationToken,
    handler: &H,
) -> Result<Option<Usage>, CliError>
where
    B: CompletionBackend + ?Sized,
    H: GenerationHandler + ?Sized,
{
    chat.messages.push(Message::user(prompt));
    let (history, answer) = chat.messages.begin_answer();
    let usage = run_generation(backend, history, answer, &chat.options, model, cancel, handler)
        .await?;
    if let Some(usage) = usage {
        chat.record_usage(usage);
    }
    Ok(usage)
}

/// Stream a new version of the last assistant message.
pub async fn regenerate_last<B, H>(
    backend: &B,
    chat: &mut ChatState,
    model: &ModelInfo,
    cancel: &CancellationToken,
    handler: &H,
) -> Result<Option<Usage>, CliError>
where
    B: CompletionBackend + ?Sized,
    H: GenerationHandler + ?Sized,
{
    let id = chat
        .messages
        .iter()
        .rev()
        .find(|m| m.role() == Role::Assistant)
        .map(|m| m.id().clone())
        .ok_or_else(|| CliError::NothingToRegenerate(chat.id.to_string()))?;

    let (history, answer) = chat.messages.begin_regeneration(&id)?;
    let usage = run_generation(backend, history, answer, &chat.options, model, cancel, handler)
        .await?;
    if let Some(usage) = usage {
        chat.record_usage(usage);
    }
    Ok(usage)
}

/// Run the same prompt against both sides of a comparison concurrently.
pub async fn compare_turn<B>(
    backend: &B,
    comparison: &mut Comparison,
    prompt: String,
    cancel: &CancellationToken,
) -> (Result<Option<Usage>, CliError>, Result<Option<Usage>, CliError>)
where
    B: CompletionBackend + ?Sized,
{
    let model_a = resolve_model(backend, &comparison.chat_a.options.model).await;
    let model_b = resolve_model(backend, &comparison.chat_b.options.model).await;

    let Comparison { chat_a, chat_b, .. } = comparison;
    tokio::join!(
        ask(backend, chat_a, &model_a, prompt.clone(), cancel, &NoopHandler),
        ask(backend, chat_b, &model_b, prompt, cancel, &NoopHandler),
    )
}

async fn run_generation<B, H>(
    backend: &B,
    history: &mut [Message],
    answer: &mut Message,
    options: &ChatOptions,
    model: &ModelInfo,
    cancel: &CancellationToken,
    handler: &H,
) -> Result<Option<Usage>, CliError>
where
    B: CompletionBackend + ?Sized,
    H: GenerationHandler + ?Sized,
{
    match generate_chat_message(backend, history, answer, options, model, cancel, handler).await
    {
        Ok(usage) => Ok(usage),
        Err(e) => {
            record_failure(answer.active_mut(), &e);
            if let Err(report) = handler.on_error(&e).await {
                debug!(error = %report, "Handler could not take the failure");
            }
            Err(e.into())
        }
    }
}

/// Leave the failure visible in the conversation.
fn record_failure(answer: &mut Version, error: &ClientError) {
    let text = error.details().text;
    match answer.first_text_mut() {
        Some(existing) if existing.is_empty() => *existing = text,
        Some(existing) => {
            existing.push_str("\n\n");
            existing.push_str(&text);
        }
        None => answer.append_text(&text),
    }
}
