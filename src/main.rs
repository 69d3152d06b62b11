//! Binary entry point for mycelial.
//!
//! This binary provides the CLI interface for the mycelial knowledge workspace.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use mycelial::config::SettingsService;
use mycelial::embedding::{Embedder, GeminiEmbedder, cosine_similarity};
use mycelial::llm::{ChatMessage, HttpClientConfig, LlmProvider, OpenRouterClient};
use mycelial::notify::TracingNotifier;
use mycelial::observability;
use mycelial::search::{GoogleSearchClient, SearchOptions, WebSearchProvider};
use mycelial::services::{BasinEditor, DropTarget, PromptService, apply_drop};
use mycelial::storage::{KnowledgeStore, ProjectStore, WorkspaceStore, open_key_value_store};
use mycelial::{
    BasinId, DragController, FolderId, KnowledgeItem, KnowledgeItemId, KnowledgeItemKind,
    MycelialConfig, ProjectId,
};
use std::collections::HashMap;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

/// Mycelial - a knowledge workspace for AI prompting.
#[derive(Parser)]
#[command(name = "mycelial")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "MYCELIAL_CONFIG_PATH")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// List knowledge items.
    Items {
        /// Only items filed in this folder.
        #[arg(long)]
        folder: Option<String>,

        /// Only items in this basin.
        #[arg(long)]
        basin: Option<String>,
    },

    /// List folders.
    Folders,

    /// List basins.
    Basins,

    /// List projects.
    Projects,

    /// Add a knowledge item.
    AddItem {
        /// Item name.
        name: String,

        /// Item kind: file, text, link, folder or basin.
        #[arg(short, long, default_value = "text")]
        kind: String,

        /// Text content.
        #[arg(long)]
        content: Option<String>,

        /// URL for link items.
        #[arg(long)]
        url: Option<String>,
    },

    /// Create a folder.
    CreateFolder {
        /// Folder name.
        name: String,
    },

    /// Create a basin.
    CreateBasin {
        /// Basin name.
        name: String,

        /// Basin description.
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Edit a basin's name, description and members.
    EditBasin {
        /// Basin id.
        id: String,

        /// New name.
        #[arg(long)]
        name: Option<String>,

        /// New description.
        #[arg(long)]
        description: Option<String>,

        /// Item ids to add.
        #[arg(long = "add")]
        add: Vec<String>,

        /// Item ids to remove.
        #[arg(long = "remove")]
        remove: Vec<String>,
    },

    /// Move items or folders onto a folder or basin.
    Move {
        /// Drop target: `folder:<id>` or `basin:<id>`.
        #[arg(long)]
        to: String,

        /// Item ids to move.
        #[arg(long = "item")]
        items: Vec<String>,

        /// Folder ids whose items should move (basin targets only).
        #[arg(long = "folder")]
        folders: Vec<String>,
    },

    /// Create a project.
    CreateProject {
        /// Project name.
        name: String,

        /// Project description.
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Link a knowledge item to a project.
    Link {
        /// Project id.
        project: String,

        /// Item id.
        item: String,
    },

    /// List models available on `OpenRouter`.
    Models {
        /// Only models whose id contains this text.
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Send a chat message.
    Chat {
        /// The message.
        message: String,

        /// Model id (defaults to the configured default model).
        #[arg(short, long)]
        model: Option<String>,

        /// System prompt.
        #[arg(short, long)]
        system: Option<String>,
    },

    /// Improve a prompt with an LLM.
    Enhance {
        /// Prompt text.
        text: String,
    },

    /// Embed text with Gemini.
    Embed {
        /// Text to embed.
        text: String,

        /// Second text to compare against.
        #[arg(long)]
        compare: Option<String>,
    },

    /// Search the web.
    Search {
        /// The search query.
        query: String,

        /// Number of results (1-10).
        #[arg(short, long, default_value = "10")]
        num: u8,

        /// 1-based index of the first result.
        #[arg(long, default_value = "1")]
        start: u32,
    },

    /// Manage global settings.
    Settings {
        /// Settings subcommand.
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Manage prompt templates.
    Prompt {
        /// Prompt subcommand.
        #[command(subcommand)]
        action: PromptAction,
    },
}

/// Settings subcommands.
#[derive(Subcommand)]
enum SettingsAction {
    /// Show settings with API keys masked.
    Show,

    /// Set a setting by its JSON name (empty value removes it).
    Set {
        /// Setting name, e.g. `openRouterApiKey`.
        name: String,

        /// Setting value.
        value: String,
    },
}

/// Prompt subcommands.
#[derive(Subcommand)]
enum PromptAction {
    /// Save a prompt template.
    Save {
        /// Prompt title.
        title: String,

        /// Template content with `{{variable}}` placeholders.
        content: String,

        /// Tags (comma-separated).
        #[arg(short, long)]
        tags: Option<String>,
    },

    /// List prompt templates.
    List {
        /// Only prompts with this tag.
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Render a prompt template.
    Render {
        /// Prompt id or title.
        name: String,

        /// Variable values as `key=value`.
        #[arg(long = "var", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,
    },

    /// Delete a prompt template.
    Delete {
        /// Prompt id.
        id: String,
    },
}

/// Main entry point.
fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config.with_env_overrides(),
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init_from_settings(Some(&config.logging), cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration.
fn load_config(path: Option<&str>) -> anyhow::Result<MycelialConfig> {
    match path.filter(|p| !p.trim().is_empty()) {
        Some(path) => MycelialConfig::load_from_file(Path::new(path))
            .with_context(|| format!("reading {path}")),
        None => Ok(MycelialConfig::load_default()),
    }
}

/// Shared handles for command implementations.
struct App {
    config: MycelialConfig,
    store: Arc<WorkspaceStore>,
    settings: SettingsService,
}

impl App {
    fn open(config: &MycelialConfig) -> anyhow::Result<Self> {
        let kv = open_key_value_store(config).context("opening storage")?;
        Ok(Self {
            config: config.clone(),
            store: Arc::new(WorkspaceStore::new(kv.clone())),
            settings: SettingsService::new(kv),
        })
    }

    fn http(&self) -> HttpClientConfig {
        HttpClientConfig::from_settings(&self.config.http)
    }

    fn openrouter(&self) -> OpenRouterClient {
        let mut client = OpenRouterClient::new().with_http_config(self.http());
        if let Some(endpoint) = &self.config.endpoints.openrouter {
            client = client.with_endpoint(endpoint);
        }
        if let Some(key) = self.settings.open_router_api_key() {
            client = client.with_api_key(key);
        }
        if let Some(model) = self.settings.load().default_model {
            client = client.with_model(model);
        }
        client
    }

    fn gemini(&self) -> GeminiEmbedder {
        let mut embedder = GeminiEmbedder::new().with_http_config(self.http());
        if let Some(endpoint) = &self.config.endpoints.gemini {
            embedder = embedder.with_endpoint(endpoint);
        }
        if let Some(model) = &self.config.endpoints.gemini_embedding_model {
            embedder = embedder.with_model(model);
        }
        if let Some(key) = self.settings.gemini_api_key() {
            embedder = embedder.with_api_key(key);
        }
        embedder
    }

    fn google(&self) -> GoogleSearchClient {
        let mut client = GoogleSearchClient::new().with_http_config(self.http());
        if let Some(endpoint) = &self.config.endpoints.google_search {
            client = client.with_endpoint(endpoint);
        }
        if let Some(key) = self.settings.google_search_api_key() {
            client = client.with_api_key(key);
        }
        if let Some(cx) = self.settings.google_search_cx() {
            client = client.with_cx(cx);
        }
        client
    }
}

/// Runs the selected command.
fn run_command(command: Commands, config: &MycelialConfig) -> anyhow::Result<()> {
    let app = App::open(config)?;

    match command {
        Commands::Items { folder, basin } => cmd_items(&app, folder, basin),
        Commands::Folders => cmd_folders(&app),
        Commands::Basins => cmd_basins(&app),
        Commands::Projects => cmd_projects(&app),
        Commands::AddItem {
            name,
            kind,
            content,
            url,
        } => cmd_add_item(&app, name, &kind, content, url),
        Commands::CreateFolder { name } => {
            let folder = app.store.create_folder(&name)?;
            println!("Folder created: {}", folder.id);
            Ok(())
        },
        Commands::CreateBasin { name, description } => {
            let basin = app.store.create_basin(&name, &description)?;
            println!("Basin created: {}", basin.id);
            Ok(())
        },
        Commands::EditBasin {
            id,
            name,
            description,
            add,
            remove,
        } => cmd_edit_basin(&app, id, name, description, add, remove),
        Commands::Move { to, items, folders } => cmd_move(&app, &to, items, folders),
        Commands::CreateProject { name, description } => {
            let project = app.store.create_project(&name, &description)?;
            println!("Project created: {}", project.id);
            Ok(())
        },
        Commands::Link { project, item } => {
            let project = app
                .store
                .link_item(&ProjectId::new(project), &KnowledgeItemId::new(item))?;
            println!(
                "Project {} now links {} item(s)",
                project.id,
                project.knowledge_item_ids.len()
            );
            Ok(())
        },
        Commands::Models { filter } => cmd_models(&app, filter),
        Commands::Chat {
            message,
            model,
            system,
        } => cmd_chat(&app, message, model, system),
        Commands::Enhance { text } => {
            let service = PromptService::new(app.store.clone()).with_llm(Arc::new(app.openrouter()));
            println!("{}", service.enhance(&text)?);
            Ok(())
        },
        Commands::Embed { text, compare } => cmd_embed(&app, &text, compare.as_deref()),
        Commands::Search { query, num, start } => cmd_search(&app, &query, num, start),
        Commands::Settings { action } => cmd_settings(&app, action),
        Commands::Prompt { action } => cmd_prompt(&app, action),
    }
}

/// Items command.
fn cmd_items(app: &App, folder: Option<String>, basin: Option<String>) -> anyhow::Result<()> {
    let folder = folder.map(FolderId::new);
    let basin = basin.map(BasinId::new);
    let items: Vec<KnowledgeItem> = app
        .store
        .items()?
        .into_iter()
        .filter(|item| folder.is_none() || item.folder_id == folder)
        .filter(|item| basin.is_none() || item.basin_id == basin)
        .collect();

    println!("{} item(s):", items.len());
    for item in &items {
        println!("  {}  [{}]  {}", item.id, item.kind.as_str(), item.name);
    }
    Ok(())
}

/// Folders command.
fn cmd_folders(app: &App) -> anyhow::Result<()> {
    let items = app.store.items()?;
    for folder in app.store.folders()? {
        let count = items
            .iter()
            .filter(|item| item.folder_id.as_ref() == Some(&folder.id))
            .count();
        println!("  {}  {} ({count} items)", folder.id, folder.name);
    }
    Ok(())
}

/// Basins command.
fn cmd_basins(app: &App) -> anyhow::Result<()> {
    for basin in app.store.basins()? {
        println!("  {}  {} ({} items)", basin.id, basin.name, basin.items.len());
        if !basin.description.is_empty() {
            println!("       {}", basin.description);
        }
    }
    Ok(())
}

/// Projects command.
fn cmd_projects(app: &App) -> anyhow::Result<()> {
    for project in app.store.projects()? {
        println!(
            "  {}  {} ({} linked items)",
            project.id,
            project.name,
            project.knowledge_item_ids.len()
        );
    }
    Ok(())
}

/// Add item command.
fn cmd_add_item(
    app: &App,
    name: String,
    kind: &str,
    content: Option<String>,
    url: Option<String>,
) -> anyhow::Result<()> {
    let Some(kind) = KnowledgeItemKind::parse(kind) else {
        bail!("unknown item kind: {kind}");
    };
    let mut item = KnowledgeItem::new(name, kind);
    if let Some(content) = content {
        item = item.with_content(content);
    }
    if let Some(url) = url {
        item = item.with_url(url);
    }
    let item = app.store.add_item(item)?;
    println!("Item added: {}", item.id);
    Ok(())
}

/// Edit basin command.
fn cmd_edit_basin(
    app: &App,
    id: String,
    name: Option<String>,
    description: Option<String>,
    add: Vec<String>,
    remove: Vec<String>,
) -> anyhow::Result<()> {
    let mut editor = BasinEditor::new(app.store.clone(), Arc::new(TracingNotifier));
    editor.set_open(true, Some(BasinId::new(id)));
    if let Some(name) = name {
        editor.set_name(name);
    }
    if let Some(description) = description {
        editor.set_description(description);
    }
    for item in add {
        editor.set_item_selected(&KnowledgeItemId::new(item), true);
    }
    for item in remove {
        editor.set_item_selected(&KnowledgeItemId::new(item), false);
    }

    let basin = editor.handle_submit()?;
    println!("Basin {} saved with {} item(s)", basin.id, basin.items.len());
    Ok(())
}

/// Move command. Drives the drag controller the same way a pointer drag would.
fn cmd_move(app: &App, to: &str, items: Vec<String>, folders: Vec<String>) -> anyhow::Result<()> {
    let target: DropTarget = to.parse()?;

    let mut dragged_items = Vec::with_capacity(items.len());
    for id in items {
        let id = KnowledgeItemId::new(id);
        let item = app
            .store
            .item(&id)?
            .with_context(|| format!("item not found: {id}"))?;
        dragged_items.push(item);
    }
    let mut dragged_folders = Vec::with_capacity(folders.len());
    for id in folders {
        let id = FolderId::new(id);
        let folder = app
            .store
            .folder(&id)?
            .with_context(|| format!("folder not found: {id}"))?;
        dragged_folders.push(folder);
    }

    let mut drag = DragController::new();
    if !drag.start_dragging(None, None, &dragged_items, &dragged_folders) {
        bail!("nothing to move");
    }
    drag.set_drop_target(Some(&target.to_string()));
    let Some((payload, _)) = drag.complete_drop() else {
        bail!("drag was cancelled");
    };

    let outcome = apply_drop(app.store.as_ref(), &payload, &target)?;
    println!(
        "Moved {} item(s) to {target}, {} already there",
        outcome.moved.len(),
        outcome.skipped.len()
    );
    Ok(())
}

/// Models command.
fn cmd_models(app: &App, filter: Option<String>) -> anyhow::Result<()> {
    let filter = filter.map(|f| f.to_lowercase());
    let models = app.openrouter().list_models()?;
    for model in models
        .iter()
        .filter(|m| filter.as_ref().is_none_or(|f| m.id.to_lowercase().contains(f)))
    {
        match model.context_length {
            Some(ctx) => println!("  {}  {} ({ctx} ctx)", model.id, model.name),
            None => println!("  {}  {}", model.id, model.name),
        }
    }
    Ok(())
}

/// Chat command.
fn cmd_chat(
    app: &App,
    message: String,
    model: Option<String>,
    system: Option<String>,
) -> anyhow::Result<()> {
    let mut client = app.openrouter();
    if let Some(model) = model {
        client = client.with_model(model);
    }
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system {
        messages.push(ChatMessage::system(system));
    }
    messages.push(ChatMessage::user(message));

    tracing::info!(provider = client.name(), model = client.model(), "Sending chat");
    println!("{}", client.chat(&messages)?);
    Ok(())
}

/// Embed command.
fn cmd_embed(app: &App, text: &str, compare: Option<&str>) -> anyhow::Result<()> {
    let embedder = app.gemini();
    let vector = embedder.embed(text)?;
    println!("{} dimensions", vector.len());
    let preview: Vec<String> = vector.iter().take(8).map(|v| format!("{v:.4}")).collect();
    println!("[{}, ...]", preview.join(", "));

    if let Some(other) = compare {
        let other = embedder.embed(other)?;
        println!("cosine similarity: {:.4}", cosine_similarity(&vector, &other));
    }
    Ok(())
}

/// Search command.
fn cmd_search(app: &App, query: &str, num: u8, start: u32) -> anyhow::Result<()> {
    let options = SearchOptions::default().with_num(num).with_start(start);
    let results = app.google().search(query, options)?;
    println!("Found {} result(s):", results.len());
    for result in results {
        println!();
        println!("  {}", result.title);
        println!("  {}", result.link);
        if !result.snippet.is_empty() {
            println!("  {}", result.snippet.replace('\n', " "));
        }
    }
    Ok(())
}

/// Settings command.
fn cmd_settings(app: &App, action: SettingsAction) -> anyhow::Result<()> {
    match action {
        SettingsAction::Show => {
            let mut value = serde_json::to_value(app.settings.load())?;
            if let Some(object) = value.as_object_mut() {
                for (key, field) in object.iter_mut() {
                    if key.ends_with("ApiKey") {
                        *field = serde_json::Value::from("********");
                    }
                }
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
        },
        SettingsAction::Set { name, value } => {
            app.settings.set_field(&name, &value)?;
            println!("Setting {name} updated");
        },
    }
    Ok(())
}

/// Prompt command.
fn cmd_prompt(app: &App, action: PromptAction) -> anyhow::Result<()> {
    let service = PromptService::new(app.store.clone());
    match action {
        PromptAction::Save {
            title,
            content,
            tags,
        } => {
            let tags = tags
                .map(|t| {
                    t.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            let prompt = service.create(&title, &content, tags)?;
            println!("Prompt saved: {}", prompt.id);
            let variables = prompt.variables();
            if !variables.is_empty() {
                println!("  Variables: {}", variables.join(", "));
            }
        },
        PromptAction::List { tag } => {
            for prompt in service.list(tag.as_deref())? {
                println!("  {}  {}", prompt.id, prompt.title);
            }
        },
        PromptAction::Render { name, vars } => {
            let values: HashMap<String, String> = vars.into_iter().collect();
            println!("{}", service.render(&name, &values)?);
        },
        PromptAction::Delete { id } => {
            if service.delete(&id.into())? {
                println!("Prompt deleted");
            } else {
                println!("No such prompt");
            }
        },
    }
    Ok(())
}

/// Parses a `key=value` argument.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {s}"))
}
