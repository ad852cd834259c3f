//! ragchat CLI - Chat with your organisation's documents

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use ragchat::{
    api::{ApiClient, ApiError, FeedbackRequest, FileQuery},
    auth::{AuthSession, FileCredentialStore, RegisterRequest},
    config::Config,
    export::{export_filename, DirectorySink, ExportError, ExportFormat, ExportService},
    notify::Notifier,
    router::{NavigationDecision, RouteName, Router},
    streaming::{StreamConsumer, StreamOutcome},
    tui::{
        prompt::PromptHandler, renderer::TerminalRenderer, spinner::UploadProgress, ChatShell,
        TerminalNotifier,
    },
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "ragchat")]
#[command(about = "Ask questions about your organisation's documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Config file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login {
        #[arg(short, long)]
        username: Option<String>,

        /// Prompted for when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Create an account and organisation
    Register {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        org: String,

        #[arg(long)]
        full_name: Option<String>,

        #[arg(short, long)]
        password: Option<String>,
    },

    /// Show the logged-in user
    Whoami {
        /// Ask the server instead of the stored profile
        #[arg(long)]
        refresh: bool,
    },

    /// Chat with streamed answers
    Chat {
        /// Continue this conversation (default: start a new one)
        #[arg(short, long)]
        conversation: Option<i64>,

        /// Title for a new conversation
        #[arg(short, long)]
        title: Option<String>,

        /// Ask one question and exit
        question: Option<String>,
    },

    #[command(subcommand)]
    Conversations(ConversationCommands),

    #[command(subcommand)]
    Files(FileCommands),

    #[command(subcommand)]
    Feedback(FeedbackCommands),

    #[command(subcommand)]
    Admin(AdminCommands),

    /// Export a conversation as markdown, html or pdf
    Export {
        conversation_id: i64,

        /// markdown, html or pdf (default from config)
        #[arg(short, long)]
        format: Option<String>,

        /// File name without extension
        #[arg(short, long)]
        name: Option<String>,

        /// Directory to write to (default from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check where navigating to a page would land
    Open { path: String },

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConversationCommands {
    List {
        #[arg(long, default_value = "0")]
        skip: u32,

        #[arg(long, default_value = "20")]
        limit: u32,
    },
    Create {
        title: Option<String>,
    },
    Show {
        id: i64,
    },
    Messages {
        id: i64,
    },
    Delete {
        id: i64,
    },
    /// Rate an answer in a conversation
    Feedback {
        id: i64,
        message_id: i64,

        /// 1 = helpful, -1 = not helpful
        #[arg(short, long, allow_hyphen_values = true)]
        rating: i32,

        #[arg(short, long)]
        comment: Option<String>,
    },
    /// Download the conversation rendered by the conversation resource
    Download {
        id: i64,

        #[arg(short, long, default_value = "markdown")]
        format: String,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum FileCommands {
    Upload {
        path: PathBuf,
    },
    List {
        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        page_size: Option<u32>,

        /// pending, processing, indexed or failed
        #[arg(long)]
        status: Option<String>,
    },
    Show {
        id: i64,
    },
    Delete {
        id: i64,
    },
    /// Processing status of an uploaded file
    Status {
        id: i64,
    },
}

#[derive(Subcommand)]
enum FeedbackCommands {
    /// Give feedback on an answer
    Give {
        message_id: i64,

        #[arg(long)]
        negative: bool,

        /// 1 to 5
        #[arg(short, long)]
        rating: Option<u8>,

        #[arg(short, long)]
        comment: Option<String>,

        /// Issue tags for negative feedback
        #[arg(short, long)]
        tag: Vec<String>,
    },
    Show {
        message_id: i64,
    },
    Delete {
        message_id: i64,
    },
    /// Organisation statistics
    Stats {
        #[arg(short, long, default_value = "30")]
        days: u32,
    },
    /// Daily trend
    Daily {
        #[arg(short, long, default_value = "7")]
        days: u32,
    },
    /// Recent unresolved negative feedback
    Negative {
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
    Resolve {
        id: i64,
        note: String,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    Stats,
    Reindex { file_id: i64 },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Initialize configuration file with defaults
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Show current configuration
    Show {
        /// server, stream, export or session
        #[arg(short, long)]
        section: Option<String>,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., server.url, stream.idle_timeout_secs)
        key: String,

        value: String,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    let result = match cli.command {
        Commands::Config(cmd) => run_config_command(cmd, &config_path),
        command => run(command, config_path).await,
    };

    match result {
        // API failures were already shown through the notifier
        Err(e) if e.is::<ApiError>() || e.is::<ExportError>() => {
            debug!("{:#}", e);
            std::process::exit(1);
        }
        other => other,
    }
}

/// Everything a command needs, wired together once
struct App {
    config: Config,
    session: Arc<AuthSession>,
    router: Arc<Router>,
    client: Arc<ApiClient>,
    renderer: TerminalRenderer,
}

impl App {
    fn build(config: Config) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(FileCredentialStore::new(config.session.store_path()));
        let session = Arc::new(AuthSession::init(store)?);
        let router = Arc::new(Router::new(session.clone()));
        let notifier: Arc<dyn Notifier> = Arc::new(TerminalNotifier::new());
        let client = ApiClient::new(&config.server, session.clone(), notifier)?
            .with_navigator(router.clone());

        Ok(Self {
            config,
            session,
            router,
            client: Arc::new(client),
            renderer: TerminalRenderer::new(),
        })
    }

    /// Run the route guard for the page a command belongs to
    fn enter(&self, route: RouteName) -> Result<()> {
        let landed = self.router.push(route)?;
        if landed == route {
            return Ok(());
        }
        match landed {
            RouteName::Login => bail!("Not logged in. Run `ragchat login` first."),
            _ => bail!("Your role does not give access to {}", route),
        }
    }

    fn exporter(&self, output: Option<PathBuf>) -> ExportService {
        let dir = output.unwrap_or_else(|| self.config.export.output_dir.clone());
        ExportService::new(self.client.clone(), Arc::new(DirectorySink::new(dir)))
    }
}

async fn run(command: Commands, config_path: PathBuf) -> Result<()> {
    let config = Config::load_from(config_path.clone())?;
    let app = App::build(config)?;

    match command {
        Commands::Login { username, password } => login(&app, username, password).await,
        Commands::Logout => {
            app.client.logout().await?;
            app.renderer.render_success("Logged out");
            Ok(())
        }
        Commands::Register {
            username,
            email,
            org,
            full_name,
            password,
        } => {
            let password = match password {
                Some(p) => p,
                None => ask(&app, "Password")?,
            };
            let request = RegisterRequest {
                username,
                email,
                password,
                full_name,
                org_name: org,
            };
            let user = app.client.register(&request).await?;
            app.renderer.render_success(&format!(
                "Registered {} ({}). You can log in now.",
                user.username, user.role
            ));
            Ok(())
        }
        Commands::Whoami { refresh } => whoami(&app, refresh).await,
        Commands::Chat {
            conversation,
            title,
            question,
        } => chat(&app, conversation, title, question).await,
        Commands::Conversations(cmd) => run_conversation_command(&app, cmd).await,
        Commands::Files(cmd) => run_file_command(&app, cmd).await,
        Commands::Feedback(cmd) => run_feedback_command(&app, cmd).await,
        Commands::Admin(cmd) => run_admin_command(&app, cmd).await,
        Commands::Export {
            conversation_id,
            format,
            name,
            output,
        } => {
            app.enter(RouteName::Conversations)?;
            let format = ExportFormat::parse(
                format
                    .as_deref()
                    .unwrap_or(&app.config.export.default_format),
            );
            app.exporter(output)
                .export_conversation(conversation_id, &format, name.as_deref())
                .await?;
            Ok(())
        }
        Commands::Open { path } => open(&app, &path),
        Commands::Config(cmd) => run_config_command(cmd, &config_path),
    }
}

fn ask(app: &App, label: &str) -> Result<String> {
    match PromptHandler::new().ask(label, app.renderer.prompt_color()) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => bail!("{} is required", label),
    }
}

async fn login(app: &App, username: Option<String>, password: Option<String>) -> Result<()> {
    let username = match username {
        Some(u) => u,
        None => ask(app, "Username")?,
    };
    let password = match password {
        Some(p) => p,
        None => ask(app, "Password")?,
    };

    let login = app.client.login(&username, &password).await?;
    app.renderer.render_success(&format!(
        "Logged in as {} ({})",
        login.user.display_name(),
        login.user.role
    ));
    info!("Session stored for {}", login.user.username);
    Ok(())
}

async fn whoami(app: &App, refresh: bool) -> Result<()> {
    let user = if refresh {
        Some(app.client.fetch_user_info().await?)
    } else {
        app.session.user()
    };

    match user {
        Some(user) => {
            app.renderer.render_field("Username", &user.username);
            app.renderer.render_field("Name", user.display_name());
            app.renderer.render_field("Email", &user.email);
            app.renderer.render_field("Role", &user.role);
            app.renderer.render_field("Organisation", &user.org_id.to_string());
        }
        None if app.session.is_authenticated() => {
            app.renderer
                .render_info("Logged in, profile not loaded. Use --refresh.");
        }
        None => app.renderer.render_info("Not logged in"),
    }
    Ok(())
}

async fn chat(
    app: &App,
    conversation: Option<i64>,
    title: Option<String>,
    question: Option<String>,
) -> Result<()> {
    app.enter(RouteName::Chat)?;

    let conversation_id = match conversation {
        Some(id) => id,
        None => {
            let title = title.as_deref().or(question.as_deref());
            app.client.create_conversation(title).await?.id
        }
    };

    let consumer = StreamConsumer::new(app.client.clone(), &app.config.stream);
    let mut shell = ChatShell::new(app.client.clone(), consumer, app.exporter(None), conversation_id);

    match question {
        Some(question) => match shell.ask(&question).await? {
            StreamOutcome::Failed(_) => std::process::exit(1),
            _ => Ok(()),
        },
        None => shell.run().await,
    }
}

async fn run_conversation_command(app: &App, cmd: ConversationCommands) -> Result<()> {
    app.enter(RouteName::Conversations)?;
    let client = &app.client;

    match cmd {
        ConversationCommands::List { skip, limit } => {
            let conversations = client.list_conversations(skip, limit).await?;
            if conversations.is_empty() {
                app.renderer.render_info("No conversations");
            }
            for c in conversations {
                println!(
                    "{:>6}  {:<40}  {:>3} messages  {}",
                    c.id,
                    c.title,
                    c.message_count,
                    c.last_message_at.as_deref().unwrap_or(&c.created_at)
                );
            }
        }
        ConversationCommands::Create { title } => {
            let c = client.create_conversation(title.as_deref()).await?;
            app.renderer
                .render_success(&format!("Created conversation {} \"{}\"", c.id, c.title));
        }
        ConversationCommands::Show { id } => {
            let detail = client.get_conversation(id).await?;
            app.renderer.render_field("Title", &detail.conversation.title);
            app.renderer
                .render_field("Created", &detail.conversation.created_at);
            app.renderer
                .render_field("Messages", &detail.messages.len().to_string());
        }
        ConversationCommands::Messages { id } => {
            for message in client.get_messages(id).await? {
                app.renderer
                    .render_system(&format!("#{} {}", message.id, message.role));
                app.renderer.render_markdown(&message.content);
                println!();
            }
        }
        ConversationCommands::Delete { id } => {
            client.delete_conversation(id).await?;
            app.renderer
                .render_success(&format!("Deleted conversation {}", id));
        }
        ConversationCommands::Feedback {
            id,
            message_id,
            rating,
            comment,
        } => {
            client
                .rate_message(id, message_id, rating, comment.as_deref())
                .await?;
            app.renderer.render_success("Thanks for the feedback");
        }
        ConversationCommands::Download { id, format, output } => {
            let data = client.download_conversation(id, &format).await?;
            let filename = export_filename(
                &format!("conversation-{}", id),
                &ExportFormat::parse(&format),
            );
            let path = output.unwrap_or_else(|| app.config.export.output_dir.join(filename));
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, data).await?;
            app.renderer
                .render_success(&format!("Saved {}", path.display()));
        }
    }
    Ok(())
}

async fn run_file_command(app: &App, cmd: FileCommands) -> Result<()> {
    app.enter(RouteName::Files)?;
    let client = &app.client;

    match cmd {
        FileCommands::Upload { path } => {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let progress = UploadProgress::new(&name);
            let bar = progress.clone();
            let uploaded = client.upload_file(&path, move |pct| bar.set(pct)).await;
            progress.finish();

            let upload = uploaded?;
            app.renderer.render_success(&format!(
                "Uploaded {} as file {} ({})",
                upload.filename, upload.file_id, upload.status
            ));
        }
        FileCommands::List {
            page,
            page_size,
            status,
        } => {
            let query = FileQuery {
                page,
                page_size,
                status,
            };
            let list = client.list_files(&query).await?;
            for f in &list.files {
                println!(
                    "{:>6}  {:<40}  {:<10}  {:>8} KiB  {} chunks",
                    f.id,
                    f.original_filename,
                    f.status,
                    f.size / 1024,
                    f.chunk_count
                );
            }
            app.renderer.render_info(&format!(
                "Page {} of {} files",
                list.page, list.total
            ));
        }
        FileCommands::Show { id } => {
            let f = client.get_file(id).await?;
            app.renderer.render_field("Name", &f.original_filename);
            app.renderer.render_field("Type", &f.file_type);
            app.renderer.render_field("Status", &f.status);
            app.renderer
                .render_field("Pages", &f.page_count.map(|p| p.to_string()).unwrap_or_default());
            app.renderer.render_field("Chunks", &f.chunk_count.to_string());
            app.renderer.render_field("Uploaded", &f.created_at);
        }
        FileCommands::Delete { id } => {
            client.delete_file(id).await?;
            app.renderer.render_success(&format!("Deleted file {}", id));
        }
        FileCommands::Status { id } => {
            let status = client.file_status(id).await?;
            app.renderer.render_json(&status);
        }
    }
    Ok(())
}

async fn run_feedback_command(app: &App, cmd: FeedbackCommands) -> Result<()> {
    let client = &app.client;

    match cmd {
        FeedbackCommands::Give {
            message_id,
            negative,
            rating,
            comment,
            tag,
        } => {
            app.enter(RouteName::Chat)?;
            let request = FeedbackRequest {
                feedback_type: if negative { "negative" } else { "positive" }.to_string(),
                rating,
                comment,
                issue_tags: tag,
            };
            client.create_feedback(message_id, &request).await?;
            app.renderer.render_success("Feedback recorded");
        }
        FeedbackCommands::Show { message_id } => {
            app.enter(RouteName::Chat)?;
            match client.get_feedback(message_id).await? {
                Some(feedback) => {
                    app.renderer.render_field("Type", &feedback.feedback_type);
                    app.renderer.render_field(
                        "Rating",
                        &feedback.rating.map(|r| r.to_string()).unwrap_or_default(),
                    );
                    app.renderer
                        .render_field("Comment", feedback.comment.as_deref().unwrap_or(""));
                    app.renderer
                        .render_field("Tags", &feedback.issue_tags.join(", "));
                }
                None => app.renderer.render_info("No feedback for this message"),
            }
        }
        FeedbackCommands::Delete { message_id } => {
            app.enter(RouteName::Chat)?;
            client.delete_feedback(message_id).await?;
            app.renderer.render_success("Feedback deleted");
        }
        FeedbackCommands::Stats { days } => {
            app.enter(RouteName::Dashboard)?;
            print!("{}", client.org_feedback_stats(days).await?);
        }
        FeedbackCommands::Daily { days } => {
            app.enter(RouteName::Dashboard)?;
            for row in client.daily_feedback_stats(days).await? {
                app.renderer.render_json(&row);
            }
        }
        FeedbackCommands::Negative { limit } => {
            app.enter(RouteName::Review)?;
            let entries = client.recent_negative_feedback(limit).await?;
            if entries.is_empty() {
                app.renderer.render_info("No unresolved negative feedback");
            }
            for entry in entries {
                app.renderer.render_json(&entry);
            }
        }
        FeedbackCommands::Resolve { id, note } => {
            app.enter(RouteName::Review)?;
            client.resolve_negative_feedback(id, &note).await?;
            app.renderer
                .render_success(&format!("Resolved feedback {}", id));
        }
    }
    Ok(())
}

async fn run_admin_command(app: &App, cmd: AdminCommands) -> Result<()> {
    app.enter(RouteName::Admin)?;

    match cmd {
        AdminCommands::Stats => print!("{}", app.client.system_stats().await?),
        AdminCommands::Reindex { file_id } => {
            let answer = app.client.reindex_file(file_id).await?;
            app.renderer.render_json(&answer);
        }
    }
    Ok(())
}

fn open(app: &App, path: &str) -> Result<()> {
    let route = match app.router.resolve(path) {
        Some(route) => route,
        None => bail!("No page at {}", path),
    };

    match ragchat::router::guard(route, &app.session) {
        NavigationDecision::Allow => app
            .renderer
            .render_success(&format!("{} ({}) is accessible", route.name, route.path)),
        NavigationDecision::Redirect(to) => app
            .renderer
            .render_info(&format!("{} redirects to {}", route.name, to)),
    }

    let landed = app.router.push_path(path)?;
    app.renderer.render_field("Lands on", &landed.to_string());
    Ok(())
}

fn run_config_command(cmd: ConfigCommands, path: &Path) -> Result<()> {
    match cmd {
        ConfigCommands::Init { force } => config_init(path, force),
        ConfigCommands::Show { section } => config_show(path, section),
        ConfigCommands::Set { key, value } => config_set(path, &key, &value),
        ConfigCommands::Path => {
            config_path(path);
            Ok(())
        }
        ConfigCommands::Validate => config_validate(path),
    }
}

fn config_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("Configuration file already exists at: {}", path.display());
        println!("Use --force to overwrite");
        return Ok(());
    }

    Config::default().save_to(path.to_path_buf())?;

    println!("Configuration file created at: {}", path.display());
    println!();
    println!("Point it at your server with:");
    println!("  ragchat config set server.url https://chat.example.com");
    println!("or set RAGCHAT_SERVER_URL.");
    Ok(())
}

fn config_show(path: &Path, section: Option<String>) -> Result<()> {
    let config = Config::load_from(path.to_path_buf())?;

    let display = match section.as_deref().map(str::to_lowercase).as_deref() {
        None => toml::to_string_pretty(&config)?,
        Some("server") => toml::to_string_pretty(&config.server)?,
        Some("stream") => toml::to_string_pretty(&config.stream)?,
        Some("export") => toml::to_string_pretty(&config.export)?,
        Some("session") => toml::to_string_pretty(&config.session)?,
        Some(other) => {
            println!("Unknown section: {}", other);
            println!("Available: server, stream, export, session");
            return Ok(());
        }
    };
    println!("{}", display);

    println!("\n--- Environment Variables ---");
    for var in [
        "RAGCHAT_SERVER_URL",
        "RAGCHAT_API_PREFIX",
        "RAGCHAT_EXPORT_DIR",
        "RAGCHAT_SESSION_FILE",
    ] {
        println!(
            "{}: {}",
            var,
            std::env::var(var).unwrap_or_else(|_| "not set".to_string())
        );
    }
    Ok(())
}

fn config_set(path: &Path, key: &str, value: &str) -> Result<()> {
    // start from the file alone so env overrides are not persisted
    let mut config = if path.exists() {
        toml::from_str::<Config>(&std::fs::read_to_string(path)?)?
    } else {
        Config::default()
    };

    let Some((section, field)) = key.split_once('.') else {
        println!("Invalid key format. Use: section.key (e.g., server.url)");
        return Ok(());
    };

    match (section, field) {
        ("server", "url") => config.server.url = value.to_string(),
        ("server", "api_prefix") => config.server.api_prefix = value.to_string(),
        ("server", "request_timeout_secs") => config.server.request_timeout_secs = value.parse()?,
        ("stream", "endpoint") => config.stream.endpoint = value.to_string(),
        ("stream", "idle_timeout_secs") => config.stream.idle_timeout_secs = value.parse()?,
        ("stream", "channel_capacity") => config.stream.channel_capacity = value.parse()?,
        ("export", "output_dir") => config.export.output_dir = PathBuf::from(value),
        ("export", "default_format") => config.export.default_format = value.to_string(),
        ("session", "store_path") => config.session.store_path = Some(PathBuf::from(value)),
        _ => {
            println!("Unknown key: {}", key);
            println!("Available: server.url, server.api_prefix, server.request_timeout_secs,");
            println!("  stream.endpoint, stream.idle_timeout_secs, stream.channel_capacity,");
            println!("  export.output_dir, export.default_format, session.store_path");
            return Ok(());
        }
    }

    config.validate()?;
    config.save_to(path.to_path_buf())?;
    println!("Set {} = {}", key, value);
    Ok(())
}

fn config_path(path: &Path) {
    println!("{}", path.display());

    if path.exists() {
        println!("(file exists)");
    } else {
        println!("(file does not exist - run 'config init' to create)");
    }
}

fn config_validate(path: &Path) -> Result<()> {
    let config = Config::load_from(path.to_path_buf())?;

    match config.validate() {
        Ok(()) => {
            println!("Configuration is valid!");
            println!();
            println!("API base:        {}", config.server.api_base());
            println!("Streaming:       {}", config.stream_url());
            println!("Idle timeout:    {}s", config.stream.idle_timeout_secs);
            println!("Exports go to:   {}", config.export.output_dir.display());
            println!("Session file:    {}", config.session.store_path().display());
        }
        Err(e) => {
            println!("Configuration validation failed:");
            println!("  {}", e);
        }
    }
    Ok(())
}
