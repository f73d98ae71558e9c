//! EduVerse CLI
//!
//! Command-line interface for EduVerse: notes and drafts, the AI
//! assistant, collaboration rooms, and file uploads.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

use eduverse_core::{Config, NoteKind, StorageError};

mod commands;
mod editor;
mod logging;
mod output;

use commands::ai::Ask;
use commands::Context;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "eduverse")]
#[command(about = "EduVerse - notes, study assistant and rooms from the terminal")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Log in and store the access token
    Login {
        /// Username (prompted if omitted)
        username: Option<String>,
        /// Password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored token
    Logout,
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        /// Password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        full_name: Option<String>,
    },
    /// Show login, server and draft status
    Status,
    /// Manage notes
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Manage local drafts
    Draft {
        #[command(subcommand)]
        command: DraftCommands,
    },
    /// Publish all local drafts
    Sync,
    /// Ask the study assistant
    Ai {
        #[command(subcommand)]
        command: AiCommands,
    },
    /// Collaboration rooms
    Room {
        #[command(subcommand)]
        command: RoomCommands,
    },
    /// Uploaded files
    File {
        #[command(subcommand)]
        command: FileCommands,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (api_url, timeout_secs, drafts_prefix, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Save a new note as a local draft
    #[command(alias = "new")]
    Draft {
        /// Note title
        #[arg(short = 'T', long)]
        title: String,
        /// Note body (opens editor if not provided)
        #[arg(short, long)]
        body: Option<String>,
        /// Note kind: text, drawing, audio, mixed
        #[arg(short, long, default_value = "text")]
        kind: NoteKind,
        /// Make the note public once published
        #[arg(long)]
        public: bool,
    },
    /// List drafts and published notes
    #[command(alias = "ls")]
    List {
        /// Only notes of this kind
        #[arg(short, long)]
        kind: Option<NoteKind>,
        /// Only published notes, filtered on the server
        #[arg(long)]
        remote: bool,
    },
    /// Show a note (server id or draft key)
    Show { id: String },
    /// Publish a draft, or a new note
    Publish {
        /// Draft key to publish
        key: Option<String>,
        /// Title of a new note
        #[arg(short = 'T', long, conflicts_with = "key")]
        title: Option<String>,
        /// Body of a new note (opens editor if not provided)
        #[arg(short, long, requires = "title")]
        body: Option<String>,
        /// Make a new note public
        #[arg(long)]
        public: bool,
    },
    /// Edit a note's body in $EDITOR
    Edit {
        /// Server id or draft key
        id: String,
        /// New title
        #[arg(short = 'T', long)]
        title: Option<String>,
    },
    /// Delete a note or draft
    #[command(alias = "rm")]
    Delete {
        /// Server id or draft key
        id: String,
        /// Don't ask for confirmation
        #[arg(short, long)]
        force: bool,
    },
    /// Render a drawing note as SVG
    Svg {
        /// Server id or draft key
        id: String,
        #[arg(long, default_value_t = 800)]
        width: u32,
        #[arg(long, default_value_t = 600)]
        height: u32,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Upload an audio recording as an audio note
    Audio {
        /// Audio file
        path: PathBuf,
        #[arg(short = 'T', long)]
        title: Option<String>,
        /// Duration in seconds
        #[arg(short, long, default_value_t = 0.0)]
        duration: f64,
        #[arg(long)]
        public: bool,
    },
}

#[derive(Subcommand)]
enum DraftCommands {
    /// List local drafts
    #[command(alias = "ls")]
    List,
    /// Delete a draft
    #[command(alias = "rm")]
    Delete {
        key: String,
        /// Don't ask for confirmation
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(clap::Args)]
struct PromptArgs {
    /// The prompt
    #[arg(required = true)]
    text: Vec<String>,
    /// Model id (defaults to default_model from config)
    #[arg(short, long)]
    model: Option<String>,
    #[arg(short, long, default_value_t = 0.7)]
    temperature: f32,
}

#[derive(Subcommand)]
enum AiCommands {
    /// Chat with the assistant
    Chat(PromptArgs),
    /// Explain a topic
    Explain(PromptArgs),
    /// Solve a math problem
    Math(PromptArgs),
    /// List available models
    Models,
}

#[derive(Subcommand)]
enum RoomCommands {
    /// List rooms
    #[command(alias = "ls")]
    List,
    /// Create a room
    Create {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        max_participants: Option<u32>,
    },
    /// Show a room
    Show { id: i64 },
    /// List a room's participants
    Participants { id: i64 },
    /// Join a room
    Join { id: i64 },
    /// Leave a room
    Leave { id: i64 },
    /// Chat in a room (reads messages from stdin)
    Chat { id: i64 },
}

#[derive(Subcommand)]
enum FileCommands {
    /// List uploaded files
    #[command(alias = "ls")]
    List,
    /// Upload a file
    Upload {
        path: PathBuf,
        /// Attach to this published note
        #[arg(long)]
        note_id: Option<i64>,
    },
    /// Delete an uploaded file
    #[command(alias = "rm")]
    Delete {
        id: i64,
        /// Don't ask for confirmation
        #[arg(short, long)]
        force: bool,
    },
    /// Download a file
    Download {
        id: i64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    if let Err(e) = run(cli, &output).await {
        if output.is_json() {
            println!(
                "{}",
                serde_json::json!({"status": "error", "message": format!("{:#}", e)})
            );
        } else {
            eprintln!("Error: {:#}", e);
            if let Some(hint) = storage_hint(&e) {
                eprintln!("Hint: {}", hint);
            }
        }
        std::process::exit(1);
    }
}

/// Recovery hint for the first storage error in the cause chain
fn storage_hint(error: &anyhow::Error) -> Option<&'static str> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<StorageError>())
        .and_then(StorageError::recovery_suggestion)
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    let config_path = cli.config;

    // Config commands work even when the config can't be used to open a store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path.as_ref(), output);
    }

    let config = Config::load_with_cli_override(config_path.as_ref())
        .context("Failed to load configuration")?;
    logging::init(&config, cli.verbose);

    let ctx = Context::open(config, config_path)?;

    match cli.command {
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Login { username, password } => {
            commands::auth::login(&ctx, username, password, output).await
        }
        Commands::Logout => commands::auth::logout(&ctx, output).await,
        Commands::Register {
            email,
            username,
            password,
            full_name,
        } => commands::auth::register(&ctx, email, username, password, full_name, output).await,
        Commands::Status => commands::status::show(&ctx, output).await,
        Commands::Note { command } => handle_note_command(command, &ctx, output).await,
        Commands::Draft { command } => match command {
            DraftCommands::List => commands::draft::list(&ctx, output).await,
            DraftCommands::Delete { key, force } => {
                commands::draft::delete(&ctx, key, force, output).await
            }
        },
        Commands::Sync => commands::sync::sync(&ctx, output).await,
        Commands::Ai { command } => handle_ai_command(command, &ctx, output).await,
        Commands::Room { command } => handle_room_command(command, &ctx, output).await,
        Commands::File { command } => match command {
            FileCommands::List => commands::file::list(&ctx, output).await,
            FileCommands::Upload { path, note_id } => {
                commands::file::upload(&ctx, path, note_id, output).await
            }
            FileCommands::Delete { id, force } => {
                commands::file::delete(&ctx, id, force, output).await
            }
            FileCommands::Download { id, output: out } => {
                commands::file::download(&ctx, id, out, output).await
            }
        },
    }
}

async fn handle_note_command(command: NoteCommands, ctx: &Context, output: &Output) -> Result<()> {
    match command {
        NoteCommands::Draft {
            title,
            body,
            kind,
            public,
        } => commands::note::draft(ctx, title, body, kind, public, output).await,
        NoteCommands::List { kind, remote } => commands::note::list(ctx, kind, remote, output).await,
        NoteCommands::Show { id } => commands::note::show(ctx, id, output).await,
        NoteCommands::Publish {
            key,
            title,
            body,
            public,
        } => commands::note::publish(ctx, key, title, body, public, output).await,
        NoteCommands::Edit { id, title } => commands::note::edit(ctx, id, title, output).await,
        NoteCommands::Delete { id, force } => commands::note::delete(ctx, id, force, output).await,
        NoteCommands::Svg {
            id,
            width,
            height,
            output: out,
        } => commands::note::svg(ctx, id, width, height, out, output).await,
        NoteCommands::Audio {
            path,
            title,
            duration,
            public,
        } => commands::note::audio(ctx, path, title, duration, public, output).await,
    }
}

async fn handle_ai_command(command: AiCommands, ctx: &Context, output: &Output) -> Result<()> {
    let (kind, args) = match command {
        AiCommands::Models => return commands::ai::models(ctx, output).await,
        AiCommands::Chat(args) => (Ask::Chat, args),
        AiCommands::Explain(args) => (Ask::Explain, args),
        AiCommands::Math(args) => (Ask::Math, args),
    };
    commands::ai::ask(ctx, kind, args.text, args.model, args.temperature, output).await
}

async fn handle_room_command(command: RoomCommands, ctx: &Context, output: &Output) -> Result<()> {
    match command {
        RoomCommands::List => commands::room::list(ctx, output).await,
        RoomCommands::Create {
            name,
            description,
            max_participants,
        } => commands::room::create(ctx, name, description, max_participants, output).await,
        RoomCommands::Show { id } => commands::room::show(ctx, id, output).await,
        RoomCommands::Participants { id } => commands::room::participants(ctx, id, output).await,
        RoomCommands::Join { id } => commands::room::join(ctx, id, output).await,
        RoomCommands::Leave { id } => commands::room::leave(ctx, id, output).await,
        RoomCommands::Chat { id } => commands::room::chat(ctx, id, output).await,
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eduverse_core::SessionError;

    #[test]
    fn test_global_flags_anywhere() {
        let cli = Cli::try_parse_from(["eduverse", "note", "list", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Note {
                command: NoteCommands::List { kind: None, remote: false }
            }
        ));
    }

    #[test]
    fn test_note_kind_parses() {
        let cli =
            Cli::try_parse_from(["eduverse", "note", "draft", "-T", "Sketch", "--kind", "drawing"])
                .unwrap();
        match cli.command {
            Commands::Note {
                command: NoteCommands::Draft { title, kind, .. },
            } => {
                assert_eq!(title, "Sketch");
                assert_eq!(kind, NoteKind::Drawing);
            }
            _ => panic!("expected note draft"),
        }

        assert!(Cli::try_parse_from(["eduverse", "note", "list", "--kind", "video"]).is_err());
    }

    #[test]
    fn test_publish_key_conflicts_with_title() {
        assert!(Cli::try_parse_from([
            "eduverse",
            "note",
            "publish",
            "@eduverse_drafts_1",
            "--title",
            "x"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["eduverse", "note", "publish", "--body", "x"]).is_err());
    }

    #[test]
    fn test_ai_prompt_words() {
        let cli = Cli::try_parse_from(["eduverse", "ai", "math", "2x", "=", "8", "-t", "0.2"])
            .unwrap();
        match cli.command {
            Commands::Ai {
                command: AiCommands::Math(args),
            } => {
                assert_eq!(args.text.join(" "), "2x = 8");
                assert_eq!(args.temperature, 0.2);
                assert!(args.model.is_none());
            }
            _ => panic!("expected ai math"),
        }
        assert!(Cli::try_parse_from(["eduverse", "ai", "chat"]).is_err());
    }

    #[test]
    fn test_storage_hint_through_session_error() {
        let err = anyhow::Error::new(SessionError::from(StorageError::SchemaTooNew {
            found: 9,
            supported: 1,
        }))
        .context("Failed to restore session");

        assert_eq!(
            storage_hint(&err),
            Some("Upgrade the client, or point data_dir at a fresh directory.")
        );
        assert!(format!("{:#}", err).contains("schema version 9"));

        let plain = anyhow::anyhow!("No draft with key x");
        assert!(storage_hint(&plain).is_none());
    }

    #[test]
    fn test_room_chat_and_config_path() {
        let cli =
            Cli::try_parse_from(["eduverse", "--config", "/tmp/e.toml", "room", "chat", "4"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/e.toml")));
        assert!(matches!(
            cli.command,
            Commands::Room {
                command: RoomCommands::Chat { id: 4 }
            }
        ));
    }
}
