use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::{env, fs};

use anyhow::{Context, Result, bail};
use assistant_stream::ConversationClient;
use config::{AppConfig, ConfigStore};
use core_orchestrator::TurnRunner;
use core_types::{ConversationRequest, TranscriptStore, TurnStatus};
use extraction_table::{
    CsvOptions, EMPTY_STATE_MESSAGE, is_extraction_response, parse_with_format, save_csv,
    table_to_csv,
};
use session_role::{SessionCache, default_session_dir_from, derive_role};
use storage_sqlite::SqliteTranscriptStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage:
  legal chat <chat-id> <message...>
  legal extract <file> [--csv <dir>]
  legal role [--token <jwt>]
  legal history <chat-id>";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Chat { chat_id: String, message: String },
    Extract { file: PathBuf, csv_dir: Option<PathBuf> },
    Role { token: Option<String> },
    History { chat_id: String },
}

impl Command {
    fn parse(args: &[String]) -> Result<Self> {
        let Some((name, rest)) = args.split_first() else {
            bail!("missing command");
        };
        match name.as_str() {
            "chat" => match rest {
                [chat_id, message @ ..] if !message.is_empty() => Ok(Self::Chat {
                    chat_id: chat_id.clone(),
                    message: message.join(" "),
                }),
                _ => bail!("chat needs a chat id and a message"),
            },
            "extract" => match rest {
                [file] => Ok(Self::Extract {
                    file: PathBuf::from(file),
                    csv_dir: None,
                }),
                [file, flag, dir] if flag == "--csv" => Ok(Self::Extract {
                    file: PathBuf::from(file),
                    csv_dir: Some(PathBuf::from(dir)),
                }),
                _ => bail!("extract needs a file and an optional `--csv <dir>`"),
            },
            "role" => match rest {
                [] => Ok(Self::Role { token: None }),
                [flag, token] if flag == "--token" => Ok(Self::Role {
                    token: Some(token.clone()),
                }),
                _ => bail!("role takes an optional `--token <jwt>`"),
            },
            "history" => match rest {
                [chat_id] => Ok(Self::History {
                    chat_id: chat_id.clone(),
                }),
                _ => bail!("history needs a chat id"),
            },
            other => bail!("unknown command `{other}`"),
        }
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{err}\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let mut data_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    data_dir.push("infrahive-legal");
    if let Err(err) = fs::create_dir_all(&data_dir) {
        eprintln!("failed to prepare data dir: {err}");
    }
    let _log_guard = init_local_logger(&data_dir.join("logs"));

    let config_store = ConfigStore::from_dir(data_dir.join("config"));
    let config = match config_store.load_or_init() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to load config: {err:#}");
            AppConfig::default()
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("failed to create tokio runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(command, &config, &data_dir)) {
        Ok(code) => code,
        Err(err) => {
            error!("command failed: {err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: &AppConfig, data_dir: &Path) -> Result<ExitCode> {
    match command {
        Command::Chat { chat_id, message } => chat(config, data_dir, chat_id, message).await,
        Command::Extract { file, csv_dir } => extract(config, &file, csv_dir.as_deref()),
        Command::Role { token } => {
            role(config, data_dir, token.as_deref());
            Ok(ExitCode::SUCCESS)
        }
        Command::History { chat_id } => history(data_dir, &chat_id).await,
    }
}

async fn chat(
    config: &AppConfig,
    data_dir: &Path,
    chat_id: String,
    message: String,
) -> Result<ExitCode> {
    let session = SessionCache::new(default_session_dir_from(data_dir)).snapshot();
    let client = ConversationClient::new(&config.backend, &config.streaming)
        .with_bearer_token(session.bearer_token(&config.session.cookie_name))?;
    let transcript = open_transcript(data_dir).await?;
    let runner = TurnRunner::new(Arc::new(client), Some(Arc::new(transcript)));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, aborting stream");
            on_signal.cancel();
        }
    });

    let mut stdout = std::io::stdout();
    let mut print_delta = |delta: &str| {
        let _ = stdout.write_all(delta.as_bytes());
        let _ = stdout.flush();
    };
    let result = runner
        .run_turn(
            ConversationRequest::new(chat_id, message),
            &cancel,
            &mut print_delta,
        )
        .await?;

    match result.status {
        TurnStatus::Completed => {
            println!();
            Ok(ExitCode::SUCCESS)
        }
        TurnStatus::Aborted => {
            println!("\n[stopped]");
            Ok(ExitCode::from(130))
        }
        TurnStatus::Errored => {
            println!();
            eprintln!("{}", result.display_text);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn extract(config: &AppConfig, file: &Path, csv_dir: Option<&Path>) -> Result<ExitCode> {
    let raw = fs::read_to_string(file)
        .with_context(|| format!("failed to read extraction result `{}`", file.display()))?;
    if !is_extraction_response(&raw) {
        info!(path = %file.display(), "input does not look like an extraction result");
    }

    let Some((format, table)) = parse_with_format(&raw) else {
        println!("{EMPTY_STATE_MESSAGE}");
        return Ok(ExitCode::SUCCESS);
    };
    println!(
        "{} rows, {} columns ({format:?})",
        table.rows.len(),
        table.columns.len()
    );
    for column in &table.columns {
        println!("  {:<24} {:?}", column.label, column.column_type);
    }

    if let Some(dir) = csv_dir {
        let csv = table_to_csv(
            &table,
            &CsvOptions {
                batch_size: config.export.csv_batch_size,
            },
        );
        let exported = save_csv(&csv, dir, &config.export.default_filename)?;
        if exported.used_fallback {
            eprintln!("`{}` was not writable, saved to the temp directory", dir.display());
        }
        println!("saved {}", exported.path.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn role(config: &AppConfig, data_dir: &Path, token: Option<&str>) {
    let session = SessionCache::new(default_session_dir_from(data_dir)).snapshot();
    let token = token.or_else(|| session.bearer_token(&config.session.cookie_name));
    match derive_role(None, session.cached_user.as_ref(), token) {
        Some(role) => println!("{}", role.as_str()),
        None => println!("unknown"),
    }
}

async fn history(data_dir: &Path, chat_id: &str) -> Result<ExitCode> {
    let transcript = open_transcript(data_dir).await?;
    let turns = transcript.list_turns(chat_id).await?;
    if turns.is_empty() {
        println!("no turns recorded for `{chat_id}`");
    }
    for turn in turns {
        println!(
            "[{}] {:?}/{:?}: {}",
            turn.created_at.format("%Y-%m-%d %H:%M:%S"),
            turn.role,
            turn.status,
            turn.content
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn open_transcript(data_dir: &Path) -> Result<SqliteTranscriptStore> {
    let path = data_dir.join("legal.db");
    SqliteTranscriptStore::connect(&path)
        .await
        .with_context(|| format!("failed to open transcript store `{}`", path.display()))
}

fn init_local_logger(log_dir: &Path) -> tracing_appender::non_blocking::WorkerGuard {
    if let Err(err) = fs::create_dir_all(log_dir) {
        eprintln!("failed to create log dir `{}`: {err}", log_dir.display());
    }
    let file_appender = tracing_appender::rolling::daily(log_dir, "legal.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,app_cli=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_writer(writer)
        .init();

    guard
}
