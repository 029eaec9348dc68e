//! Terminal front-end for the quest backend: account commands, the progress
//! view and an interactive typing / fill-in-the-blank game.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::{future::Future, path::PathBuf, sync::Arc};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use codequest_api::{
    client::{ApiClient, IdentityStore, PlayerSession},
    config::Config,
    quest::{Attempt, AttemptPhase, Catalog, Exercise, QuestBoard, QuestError, QuestMode},
    sync::{HttpProgressSink, ProgressSync},
};

#[derive(Parser)]
#[command(name = "quest-cli")]
#[command(about = "Practice code by typing snippets and filling in blanks")]
#[command(version)]
struct Cli {
    /// Backend base URL (defaults to API_BASE_URL or http://localhost:7000)
    #[arg(long, global = true)]
    api: Option<String>,

    /// File remembering the signed-in player
    #[arg(long, global = true)]
    identity: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: Option<String>,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign in with an existing account
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the signed-in player
    Logout,

    /// Show who is signed in
    Whoami,

    /// List stored progress
    Progress {
        /// Player to show (defaults to the signed-in player)
        #[arg(long)]
        email: Option<String>,
    },

    /// Play a quest
    Play {
        #[arg(value_enum, default_value_t = ModeArg::Typing)]
        mode: ModeArg,
        #[arg(long, short = 'l', default_value = "java")]
        language: String,
        #[arg(long, short = 'i', default_value_t = 0)]
        index: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Typing,
    Fill,
}

impl From<ModeArg> for QuestMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Typing => QuestMode::Typing,
            ModeArg::Fill => QuestMode::FillBlank,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "codequest_api=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().context("Failed to load configuration")?;
    let base_url = cli
        .api
        .unwrap_or_else(|| config.client.api_base_url.clone());
    let identity = IdentityStore::new(
        cli.identity
            .unwrap_or_else(|| config.client.identity_path.clone()),
    );
    let api = ApiClient::new(&base_url, config.client.request_timeout())?;
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    match cli.command {
        Commands::Register {
            email,
            username,
            password,
        } => {
            let password = match password {
                Some(password) => password,
                None => prompt(&mut input, "Password: ").await?,
            };
            let username = username.unwrap_or_else(|| email.clone());
            api.register(&username, &email, &password).await?;
            // Registration signs the player in right away
            let session = PlayerSession::signed_in(email);
            identity.save(&session)?;
            println!("Registered and signed in as {}", session.identifier());
        }
        Commands::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt(&mut input, "Password: ").await?,
            };
            api.login(&email, &password).await?;
            let session = PlayerSession::signed_in(email);
            identity.save(&session)?;
            println!("Signed in as {}", session.identifier());
        }
        Commands::Logout => {
            identity.clear()?;
            println!("Signed out");
        }
        Commands::Whoami => match identity.load()?.email() {
            Some(email) => println!("{}", email),
            None => println!("Not signed in (progress is not saved)"),
        },
        Commands::Progress { email } => {
            let session = identity.load()?;
            let Some(email) = email.or_else(|| session.email().map(str::to_string)) else {
                bail!("Not signed in; pass --email or log in first");
            };
            let entries = api.fetch_progress(&email).await?;
            if entries.is_empty() {
                println!("No progress stored for {}", email);
            }
            for entry in entries {
                println!("{:<24} {:>5.0}%", entry.quest_id, entry.progress);
            }
        }
        Commands::Play {
            mode,
            language,
            index,
        } => {
            let session = identity.load()?;
            if session.is_anonymous() {
                println!("Playing anonymously: progress will not be saved.");
            }
            let sync = ProgressSync::spawn(
                Arc::new(HttpProgressSink::new(api)),
                config.client.sync_debounce(),
            );
            let board = QuestBoard::new(
                Arc::new(Catalog::builtin()),
                session,
                sync,
                mode.into(),
                &language,
                index,
            )?;
            run_session(board, &mut input, interrupted()).await?;
        }
    }

    Ok(())
}

type Input = Lines<BufReader<tokio::io::Stdin>>;

async fn prompt(input: &mut Input, label: &str) -> Result<String> {
    eprint!("{}", label);
    match input.next_line().await? {
        Some(line) => Ok(line),
        None => bail!("No input"),
    }
}

const HELP: &str = "\
commands:
  :next              next exercise
  :reset             clear the attempt
  :complete          mark the exercise complete
  :back              delete the last typed character
  :blank N VALUE     fill blank N (1-based)
  :lang LANGUAGE     switch language
  :mode typing|fill  switch game
  :quit              leave
typing quests: any other line is typed character by character
fill quests: any other line fills the next empty blank";

async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Plays until `:quit`, end of input or `interrupt`, then sends whatever
/// progress is still pending.
async fn run_session<R, F>(
    mut board: QuestBoard<ProgressSync>,
    input: &mut Lines<R>,
    interrupt: F,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    let outcome = tokio::select! {
        result = play(&mut board, input) => result,
        _ = interrupt => {
            println!();
            tracing::info!("Interrupted, saving pending progress");
            Ok(())
        }
    };
    board.into_reporter().shutdown().await;
    outcome
}

async fn play<R>(board: &mut QuestBoard<ProgressSync>, input: &mut Lines<R>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    println!("{}", HELP);
    show(board);

    while let Some(line) = input.next_line().await? {
        let line = line.as_str();
        let outcome = match line.split_once(' ').unwrap_or((line, "")) {
            (":quit", _) | (":q", _) => break,
            (":next", _) => board.next_exercise().map(|_| ()),
            (":reset", _) => {
                board.reset();
                Ok(())
            }
            (":complete", _) => {
                board.mark_complete();
                Ok(())
            }
            (":back", _) => board.backspace().map(|_| ()),
            (":lang", language) => board.switch_language(language.trim()),
            (":mode", "typing") => board.select_mode(QuestMode::Typing),
            (":mode", "fill") => board.select_mode(QuestMode::FillBlank),
            (":blank", rest) => match rest.trim().split_once(' ') {
                Some((slot, value)) => match slot.parse::<usize>() {
                    Ok(slot) if slot > 0 => board.set_blank(slot - 1, value.trim()).map(|_| ()),
                    _ => {
                        println!("usage: :blank N VALUE");
                        continue;
                    }
                },
                None => {
                    println!("usage: :blank N VALUE");
                    continue;
                }
            },
            (command, _) if command.starts_with(':') => {
                println!("{}", HELP);
                continue;
            }
            _ => feed(board, line),
        };

        if let Err(e) = outcome {
            println!("error: {}", e);
        }
        show(board);
    }

    Ok(())
}

/// Plain input: typed char by char for typing quests, or the next empty
/// blank for fill quests.
fn feed(board: &mut QuestBoard<ProgressSync>, line: &str) -> Result<(), QuestError> {
    let next_blank = match board.attempt() {
        Attempt::Typing(_) => None,
        Attempt::FillBlank(answers) => Some(
            answers
                .iter()
                .position(|a| a.trim().is_empty())
                .unwrap_or(answers.len().saturating_sub(1)),
        ),
    };

    match next_blank {
        None => {
            for c in line.chars() {
                board.type_char(c)?;
            }
            Ok(())
        }
        Some(slot) => board.set_blank(slot, line.trim()).map(|_| ()),
    }
}

fn show(board: &QuestBoard<ProgressSync>) {
    let exercise = board.exercise();
    println!();
    println!("== {} ==", exercise.key());
    match (exercise, board.attempt()) {
        (Exercise::Typing(ex), Attempt::Typing(typed)) => {
            println!("{}", ex.snippet);
            println!("{}", typed);
        }
        (Exercise::FillBlank(ex), Attempt::FillBlank(answers)) => {
            println!("{}", ex.render_with(answers));
        }
        _ => {}
    }
    let status = match board.phase() {
        AttemptPhase::Empty => "not started",
        AttemptPhase::InProgress => "in progress",
        AttemptPhase::MarkedComplete => "marked complete",
    };
    println!("[{}%] {}", board.percentage(), status);
}
