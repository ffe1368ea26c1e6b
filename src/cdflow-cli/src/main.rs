//! cdflow CLI - Congressional Debate flow keeper
//!
//! Records speakers and notes for a round, links rebuttals to what they
//! rebut, and asks an OpenAI-compatible model for a round summary.

use cdflow_core::export::{round_to_text, short_id};
use cdflow_core::model::{parse_speaker_key, speaker_key};
use cdflow_core::summary::{DEFAULT_API_BASE, OpenAiSummaryProvider};
use cdflow_core::{
    ArgumentType, Config, DebateRound, DebateStore, DebateSummary, LinkKind, NewArgument,
    NewSpeaker, RoundStatus, Side, SpeakerUpdate, SummaryService, compute_highlight,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    name = "cdflow",
    version,
    about = "Congressional Debate flow keeper",
    long_about = "Take notes on a Congressional Debate round, link rebuttals, and generate an AI summary."
)]
struct Cli {
    /// Path to a TOML config file (defaults to $CDFLOW_CONFIG)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a new round (the current one is archived if it has speakers)
    New {
        #[arg(value_name = "TOPIC")]
        topic: String,
    },
    /// Print the current round
    Show,
    /// Manage speakers
    Speaker {
        #[command(subcommand)]
        action: SpeakerCommand,
    },
    /// Manage notes
    Note {
        #[command(subcommand)]
        action: NoteCommand,
    },
    /// Mark SOURCE as rebutting TARGET
    Link { source: String, target: String },
    /// Remove a rebuttal link
    Unlink { source: String, target: String },
    /// List every rebuttal link in the round
    Links,
    /// Show what a note or speaker is connected to
    Highlight { id: String },
    /// Generate an AI summary of the round
    Summarize,
    /// Saved rounds
    Archive {
        #[command(subcommand)]
        action: ArchiveCommand,
    },
    /// Mark the current round completed
    Complete,
    /// Mark the current round in progress again
    Reopen,
}

#[derive(Subcommand)]
enum SpeakerCommand {
    /// Add a speaker to the current round
    Add {
        name: String,
        /// aff or neg
        #[arg(long, value_name = "SIDE")]
        side: Side,
        /// Speaking position (defaults to next on that side)
        #[arg(long, value_name = "N")]
        order: Option<u32>,
    },
    /// Remove a speaker and all their notes
    Remove { speaker: String },
    /// Rename a speaker
    Rename { speaker: String, name: String },
}

#[derive(Subcommand)]
enum NoteCommand {
    /// Add a note under a speaker ("REF <name>" marks a speaker rebuttal)
    Add {
        speaker: String,
        #[arg(default_value = "")]
        content: String,
        #[arg(long, value_name = "KIND")]
        kind: Option<ArgumentType>,
    },
    /// Replace a note's text
    Edit { note: String, content: String },
    /// Delete a note
    Delete { note: String },
    /// Move a note to a new position under its speaker
    Move { note: String, index: usize },
}

#[derive(Subcommand)]
enum ArchiveCommand {
    /// List saved rounds
    List,
    /// Make a saved round current
    Load { round: String },
    /// Delete a saved round
    Delete { round: String },
    /// Save a copy of the current round
    Save,
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult {
    let config = load_config(cli.config)?;
    let mut store = DebateStore::from_config(&config)?;

    match cli.command {
        Command::New { topic } => {
            let archived = store
                .current()
                .is_some_and(|round| !round.speakers.is_empty());
            store.create_debate(&topic)?;
            if archived {
                println!("{}", "Previous round archived.".dimmed());
            }
            println!("{} {}", "New round:".green().bold(), topic.trim().bright_white());
        }
        Command::Show => {
            let round = require_round(&store)?;
            print_header(round);
            print!("{}", round_to_text(round));
        }
        Command::Speaker { action } => speaker_command(&mut store, action)?,
        Command::Note { action } => note_command(&mut store, action)?,
        Command::Link { source, target } => {
            let round = require_round(&store)?;
            let source = resolve_argument(round, &source)?;
            let target = resolve_argument(round, &target)?;
            if store.link_refutation(&source, &target)? {
                println!("{} {} -> {}", "Linked".green(), short_id(&source), short_id(&target));
            } else {
                println!("{}", "Already linked.".dimmed());
            }
        }
        Command::Unlink { source, target } => {
            let round = require_round(&store)?;
            let source = resolve_argument(round, &source)?;
            let target = resolve_argument(round, &target)?;
            if store.unlink_refutation(&source, &target) {
                println!("{} {} -> {}", "Unlinked".green(), short_id(&source), short_id(&target));
            } else {
                println!("{}", "No such link.".dimmed());
            }
        }
        Command::Links => {
            let round = require_round(&store)?;
            let links = store.get_refutation_links();
            if links.is_empty() {
                println!("{}", "No rebuttal links yet.".dimmed());
            }
            for link in links {
                println!(
                    "  {} {} {}",
                    describe_argument(round, &link.source),
                    "->".yellow(),
                    describe_argument(round, &link.target)
                );
            }
        }
        Command::Highlight { id } => {
            let round = require_round(&store)?;
            let hovered = resolve_entity(round, &id)?;
            let highlight = compute_highlight(Some(round), Some(&hovered));
            if highlight.is_empty() {
                println!("{}", "Nothing connected.".dimmed());
            }
            for edge in highlight.edges() {
                let arrow = match edge.kind {
                    LinkKind::Refutes => "refutes".yellow(),
                    LinkKind::RefutedBy => "refuted by".cyan(),
                    LinkKind::RefutesSpeaker => "refutes speaker".magenta(),
                };
                println!(
                    "  {} {} {}",
                    describe_entity(round, &edge.source),
                    arrow,
                    describe_entity(round, &edge.target)
                );
            }
        }
        Command::Summarize => {
            let round = require_round(&store)?;
            let summary = summarize(&config, round).await?;
            print_summary(&summary);
        }
        Command::Archive { action } => archive_command(&mut store, action)?,
        Command::Complete => {
            if store.complete_debate() {
                println!("{}", "Round marked completed.".green());
            } else {
                require_round(&store)?;
                println!("{}", "Round is already completed.".dimmed());
            }
        }
        Command::Reopen => {
            if store.set_status(RoundStatus::InProgress) {
                println!("{}", "Round reopened.".green());
            } else {
                require_round(&store)?;
                println!("{}", "Round is already in progress.".dimmed());
            }
        }
    }

    // Mutations save as they go; surface a failed save here.
    if store.persist_error().is_some() {
        store.save_now()?;
    }
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> CliResult<Config> {
    let path = path.or_else(|| env::var("CDFLOW_CONFIG").ok().map(PathBuf::from));
    match path {
        Some(path) => Ok(Config::load(path)?),
        None => Ok(Config::default()),
    }
}

fn speaker_command(store: &mut DebateStore, action: SpeakerCommand) -> CliResult {
    match action {
        SpeakerCommand::Add { name, side, order } => {
            let mut new = NewSpeaker::new(name, side);
            if let Some(order) = order {
                new = new.with_order(order);
            }
            let id = store.add_speaker(new)?.ok_or(NO_ROUND)?;
            if let Some(speaker) = store.get_speaker_by_id(&id) {
                println!(
                    "{} {} [{}]",
                    "Added".green(),
                    speaker.display_name_with_side().bright_cyan(),
                    short_id(&id)
                );
            }
        }
        SpeakerCommand::Remove { speaker } => {
            let id = resolve_speaker(require_round(store)?, &speaker)?;
            store.remove_speaker(&id);
            println!("{} speaker {}", "Removed".green(), short_id(&id));
        }
        SpeakerCommand::Rename { speaker, name } => {
            let id = resolve_speaker(require_round(store)?, &speaker)?;
            let update = SpeakerUpdate {
                name: Some(name.clone()),
                ..Default::default()
            };
            store.update_speaker(&id, update)?;
            println!("{} {}", "Renamed to".green(), name.trim().bright_cyan());
        }
    }
    Ok(())
}

fn note_command(store: &mut DebateStore, action: NoteCommand) -> CliResult {
    match action {
        NoteCommand::Add {
            speaker,
            content,
            kind,
        } => {
            let speaker_id = resolve_speaker(require_round(store)?, &speaker)?;
            let fields = NewArgument {
                kind,
                ..Default::default()
            };
            let id = store.add_argument(&speaker_id, fields).ok_or(NO_ROUND)?;
            if !content.is_empty() {
                store.commit_argument_content(&id, &content);
            }
            println!("{} note [{}]", "Added".green(), short_id(&id));
            report_ref(store, &id);
        }
        NoteCommand::Edit { note, content } => {
            let id = resolve_argument(require_round(store)?, &note)?;
            store.commit_argument_content(&id, &content);
            println!("{} note [{}]", "Updated".green(), short_id(&id));
            report_ref(store, &id);
        }
        NoteCommand::Delete { note } => {
            let id = resolve_argument(require_round(store)?, &note)?;
            store.delete_argument(&id);
            println!("{} note [{}]", "Deleted".green(), short_id(&id));
        }
        NoteCommand::Move { note, index } => {
            let id = resolve_argument(require_round(store)?, &note)?;
            if store.move_argument(&id, index) {
                println!("{} note [{}]", "Moved".green(), short_id(&id));
            } else {
                println!("{}", "Note already in that position.".dimmed());
            }
        }
    }
    Ok(())
}

fn archive_command(store: &mut DebateStore, action: ArchiveCommand) -> CliResult {
    match action {
        ArchiveCommand::List => {
            let current = store.current().map(|r| r.id.clone());
            if store.saved_rounds().is_empty() {
                println!("{}", "No saved rounds.".dimmed());
            }
            for round in store.saved_rounds() {
                let marker = if current.as_deref() == Some(round.id.as_str()) {
                    "*".green().bold()
                } else {
                    " ".normal()
                };
                println!(
                    "{} [{}] {} {}",
                    marker,
                    short_id(&round.id),
                    round.topic.bright_white(),
                    format!(
                        "({} speakers, {})",
                        round.speakers.len(),
                        round.updated_at.format("%Y-%m-%d %H:%M")
                    )
                    .dimmed()
                );
            }
        }
        ArchiveCommand::Load { round } => {
            let id = resolve_saved(store, &round)?;
            store.load_debate(&id)?;
            println!("{} [{}]", "Loaded".green(), short_id(&id));
        }
        ArchiveCommand::Delete { round } => {
            let id = resolve_saved(store, &round)?;
            store.delete_saved(&id);
            println!("{} [{}]", "Deleted".green(), short_id(&id));
        }
        ArchiveCommand::Save => {
            if store.save_current() {
                println!("{}", "Current round saved.".green());
            } else {
                println!("{}", "Nothing to save.".dimmed());
            }
        }
    }
    Ok(())
}

async fn summarize(config: &Config, round: &DebateRound) -> CliResult<DebateSummary> {
    // Get API configuration from environment
    let api_base = env::var("OPENAI_API_BASE")
        .or_else(|_| env::var("OPENAI_BASE_URL"))
        .unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

    let api_key = env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
        eprintln!(
            "{}",
            "Warning: OPENAI_API_KEY not set. API calls may fail.".yellow()
        );
        String::new()
    });

    let provider = OpenAiSummaryProvider::from_config(&config.summary, api_base, api_key);
    println!(
        "{}",
        format!("Summarizing with {}...", provider.model()).dimmed()
    );
    let service = SummaryService::new(Arc::new(provider), config.clone());
    Ok(service.summarize(round).await?)
}

const NO_ROUND: &str = "No current round. Start one with `cdflow new <topic>`.";

fn require_round(store: &DebateStore) -> CliResult<&DebateRound> {
    Ok(store.current().ok_or(NO_ROUND)?)
}

/// Match an ID or unique ID prefix against `candidates`.
fn match_id<'a>(
    what: &str,
    query: &str,
    candidates: impl Iterator<Item = &'a str>,
) -> CliResult<String> {
    let matches: Vec<&str> = candidates.filter(|id| id.starts_with(query)).collect();
    match matches.as_slice() {
        [id] => Ok(id.to_string()),
        [] => Err(format!("No {} matches '{}'", what, query).into()),
        _ => Err(format!("'{}' matches more than one {}", query, what).into()),
    }
}

fn resolve_argument(round: &DebateRound, query: &str) -> CliResult<String> {
    match_id("note", query, round.arguments().map(|a| a.id.as_str()))
}

/// Speakers may be named, or given by ID prefix.
fn resolve_speaker(round: &DebateRound, query: &str) -> CliResult<String> {
    if let Some(speaker) = round.speaker_by_name(query) {
        return Ok(speaker.id.clone());
    }
    match_id("speaker", query, round.speakers.iter().map(|s| s.id.as_str()))
}

fn resolve_entity(round: &DebateRound, query: &str) -> CliResult<String> {
    if let Ok(id) = resolve_argument(round, query) {
        return Ok(id);
    }
    resolve_speaker(round, query)
        .map(|id| speaker_key(&id))
        .map_err(|_| format!("No note or speaker matches '{}'", query).into())
}

fn resolve_saved(store: &DebateStore, query: &str) -> CliResult<String> {
    match_id(
        "saved round",
        query,
        store.saved_rounds().iter().map(|r| r.id.as_str()),
    )
}

fn describe_argument(round: &DebateRound, id: &str) -> String {
    match round.argument(id) {
        Some(argument) => {
            let speaker = round
                .speaker(&argument.speaker_id)
                .map(|s| s.name.as_str())
                .unwrap_or("?");
            format!("[{}] {}: {}", short_id(id), speaker, argument.content.trim())
        }
        None => format!("[{}]", short_id(id)),
    }
}

fn describe_entity(round: &DebateRound, key: &str) -> String {
    match parse_speaker_key(key).and_then(|id| round.speaker(id)) {
        Some(speaker) => speaker.display_name_with_side().bright_cyan().to_string(),
        None => describe_argument(round, key),
    }
}

fn report_ref(store: &DebateStore, argument_id: &str) {
    let target = store
        .get_argument_by_id(argument_id)
        .and_then(|a| a.refutes_speaker.as_deref())
        .and_then(|id| store.get_speaker_by_id(id));
    if let Some(speaker) = target {
        println!("  {} {}", "refutes speaker".magenta(), speaker.name.bright_cyan());
    }
}

fn print_header(round: &DebateRound) {
    println!();
    println!("{}", "═".repeat(70).bright_blue());
    println!("{}", format!("  {}", round.topic).bright_blue().bold());
    println!("{}", "═".repeat(70).bright_blue());
}

fn print_summary(summary: &DebateSummary) {
    println!();
    println!("{}", "═".repeat(70).bright_magenta());
    println!("{}", "  Round Summary".bright_magenta().bold());
    println!("{}", "═".repeat(70).bright_magenta());

    println!();
    println!("{}", "Major arguments:".bold());
    for major in &summary.major_arguments {
        let side = match major.side {
            Side::Affirmative => Side::Affirmative.display_name().green(),
            Side::Negative => Side::Negative.display_name().red(),
        };
        let speakers = major
            .speakers
            .as_ref()
            .map(|s| format!(" ({})", s.join(", ")))
            .unwrap_or_default();
        println!(
            "  {} {} {}{}",
            side,
            format!("{:>3}", major.strength).yellow(),
            major.argument,
            speakers.dimmed()
        );
    }

    println!();
    println!("{}", "Areas of clash:".bold());
    for clash in &summary.areas_of_clash {
        println!("  {} {}", clash.topic.bright_white(), format!("[{}]", clash.status.as_str()).dimmed());
        println!("    {} {}", "AFF:".green(), clash.affirmative_position);
        println!("    {} {}", "NEG:".red(), clash.negative_position);
    }

    println!();
    println!("{}", "Recommendations:".bold());
    for recommendation in &summary.recommendations {
        println!("  - {}", recommendation);
    }

    println!();
    println!("{}", "Overall:".bold());
    println!("  {}", summary.overall_assessment);
    println!();
}
