//! Warcraft 3 replay (.w3g) decoder CLI
//!
//! A command-line front end over the decoder library.
//!
//! ## Commands
//!
//! - `info` - Display a quick one-screen summary
//! - `parse` - Decode a replay with output format options
//! - `validate` - Decode for side effects only (exit codes for scripting)

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use serde::Serialize;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};
use w3g_replay::{Expansion, MessageTarget, Replay, Winner};

/// Warcraft 3 replay (.w3g) decoder
#[derive(Parser)]
#[command(name = "w3g-replay")]
#[command(about = "Warcraft 3 replay (.w3g) decoder", long_about = None)]
#[command(version)]
struct Cli {
    /// Show decoder diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display replay information
    Info {
        /// Path to the replay file
        file: PathBuf,
    },
    /// Decode a replay file
    Parse {
        /// Path to the replay file
        file: PathBuf,
        /// Output format: json, pretty
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
        /// Include chat messages
        #[arg(long)]
        chat: bool,
        /// Include all actions in output
        #[arg(long)]
        actions: bool,
    },
    /// Validate that a file decodes cleanly
    Validate {
        /// Path to the replay file
        file: PathBuf,
    },
}

/// Output format options
#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

// ============================================================================
// Serializable Output Structures
// ============================================================================

#[derive(Serialize)]
struct ReplayOutput {
    game_name: String,
    map: String,
    creator: String,
    duration: String,
    version: u32,
    build_number: u16,
    expansion: &'static str,
    multiplayer: bool,
    private_game: bool,
    random_seed: u32,
    slots: Vec<SlotInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    winner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chat: Option<Vec<ChatInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    actions: Option<Vec<ActionInfo>>,
}

#[derive(Serialize)]
struct SlotInfo {
    slot: usize,
    name: String,
    team: u8,
    color: &'static str,
    race: &'static str,
    handicap: u8,
    cpu: bool,
}

#[derive(Serialize)]
struct ChatInfo {
    time: String,
    author: String,
    to: String,
    body: String,
}

#[derive(Serialize)]
struct ActionInfo {
    time_ms: u32,
    player: String,
    ability: String,
}

// ============================================================================
// Rendering
// ============================================================================

fn timestamp(ms: u32) -> String {
    let total_seconds = ms / 1000;
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

fn player_label(replay: &Replay, player_id: u8) -> String {
    replay
        .player(player_id)
        .map(|p| p.display_name().to_string())
        .unwrap_or_else(|| format!("player {player_id}"))
}

fn slot_author(replay: &Replay, slot_id: usize) -> String {
    replay
        .slot(slot_id)
        .map(|s| replay.slot_label(s))
        .unwrap_or_else(|| format!("slot {slot_id}"))
}

fn winner_label(replay: &Replay) -> Option<String> {
    replay.winner.map(|winner| match winner {
        Winner::Team(team) => format!("team {team}"),
        Winner::Draw => "draw".to_string(),
    })
}

fn build_output(replay: &Replay, with_chat: bool, with_actions: bool) -> ReplayOutput {
    let slots = replay
        .slots
        .iter()
        .filter(|slot| slot.is_occupied() || slot.is_cpu)
        .map(|slot| SlotInfo {
            slot: slot.id,
            name: replay.slot_label(slot),
            team: slot.team,
            color: slot.color.name,
            race: slot.race.name(),
            handicap: slot.handicap,
            cpu: slot.is_cpu,
        })
        .collect();

    let chat = with_chat.then(|| {
        replay
            .chat
            .iter()
            .map(|message| ChatInfo {
                time: timestamp(message.time_ms),
                author: slot_author(replay, message.author_slot),
                to: match message.target {
                    MessageTarget::Unspecified => "-".to_string(),
                    MessageTarget::Everyone => "All".to_string(),
                    MessageTarget::Allies => "Allies".to_string(),
                    MessageTarget::Observers => "Observers".to_string(),
                    MessageTarget::Slot(slot_id) => slot_author(replay, slot_id),
                },
                body: message.body.clone(),
            })
            .collect()
    });

    let actions = with_actions.then(|| {
        replay
            .actions
            .iter()
            .map(|action| ActionInfo {
                time_ms: action.time_ms,
                player: player_label(replay, action.player_id),
                ability: action.ability.to_string(),
            })
            .collect()
    });

    ReplayOutput {
        game_name: replay.options.game_name.clone(),
        map: replay.options.map_name.clone(),
        creator: replay.options.creator_name.clone(),
        duration: replay.duration_string(),
        version: replay.version,
        build_number: replay.build_number,
        expansion: match replay.expansion {
            Expansion::ReignOfChaos => "Reign of Chaos",
            Expansion::TheFrozenThrone => "The Frozen Throne",
        },
        multiplayer: replay.is_multiplayer,
        private_game: replay.private_game,
        random_seed: replay.random_seed,
        slots,
        winner: winner_label(replay),
        saver: replay.saver.map(|id| player_label(replay, id)),
        chat,
        actions,
    }
}

fn print_pretty(output: &ReplayOutput) {
    println!("{} ({})", output.game_name, output.duration);
    println!("  map:      {}", output.map);
    println!("  creator:  {}", output.creator);
    println!(
        "  version:  {} build {} ({})",
        output.version, output.build_number, output.expansion
    );
    println!("  seed:     0x{:08X}", output.random_seed);
    if output.private_game {
        println!("  private game");
    }
    println!("  lobby:");
    for slot in &output.slots {
        println!(
            "    [{}] team {} {:<10} {:<9} {}",
            slot.slot, slot.team, slot.color, slot.race, slot.name
        );
    }
    if let Some(winner) = &output.winner {
        println!("  winner:   {winner}");
    }
    if let Some(saver) = &output.saver {
        println!("  saved by: {saver}");
    }
    if let Some(chat) = &output.chat {
        println!("  chat:");
        for message in chat {
            println!(
                "    [{}] {} -> {}: {}",
                message.time, message.author, message.to, message.body
            );
        }
    }
    if let Some(actions) = &output.actions {
        println!("  actions: {}", actions.len());
        for action in actions {
            println!(
                "    [{}] {}: {}",
                timestamp(action.time_ms),
                action.player,
                action.ability
            );
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn load_replay(file: &PathBuf) -> Result<Replay, String> {
    let data = fs::read(file).map_err(|e| format!("{}: {e}", file.display()))?;
    Replay::parse(&data).map_err(|e| format!("{}: {e}", file.display()))
}

fn run_info(file: &PathBuf) -> ExitCode {
    match load_replay(file) {
        Ok(replay) => {
            print_pretty(&build_output(&replay, false, false));
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run_parse(file: &PathBuf, output: &OutputFormat, chat: bool, actions: bool) -> ExitCode {
    let replay = match load_replay(file) {
        Ok(replay) => replay,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };
    let rendered = build_output(&replay, chat, actions);
    match output {
        OutputFormat::Pretty => print_pretty(&rendered),
        OutputFormat::Json => match serde_json::to_string_pretty(&rendered) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: JSON encoding failed: {e}");
                return ExitCode::FAILURE;
            }
        },
    }
    ExitCode::SUCCESS
}

fn run_validate(file: &PathBuf) -> ExitCode {
    match load_replay(file) {
        Ok(replay) => {
            println!(
                "{}: OK ({} players, {} actions, {} chat messages)",
                file.display(),
                replay.players.len(),
                replay.actions.len(),
                replay.chat.len()
            );
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    match &cli.command {
        Commands::Info { file } => run_info(file),
        Commands::Parse {
            file,
            output,
            chat,
            actions,
        } => run_parse(file, output, *chat, *actions),
        Commands::Validate { file } => run_validate(file),
    }
}
