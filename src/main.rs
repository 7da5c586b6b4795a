use anyhow::Result;
use boulder_tally::competition::{Competition, CompetitionError, MemberUpdate, RouteUpdate};
use boulder_tally::config::Config;
use boulder_tally::model::{MemberId, RoomId, RouteId};
use boulder_tally::output;
use boulder_tally::store::{self, MemoryStore};
use clap::{Args, Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const EXIT_SUCCESS: i32 = 0;
const EXIT_CONFIG: i32 = 4;
const EXIT_STORAGE: i32 = 5;
const EXIT_INPUT: i32 = 6;

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create, rename, delete and inspect rooms
    #[command(subcommand)]
    Room(RoomCommand),
    /// Add, update and remove competitors
    #[command(subcommand)]
    Member(MemberCommand),
    /// Add, update and remove routes
    #[command(subcommand)]
    Route(RouteCommand),
    /// Mark a member's attempt on a route
    #[command(subcommand)]
    Score(ScoreCommand),
    /// Show a room's ranking
    Leaderboard {
        room: u64,
        /// Tab-separated output for scripting
        #[arg(long, conflicts_with = "json")]
        tsv: bool,
        /// JSON output
        #[arg(long)]
        json: bool,
    },
    /// Show how each route's points are split
    Routes {
        room: u64,
        /// JSON output
        #[arg(long)]
        json: bool,
    },
    /// Re-derive every score of a room
    Recompute { room: u64 },
}

#[derive(Subcommand, Debug)]
enum RoomCommand {
    Create { name: String },
    Rename { room: u64, name: String },
    Delete { room: u64 },
    List,
    /// Show a room's members and routes with their ids
    Show { room: u64 },
}

#[derive(Subcommand, Debug)]
enum MemberCommand {
    Add {
        room: u64,
        name: String,
        /// Score in the custom class (full L per completed route)
        #[arg(long)]
        custom: bool,
    },
    Update {
        member: u64,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        class: ClassArgs,
    },
    Delete { member: u64 },
}

#[derive(Args, Debug)]
#[group(multiple = false)]
struct ClassArgs {
    /// Move the member to the custom class
    #[arg(long)]
    custom: bool,
    /// Move the member to the normal class
    #[arg(long)]
    normal: bool,
}

impl ClassArgs {
    fn is_custom_calc(&self) -> Option<bool> {
        match (self.custom, self.normal) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Subcommand, Debug)]
enum RouteCommand {
    Add {
        room: u64,
        name: String,
        #[arg(long)]
        grade: String,
        /// Comma-separated ids of members who completed the route
        #[arg(long, value_delimiter = ',')]
        completed: Vec<u64>,
    },
    Update {
        route: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        grade: Option<String>,
        /// Replace the completion set (pass with no ids to clear it)
        #[arg(long, value_delimiter = ',', num_args = 0..)]
        completed: Option<Vec<u64>>,
    },
    Delete { route: u64 },
}

#[derive(Subcommand, Debug)]
enum ScoreCommand {
    /// Set whether a member completed a route
    Set {
        member: u64,
        route: u64,
        #[arg(action = clap::ArgAction::Set, value_parser = clap::value_parser!(bool))]
        completed: bool,
    },
}

#[derive(Parser, Debug)]
#[command(name = "boulder-tally")]
#[command(about = "Bouldering competition scoring", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (defaults to ~/.config/boulder-tally/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Path to the state file (overrides data_file from config)
    #[arg(short, long, global = true)]
    data: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "boulder_tally=debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match boulder_tally::config::load_config(cli.config.map(PathBuf::from)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };

    if let Err(errors) = boulder_tally::config::validate_config(&config) {
        eprintln!("Config errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        std::process::exit(EXIT_CONFIG);
    }

    let data_path = match boulder_tally::config::resolve_data_path(&config, cli.data.map(PathBuf::from)) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Config error: {:#}", e);
            std::process::exit(EXIT_CONFIG);
        }
    };
    tracing::debug!(path = %data_path.display(), "using state file");

    let use_colors = output::should_use_colors(config.color);

    // The state file stays locked from load to save so concurrent
    // invocations serialize.
    let result = store::with_locked_state(&data_path, |state| {
        let competition = Competition::new(MemoryStore::from_state(state));
        if run(cli.command, &competition, &config, use_colors)? {
            Ok(Some(competition.into_store().to_state()?))
        } else {
            Ok(None)
        }
    });

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        let code = match e.downcast_ref::<CompetitionError>() {
            Some(err) if err.is_invalid_input() => EXIT_INPUT,
            _ => EXIT_STORAGE,
        };
        std::process::exit(code);
    }

    std::process::exit(EXIT_SUCCESS);
}

/// Execute one command. Returns true when the state must be written back.
fn run(command: Commands, comp: &Competition<MemoryStore>, config: &Config, use_colors: bool) -> Result<bool> {
    match command {
        Commands::Room(cmd) => match cmd {
            RoomCommand::Create { name } => {
                let room = comp.create_room(&name)?;
                println!("Created room {} ({})", room.id.0, room.name);
                Ok(true)
            }
            RoomCommand::Rename { room, name } => {
                let room = comp.rename_room(RoomId(room), &name)?;
                println!("Renamed room {} to {}", room.id.0, room.name);
                Ok(true)
            }
            RoomCommand::Delete { room } => {
                comp.delete_room(RoomId(room))?;
                println!("Deleted room {}", room);
                Ok(true)
            }
            RoomCommand::List => {
                println!("{}", output::format_room_list(&comp.rooms()?, use_colors));
                Ok(false)
            }
            RoomCommand::Show { room } => {
                let details = comp.room(RoomId(room))?;
                println!("{} (L = {})", details.name, details.standard_line_score);
                println!("{}", output::format_member_list(&comp.members(RoomId(room))?));
                println!();
                println!("{}", output::format_route_list(&comp.routes(RoomId(room))?));
                Ok(false)
            }
        },
        Commands::Member(cmd) => match cmd {
            MemberCommand::Add { room, name, custom } => {
                let member = comp.add_member(RoomId(room), &name, custom)?;
                println!("Added member {} ({}, {})", member.id.0, member.name, member.class_label());
                Ok(true)
            }
            MemberCommand::Update { member, name, class } => {
                let update = MemberUpdate {
                    name,
                    is_custom_calc: class.is_custom_calc(),
                };
                let member = comp.update_member(MemberId(member), update)?;
                println!(
                    "Updated member {} ({}, {}): {}",
                    member.id.0,
                    member.name,
                    member.class_label(),
                    output::format_points(member.total_score)
                );
                Ok(true)
            }
            MemberCommand::Delete { member } => {
                comp.delete_member(MemberId(member))?;
                println!("Deleted member {}", member);
                Ok(true)
            }
        },
        Commands::Route(cmd) => match cmd {
            RouteCommand::Add { room, name, grade, completed } => {
                let completions: BTreeSet<MemberId> = completed.into_iter().map(MemberId).collect();
                let route = comp.add_route(RoomId(room), &name, &grade, &completions)?;
                println!("Added route {} ({} {})", route.id.0, route.name, route.grade);
                Ok(true)
            }
            RouteCommand::Update { route, name, grade, completed } => {
                let update = RouteUpdate {
                    name,
                    grade,
                    completions: completed.map(|ids| ids.into_iter().map(MemberId).collect()),
                };
                let route = comp.update_route(RouteId(route), update)?;
                println!("Updated route {} ({} {})", route.id.0, route.name, route.grade);
                Ok(true)
            }
            RouteCommand::Delete { route } => {
                comp.delete_route(RouteId(route))?;
                println!("Deleted route {}", route);
                Ok(true)
            }
        },
        Commands::Score(ScoreCommand::Set { member, route, completed }) => {
            let score = comp.set_completion(MemberId(member), RouteId(route), completed)?;
            println!(
                "Member {} on route {}: {} ({})",
                member,
                route,
                if score.is_completed { "completed" } else { "not completed" },
                output::format_points(score.score_attained)
            );
            Ok(true)
        }
        Commands::Leaderboard { room, tsv, json } => {
            let board = comp.leaderboard(RoomId(room))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&board)?);
            } else if tsv {
                println!("{}", output::format_leaderboard_tsv(&board));
            } else {
                println!(
                    "{}",
                    output::format_leaderboard(&board, config.leaderboard.show_completed, use_colors)
                );
            }
            Ok(false)
        }
        Commands::Routes { room, json } => {
            let board = comp.route_board(RoomId(room))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&board)?);
            } else {
                println!("{}", output::format_route_board(&board, use_colors));
            }
            Ok(false)
        }
        Commands::Recompute { room } => match comp.recompute(RoomId(room))? {
            Some(outcome) => {
                println!(
                    "Recomputed room {}: L = {}, {} scores and {} members updated",
                    room, outcome.standard_line_score, outcome.scores_written, outcome.members_written
                );
                Ok(!outcome.is_noop())
            }
            None => {
                println!("Room {} not found, nothing to do", room);
                Ok(false)
            }
        },
    }
}
