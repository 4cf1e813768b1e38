//! Klondike Solvability Checker
//!
//! Deals seeded Klondike games (draw one, unlimited recycling), lists the
//! moves the solver would try, and decides whether a position can still be
//! won, either directly or through the debounced background analyzer.

use std::io;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use patience::hash::DEFAULT_TT_CAPACITY;
use patience::moves::generate_all_moves;
use patience::state::format_state;
use patience::{
    decode_state, encode_state, solve, Analyzer, AnalyzerConfig, GameState, SolvabilityStatus,
    SolverConfig, SolverResult,
};

/// Decides whether Klondike positions can still be won.
#[derive(Parser)]
#[command(name = "patience")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Where the position comes from.
#[derive(Args)]
#[group(required = true, multiple = false)]
struct Position {
    /// Deal a new game from this seed.
    #[arg(long)]
    seed: Option<u64>,
    /// Load a state code as printed by `deal`.
    #[arg(long)]
    code: Option<String>,
}

impl Position {
    fn load(&self) -> patience::Result<GameState> {
        match (&self.code, self.seed) {
            (Some(code), _) => decode_state(code),
            (None, seed) => Ok(GameState::deal(seed.unwrap_or_default())),
        }
    }
}

/// Search budget flags.
#[derive(Args)]
struct Budget {
    /// Wall-clock limit per solve.
    #[arg(long, default_value_t = 60_000)]
    max_time_ms: u64,
    /// Node limit per solve.
    #[arg(long)]
    max_states: Option<u64>,
    /// Transposition table entries kept before eviction.
    #[arg(long, default_value_t = DEFAULT_TT_CAPACITY)]
    tt_capacity: usize,
}

impl From<&Budget> for SolverConfig {
    fn from(budget: &Budget) -> Self {
        SolverConfig {
            max_time_ms: budget.max_time_ms,
            max_states_explored: budget.max_states,
            transposition_capacity: budget.tt_capacity,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print a seeded deal and its state code.
    Deal {
        #[arg(long)]
        seed: u64,
        /// Dump the full state as JSON instead.
        #[arg(long)]
        json: bool,
    },
    /// List the candidate moves in the order the solver tries them.
    Moves {
        #[command(flatten)]
        position: Position,
    },
    /// Decide whether a position can be won.
    Solve {
        #[command(flatten)]
        position: Position,
        #[command(flatten)]
        budget: Budget,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
        /// Also print the winning line.
        #[arg(long)]
        line: bool,
    },
    /// Run the background analyzer and report progress until it settles.
    Analyze {
        #[command(flatten)]
        position: Position,
        #[command(flatten)]
        budget: Budget,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let outcome = match cli.command {
        Some(Command::Deal { seed, json: true }) => {
            match state_json(&GameState::deal(seed)) {
                Ok(text) => println!("{}", text),
                Err(e) => eprintln!("Failed to serialize state: {}", e),
            }
            Ok(())
        }
        Some(Command::Deal { seed, json: false }) => {
            run_deal(seed);
            Ok(())
        }
        Some(Command::Moves { position }) => position.load().map(|state| run_moves(&state)),
        Some(Command::Solve {
            position,
            budget,
            json,
            line,
        }) => position
            .load()
            .map(|state| run_solve(&state, &(&budget).into(), json, line)),
        Some(Command::Analyze { position, budget }) => position
            .load()
            .map(|state| run_analyze(&state, (&budget).into())),
        None => {
            // default: deal a random game and solve it
            let seed = rand::random::<u64>();
            run_deal(seed);
            run_solve(&GameState::deal(seed), &SolverConfig::default(), false, false);
            Ok(())
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Invalid position: {}", e);
            ExitCode::from(2)
        }
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn state_json(state: &GameState) -> serde_json::Result<String> {
    serde_json::to_string_pretty(state)
}

fn run_deal(seed: u64) {
    let state = GameState::deal(seed);
    println!("seed {}", seed);
    print!("{}", format_state(&state));
    println!("code: {}", encode_state(&state));
}

fn run_moves(state: &GameState) {
    print!("{}", format_state(state));
    let moves = generate_all_moves(state);
    println!("{} moves:", moves.len());
    for mv in moves {
        println!("  {}", mv);
    }
}

fn run_solve(state: &GameState, config: &SolverConfig, json: bool, line: bool) {
    info!(?config, "solving");
    let result = solve(state, config);

    if json {
        match serde_json::to_string_pretty(&result) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Failed to serialize result: {}", e),
        }
        return;
    }

    print!("{}", format_result(&result));
    if line && result.winnable {
        print!("{}", format_line(&result));
    }
}

fn run_analyze(state: &GameState, solver: SolverConfig) {
    let mut analyzer = Analyzer::new(AnalyzerConfig {
        solver,
        ..AnalyzerConfig::default()
    });
    analyzer.state_changed(state);

    let mut last_reported = 0;
    loop {
        let analysis = analyzer.poll().clone();
        if analysis.is_settled() {
            println!("status: {}", status_label(analysis.status));
            println!("states explored: {}", analysis.states_explored);
            println!("time: {} ms", analysis.time_ms);
            if let Some(mv) = analysis.first_winning_move {
                println!("hint: {}", mv);
            }
            break;
        }
        if analysis.states_explored > last_reported {
            last_reported = analysis.states_explored;
            println!(
                "analyzing: {} states, {} ms",
                analysis.states_explored, analysis.time_ms
            );
        }
        thread::sleep(Duration::from_millis(50));
    }
}

fn status_label(status: SolvabilityStatus) -> &'static str {
    match status {
        SolvabilityStatus::Idle => "idle",
        SolvabilityStatus::Analyzing => "analyzing",
        SolvabilityStatus::Winnable => "winnable",
        SolvabilityStatus::NotWinnable => "not winnable",
        SolvabilityStatus::Unknown => "unknown (budget exhausted)",
    }
}

fn format_result(result: &SolverResult) -> String {
    let mut output = format!("status: {}\n", status_label(result.status()));
    output.push_str(&format!("states explored: {}\n", result.states_explored));
    output.push_str(&format!("time: {} ms\n", result.time_ms));
    if let Some(mv) = result.first_winning_move {
        output.push_str(&format!("first move: {}\n", mv));
    }
    output
}

fn format_line(result: &SolverResult) -> String {
    let mut output = format!("winning line ({} moves):\n", result.winning_line.len());
    for (i, mv) in result.winning_line.iter().enumerate() {
        output.push_str(&format!("{:>4}. {}\n", i + 1, mv));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use patience::SolverMove;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_seed_and_code_conflict() {
        assert!(Cli::try_parse_from(["patience", "solve", "--seed", "1", "--code", "x"]).is_err());
        assert!(Cli::try_parse_from(["patience", "moves"]).is_err());
        assert!(Cli::try_parse_from(["patience", "-vv", "solve", "--seed", "1", "--line"]).is_ok());
    }

    #[test]
    fn test_budget_flags() {
        let cli = Cli::try_parse_from([
            "patience",
            "solve",
            "--seed",
            "4",
            "--max-time-ms",
            "500",
            "--max-states",
            "1000",
        ])
        .unwrap();
        let Some(Command::Solve { budget, .. }) = cli.command else {
            panic!("expected solve");
        };
        let config = SolverConfig::from(&budget);
        assert_eq!(config.max_time_ms, 500);
        assert_eq!(config.max_states_explored, Some(1000));
        assert_eq!(config.transposition_capacity, DEFAULT_TT_CAPACITY);
    }

    #[test]
    fn test_state_json_reloads() {
        let state = GameState::deal(21);
        let text = state_json(&state).unwrap();
        let reloaded: GameState = serde_json::from_str(&text).unwrap();
        assert_eq!(reloaded, state);
        assert!(text.contains("\"face_up\": true"));
    }

    #[test]
    fn test_result_report() {
        let result = SolverResult {
            winnable: true,
            timed_out: false,
            states_explored: 1234,
            time_ms: 56,
            first_winning_move: Some(SolverMove::WasteToTableau { column: 2 }),
            winning_line: vec![
                SolverMove::WasteToTableau { column: 2 },
                SolverMove::StockToWaste,
                SolverMove::TableauToTableau {
                    from: 4,
                    card_index: 3,
                    to: 0,
                    count: 2,
                },
            ],
        };

        let output = format_result(&result) + &format_line(&result);
        insta::assert_snapshot!(output, @r"
        status: winnable
        states explored: 1234
        time: 56 ms
        first move: waste -> t2
        winning line (3 moves):
           1. waste -> t2
           2. draw
           3. t4:3 -> t0 (2)
        ");
    }

    #[test]
    fn test_unknown_result_report() {
        let output = format_result(&SolverResult::unresolved());
        insta::assert_snapshot!(output, @r"
        status: unknown (budget exhausted)
        states explored: 0
        time: 0 ms
        ");
    }
}
