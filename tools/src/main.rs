//! turn-runner: headless session harness for the canton economy core.
//!
//! Usage:
//!   turn-runner --seed 12345 --turns 20 --db game.db
//!   turn-runner --seed 12345 --rules rules.json --ipc-mode
//!
//! Batch mode submits the demo plan every turn, advances, and stores each
//! post-turn snapshot. IPC mode reads one JSON request per stdin line and
//! answers with one JSON line.

mod store;

use anyhow::{Context, Result};
use canton_core::{
    command::EconomyCommand,
    config::SimConfig,
    context::ExternalContext,
    event::TurnSummary,
    fixtures,
    plan::TurnPlan,
    types::{Resource, Turn},
    TurnEngine,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use store::SnapshotStore;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    GetState,
    SubmitPlan { plan: TurnPlan },
    Advance {
        #[serde(default = "one")]
        count: u64,
    },
    Command { command: EconomyCommand },
    Quit,
}

fn one() -> u64 {
    1
}

#[derive(serde::Serialize)]
struct UiState {
    turn: Turn,
    treasury: f64,
    debt: f64,
    defaulted: bool,
    food: f64,
    foreign_exchange: f64,
    urbanization: Vec<(String, u8)>,
    last_summary: Option<TurnSummary>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let turns = parse_arg(&args, "--turns", 12u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let rules = flag_value(&args, "--rules");

    let config = match rules {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::default_rules(),
    };
    let config = Arc::new(config);

    if !ipc_mode {
        println!("Canton economy turn-runner");
        println!("  seed:   {seed}");
        println!("  turns:  {turns}");
        println!("  db:     {db}");
        println!("  rules:  {}", rules.unwrap_or("built-in"));
        println!();
    }

    let store = SnapshotStore::open(db)?;
    store.migrate()?;

    let state = fixtures::demo_state(&config);
    let game_id = format!("game-{seed}");
    store.insert_game(&game_id, seed, env!("CARGO_PKG_VERSION"), &state.nation_id)?;

    let mut engine = TurnEngine::build(state, config, seed);
    let external = fixtures::demo_external();

    if ipc_mode {
        run_ipc_loop(&mut engine, &store, &game_id, &external)?;
    } else {
        let summaries = run_batch(&mut engine, &store, &game_id, &external, turns)?;
        print_summary(&engine, &store, &game_id, &summaries)?;
    }
    Ok(())
}

fn run_batch(
    engine: &mut TurnEngine,
    store: &SnapshotStore,
    game_id: &str,
    external: &ExternalContext,
    turns: u64,
) -> Result<Vec<TurnSummary>> {
    let mut summaries = Vec::new();
    for _ in 0..turns {
        engine.submit_plan(fixtures::demo_plan())?;
        summaries.push(advance_and_store(engine, store, game_id, external)?);
    }
    Ok(summaries)
}

fn advance_and_store(
    engine: &mut TurnEngine,
    store: &SnapshotStore,
    game_id: &str,
    external: &ExternalContext,
) -> Result<TurnSummary> {
    let summary = engine
        .advance_turn(external)
        .with_context(|| format!("resolving turn {}", engine.turn() + 1))?;
    store.save_snapshot(game_id, &engine.snapshot())?;
    store.append_events(game_id, summary.turn, engine.last_events())?;
    Ok(summary)
}

fn run_ipc_loop(
    engine: &mut TurnEngine,
    store: &SnapshotStore,
    game_id: &str,
    external: &ExternalContext,
) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        if handle.read_line(&mut buffer)? == 0 {
            break;
        }

        let request: IpcRequest = match serde_json::from_str(&buffer) {
            Ok(r) => r,
            Err(e) => {
                write_error(&mut stdout, &e.to_string())?;
                continue;
            }
        };

        let reply = match request {
            IpcRequest::Quit => break,
            IpcRequest::GetState => Ok(()),
            IpcRequest::SubmitPlan { plan } => engine.submit_plan(plan).map_err(anyhow::Error::from),
            IpcRequest::Command { command } => engine.command(command).map(|_| ()).map_err(Into::into),
            IpcRequest::Advance { count } => {
                (0..count).try_for_each(|_| advance_and_store(engine, store, game_id, external).map(|_| ()))
            }
        };
        match reply {
            Ok(()) => writeln!(stdout, "{}", serde_json::to_string(&ui_state(engine))?)?,
            Err(e) => {
                log::warn!("ipc request failed: {e:#}");
                write_error(&mut stdout, &format!("{e:#}"))?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn write_error(out: &mut impl Write, message: &str) -> Result<()> {
    writeln!(out, "{}", serde_json::json!({ "error": message }))?;
    out.flush()?;
    Ok(())
}

fn ui_state(engine: &TurnEngine) -> UiState {
    let state = engine.state();
    UiState {
        turn: state.turn,
        treasury: state.treasury(),
        debt: state.finance.debt,
        defaulted: state.finance.defaulted,
        food: state.stockpile.get(Resource::Food),
        foreign_exchange: state.stockpile.get(Resource::ForeignExchange),
        urbanization: state
            .cantons
            .values()
            .map(|c| (c.id.clone(), c.urbanization_level()))
            .collect(),
        last_summary: state.last_summary.clone(),
    }
}

fn print_summary(
    engine: &TurnEngine,
    store: &SnapshotStore,
    game_id: &str,
    summaries: &[TurnSummary],
) -> Result<()> {
    let state = engine.state();

    println!("=== TURNS ===");
    for s in summaries {
        println!(
            "  turn {:>3} | energy {:.2} | lp {:.2} | brownouts {:>2} | treasury {:>9.1} | debt {:>7.1}{}",
            s.turn,
            s.energy_ratio,
            s.lp_ratio,
            s.brownouts,
            s.treasury,
            s.debt,
            if s.defaulted { " | DEFAULT" } else { "" }
        );
    }

    println!();
    println!("=== FINAL STATE ===");
    println!("  game_id:    {game_id}");
    println!("  final turn: {}", state.turn);
    println!("  snapshots:  {}", store.snapshot_count(game_id)?);
    for canton in state.cantons.values() {
        println!(
            "  {:<8} UL {:>2} (next {:>2}) meter {:.2}",
            canton.id,
            canton.urbanization_level(),
            canton.next_urbanization_level(),
            canton.development
        );
    }
    for (resource, amount) in state.stockpile.iter() {
        println!("  {:<18} {:>10.1}", resource.as_str(), amount);
    }

    println!();
    println!("=== EVENTS ===");
    for (event_type, count) in store.event_counts(game_id)? {
        println!("  {event_type:<24} {count}");
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
