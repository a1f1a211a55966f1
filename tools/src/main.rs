//! dominion-runner: headless world runner for Stellar Dominion.
//!
//! Usage:
//!   dominion-runner --seed 12345 --empires 12 --hours 48 --db world.db
//!   dominion-runner --seed 12345 --db world.db --ipc-mode
//!
//! Simulation mode founds a roster of empires, groups them into alliances
//! and plays `--hours` of seeded activity against a pinned clock, then
//! prints the leaderboard. IPC mode reads one JSON request per stdin line
//! and writes one JSON response per stdout line.

use anyhow::Result;
use dominion_core::{
    clock::{Clock, FixedClock},
    command::{PlayerCommand, RequestContext},
    config::GameConfig,
    empire::{AllianceRole, Empire, UnitKind},
    engine::GameEngine,
    error::GameError,
    espionage::SpyMission,
    name_generator::NameGenerator,
    rng::{GameRng, RngBank, RngSlot},
    store::GameStore,
    training::ArmoryTrack,
    types::{EmpireId, Timestamp},
};
use std::collections::BTreeMap;
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    FoundEmpire {
        name: String,
    },
    Command {
        empire_id: EmpireId,
        command:   PlayerCommand,
    },
    Advance {
        secs: i64,
    },
    Empire {
        empire_id: EmpireId,
    },
    Leaderboard,
    Quit,
}

/// Tally of simulated actions, keyed by command name.
#[derive(Default)]
struct ActivityStats {
    accepted: BTreeMap<&'static str, u64>,
    rejected: BTreeMap<&'static str, u64>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let empires = parse_arg(&args, "--empires", 12usize);
    let hours = parse_arg(&args, "--hours", 24u64);
    let start = parse_arg(&args, "--start", 1_700_000_000 as Timestamp);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = string_arg(&args, "--db", ":memory:");
    let data_dir = string_arg(&args, "--data-dir", "./data");

    if !ipc_mode {
        println!("Stellar Dominion: dominion-runner");
        println!("  seed:      {seed}");
        println!("  empires:   {empires}");
        println!("  hours:     {hours}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let config = GameConfig::load(data_dir)?;
    let store = if db == ":memory:" {
        GameStore::in_memory()?
    } else {
        GameStore::open(db)?
    };
    let clock = Arc::new(FixedClock::at(start));
    let mut engine = GameEngine::create_world(store, config, clock.clone(), seed)?;

    if ipc_mode {
        run_ipc_loop(&mut engine, &clock)?;
    } else {
        let roster = seed_world(&mut engine, empires)?;
        let stats = simulate(&mut engine, &clock, &roster, hours)?;
        print_summary(&engine, &stats, hours)?;
    }
    Ok(())
}

// ── Simulation ─────────────────────────────────────────────────────

/// Found `count` empires and group them into alliances of four.
fn seed_world(engine: &mut GameEngine, count: usize) -> Result<Vec<EmpireId>> {
    let bank = RngBank::new(engine.master_seed());
    let mut rng = bank.for_slot(RngSlot::WorldGen, 0);

    let mut roster = Vec::with_capacity(count);
    for i in 0..count {
        let empire = found_unique(engine, &mut rng, i)?;
        roster.push(empire.id);
    }

    for group in roster.chunks(4) {
        let Some((&leader, members)) = group.split_first() else {
            continue;
        };
        let (name, tag) = NameGenerator::alliance_name(&mut rng);
        let ctx = engine.context(leader);
        let alliance = match engine.found_alliance(&ctx, &name, &tag) {
            Ok(a) => a,
            Err(GameError::NameTaken(_)) => {
                let fallback = format!("Coalition {leader}");
                engine.found_alliance(&ctx, &fallback, &format!("C{leader}"))?
            }
            Err(e) => return Err(e.into()),
        };
        for (i, &member) in members.iter().enumerate() {
            let ctx = engine.context(member);
            engine.join_alliance(&ctx, alliance.id)?;
            if i == 0 {
                let ctx = engine.context(leader);
                engine.set_member_role(&ctx, member, AllianceRole::Officer)?;
            }
        }
    }
    Ok(roster)
}

fn found_unique(engine: &mut GameEngine, rng: &mut GameRng, index: usize) -> Result<Empire> {
    for _ in 0..5 {
        let name = NameGenerator::empire_name(rng);
        match engine.found_empire(&name) {
            Ok(empire) => return Ok(empire),
            Err(GameError::NameTaken(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(engine.found_empire(&format!("Empire {}", index + 1))?)
}

/// One pass over the roster per simulated hour, each empire issuing one
/// seeded command.
fn simulate(
    engine: &mut GameEngine,
    clock: &FixedClock,
    roster: &[EmpireId],
    hours: u64,
) -> Result<ActivityStats> {
    let bank = RngBank::new(engine.master_seed());
    let mut rng = bank.for_slot(RngSlot::Activity, 0);
    let mut stats = ActivityStats::default();

    for hour in 1..=hours {
        clock.advance_secs(3600);
        for &empire_id in roster {
            let ctx = RequestContext::new(empire_id, clock.now_ts());
            let command = pick_command(engine, &mut rng, empire_id, roster)?;
            let name = command.type_name();
            match engine.execute(&ctx, command) {
                Ok(_) => *stats.accepted.entry(name).or_default() += 1,
                Err(e) if e.is_validation() => *stats.rejected.entry(name).or_default() += 1,
                Err(e) => return Err(e.into()),
            }
        }
        log::info!("hour={hour} simulation: {} commands issued", roster.len());
    }
    Ok(stats)
}

fn pick_command(
    engine: &GameEngine,
    rng: &mut GameRng,
    empire_id: EmpireId,
    roster: &[EmpireId],
) -> Result<PlayerCommand> {
    let empire = engine.empire(empire_id)?;
    let other = roster[rng.next_u64_below(roster.len() as u64) as usize];
    let roll = rng.roll_inclusive(1, 100);

    let command = match roll {
        1..=30 => {
            let unit = match rng.next_u64_below(4) {
                0 => UnitKind::Worker,
                1 => UnitKind::Soldier,
                2 => UnitKind::Guard,
                _ => UnitKind::Spy,
            };
            PlayerCommand::Train { unit, quantity: (empire.untrained_citizens / 2).max(1) }
        }
        31..=55 => PlayerCommand::Attack {
            target: other,
            turns: rng.roll_inclusive(1, engine.config().combat.max_turns_per_attack),
        },
        56..=62 => PlayerCommand::Spy {
            target: other,
            mission: match rng.next_u64_below(3) {
                0 => SpyMission::Intelligence,
                1 => SpyMission::Sabotage,
                _ => SpyMission::Assassination,
            },
        },
        63..=72 => PlayerCommand::AllianceDeposit { amount: empire.credits / 4 },
        73..=80 => match next_structure(engine, &empire)? {
            Some(key) => PlayerCommand::PurchaseStructure { key },
            None => PlayerCommand::Sync,
        },
        81..=86 => PlayerCommand::PlayBlackMarket {
            game: "data_dice".to_string(),
            stake: (empire.credits / 20).clamp(1_000, 100_000),
        },
        87..=91 => PlayerCommand::BankDeposit { amount: empire.credits / 2 },
        92..=95 => PlayerCommand::UpgradeArmory {
            track: if rng.chance(0.5) { ArmoryTrack::Offense } else { ArmoryTrack::Defense },
        },
        96..=97 => PlayerCommand::UpgradeVault,
        _ => PlayerCommand::Sync,
    };
    Ok(command)
}

/// Lowest unowned tier in the first category with one, for empires that
/// may spend from their alliance bank.
fn next_structure(engine: &GameEngine, empire: &Empire) -> Result<Option<String>> {
    let (Some(alliance_id), Some(role)) = (empire.alliance_id, empire.alliance_role) else {
        return Ok(None);
    };
    if !role.can_manage_treasury() {
        return Ok(None);
    }
    let owned = engine.store().read(|tx| tx.owned_structures(alliance_id))?;
    let next = engine
        .config()
        .structures
        .values()
        .filter(|s| !owned.contains(&s.key))
        .filter(|s| {
            engine
                .config()
                .structure_prerequisite(&s.key)
                .map_or(true, |p| owned.contains(&p.key))
        })
        .map(|s| s.key.clone())
        .next();
    Ok(next)
}

fn print_summary(engine: &GameEngine, stats: &ActivityStats, hours: u64) -> Result<()> {
    let events = engine.store().event_count()?;

    println!("=== WORLD SUMMARY ===");
    println!("  master seed:    {}", engine.master_seed());
    println!("  hours played:   {hours}");
    println!("  events logged:  {events}");
    println!();
    println!("=== COMMANDS (accepted / rejected) ===");
    let mut names: Vec<_> = stats.accepted.keys().chain(stats.rejected.keys()).collect();
    names.sort();
    names.dedup();
    for name in names {
        println!(
            "  {:<20} {:>6} / {:<6}",
            name,
            stats.accepted.get(name).copied().unwrap_or(0),
            stats.rejected.get(name).copied().unwrap_or(0)
        );
    }
    println!();
    println!("=== LEADERBOARD (top 10) ===");
    for entry in engine.leaderboard()?.iter().take(10) {
        println!(
            "  #{:<3} {:<34} lvl {:>3} | power {:>10.0} | net worth {:>12}",
            entry.rank, entry.name, entry.level, entry.power_score, entry.net_worth
        );
    }
    Ok(())
}

// ── IPC ────────────────────────────────────────────────────────────

fn run_ipc_loop(engine: &mut GameEngine, clock: &FixedClock) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let request: IpcRequest = match serde_json::from_str(&buffer) {
            Ok(r) => r,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        let response = match request {
            IpcRequest::Quit => break,
            IpcRequest::Advance { secs } => {
                clock.advance_secs(secs);
                Ok(serde_json::json!({ "now": clock.now_ts() }))
            }
            IpcRequest::FoundEmpire { name } => engine
                .found_empire(&name)
                .and_then(|e| Ok(serde_json::to_value(e)?)),
            IpcRequest::Empire { empire_id } => engine
                .empire(empire_id)
                .and_then(|e| Ok(serde_json::to_value(e)?)),
            IpcRequest::Leaderboard => engine
                .leaderboard()
                .and_then(|l| Ok(serde_json::to_value(l)?)),
            IpcRequest::Command { empire_id, command } => {
                let ctx = RequestContext::new(empire_id, clock.now_ts());
                engine
                    .execute(&ctx, command)
                    .and_then(|o| Ok(serde_json::to_value(o)?))
            }
        };

        let line = match response {
            Ok(ok) => serde_json::json!({ "ok": ok }),
            Err(e) if e.is_validation() => {
                serde_json::json!({ "error": e.to_string(), "rejected": true })
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(stdout, "{line}")?;
        stdout.flush()?;
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str, default: &'a str) -> &'a str {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .unwrap_or(default)
}
