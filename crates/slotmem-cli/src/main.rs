//! `slotmem-cli` – Slot Memory inspector
//!
//! This binary opens the template store of one world and lets the user look
//! into it or drive it by hand.  It:
//!
//! 1. Loads `~/.slotmem/config.toml`, writing the defaults on first run.
//! 2. Picks the data file for the world given on the command line
//!    (`--world <save>` or `--server <address>`).
//! 3. Drops the user into an **interactive REPL** with slash-commands
//!    (`/stats`, `/list`, `/show`, `/mode`, `/open`, `/click`, `/help`, …).
//! 4. Intercepts **Ctrl-C** and always flushes pending writes before exit.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use slotmem_kernel::SlotMemorySession;
use slotmem_memory::persistence::WorldKey;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the filter (default "info").  SLOTMEM_LOG_FORMAT=json
    // emits newline-delimited JSON; user-facing output stays on println!.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("SLOTMEM_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    let world = match parse_world(std::env::args().skip(1)) {
        Ok(world) => world,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            eprintln!("Usage: slotmem [--world <save name> | --server <address>]");
            std::process::exit(2);
        }
    };

    print_banner();

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – press Enter to flush and exit …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; use /quit to flush before exiting");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    // ── Session ───────────────────────────────────────────────────────────
    let session_config = cfg.to_session_config(&world);
    if let Some(path) = &session_config.data_file {
        println!("  World data : {}", path.display().to_string().bold());
    }
    let session = SlotMemorySession::load_all(session_config);
    println!("  {}", session.stats());

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());

    // ── Interactive REPL ──────────────────────────────────────────────────
    let session = repl::run(session, cfg.player_inventory_slots, shutdown);
    session.shutdown();
    println!("{}", "  ✓ Slot memory flushed.".green());
}

/// Read `--world <save>` / `--server <address>` from the command line.
fn parse_world(mut args: impl Iterator<Item = String>) -> Result<WorldKey, String> {
    let mut world = WorldKey::Unknown;
    while let Some(arg) = args.next() {
        let value = || format!("{arg} needs a value");
        world = match arg.as_str() {
            "--world" => WorldKey::Local {
                save_name: args.next().ok_or_else(value)?,
            },
            "--server" => WorldKey::Remote {
                address: args.next().ok_or_else(value)?,
            },
            other => return Err(format!("unknown argument '{other}'")),
        };
    }
    Ok(world)
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!(
        "  {} {}",
        "slotmem".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Container slot memory inspector");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn no_arguments_means_unknown_world() {
        assert_eq!(parse_world(args(&[])), Ok(WorldKey::Unknown));
    }

    #[test]
    fn world_and_server_flags() {
        assert_eq!(
            parse_world(args(&["--world", "New World"])),
            Ok(WorldKey::Local {
                save_name: "New World".into()
            })
        );
        assert_eq!(
            parse_world(args(&["--server", "mc.example.org"])),
            Ok(WorldKey::Remote {
                address: "mc.example.org".into()
            })
        );
    }

    #[test]
    fn flag_without_value_is_an_error() {
        assert!(parse_world(args(&["--world"])).is_err());
        assert!(parse_world(args(&["--verbose"])).is_err());
    }
}
