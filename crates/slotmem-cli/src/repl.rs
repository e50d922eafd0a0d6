//! REPL – interactive inspector for the slot memory of one world.
//!
//! Inspection commands:
//!   /help                 – show this list
//!   /stats                – container and template counts
//!   /list                 – every remembered container
//!   /show <id>            – slot templates of one container
//!   /forget <id>          – delete a container's memory
//!   /save                 – write the data file now
//!   /mode [persistent|session] – show or switch the persistence mode
//!   /schema               – JSON Schema of the data file
//!   /quit | /exit         – flush and exit
//!
//! Host simulation (one container open at a time):
//!   /open <kind> <dim> <x> <y> <z> <total_slots>
//!   /close
//!   /memorize             – toggle memorize mode
//!   /hold <item|->        – set or empty the main-hand item
//!   /click <slot> <button> [item]  – item is the cursor stack
//!   /insert <slot> <item>
//!   /clear

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use slotmem_kernel::{
    ContainerOpened, SlotMemorySession, container_slot_count, pick_template_source,
};
use slotmem_memory::persistence::document_schema;
use slotmem_types::{
    ContainerIdentity, ContainerKind, ItemSignature, PersistenceMode, SpatialCoordinate,
};

/// One parsed REPL line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Stats,
    List,
    Show(String),
    Forget(String),
    Save,
    Mode(Option<PersistenceMode>),
    Schema,
    Open {
        kind: ContainerKind,
        coordinate: SpatialCoordinate,
        total_slots: usize,
    },
    Close,
    Memorize,
    Click {
        slot: usize,
        button: u8,
        item: Option<ItemSignature>,
    },
    Insert {
        slot: usize,
        item: ItemSignature,
    },
    Hold(Option<ItemSignature>),
    Clear,
    Quit,
}

impl Command {
    /// Parse a trimmed, non-empty input line.
    pub fn parse(line: &str) -> Result<Command, String> {
        let mut words = line.split_whitespace();
        let head = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        let cmd = match (head, args.as_slice()) {
            ("/help", []) => Command::Help,
            ("/stats", []) => Command::Stats,
            ("/list", []) => Command::List,
            ("/show", [id]) => Command::Show(id.to_string()),
            ("/forget", [id]) => Command::Forget(id.to_string()),
            ("/save", []) => Command::Save,
            ("/mode", []) => Command::Mode(None),
            ("/mode", [mode]) => Command::Mode(Some(mode.parse().map_err(|e| format!("{e}"))?)),
            ("/schema", []) => Command::Schema,
            ("/open", [kind, dim, x, y, z, total]) => Command::Open {
                kind: kind.parse().unwrap_or_else(|never| match never {}),
                coordinate: SpatialCoordinate::new(
                    *dim,
                    parse_num(x, "x")?,
                    parse_num(y, "y")?,
                    parse_num(z, "z")?,
                ),
                total_slots: parse_num(total, "total_slots")?,
            },
            ("/close", []) => Command::Close,
            ("/memorize", []) => Command::Memorize,
            ("/click", [slot, button]) => Command::Click {
                slot: parse_num(slot, "slot")?,
                button: parse_num(button, "button")?,
                item: None,
            },
            ("/click", [slot, button, item]) => Command::Click {
                slot: parse_num(slot, "slot")?,
                button: parse_num(button, "button")?,
                item: Some(parse_item(item)?),
            },
            ("/insert", [slot, item]) => Command::Insert {
                slot: parse_num(slot, "slot")?,
                item: parse_item(item)?,
            },
            ("/hold", ["-"]) => Command::Hold(None),
            ("/hold", [item]) => Command::Hold(Some(parse_item(item)?)),
            ("/clear", []) => Command::Clear,
            ("/quit" | "/exit", []) => Command::Quit,
            _ => return Err(format!("Unknown command or wrong arguments: '{line}'")),
        };
        Ok(cmd)
    }
}

fn parse_num<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, String> {
    raw.parse()
        .map_err(|_| format!("'{raw}' is not a valid {what}"))
}

fn parse_item(raw: &str) -> Result<ItemSignature, String> {
    raw.parse().map_err(|e: slotmem_types::SlotMemError| e.to_string())
}

/// REPL state beyond the session: the simulated open screen and main hand.
struct Shell {
    session: SlotMemorySession,
    player_inventory_slots: usize,
    open: Option<ContainerIdentity>,
    held: Option<ItemSignature>,
}

/// Entry point for the interactive REPL.
///
/// `shutdown` is polled each iteration; when set the REPL exits and hands the
/// session back for the final flush.
pub fn run(
    session: SlotMemorySession,
    player_inventory_slots: usize,
    shutdown: Arc<AtomicBool>,
) -> SlotMemorySession {
    let mut shell = Shell {
        session,
        player_inventory_slots,
        open: None,
        held: None,
    };
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        shell.session.tick(Instant::now());

        let prompt = match &shell.open {
            Some(id) => format!("slotmem[{}]>", id.key()),
            None => "slotmem>".to_string(),
        };
        print!("{} ", prompt.bold().cyan());
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match Command::parse(line) {
            Ok(Command::Quit) => {
                println!("{}", "Goodbye.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Ok(cmd) => shell.execute(cmd),
            Err(e) => println!(
                "{} {}. Type {} for available commands.",
                "Error:".red(),
                e.yellow(),
                "/help".bold()
            ),
        }
    }

    if let Some(id) = shell.open.take() {
        shell.session.on_container_closed(&id);
    }
    shell.session
}

// ─────────────────────────────────────────────────────────────────────────────
// Command handlers
// ─────────────────────────────────────────────────────────────────────────────

impl Shell {
    fn execute(&mut self, cmd: Command) {
        match cmd {
            Command::Help => cmd_help(),
            Command::Stats => println!("  {}", self.session.stats()),
            Command::List => self.cmd_list(),
            Command::Show(id) => self.cmd_show(&id),
            Command::Forget(id) => self.cmd_forget(&id),
            Command::Save => {
                if self.session.save_all() {
                    println!("{}", "✓ Saved.".green());
                } else {
                    println!("{}", "Nothing written (session mode or write failure).".yellow());
                }
            }
            Command::Mode(None) => {
                println!("  Mode: {}", self.session.persistence_mode().to_string().yellow());
            }
            Command::Mode(Some(mode)) => self.cmd_mode(mode),
            Command::Schema => match serde_json::to_string_pretty(&document_schema()) {
                Ok(json) => println!("{json}"),
                Err(e) => println!("{}: {}", "Schema error".red(), e),
            },
            Command::Open {
                kind,
                coordinate,
                total_slots,
            } => self.cmd_open(kind, coordinate, total_slots),
            Command::Close => match self.open.take() {
                Some(id) => {
                    self.session.on_container_closed(&id);
                    println!("  Closed {}", id.key().dimmed());
                }
                None => println!("{}", "No container is open.".yellow()),
            },
            Command::Memorize => {
                if let Some(id) = self.require_open() {
                    let on = self.session.on_toggle_memorize_mode(&id);
                    println!("  Memorize mode {}", if on { "ON".green() } else { "OFF".red() });
                }
            }
            Command::Click { slot, button, item } => {
                if let Some(id) = self.require_open() {
                    // Slot contents are not simulated.
                    let source = pick_template_source(None, item.as_ref(), self.held.as_ref());
                    if self.session.on_memorize_click(&id, slot, button, source) {
                        self.print_slot(&id, slot);
                    } else {
                        println!("{}", "Not in memorize mode; click passed through.".dimmed());
                    }
                }
            }
            Command::Insert { slot, item } => {
                if let Some(id) = self.require_open() {
                    if self.session.on_attempt_insert(&id, slot, Some(&item)) {
                        println!("  {} {} into slot {}", "accepted".green(), item, slot);
                    } else {
                        println!("  {} {} into slot {}", "rejected".red(), item, slot);
                    }
                }
            }
            Command::Hold(item) => {
                match &item {
                    Some(sig) => println!("  Holding {}", sig.to_string().yellow()),
                    None => println!("  {}", "Main hand empty.".dimmed()),
                }
                self.held = item;
            }
            Command::Clear => {
                if let Some(id) = self.require_open() {
                    self.session.on_clear_all(&id);
                    println!("{}", "✓ All templates cleared.".green());
                }
            }
            Command::Quit => {}
        }
    }

    fn cmd_list(&self) {
        let store = self.session.store();
        if store.is_empty() {
            println!("  {}", "No containers remembered.".dimmed());
            return;
        }
        for id in store.identities() {
            if let Some(record) = store.get(id) {
                let marker = if record.memorize_mode { "●" } else { " " };
                println!(
                    "  {} {}  {}/{} slots",
                    marker.green(),
                    id.bold(),
                    record.templated_count(),
                    record.slots.len()
                );
            }
        }
    }

    fn cmd_show(&self, id: &str) {
        let Some(record) = self.session.store().get(id) else {
            println!("{} '{}'", "Unknown container:".red(), id.yellow());
            return;
        };
        println!("{}", id.bold().underline());
        println!(
            "  memorize: {}  modified: {}",
            record.memorize_mode,
            record.last_modified.to_string().dimmed()
        );
        for (i, slot) in record.slots.iter().enumerate() {
            match slot {
                Some(sig) => println!("  {:>3}  {}", i, sig.to_string().yellow()),
                None => println!("  {:>3}  {}", i, "·".dimmed()),
            }
        }
    }

    fn cmd_forget(&mut self, id: &str) {
        if !self.session.store().contains(id) {
            println!("{} '{}'", "Unknown container:".red(), id.yellow());
            return;
        }
        self.session.forget(id);
        println!("{} {}", "✓ Forgot".green(), id.bold());
    }

    fn cmd_mode(&mut self, mode: PersistenceMode) {
        self.session.set_persistence_mode(mode);
        // Rebinding may have changed the open container's key.
        if self.open.is_some() {
            self.open = self.session.open_containers().first().map(|id| (*id).clone());
        }
        println!("{} {}", "✓ Mode set to".green(), mode.to_string().bold());
    }

    fn cmd_open(&mut self, kind: ContainerKind, coordinate: SpatialCoordinate, total_slots: usize) {
        if let Some(previous) = self.open.take() {
            self.session.on_container_closed(&previous);
        }
        let slot_count = container_slot_count(total_slots, self.player_inventory_slots);
        let id = self.session.on_container_opened(ContainerOpened {
            kind,
            coordinate: Some(coordinate),
            screen_type_tag: "GenericContainerScreen".to_string(),
            session_id: next_session_id(),
            slot_count,
        });
        println!("  Opened {} ({} container slots)", id.key().bold(), slot_count);
        self.open = Some(id);
    }

    fn require_open(&self) -> Option<ContainerIdentity> {
        if self.open.is_none() {
            println!("{} Use {} first.", "No container is open.".yellow(), "/open".bold());
        }
        self.open.clone()
    }

    fn print_slot(&self, id: &ContainerIdentity, slot: usize) {
        match self.session.template(id, slot) {
            Some(sig) => println!("  slot {} ← {}", slot, sig.to_string().yellow()),
            None => println!("  slot {} ← {}", slot, "any".dimmed()),
        }
    }
}

fn next_session_id() -> i32 {
    use std::sync::atomic::AtomicI32;
    static NEXT: AtomicI32 = AtomicI32::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

fn cmd_help() {
    println!();
    println!("{}", "Slot Memory Commands".bold().underline());
    println!("  {}                 – container and template counts", "/stats".bold().cyan());
    println!("  {}                  – remembered containers", "/list".bold().cyan());
    println!("  {}             – slot templates of one container", "/show <id>".bold().cyan());
    println!("  {}           – delete a container's memory", "/forget <id>".bold().cyan());
    println!("  {}                  – write the data file now", "/save".bold().cyan());
    println!("  {} – show or switch persistence", "/mode [persistent|session]".bold().cyan());
    println!("  {}                – JSON Schema of the data file", "/schema".bold().cyan());
    println!();
    println!("{}", "Host Simulation".bold().underline());
    println!("  {}", "/open <kind> <dim> <x> <y> <z> <total_slots>".bold().cyan());
    println!("  {}                 – close the open container", "/close".bold().cyan());
    println!("  {}              – toggle memorize mode", "/memorize".bold().cyan());
    println!("  {}         – set or empty the main hand", "/hold <item|->".bold().cyan());
    println!("  {} – 0 remembers, 1 clears", "/click <slot> <button> [item]".bold().cyan());
    println!("  {}    – would the item be accepted?", "/insert <slot> <item>".bold().cyan());
    println!("  {}                 – clear every template", "/clear".bold().cyan());
    println!("  {}          – flush and exit", "/quit  /exit".bold().cyan());
    println!();
}
