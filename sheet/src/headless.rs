//! Headless mode for the character sheet.
//!
//! A simple line protocol over stdin/stdout:
//! - Lines starting with `#` are commands
//! - Output lines are tagged (`[STATUS]`, `[ERROR]`, `[NOTICE]`, ...)

use sheet_core::character_builder::STANDARD_ARRAY;
use sheet_core::{
    Attribute, Character, CharacterBuilder, CharacterClass, CharacterId, CharacterStore, Skill,
    Tab,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// A parsed headless command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    New { class: CharacterClass, name: String },
    Load(String),
    Status,
    Damage(i32),
    Heal(i32),
    Sanity(i32),
    Equip(String),
    Unequip(String),
    Spend { resource: String, amount: i32 },
    Restore { resource: String, amount: i32 },
    Xp(i64),
    LevelUp,
    Rest { long: bool },
    Export(PathBuf),
    Import(PathBuf),
    Delete(Option<String>),
    Tab(Option<Tab>),
    Help,
    Quit,
}

const HELP: &[&str] = &[
    "  #list                       - List saved characters",
    "  #new <class> <name>         - Create a character from the standard array",
    "  #load <id|name>             - Open a saved character",
    "  #status                     - Show the open character",
    "  #damage <n> / #heal <n>     - Adjust hit points",
    "  #sanity <+/-n>              - Adjust sanity",
    "  #equip <item> / #unequip <item>",
    "  #spend <resource> [n] / #restore <resource> [n]",
    "  #xp <n>                     - Add experience",
    "  #levelup                    - Level up when experience allows",
    "  #rest short|long            - Take a rest",
    "  #export <path> / #import <path>",
    "  #delete [id|name]           - Delete a character (default: the open one)",
    "  #tab [name]                 - Show or switch the sheet tab",
    "  #help                       - Show this help",
    "  #quit                       - Exit",
];

fn number<T: std::str::FromStr>(arg: Option<&str>, usage: &str) -> Result<T, String> {
    arg.and_then(|a| a.trim_start_matches('+').parse().ok())
        .ok_or_else(|| format!("Usage: {usage}"))
}

fn rest_of(parts: &[&str], usage: &str) -> Result<String, String> {
    if parts.is_empty() {
        return Err(format!("Usage: {usage}"));
    }
    Ok(parts.join(" "))
}

/// Split a `<name...> [n]` argument list, defaulting the count to 1.
fn name_and_count(parts: &[&str], usage: &str) -> Result<(String, i32), String> {
    match parts.split_last() {
        Some((last, init)) if !init.is_empty() => match last.parse::<i32>() {
            Ok(n) => Ok((init.join(" "), n)),
            Err(_) => Ok((parts.join(" "), 1)),
        },
        Some(_) => Ok((parts.join(" "), 1)),
        None => Err(format!("Usage: {usage}")),
    }
}

/// Parse one `#` command line.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let Some(body) = line.trim().strip_prefix('#') else {
        return Err("Commands start with '#'. Type #help for help.".to_string());
    };
    let parts: Vec<&str> = body.split_whitespace().collect();
    let Some((&head, args)) = parts.split_first() else {
        return Err("Empty command. Type #help for help.".to_string());
    };

    match head.to_lowercase().as_str() {
        "list" => Ok(Command::List),
        "new" => {
            let usage = "#new <class> <name>";
            let class = args
                .first()
                .and_then(|c| CharacterClass::from_id(c))
                .ok_or_else(|| format!("Usage: {usage}"))?;
            let name = rest_of(&args[1..], usage)?;
            Ok(Command::New { class, name })
        }
        "load" => Ok(Command::Load(rest_of(args, "#load <id|name>")?)),
        "status" => Ok(Command::Status),
        "damage" => Ok(Command::Damage(number(args.first().copied(), "#damage <n>")?)),
        "heal" => Ok(Command::Heal(number(args.first().copied(), "#heal <n>")?)),
        "sanity" => Ok(Command::Sanity(number(args.first().copied(), "#sanity <+/-n>")?)),
        "equip" => Ok(Command::Equip(rest_of(args, "#equip <item>")?)),
        "unequip" => Ok(Command::Unequip(rest_of(args, "#unequip <item>")?)),
        "spend" => {
            let (resource, amount) = name_and_count(args, "#spend <resource> [n]")?;
            Ok(Command::Spend { resource, amount })
        }
        "restore" => {
            let (resource, amount) = name_and_count(args, "#restore <resource> [n]")?;
            Ok(Command::Restore { resource, amount })
        }
        "xp" => Ok(Command::Xp(number(args.first().copied(), "#xp <n>")?)),
        "levelup" => Ok(Command::LevelUp),
        "rest" => match args.first().map(|a| a.to_lowercase()).as_deref() {
            Some("short") => Ok(Command::Rest { long: false }),
            Some("long") => Ok(Command::Rest { long: true }),
            _ => Err("Usage: #rest short|long".to_string()),
        },
        "export" => Ok(Command::Export(rest_of(args, "#export <path>")?.into())),
        "import" => Ok(Command::Import(rest_of(args, "#import <path>")?.into())),
        "delete" => Ok(Command::Delete(rest_of(args, "").ok())),
        "tab" => match args.first() {
            None => Ok(Command::Tab(None)),
            Some(name) => Tab::from_name(name)
                .map(|tab| Command::Tab(Some(tab)))
                .ok_or_else(|| format!("Unknown tab '{name}'")),
        },
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        _ => Err("Unknown command. Type #help for help.".to_string()),
    }
}

/// Build a level 1 character with the standard array in attribute order and
/// the first class skills.
fn quick_character(class: CharacterClass, name: &str) -> Result<Character, String> {
    let [strength, dexterity, constitution, intelligence, wisdom, charisma] = Attribute::all();
    let [a, b, c, d, e, f] = STANDARD_ARRAY;
    let data = class.data();
    let skills: Vec<Skill> = data.skill_options.iter().copied().take(data.skill_count).collect();
    CharacterBuilder::new()
        .name(name)
        .race("Human")
        .class(class)
        .standard_array([
            (a, strength),
            (b, dexterity),
            (c, constitution),
            (d, intelligence),
            (e, wisdom),
            (f, charisma),
        ])
        .skills(skills)
        .build()
        .map_err(|e| e.to_string())
}

/// Match a roster entry by exact id, then by case-insensitive name.
fn resolve_character(store: &CharacterStore, key: &str) -> Option<CharacterId> {
    let roster = store.roster();
    roster
        .iter()
        .find(|p| p.id.as_str() == key)
        .or_else(|| roster.iter().find(|p| p.name.eq_ignore_ascii_case(key)))
        .map(|p| p.id.clone())
}

fn resolve_item(character: &Character, key: &str) -> Option<String> {
    character
        .inventory
        .iter()
        .find(|i| i.id == key)
        .or_else(|| character.inventory.iter().find(|i| i.name.eq_ignore_ascii_case(key)))
        .map(|i| i.id.clone())
}

fn resolve_resource(character: &Character, key: &str) -> Option<String> {
    character
        .resources
        .iter()
        .find(|r| r.id == key)
        .or_else(|| character.resources.iter().find(|r| r.name.eq_ignore_ascii_case(key)))
        .map(|r| r.id.clone())
}

fn print_status(character: &Character) {
    println!("[STATUS]");
    println!(
        "  {} - level {} {} ({})",
        character.name,
        character.level,
        if character.class.is_empty() { "adventurer" } else { character.class.as_str() },
        character.id
    );
    println!(
        "  HP: {}/{} (+{} temp)  AC: {}  Sanity: {}/{}",
        character.current_hp,
        character.effective_max_hp(),
        character.temp_hp,
        character.armor_class,
        character.sanity,
        character.max_sanity
    );
    println!(
        "  XP: {}  Proficiency: +{}",
        character.experience, character.proficiency_bonus
    );
    for resource in &character.resources {
        println!("  {}: {}/{}", resource.name, resource.current, resource.max);
    }
    let equipped: Vec<&str> = character
        .inventory
        .iter()
        .filter(|i| i.equipped)
        .map(|i| i.name.as_str())
        .collect();
    if !equipped.is_empty() {
        println!("  Equipped: {}", equipped.join(", "));
    }
    if let Some(entry) = character.history.latest() {
        println!("  Last: {}", entry.message);
    }
}

/// Outcome of one command.
enum Flow {
    Continue,
    Quit,
}

async fn execute(store: &mut CharacterStore, command: Command) -> Flow {
    // Commands that need an open character.
    let active = store.active().cloned();
    let needs_active = !matches!(
        command,
        Command::List
            | Command::New { .. }
            | Command::Load(_)
            | Command::Import(_)
            | Command::Delete(Some(_))
            | Command::Tab(_)
            | Command::Help
            | Command::Quit
    );
    if needs_active && active.is_none() {
        println!("[ERROR] No character is open. Use #new or #load.");
        return Flow::Continue;
    }

    match command {
        Command::List => {
            if store.roster().is_empty() {
                println!("[LIST] No saved characters");
            }
            for preview in store.roster() {
                println!(
                    "[LIST] {} - {} (level {} {}) HP {}/{}",
                    preview.id,
                    preview.name,
                    preview.level,
                    preview.class,
                    preview.current_hp,
                    preview.max_hp
                );
            }
        }
        Command::New { class, name } => match quick_character(class, &name) {
            Ok(character) => {
                let id = store.create(character).await;
                println!("[CREATED] {name} ({id})");
            }
            Err(e) => println!("[ERROR] {e}"),
        },
        Command::Load(key) => match resolve_character(store, &key) {
            Some(id) => match store.load(&id).await {
                Some(character) => print_status(character),
                None => println!("[ERROR] Could not load '{key}'"),
            },
            None => println!("[ERROR] No character matches '{key}'"),
        },
        Command::Status => {
            if let Some(character) = store.active() {
                print_status(character);
            }
        }
        Command::Damage(n) => store.damage(n).await,
        Command::Heal(n) => store.heal(n).await,
        Command::Sanity(delta) => store.adjust_sanity(delta).await,
        Command::Equip(key) => match active.as_ref().and_then(|c| resolve_item(c, &key)) {
            Some(id) => store.equip(id).await,
            None => println!("[ERROR] No item matches '{key}'"),
        },
        Command::Unequip(key) => match active.as_ref().and_then(|c| resolve_item(c, &key)) {
            Some(id) => store.unequip(id).await,
            None => println!("[ERROR] No item matches '{key}'"),
        },
        Command::Spend { resource, amount } => {
            match active.as_ref().and_then(|c| resolve_resource(c, &resource)) {
                Some(id) => store.spend_resource(id, amount).await,
                None => println!("[ERROR] No resource matches '{resource}'"),
            }
        }
        Command::Restore { resource, amount } => {
            match active.as_ref().and_then(|c| resolve_resource(c, &resource)) {
                Some(id) => store.restore_resource(id, amount).await,
                None => println!("[ERROR] No resource matches '{resource}'"),
            }
        }
        Command::Xp(amount) => store.add_experience(amount).await,
        Command::LevelUp => {
            if store.level_up().await {
                let level = store.active().map(|c| c.level).unwrap_or_default();
                println!("[LEVEL] Reached level {level}");
            } else {
                println!("[LEVEL] Not enough experience to level up");
            }
        }
        Command::Rest { long: true } => store.long_rest().await,
        Command::Rest { long: false } => store.short_rest().await,
        Command::Export(path) => match store.export_file(&path).await {
            Ok(()) => println!("[EXPORTED] {}", path.display()),
            Err(e) => println!("[ERROR] Export failed: {e}"),
        },
        Command::Import(path) => match store.import_file(&path).await {
            Ok(id) => println!("[IMPORTED] {id}"),
            Err(e) => println!("[ERROR] Import failed: {e}"),
        },
        Command::Delete(key) => {
            let id = match key {
                Some(key) => resolve_character(store, &key),
                None => active.as_ref().map(|c| c.id.clone()),
            };
            match id {
                Some(id) => {
                    store.delete(&id).await;
                    println!("[DELETED] {id}");
                }
                None => println!("[ERROR] No such character"),
            }
        }
        Command::Tab(Some(tab)) => {
            store.set_tab(tab);
            println!("[TAB] {tab}");
        }
        Command::Tab(None) => println!("[TAB] {}", store.tab()),
        Command::Help => {
            println!("[HELP]");
            for line in HELP {
                println!("{line}");
            }
        }
        Command::Quit => {
            println!("Goodbye!");
            return Flow::Quit;
        }
    }
    Flow::Continue
}

/// Run the headless loop until `#quit` or end of input.
pub async fn run_headless(store: &mut CharacterStore) -> io::Result<()> {
    println!("=== Character Sheet Headless Mode ===");
    println!("Saved characters: {}", store.roster().len());
    println!("Type #help for commands.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let flow = match parse_command(line) {
            Ok(command) => execute(store, command).await,
            Err(e) => {
                println!("[ERROR] {e}");
                Flow::Continue
            }
        };

        for notice in store.drain_notices() {
            println!("[NOTICE] {notice}");
        }
        stdout.flush()?;

        if matches!(flow, Flow::Quit) {
            break;
        }
    }

    Ok(())
}
