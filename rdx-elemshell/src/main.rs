use anyhow::Result;
use chrono::Local;
use colored::Colorize;
use elementum::prelude::*;
use elementum::{ENGINE_NAME, VERSION as LIB_VERSION};
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::cell::Cell;
use std::env;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commands the shell understands, in `help` order.
const COMMANDS: [&str; 15] = [
    "tap", "swipe", "hold", "remove", "anti", "ad", "background", "save", "export", "import",
    "status", "listen", "subs", "help", "exit",
];

/// Colors the command word by whether the shell knows it; JSON after
/// `import` is dimmed so long snapshots stay readable.
#[derive(Completer, Helper, Hinter, Validator)]
struct CommandHighlighter;

impl Highlighter for CommandHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let colored_command = if COMMANDS.contains(&command) {
            command.yellow().bold()
        } else {
            command.red()
        };
        if rest.is_empty() && !line.ends_with(' ') {
            return Cow::Owned(colored_command.to_string());
        }
        let colored_rest = if command == "import" { rest.dimmed() } else { rest.normal() };
        Cow::Owned(format!("{} {}", colored_command, colored_rest))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

/// Everything one shell session drives.
struct Session {
    hub: EventHub,
    clock: Rc<GlobalClock>,
    core: CoreLoopController,
    pause: PauseCoordinator,
    persistence: PersistenceService,
}

/// Prints the logo and where this session keeps its progress. Silenced by
/// `QUIET_MODE`.
fn print_banner(config: &ElementumConfig) {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    const LOGO_TEXT: &str = include_str!("../logo.log");
    let rule = "-".repeat(72).dimmed();

    println!("{}", LOGO_TEXT.cyan());
    println!("{}", rule);
    println!("  elemshell v{}  |  {} v{}", SHELL_VERSION, ENGINE_NAME, LIB_VERSION);
    println!("  Progress:  {}", config.progress_store().location().green());
    println!("  Cloud key: {}", config.save.cloud_key.cyan());
    println!(
        "  Run:       target mass {}, {} per tap",
        config.core_loop.target_mass, config.core_loop.mass_per_tap
    );
    println!("{}", rule);
}

/// Subscribes printing handlers for every topic. `Tap` and `MassChanged`
/// traffic is only printed while `listening` is on.
fn register_event_listeners(hub: &EventHub, listening: Rc<Cell<bool>>) -> Vec<Subscription> {
    let mut listeners = Vec::new();
    for topic in Topic::ALL {
        let listening = listening.clone();
        listeners.push(hub.on(topic, move |event| {
            let line = match event {
                GameEvent::GestureTap { .. } | GameEvent::MassChanged { .. } => {
                    if !listening.get() {
                        return;
                    }
                    format!("<-- [{}] {:?}", topic, event).dimmed()
                }
                GameEvent::StateChanged { state } => format!("<-- [STATE] {}", state).cyan().bold(),
                GameEvent::MilestoneRequested { checkpoint_percent } => {
                    format!("<-- [MILESTONE] Pick a card at {}%", checkpoint_percent).magenta()
                }
                GameEvent::CollapseStarted => "<-- [COLLAPSE] The element is collapsing!".red().bold(),
                GameEvent::WinReached => "<-- [WIN] Target mass reached!".green().bold(),
                GameEvent::SaveRequested => "<-- [SAVE] Save requested.".blue(),
                _ => format!("<-- [{}] {:?}", topic, event).normal(),
            };
            println!("{}", line);
        }));
    }
    listeners
}

fn print_status(session: &Session) {
    let record = session.persistence.record();
    let last_saved = session
        .persistence
        .last_saved_at()
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());

    println!("{}", "Run:".bold());
    println!("  State:        {}", session.core.state());
    println!(
        "  Mass:         {} ({:.1}%)",
        session.core.current_mass(),
        session.core.progress() * 100.0
    );
    println!("  Antis:        {}", session.core.active_anti_count());
    println!(
        "  Ad paused:    {} (time scale {}, audio {})",
        session.pause.is_paused(),
        session.clock.time_scale(),
        if session.clock.audio_paused() { "muted" } else { "on" }
    );
    println!("{}", "Progress:".bold());
    println!("  Best mass:    {}", record.best_mass);
    println!("  Total wins:   {}", record.total_wins);
    println!("  Star dust:    {}", record.star_dust);
    println!("  Element:      {}", record.last_element_id);
    println!(
        "  Stored at:    {}",
        session.persistence.location().unwrap_or_else(|| "-".to_string())
    );
    println!("  Last saved:   {}", last_saved);
}

fn print_help() {
    println!("Available commands:");
    println!("  tap [N]               - Publishes N gesture taps (default 1).");
    println!("  swipe                 - Publishes a gesture swipe.");
    println!("  hold                  - Publishes a gesture hold.");
    println!("  remove <N> [REASON]   - Removes N mass from the run.");
    println!("  anti <N>              - Sets the number of live hostile entities.");
    println!("  ad open|close|reward  - Simulates the ad SDK.");
    println!("  background            - Simulates the app going to the background.");
    println!("  save                  - Requests a save over the hub.");
    println!("  export                - Prints the cloud snapshot.");
    println!("  import <JSON>         - Applies a cloud snapshot.");
    println!("  status                - Shows the run and saved progress.");
    println!("  listen on|off         - Toggles printing of tap and mass traffic.");
    println!("  subs <TOPIC>          - Shows the subscriber count of a topic (e.g. mass-changed).");
    println!("  exit                  - Quits the shell.");
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config_path = env::args().nth(1).map(PathBuf::from);
    let config = ElementumConfig::load(config_path.as_deref())?;
    print_banner(&config);

    let hub = EventHub::new();
    let is_listening = Rc::new(Cell::new(false));
    let _listeners = register_event_listeners(&hub, is_listening.clone());

    let clock = Rc::new(GlobalClock::new());
    let persistence = PersistenceService::start(
        &hub,
        Some(config.save.clone()),
        Box::new(config.progress_store()),
    );
    let pause = PauseCoordinator::new(&hub, clock.clone());
    let mut core = CoreLoopController::new(&hub, Some(config.core_loop.clone()));
    info!("Starting {} run...", ENGINE_NAME.cyan());
    core.activate();

    let session = Session {
        hub,
        clock,
        core,
        pause,
        persistence,
    };

    let mut rl = Editor::new()?;
    rl.set_helper(Some(CommandHighlighter));

    println!("{} is running. Type 'help' for commands or 'exit' to quit.", ENGINE_NAME.cyan());

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        let readline = rl.readline(&prompt);
        match readline {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let args = line.split_whitespace().collect::<Vec<_>>();

                if let Some(command) = args.first() {
                    match *command {
                        "tap" => {
                            let count = match args.get(1).map(|n| n.parse::<u32>()) {
                                None => 1,
                                Some(Ok(count)) => count,
                                Some(Err(_)) => {
                                    println!("Error: tap count must be a positive number.");
                                    continue;
                                }
                            };
                            for _ in 0..count {
                                session.hub.publish(GameEvent::GestureTap {
                                    position: ScreenPoint::default(),
                                });
                            }
                            println!("--> Mass is now {}.", session.core.current_mass());
                        }
                        "swipe" => session.hub.publish(GameEvent::GestureSwipe {
                            start: ScreenPoint::new(0.0, 0.0),
                            end: ScreenPoint::new(120.0, 0.0),
                            duration_secs: 0.15,
                        }),
                        "hold" => session.hub.publish(GameEvent::GestureHold {
                            position: ScreenPoint::default(),
                            duration_secs: 0.8,
                        }),
                        "remove" => {
                            if let Some(amount_str) = args.get(1) {
                                if let Ok(amount) = amount_str.parse::<i64>() {
                                    let reason = args.get(2).copied().unwrap_or("shell");
                                    session.core.remove_mass(amount, reason);
                                    println!("--> Mass is now {}.", session.core.current_mass());
                                } else {
                                    println!("Error: '{}' is not a valid amount.", amount_str);
                                }
                            } else {
                                println!("Usage: remove <N> [REASON]");
                            }
                        }
                        "anti" => {
                            if let Some(Ok(count)) = args.get(1).map(|n| n.parse::<i64>()) {
                                session.core.set_active_anti_count(count);
                                println!("--> {} hostile entities alive.", session.core.active_anti_count());
                            } else {
                                println!("Usage: anti <N>");
                            }
                        }
                        "ad" => match args.get(1) {
                            Some(&"open") => session.pause.notify_ad_opened(),
                            Some(&"close") => session.pause.notify_ad_closed(),
                            Some(&"reward") => session.pause.notify_reward_granted(),
                            _ => println!("Usage: ad open|close|reward"),
                        },
                        "background" => session.persistence.enter_background(),
                        "save" => session.hub.publish(GameEvent::SaveRequested),
                        "export" => {
                            let snapshot = session.persistence.export_snapshot();
                            let key = session.persistence.cloud_key().unwrap_or_default();
                            println!("--> [{}] {}", key.cyan(), snapshot);
                        }
                        "import" => {
                            let snapshot = line.trim().strip_prefix("import").unwrap_or_default();
                            if session.persistence.import_snapshot(snapshot) {
                                println!("--> Snapshot applied.");
                            } else {
                                println!("--> Error: snapshot rejected.");
                            }
                        }
                        "status" => print_status(&session),
                        "subs" => match args.get(1).map(|name| name.parse::<Topic>()) {
                            Some(Ok(topic)) => println!(
                                "--> '{}' has {} subscriber(s).",
                                topic,
                                session.hub.subscriber_count(topic)
                            ),
                            Some(Err(e)) => println!("Error: {}", e),
                            None => println!("Usage: subs <TOPIC>"),
                        },
                        "listen" => match args.get(1) {
                            Some(&"on") => {
                                is_listening.set(true);
                                println!("--> Started printing tap and mass traffic.");
                            }
                            Some(&"off") => {
                                is_listening.set(false);
                                println!("--> Stopped printing tap and mass traffic.");
                            }
                            _ => println!("Usage: listen on|off"),
                        },
                        "help" => print_help(),
                        "exit" => break,
                        _ => println!("Unknown command: '{}'. Type 'help'.", line),
                    }
                }
            }
            Err(_) => {
                println!("Exiting elemshell...");
                break;
            }
        }
    }

    session.pause.shutdown();
    session.persistence.enter_background();
    session.hub.teardown();
    Ok(())
}
