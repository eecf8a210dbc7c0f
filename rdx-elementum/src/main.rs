use anyhow::Result;
use elementum::prelude::*;
use elementum::{ENGINE_NAME, VERSION};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Real time between simulated taps.
const TAP_INTERVAL: Duration = Duration::from_millis(50);
/// How long the simulated ad stays on screen.
const AD_LENGTH: Duration = Duration::from_secs(2);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize structured logging. `RUST_LOG` overrides the default level.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    // 2. Load configuration from the optional path argument.
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ElementumConfig::load(config_path.as_deref())?;
    info!("{} v{} starting with {:?}", ENGINE_NAME, VERSION, config.core_loop);

    // 3. Create the hub and the components of the run.
    let hub = EventHub::new();
    let clock = Rc::new(GlobalClock::new());
    let persistence = PersistenceService::start(
        &hub,
        Some(config.save.clone()),
        Box::new(config.progress_store()),
    );
    let pause = PauseCoordinator::new(&hub, clock.clone());

    // 4. Subscribe the log listeners before the run starts.
    let won = Rc::new(Cell::new(false));
    let _listeners = register_event_listeners(&hub, won.clone());

    let mut core = CoreLoopController::new(&hub, Some(config.core_loop.clone()));
    core.activate();

    // 5. Drive the run until it is won or Ctrl+C arrives.
    run_simulation(&hub, &clock, &core, &pause, &won).await;

    // 6. Save on the way out and clear the hub before components drop.
    pause.shutdown();
    persistence.enter_background();
    info!("Final progress: {:?}", persistence.record());
    hub.teardown();
    info!("{} has shut down.", ENGINE_NAME);
    Ok(())
}

/// Subscribes a logging handler to every topic the run produces.
fn register_event_listeners(hub: &EventHub, won: Rc<Cell<bool>>) -> Vec<Subscription> {
    let mut listeners = vec![
        hub.on(Topic::StateChanged, |event| info!("[STATE] => {:?}", event)),
        hub.on(Topic::MilestoneRequested, |event| info!("[MILESTONE] => {:?}", event)),
        hub.on(Topic::CollapseStarted, |_| info!("[COLLAPSE] => The element is collapsing.")),
        hub.on(Topic::AdOpened, |_| info!("[AD] => Opened.")),
        hub.on(Topic::AdClosed, |_| info!("[AD] => Closed.")),
        hub.on(Topic::RewardGranted, |_| info!("[AD] => Reward granted.")),
        hub.on(Topic::WinReached, move |_| {
            info!("[WIN] => Target mass reached.");
            won.set(true);
        }),
    ];
    listeners.push(hub.on(Topic::MassChanged, |event| {
        if let GameEvent::MassChanged { mass, reason, .. } = event {
            if mass % 10 == 0 || reason != "tap" {
                info!("[MASS] => {} ({})", mass, reason);
            }
        }
    }));
    listeners
}

/// Publishes a tap on every tick while game time runs, with one ad break and
/// a wave of hostile entities along the way.
async fn run_simulation(
    hub: &EventHub,
    clock: &GlobalClock,
    core: &CoreLoopController,
    pause: &PauseCoordinator,
    won: &Cell<bool>,
) {
    let mut ticker = tokio::time::interval(TAP_INTERVAL);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let target = core.snapshot().map_or(0, |machine| machine.config().target_mass);
    let mut ad_break: Option<Instant> = None;
    let mut ad_shown = false;
    let mut antis_spawned = false;
    let mut game_time = Duration::ZERO;

    info!("Simulation running. Press Ctrl+C to shut down.");
    loop {
        tokio::select! {
            biased;
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("Shutdown signal received.");
                break;
            }
            _ = ticker.tick() => {
                game_time += clock.scaled(TAP_INTERVAL);

                if let Some(until) = ad_break {
                    if Instant::now() >= until {
                        pause.notify_reward_granted();
                        pause.notify_ad_closed();
                        ad_break = None;
                        info!("Game time so far: {:?}", game_time);
                    }
                    continue;
                }

                let mass = core.current_mass();
                if !ad_shown && mass * 2 >= target {
                    ad_shown = true;
                    ad_break = Some(Instant::now() + AD_LENGTH);
                    pause.notify_ad_opened();
                    continue;
                }
                if !antis_spawned && core.state() == GameState::Collapse {
                    antis_spawned = true;
                    core.set_active_anti_count(3);
                }
                if antis_spawned && mass >= target && core.active_anti_count() > 0 {
                    // One hostile entity destroyed per tick, each costing a little mass.
                    core.remove_mass(1, "anti-hit");
                    core.set_active_anti_count(core.active_anti_count() - 1);
                }

                hub.publish(GameEvent::GestureTap { position: ScreenPoint::default() });

                if won.get() || core.is_inert() {
                    break;
                }
            }
        }
    }
}
