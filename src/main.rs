//! TinyThreading - headless login demo
//!
//! Main entry point. Runs the same slow login through every configured
//! strategy and approach, pumping a [`MainLoop`] in place of a UI thread.
//!
//! # Execution Flow
//!
//! 1. Load settings from `TinyThreading Data/TinyThreading.yaml` and
//!    `TINYTHREADING_` environment variables
//! 2. Initialize logging → `<log_dir>/<log_prefix>.<date>`
//! 3. Create the main loop on this thread and the worker runtime
//! 4. For each strategy, build a [`Dispatcher`] and run each login approach,
//!    pumping the main loop until the login has reported back
//! 5. Print the session events, close the session after each strategy, then
//!    log a metrics summary and shut down

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tinythreading::dispatch::WorkerRuntime;
use tinythreading::models::SessionState;
use tinythreading::services::LoginService;
use tinythreading::ui::LoginController;
use tinythreading::{
    APP_NAME, ConfigManager, Dispatcher, LoginApproach, MainLoop, Metrics, StateChange,
    StateManager, Strategy, VERSION,
};
use tokio::sync::broadcast;

const CONFIG_DIR: &str = "TinyThreading Data";

fn main() -> Result<()> {
    let config_manager = ConfigManager::new(CONFIG_DIR)?;
    let settings = config_manager.load_settings()?;

    let _log_guard = tinythreading::logging::setup_from_settings(&settings.logging)?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let metrics = Arc::new(Metrics::new());
    let mut main_loop = MainLoop::with_metrics(Arc::clone(&metrics))?;
    let runtime = WorkerRuntime::new(&settings.dispatch)?;

    let state = StateManager::new();
    let mut events = state.subscribe();
    let service = Arc::new(LoginService::new(settings.demo.login_delay()));
    let timeout = settings.dispatch.callback_timeout();
    let user = settings.demo.user.as_str();

    // The synchronous approach never touches a dispatcher, so one run is enough
    let dispatched_approaches: Vec<LoginApproach> = settings
        .demo
        .approaches
        .iter()
        .copied()
        .filter(|approach| *approach != LoginApproach::Synchronous)
        .collect();

    let mut totals = Tally::default();

    if settings.demo.approaches.contains(&LoginApproach::Synchronous) {
        let controller = controller_for(
            settings.dispatch.strategy,
            &runtime,
            &main_loop,
            settings.dispatch.max_in_flight,
            &metrics,
            &service,
            &state,
        );
        println!("== synchronous ==");
        controller.login(LoginApproach::Synchronous, user)?;
        totals.add(&controller.end_session());
        print_events(&mut events);
    }

    for strategy in &settings.demo.strategies {
        let controller = controller_for(
            *strategy,
            &runtime,
            &main_loop,
            settings.dispatch.max_in_flight,
            &metrics,
            &service,
            &state,
        );

        for approach in &dispatched_approaches {
            println!("== {} / {} ==", approach, strategy);
            controller.login(*approach, user)?;

            let watched = state.clone();
            main_loop
                .run_until(|| watched.read(|s| s.logins_outstanding() == 0), timeout)
                .with_context(|| {
                    format!("Login via {} on {} did not report back", approach, strategy)
                })?;

            print_events(&mut events);
        }

        controller.dispatcher().shutdown();

        let session = controller.end_session();
        println!(
            "  {}: {} succeeded, {} failed",
            strategy, session.logins_succeeded, session.logins_failed
        );
        totals.add(&session);
        print_events(&mut events);
    }

    println!(
        "{} logins: {} succeeded, {} failed",
        totals.started, totals.succeeded, totals.failed
    );

    metrics.log_summary();
    runtime.shutdown(Duration::from_secs(5));

    tracing::info!("Application shutdown complete");
    Ok(())
}

/// Login counts summed over every closed session
#[derive(Debug, Default)]
struct Tally {
    started: usize,
    succeeded: usize,
    failed: usize,
}

impl Tally {
    fn add(&mut self, session: &SessionState) {
        self.started += session.logins_started;
        self.succeeded += session.logins_succeeded;
        self.failed += session.logins_failed;
    }
}

fn controller_for(
    strategy: Strategy,
    runtime: &WorkerRuntime,
    main_loop: &MainLoop,
    max_in_flight: usize,
    metrics: &Arc<Metrics>,
    service: &Arc<LoginService>,
    state: &StateManager,
) -> LoginController {
    let dispatcher = Dispatcher::with_metrics(
        runtime.executor(strategy),
        Arc::new(main_loop.handle()),
        max_in_flight,
        Arc::clone(metrics),
    );
    LoginController::new(dispatcher, Arc::clone(service), state.clone())
}

fn print_events(events: &mut broadcast::Receiver<StateChange>) {
    loop {
        match events.try_recv() {
            Ok(event) => println!("  {}", describe(&event)),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::warn!("Skipped {} session events", skipped);
            }
            Err(_) => break,
        }
    }
}

fn describe(event: &StateChange) -> String {
    match event {
        StateChange::LoginStarted { user } => format!("login started for {}", user),
        StateChange::ProgressShown { title, message } => {
            format!("progress: {} / {}", title, message)
        }
        StateChange::ProgressMessageChanged { message } => format!("progress: {}", message),
        StateChange::ProgressHidden => "progress hidden".to_string(),
        StateChange::AlertShown { title, message } => format!("alert: {} / {}", title, message),
        StateChange::LoginFinished { succeeded } => {
            format!("login finished, succeeded={}", succeeded)
        }
        StateChange::StateReset => "state reset".to_string(),
    }
}
