use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

use stack_orchestrator::config::OrchestratorConfig;
use stack_orchestrator::domain::execution_state::RunState;
use stack_orchestrator::infrastructure::repositories::{
    PostgresCycleSummaryRepository, PostgresExecutionStateRepository,
    PostgresTeamContextRepository,
};
use stack_orchestrator::orchestrator::{
    CommandAgentExecutor, CycleController, ExecutionStateMachine, OrchestrationObserver,
    TeamDriver, TracingObserver, WaveExecutor, WorkDetector,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = OrchestratorConfig::from_env().expect("Invalid orchestrator configuration");

    if config.team_ids.is_empty() {
        tracing::warn!("ORCHESTRATOR_TEAM_IDS not set, nothing to orchestrate");
        return;
    }

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Database connected successfully");

    let observer: Arc<dyn OrchestrationObserver> = Arc::new(TracingObserver);

    let detector = Arc::new(WorkDetector::new(
        Arc::new(PostgresTeamContextRepository::new(pool.clone())),
        config.detector_settings(),
    ));
    let executor = WaveExecutor::new(
        Arc::new(CommandAgentExecutor::new(
            config.agent_command.clone(),
            config.agent_timeout,
        )),
        observer.clone(),
        config.inter_wave_delay,
    );
    let controller = Arc::new(CycleController::new(
        detector,
        executor,
        Arc::new(PostgresCycleSummaryRepository::new(pool.clone())),
        observer.clone(),
        config.decision_policy(),
    ));
    let machine = Arc::new(ExecutionStateMachine::new(
        Arc::new(PostgresExecutionStateRepository::new(pool.clone())),
        controller.clone(),
        observer.clone(),
    ));
    let driver = Arc::new(TeamDriver::new(
        machine.clone(),
        controller,
        observer,
        config.driver_settings(),
    ));

    let mut handles = Vec::new();
    for &team_id in &config.team_ids {
        let current = match machine.current(team_id).await {
            Ok(state) => state.state,
            Err(e) => {
                tracing::error!(%team_id, error = %e, "failed to read execution state");
                continue;
            }
        };

        // Running or paused teams were left by a previous process; drive them as they are
        if matches!(current, RunState::Idle | RunState::Stopped) {
            if let Err(e) = machine.start(team_id).await {
                tracing::error!(%team_id, error = %e, "failed to start team");
                continue;
            }
        }

        tracing::info!(%team_id, "driver started");
        handles.push((team_id, driver.clone().spawn(team_id)));
    }

    let drivers = futures::future::join_all(handles.into_iter().map(|(team_id, handle)| async move {
        match handle.await {
            Ok(Ok(cycles)) => tracing::info!(%team_id, cycles, "driver finished"),
            Ok(Err(e)) => tracing::error!(%team_id, error = %e, "driver failed"),
            Err(e) => tracing::error!(%team_id, error = %e, "driver task aborted"),
        }
    }));

    tokio::pin!(drivers);

    tokio::select! {
        _ = &mut drivers => tracing::info!("all drivers finished"),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested, stopping teams");
            for &team_id in &config.team_ids {
                if let Err(e) = machine.stop(team_id).await {
                    tracing::warn!(%team_id, error = %e, "failed to stop team");
                }
            }

            // Drivers finish their current cycle before observing the stop
            let grace = config.shutdown_grace();
            tokio::select! {
                finished = tokio::time::timeout(grace, &mut drivers) => match finished {
                    Ok(_) => tracing::info!("all drivers finished"),
                    Err(_) => tracing::warn!(?grace, "drivers still running after grace period, exiting"),
                },
                _ = tokio::signal::ctrl_c() => tracing::warn!("second interrupt, exiting without waiting"),
            }
        }
    }
}
