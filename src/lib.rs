pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod pipeline;
pub(crate) mod repositories;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use crate::core::{config::Settings, state::AppState, telemetry};

pub async fn run_worker() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    let state = AppState::new(settings, db_pool);

    tracing::info!(
        environment = state.settings().runtime().environment.as_str(),
        concurrency = state.settings().worker().concurrency,
        "survey-ocr worker starting"
    );

    tasks::scheduler::run(state).await
}
