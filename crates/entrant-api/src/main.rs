use entrant_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    // Validation, tracing, storage, services, routes
    let (_state, router) = entrant_api::setup::initialize_app(config.clone()).await?;

    entrant_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
