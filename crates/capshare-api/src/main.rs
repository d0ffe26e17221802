use capshare_core::Config;

// Use mimalloc as the global allocator for better performance and lower fragmentation,
// especially when running on musl-based systems inside containers.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let app = capshare_api::setup::initialize_app(config).await?;

    capshare_api::setup::server::start_server(&app.state.config, app.router, app.reaper).await?;

    Ok(())
}
