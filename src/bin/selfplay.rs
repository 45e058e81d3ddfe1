#[path = "selfplay/app/mod.rs"]
mod app;
#[path = "selfplay/args.rs"]
mod args;
#[path = "selfplay/config/mod.rs"]
mod config;
#[path = "selfplay/logging.rs"]
mod logging;
#[path = "selfplay/provider.rs"]
mod provider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}
