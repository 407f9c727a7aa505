use channel_sheet_sync::api::build_rocket;
use channel_sheet_sync::config::{create_app_state, init_logger, load_environment};
use log::info;

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    load_environment();
    init_logger();

    let state = create_app_state()?;
    info!("Application state initialized.");

    let _rocket = build_rocket(state).launch().await?;
    Ok(())
}
