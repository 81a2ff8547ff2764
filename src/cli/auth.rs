use crate::config::Config;
use crate::error::Result;
use crate::sheets::SheetsClient;
use tracing::info;

pub async fn execute() -> Result<()> {
    let config = Config::load()?;
    let client = SheetsClient::new(&config.sheets, &config.sync)?;
    client.verify_auth().await?;

    info!("Google Sheets authentication verified");

    Ok(())
}
