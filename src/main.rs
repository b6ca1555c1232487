pub mod cache;
pub mod config;
pub mod declare;
pub mod error;
pub mod logging;
pub mod upstream;
pub mod util;
pub mod web;

#[cfg(test)]
mod stub;

use crate::config::SETTINGS;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    logging::info_file_async(format!(
        "SETTINGS.system: {:?}\r\nSETTINGS.finnhub: {:?}",
        SETTINGS.system, SETTINGS.finnhub
    ));

    if let Err(why) = web::start().await {
        logging::error_file_async(format!("Failed to start the relay because {:?}", why));
        logging::error_console(format!("Failed to start the relay because {:?}", why));
        return Err(why);
    }

    Ok(())
}
