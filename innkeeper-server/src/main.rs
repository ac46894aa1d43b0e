use std::{env, process::ExitCode, sync::Arc};

use innkeeper_core::{Innkeeper, PgDatabase};
use innkeeper_server::{logging, run_server};
use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logger();

    let database_url = match env::var("INNKEEPER_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            error!("INNKEEPER_DATABASE_URL must be set");
            return ExitCode::FAILURE;
        }
    };

    info!("Connecting to database...");

    let database = match PgDatabase::new(&database_url).await {
        Ok(database) => database,
        Err(e) => {
            error!("Could not initialize database: {e}");
            return ExitCode::FAILURE;
        }
    };

    let innkeeper = Arc::new(Innkeeper::new(database));

    info!("Initialized successfully.");
    run_server(innkeeper).await;

    ExitCode::SUCCESS
}
