mod cli;
mod infra;
mod routes;
mod server;

use contact_relay::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
