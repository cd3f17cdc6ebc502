mod cli;
mod infra;
mod predict;
mod routes;
mod server;

use admission_match::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
