//! Campus placement job board: recruiters post jobs, students browse the postings they
//! are eligible for and apply, and postings expire once their deadline passes.

mod cli;
pub mod config;
pub mod error;
pub mod infra;
pub mod placement;
pub mod routes;
mod server;
pub mod telemetry;

use error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
