// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Print the drift report between `users` and `students`.
//!
//! Usage: `GCP_PROJECT_ID=my-project sync-report`
//!
//! Exits with status 1 when the collections are out of sync. Never writes.

use school_portal::db::FirestoreDb;
use school_portal::services::sync_check::sync_report;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let project_id = std::env::var("GCP_PROJECT_ID").map_err(|_| "GCP_PROJECT_ID must be set")?;
    let db = FirestoreDb::new(&project_id).await?;
    let report = sync_report(&db).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(if report.in_sync() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
