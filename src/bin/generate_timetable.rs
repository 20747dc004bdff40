// Small dev utility: run timetable generation against an existing database and print the report.
//
// Usage:
//   cargo run --bin generate_timetable -- [timetable_id] [db_path]
//
// Without a timetable_id the most recently updated DRAFT timetable is used.
// db_path defaults to CAMPUS_TIMETABLE_DB_PATH / the user data dir.

use anyhow::{anyhow, Context};
use campus_timetable::app::{get_default_db_path, AppState};
use campus_timetable::domain::types::TimetableStatus;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    campus_timetable::logging::init();

    let mut args = std::env::args().skip(1);
    let timetable_arg = args.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let db_path = args.next().unwrap_or_else(get_default_db_path);

    let state = AppState::new(db_path.clone()).map_err(|e| anyhow!(e))?;

    let timetable_id = match timetable_arg {
        Some(id) => id,
        None => state
            .timetable_api
            .list_by_status(TimetableStatus::Draft)?
            .into_iter()
            .max_by_key(|t| t.updated_at)
            .map(|t| t.timetable_id)
            .ok_or_else(|| anyhow!("No DRAFT timetable found in {} (pass timetable_id explicitly)", db_path))?,
    };

    let report = state
        .timetable_api
        .generate_timetable(&timetable_id, "generate_timetable bin")
        .await
        .with_context(|| format!("generation failed for timetable {}", timetable_id))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
