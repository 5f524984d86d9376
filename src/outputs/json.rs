//! JSON edition export.
//!
//! Files land at `{json_output_dir}/{date}/{time_of_day}.json`.
//!
//! # Evening Edge Case
//!
//! An "evening" run that slips past midnight (the clock reads 23:59:59 or
//! later by the time it writes) files under the previous day so the edition
//! stays grouped with the day whose news it carries.

use chrono::{Duration, Local, NaiveDate, NaiveTime};
use std::error::Error;
use tokio::fs;
use tracing::{error, info, instrument};

use super::Edition;

/// Write an [`Edition`] to its date-keyed JSON file.
///
/// # Output Path
///
/// `{json_output_dir}/{date}/{time_of_day}.json`
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_edition(
    edition: &Edition,
    json_output_dir: &str,
) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string(edition)?;

    let today = Local::now().date_naive();
    let file_date = resolve_edition_date(&edition.time_of_day, Local::now().time(), today)
        .map(|d| d.to_string())
        .unwrap_or_else(|| edition.local_date.clone());

    let full_json_dir = format!("{json_output_dir}/{file_date}");
    info!(%full_json_dir, "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&full_json_dir).await {
        error!(%full_json_dir, error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let output_json_filename = format!("{full_json_dir}/{}.json", edition.time_of_day);
    info!(path = %output_json_filename, "Writing JSON");
    fs::write(&output_json_filename, json).await?;
    info!(path = %output_json_filename, "Wrote edition JSON");

    Ok(())
}

/// The date an edition should file under, given the wall clock.
///
/// Returns `None` when the edition's own date should be used as-is.
pub(crate) fn resolve_edition_date(
    time_of_day: &str,
    now: NaiveTime,
    today: NaiveDate,
) -> Option<NaiveDate> {
    let midnight = NaiveTime::from_hms_opt(23, 59, 59).unwrap();
    if time_of_day == "evening" && now >= midnight {
        Some(today - Duration::days(1))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evening_at_midnight_boundary_files_yesterday() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let late = NaiveTime::from_hms_opt(23, 59, 59).unwrap();
        assert_eq!(
            resolve_edition_date("evening", late, today),
            Some(NaiveDate::from_ymd_opt(2026, 8, 5).unwrap())
        );
    }

    #[test]
    fn test_normal_runs_keep_their_date() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();
        let evening = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
        assert_eq!(resolve_edition_date("evening", evening, today), None);

        let late = NaiveTime::from_hms_opt(23, 59, 59).unwrap();
        assert_eq!(resolve_edition_date("morning", late, today), None);
    }

    #[tokio::test]
    async fn test_write_edition_creates_dated_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_str().unwrap();
        let edition = Edition {
            local_date: Local::now().date_naive().to_string(),
            time_of_day: "morning".to_string(),
            local_time: "07:00:00".to_string(),
            articles: vec![],
        };

        write_edition(&edition, dir).await.unwrap();

        let path = format!("{dir}/{}/morning.json", edition.local_date);
        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: Edition = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed.time_of_day, "morning");
    }
}
