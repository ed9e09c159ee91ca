use crate::calendar::parse_date_key;
use crate::errors::AppError;
use crate::models::{RaceDays, RaceIndex, RacePredictions, SiteData};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, warn};

pub const RACE_DAYS_FILE: &str = "racedays.json";
pub const RACE_INDEX_FILE: &str = "race_index.json";
pub const PREDICTIONS_FILE: &str = "predictions.json";
pub const RACES_DIR: &str = "races";

pub async fn load_site_data(dir: &Path) -> SiteData {
    SiteData {
        race_days: load_race_days(&dir.join(RACE_DAYS_FILE)).await,
        race_index: load_json::<RaceIndex>(&dir.join(RACE_INDEX_FILE)).await,
        predictions: load_json::<RacePredictions>(&dir.join(PREDICTIONS_FILE)).await,
    }
}

/// Missing or unreadable files fall back to the type's default.
async fn load_json<T: DeserializeOwned + Default>(path: &Path) -> T {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse {}: {err}", path.display());
                T::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => T::default(),
        Err(err) => {
            error!("failed to read {}: {err}", path.display());
            T::default()
        }
    }
}

pub async fn load_race_days(path: &Path) -> RaceDays {
    let raw: Vec<String> = load_json(path).await;
    raw.into_iter()
        .filter(|key| {
            let valid = parse_date_key(key).is_some();
            if !valid {
                warn!("skipping invalid race day {key:?} in {}", path.display());
            }
            valid
        })
        .collect()
}

pub async fn persist_race_days(dir: &Path, race_days: &RaceDays) -> Result<(), AppError> {
    fs::create_dir_all(dir).await?;
    let payload = serde_json::to_vec_pretty(race_days)?;
    fs::write(dir.join(RACE_DAYS_FILE), payload).await?;
    Ok(())
}

/// Location of a per-race predictions fixture, e.g. `races/20240115/東京_r11.json`
/// for the page `東京_r11.html`. Returns `None` for names that could escape the
/// data directory.
pub fn race_page_path(dir: &Path, date: &str, page: &str) -> Option<PathBuf> {
    let stem = page.strip_suffix(".html")?;
    if stem.is_empty() || stem.starts_with('.') || stem.contains(['/', '\\']) {
        return None;
    }
    parse_date_key(date)?;
    Some(dir.join(RACES_DIR).join(date).join(format!("{stem}.json")))
}

pub async fn load_race_page(path: &Path) -> Result<RacePredictions, AppError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::not_found("race page not found"));
        }
        Err(err) => return Err(AppError::internal(err)),
    };
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(label: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("race_site_{label}_{}_{nanos}", std::process::id()))
    }

    #[tokio::test]
    async fn missing_files_load_as_empty() {
        let data = load_site_data(&temp_dir("missing")).await;
        assert!(data.race_days.is_empty());
        assert!(data.race_index.is_empty());
        assert!(data.predictions.predictions.is_empty());
    }

    #[tokio::test]
    async fn invalid_race_days_are_skipped() {
        let dir = temp_dir("invalid");
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join(RACE_DAYS_FILE), r#"["20240115", "2024-01-16", "20240230"]"#)
            .await
            .unwrap();

        let data = load_site_data(&dir).await;
        assert_eq!(data.race_days.to_vec(), vec!["20240115".to_string()]);
        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn malformed_json_degrades_to_default() {
        let dir = temp_dir("malformed");
        fs::create_dir_all(&dir).await.unwrap();
        fs::write(dir.join(RACE_INDEX_FILE), "{not json").await.unwrap();

        let data = load_site_data(&dir).await;
        assert!(data.race_index.is_empty());
        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn persisted_race_days_reload() {
        let dir = temp_dir("persist");
        let days: RaceDays = ["20240301".to_string(), "20240102".to_string()]
            .into_iter()
            .collect();
        persist_race_days(&dir, &days).await.unwrap();

        let reloaded = load_race_days(&dir.join(RACE_DAYS_FILE)).await;
        assert_eq!(reloaded, days);
        let _ = fs::remove_dir_all(&dir).await;
    }

    #[test]
    fn race_page_path_rejects_traversal() {
        let dir = Path::new("data");
        assert_eq!(
            race_page_path(dir, "20240115", "東京_r11.html"),
            Some(PathBuf::from("data/races/20240115/東京_r11.json"))
        );
        assert_eq!(race_page_path(dir, "20240115", "..html"), None);
        assert_eq!(race_page_path(dir, "20240115", "東京_r11.json"), None);
        assert_eq!(race_page_path(dir, "../etc", "x.html"), None);
    }
}
