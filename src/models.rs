use crate::calendar::{Grid, MonthRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Date-keys (`YYYYMMDD`) on which at least one race is scheduled.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct RaceDays(BTreeSet<String>);

impl RaceDays {
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    /// Returns false when the key was already present.
    pub fn insert(&mut self, key: String) -> bool {
        self.0.insert(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl FromIterator<String> for RaceDays {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// date-key -> venue -> race numbers ("R1", "R2", ...)
pub type RaceIndex = BTreeMap<String, BTreeMap<String, Vec<String>>>;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HorsePrediction {
    pub horse: String,
    #[serde(default)]
    pub weight_now: Value,
    #[serde(default)]
    pub weight_diff: Value,
    pub last3f_time: f64,
    pub last3f_diff: f64,
    pub odds: f64,
    #[serde(default)]
    pub score: Value,
    pub expected_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RacePredictions {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub cource: String,
    #[serde(default)]
    pub race_num: Value,
    #[serde(default)]
    pub race_title: String,
    #[serde(default)]
    pub predictions: Vec<HorsePrediction>,
}

/// Renders a loosely typed fixture field the way it would print as text.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct SiteData {
    pub race_days: RaceDays,
    pub race_index: RaceIndex,
    pub predictions: RacePredictions,
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SortQuery {
    pub sort: Option<usize>,
    pub dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddRaceDayRequest {
    pub date: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RaceDaysResponse {
    pub race_days: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CalendarResponse {
    pub month: MonthRef,
    pub heading: String,
    pub prev: MonthRef,
    pub next: MonthRef,
    pub grid: Grid,
}
