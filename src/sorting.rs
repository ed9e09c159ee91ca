use crate::errors::AppError;
use crate::models::{HorsePrediction, display_value};
use std::cmp::Ordering;

pub const COLUMNS: [&str; 9] = [
    "順位",
    "馬名",
    "馬体重",
    "増減",
    "上がり3F",
    "3F差",
    "オッズ",
    "スコア",
    "期待値",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    pub fn parse(value: Option<&str>) -> Result<Self, AppError> {
        match value.map(str::trim) {
            None | Some("") | Some("asc") => Ok(SortDir::Asc),
            Some("desc") => Ok(SortDir::Desc),
            Some(_) => Err(AppError::bad_request("dir must be 'asc' or 'desc'")),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDir::Asc => "asc",
            SortDir::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: usize,
    pub dir: SortDir,
}

impl SortSpec {
    pub fn new(column: usize, dir: SortDir) -> Result<Self, AppError> {
        if column >= COLUMNS.len() {
            return Err(AppError::bad_request(format!(
                "sort column must be below {}",
                COLUMNS.len()
            )));
        }
        Ok(Self { column, dir })
    }

    /// Direction a header link for `column` should request next.
    pub fn next_dir_for(current: Option<SortSpec>, column: usize) -> SortDir {
        match current {
            Some(spec) if spec.column == column => spec.dir.toggled(),
            _ => SortDir::Asc,
        }
    }
}

/// A table row: the 1-based position in the fixture plus the prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRow<'a> {
    pub rank: usize,
    pub horse: &'a HorsePrediction,
}

impl PredictionRow<'_> {
    pub fn cells(&self) -> [String; 9] {
        let horse = self.horse;
        [
            self.rank.to_string(),
            horse.horse.clone(),
            display_value(&horse.weight_now),
            display_value(&horse.weight_diff),
            format!("{:.2}", horse.last3f_time),
            format!("{:.2}", horse.last3f_diff),
            format!("{:.2}", horse.odds),
            display_value(&horse.score),
            format!("{:.2}", horse.expected_value),
        ]
    }

    fn cell(&self, column: usize) -> String {
        self.cells()
            .into_iter()
            .nth(column)
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

pub fn rows(predictions: &[HorsePrediction]) -> Vec<PredictionRow<'_>> {
    predictions
        .iter()
        .enumerate()
        .map(|(idx, horse)| PredictionRow { rank: idx + 1, horse })
        .collect()
}

fn parse_number(text: &str) -> Option<f64> {
    if text.is_empty() {
        return Some(0.0);
    }
    text.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Sorts rows by one column. Whether the column compares numerically is
/// decided by the first row's cell alone.
pub fn sort_rows(rows: &mut [PredictionRow<'_>], spec: SortSpec) {
    let Some(first) = rows.first() else {
        return;
    };
    let numeric = parse_number(&first.cell(spec.column)).is_some();

    rows.sort_by(|a, b| {
        let (va, vb) = (a.cell(spec.column), b.cell(spec.column));
        let ordering = if numeric {
            match (parse_number(&va), parse_number(&vb)) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            }
        } else {
            va.cmp(&vb)
        };
        match spec.dir {
            SortDir::Asc => ordering,
            SortDir::Desc => ordering.reverse(),
        }
    });
}
