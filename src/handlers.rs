use crate::calendar::{build_grid, parse_date_key, MonthRef};
use crate::errors::AppError;
use crate::models::{
    AddRaceDayRequest, CalendarResponse, HomeQuery, MonthQuery, RaceDaysResponse, SortQuery,
};
use crate::sorting::{SortDir, SortSpec};
use crate::state::AppState;
use crate::storage::{load_race_page, persist_race_days, race_page_path};
use crate::ui::{
    adjacent_days, render_calendar_page, render_day_page, render_home, render_predictions_page,
};
use axum::{
    extract::{Path, Query, State},
    response::Html,
    Json,
};
use chrono::{Local, NaiveDate};
use tracing::info;

pub async fn home(
    State(state): State<AppState>,
    Query(query): Query<HomeQuery>,
) -> Html<String> {
    let data = state.data.lock().await;
    Html(render_home(&data.race_index, query.date.as_deref()))
}

pub async fn calendar(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Result<Html<String>, AppError> {
    let today = today();
    let month = resolve_month(&query, today)?;
    let data = state.data.lock().await;
    let grid = build_grid(month, &data.race_days);
    Ok(Html(render_calendar_page(month, &grid, today, &data.race_days)))
}

pub async fn get_calendar(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<CalendarResponse>, AppError> {
    let month = resolve_month(&query, today())?;
    let data = state.data.lock().await;
    Ok(Json(CalendarResponse {
        month,
        heading: month.heading(),
        prev: month.prev(),
        next: month.next(),
        grid: build_grid(month, &data.race_days),
    }))
}

pub async fn predictions(
    State(state): State<AppState>,
    Query(query): Query<SortQuery>,
) -> Result<Html<String>, AppError> {
    let sort = resolve_sort(&query)?;
    let data = state.data.lock().await;
    Ok(Html(render_predictions_page(&data.predictions, sort, "/predictions")))
}

pub async fn race_page(
    State(state): State<AppState>,
    Path((date, page)): Path<(String, String)>,
    Query(query): Query<SortQuery>,
) -> Result<Html<String>, AppError> {
    if page == "index.html" {
        let data = state.data.lock().await;
        let venues = data
            .race_index
            .get(&date)
            .ok_or_else(|| AppError::not_found(format!("no races listed for {date}")))?;
        let (prev, next) = adjacent_days(&data.race_index, &date);
        return Ok(Html(render_day_page(&date, venues, prev, next)));
    }

    let sort = resolve_sort(&query)?;
    let path = race_page_path(&state.data_dir, &date, &page)
        .ok_or_else(|| AppError::not_found("race page not found"))?;
    let predictions = load_race_page(&path).await?;
    Ok(Html(render_predictions_page(&predictions, sort, &page)))
}

pub async fn get_race_days(State(state): State<AppState>) -> Json<RaceDaysResponse> {
    let data = state.data.lock().await;
    Json(RaceDaysResponse {
        race_days: data.race_days.to_vec(),
    })
}

pub async fn add_race_day(
    State(state): State<AppState>,
    Json(payload): Json<AddRaceDayRequest>,
) -> Result<Json<RaceDaysResponse>, AppError> {
    let key = payload.date.trim();
    if parse_date_key(key).is_none() {
        return Err(AppError::bad_request("date must be a valid YYYYMMDD date"));
    }

    let mut data = state.data.lock().await;
    let mut updated = data.race_days.clone();
    if updated.insert(key.to_string()) {
        // Only a set that reached disk replaces the in-memory one.
        persist_race_days(&state.data_dir, &updated).await?;
        data.race_days = updated;
        info!("added race day {key}");
    } else {
        info!("race day {key} already registered");
    }

    Ok(Json(RaceDaysResponse {
        race_days: data.race_days.to_vec(),
    }))
}

fn resolve_month(query: &MonthQuery, today: NaiveDate) -> Result<MonthRef, AppError> {
    let current = MonthRef::current(today);
    MonthRef::new(
        query.year.unwrap_or(current.year),
        query.month.unwrap_or(current.month),
    )
}

fn resolve_sort(query: &SortQuery) -> Result<Option<SortSpec>, AppError> {
    let dir = SortDir::parse(query.dir.as_deref())?;
    query
        .sort
        .map(|column| SortSpec::new(column, dir))
        .transpose()
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
