use crate::calendar::{date_key, date_key_for, parse_date_key, CalendarCell, Grid, MonthRef};
use crate::models::{display_value, RaceDays, RaceIndex, RacePredictions};
use crate::sorting::{self, PredictionRow, SortDir, SortSpec, COLUMNS};
use chrono::NaiveDate;
use maud::{html, Markup, PreEscaped, DOCTYPE};
use std::collections::BTreeMap;
use std::ops::Bound;

const WEEKDAYS: [&str; 7] = ["月", "火", "水", "木", "金", "土", "日"];

fn weekday_class(index: usize) -> &'static str {
    match index {
        5 => "sat",
        6 => "sun",
        _ => "",
    }
}

/// Path of a race day's page, relative to a top-level page.
pub fn race_day_href(key: &str) -> String {
    format!("../races/{key}/index.html")
}

pub fn race_href(prefix: &str, venue: &str, race_no: &str) -> String {
    format!("{prefix}{venue}_{}.html", race_no.to_lowercase())
}

fn render_page(title: &str, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="ja" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (PreEscaped(PAGE_CSS)) }
            }
            body { (body) }
        }
    }
    .into_string()
}

pub fn render_calendar_grid(grid: &Grid, month: MonthRef) -> Markup {
    html! {
        table #calendar {
            tr {
                @for (idx, label) in WEEKDAYS.iter().enumerate() {
                    th class=(weekday_class(idx)) { (label) }
                }
            }
            @for week in &grid.weeks {
                tr {
                    @for cell in week {
                        @match cell {
                            CalendarCell::Empty => td {},
                            CalendarCell::Day { day, is_race_day: true } => td {
                                a href=(race_day_href(&date_key(month.year, month.month, *day))) { (day) }
                            },
                            CalendarCell::Day { day, is_race_day: false } => td { (day) },
                        }
                    }
                }
            }
        }
    }
}

pub fn render_today_banner(today: NaiveDate, race_days: &RaceDays) -> Markup {
    let key = date_key_for(today);
    html! {
        div #todayRace {
            @if race_days.contains(&key) {
                a href=(race_day_href(&key)) {
                    "本日のレースを見る (" (today.format("%Y/%m/%d")) ")"
                }
            } @else {
                p { "本日開催のレースはありません" }
            }
        }
    }
}

fn month_href(month: MonthRef) -> String {
    format!("/calendar?year={}&month={}", month.year, month.month)
}

pub fn render_calendar_page(
    month: MonthRef,
    grid: &Grid,
    today: NaiveDate,
    race_days: &RaceDays,
) -> String {
    let body = html! {
        h1 { "開催日カレンダー" }
        div.month-nav {
            a #prevMonth href=(month_href(month.prev())) { "←" }
            span #monthYear { (month.heading()) }
            a #nextMonth href=(month_href(month.next())) { "→" }
        }
        (render_calendar_grid(grid, month))
        (render_today_banner(today, race_days))
    };
    render_page("開催日カレンダー", body)
}

pub fn render_race_list(date: &str, venues: &BTreeMap<String, Vec<String>>, prefix: &str) -> Markup {
    html! {
        div id="race-list" {
            h2 { (date) " の開催場一覧" }
            @for (venue, races) in venues {
                div.venue-block {
                    h3 { (venue) }
                    ul {
                        @for race_no in races {
                            li {
                                a href=(race_href(prefix, venue, race_no)) { (venue) " " (race_no) }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Home page: one tab per date, plus the listing for `selected`
/// (the first date when none is given).
pub fn render_home(index: &RaceIndex, selected: Option<&str>) -> String {
    let selected = selected.or_else(|| index.keys().next().map(String::as_str));
    let listing = selected.and_then(|date| index.get_key_value(date));
    let body = html! {
        h1 { "レース一覧" }
        nav.links {
            a href="/calendar" { "開催日カレンダー" }
            " "
            a href="/predictions" { "予想" }
        }
        div.tabs {
            @for date in index.keys() {
                @let active = selected == Some(date.as_str());
                a.tab.active[active] href={ "/?date=" (date) } { (date) }
            }
        }
        @if let Some((date, venues)) = listing {
            (render_race_list(date, venues, &format!("races/{date}/")))
        } @else {
            div id="race-list" {}
        }
    };
    render_page("レース一覧", body)
}

/// Race days listed immediately before and after `date`, in key order.
pub fn adjacent_days<'a>(index: &'a RaceIndex, date: &str) -> (Option<&'a str>, Option<&'a str>) {
    let prev = index
        .range::<str, _>((Bound::Unbounded, Bound::Excluded(date)))
        .next_back()
        .map(|(key, _)| key.as_str());
    let next = index
        .range::<str, _>((Bound::Excluded(date), Bound::Unbounded))
        .next()
        .map(|(key, _)| key.as_str());
    (prev, next)
}

fn display_date(key: &str) -> String {
    match parse_date_key(key) {
        Some(date) => date.format("%Y/%m/%d").to_string(),
        None => key.to_string(),
    }
}

pub fn render_day_page(
    date: &str,
    venues: &BTreeMap<String, Vec<String>>,
    prev: Option<&str>,
    next: Option<&str>,
) -> String {
    let body = html! {
        h1 { (display_date(date)) }
        div.nav {
            a href="../../calendar" { "開催日カレンダーへ戻る" }
            br;
            div.subnav {
                @if let Some(prev) = prev {
                    a href={ "../" (prev) "/index.html" } { "← 前の日" }
                    " (" (display_date(prev)) ") "
                } @else {
                    span.disabled { "← 前の日" }
                    " "
                }
                @if let Some(next) = next {
                    a href={ "../" (next) "/index.html" } { "→ 次の日" }
                    " (" (display_date(next)) ")"
                } @else {
                    span.disabled { "→ 次の日" }
                }
            }
        }
        (render_race_list(date, venues, ""))
    };
    render_page(&display_date(date), body)
}

fn sort_href(base: &str, current: Option<SortSpec>, column: usize) -> String {
    let dir = SortSpec::next_dir_for(current, column);
    format!("{base}?sort={column}&dir={}", dir.as_str())
}

fn sort_marker(current: Option<SortSpec>, column: usize) -> &'static str {
    match current {
        Some(spec) if spec.column == column => match spec.dir {
            SortDir::Asc => " ▲",
            SortDir::Desc => " ▼",
        },
        _ => "",
    }
}

pub fn render_predictions_table(
    predictions: &RacePredictions,
    sort: Option<SortSpec>,
    base: &str,
) -> Markup {
    let mut rows: Vec<PredictionRow<'_>> = sorting::rows(&predictions.predictions);
    if let Some(spec) = sort {
        sorting::sort_rows(&mut rows, spec);
    }

    html! {
        table id="predictions-table" {
            thead {
                tr {
                    @for (idx, label) in COLUMNS.iter().enumerate() {
                        th { a href=(sort_href(base, sort, idx)) { (label) (sort_marker(sort, idx)) } }
                    }
                }
            }
            tbody {
                @for row in &rows {
                    tr.data-row {
                        @for cell in row.cells() {
                            td { (cell) }
                        }
                    }
                }
            }
        }
    }
}

pub fn render_predictions_page(
    predictions: &RacePredictions,
    sort: Option<SortSpec>,
    base: &str,
) -> String {
    let body = html! {
        header.race-header {
            span id="race-date" { (predictions.date) }
            " "
            span #cource { (predictions.cource) }
            " "
            span id="race-num" { (display_value(&predictions.race_num)) }
            h1 id="race-title" { (predictions.race_title) }
        }
        (render_predictions_table(predictions, sort, base))
    };
    render_page(&predictions.race_title, body)
}

const PAGE_CSS: &str = r#"
    body {
      font-family: sans-serif;
      text-align: center;
    }
    #calendar {
      border-collapse: collapse;
      margin: 20px auto;
      width: 80%;
    }
    #calendar td, #calendar th {
      border: 1px solid #ccc;
      padding: 10px;
      width: 14%;
      height: 80px;
      vertical-align: top;
    }
    #calendar th.sat {
      color: #1565c0;
    }
    #calendar th.sun {
      color: #c62828;
    }
    #calendar a {
      text-decoration: none;
      color: blue;
      font-weight: bold;
    }
    #monthYear {
      font-size: 1.5em;
      margin: 0 10px;
    }
    .month-nav a {
      text-decoration: none;
      font-size: 1.5em;
    }
    #todayRace {
      margin-top: 20px;
      font-size: 1.2em;
    }
    #todayRace a {
      text-decoration: none;
      color: white;
      background-color: #007bff;
      padding: 10px 20px;
      border-radius: 5px;
      font-weight: bold;
    }
    #todayRace a:hover {
      background-color: #0056b3;
    }
    #todayRace p {
      color: #555;
    }
    .tabs {
      display: flex;
      gap: 6px;
      justify-content: center;
      flex-wrap: wrap;
    }
    .tab {
      padding: 6px 14px;
      border: 1px solid #ccc;
      border-radius: 999px;
      text-decoration: none;
      color: #333;
    }
    .tab.active {
      background: #007bff;
      color: white;
    }
    .subnav .disabled {
      color: #aaa;
    }
    .venue-block ul {
      list-style: none;
      padding: 0;
    }
    #predictions-table {
      border-collapse: collapse;
      margin: 20px auto;
    }
    #predictions-table th, #predictions-table td {
      border: 1px solid #ccc;
      padding: 6px 10px;
    }
    #predictions-table th a {
      color: inherit;
      text-decoration: none;
    }
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::build_grid;
    use crate::models::HorsePrediction;
    use serde_json::json;

    fn race_days(keys: &[&str]) -> RaceDays {
        keys.iter().map(|key| key.to_string()).collect()
    }

    #[test]
    fn calendar_links_race_days_only() {
        let month = MonthRef::new(2024, 0).unwrap();
        let grid = build_grid(month, &race_days(&["20240115"]));
        let markup = render_calendar_grid(&grid, month).into_string();

        assert!(markup.contains(r#"<a href="../races/20240115/index.html">15</a>"#));
        assert_eq!(markup.matches("<a ").count(), 1);
        assert!(markup.contains("<td>16</td>"));
        assert!(markup.contains(r#"<th class="sat">土</th>"#));
        assert!(markup.contains(r#"<th class="sun">日</th>"#));
    }

    #[test]
    fn calendar_rows_follow_grid() {
        let month = MonthRef::new(2024, 5).unwrap();
        let grid = build_grid(month, &RaceDays::default());
        let markup = render_calendar_grid(&grid, month).into_string();

        // header row plus five weeks
        assert_eq!(markup.matches("<tr>").count(), 6);
        assert_eq!(markup.matches("<td></td>").count(), 5);
    }

    #[test]
    fn calendar_page_has_heading_and_navigation() {
        let month = MonthRef::new(2024, 11).unwrap();
        let grid = build_grid(month, &RaceDays::default());
        let today = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        let page = render_calendar_page(month, &grid, today, &RaceDays::default());

        assert!(page.contains("2024年 12月"));
        assert!(page.contains("/calendar?year=2025&amp;month=0"));
        assert!(page.contains("/calendar?year=2024&amp;month=10"));
    }

    #[test]
    fn today_banner_links_only_on_race_day() {
        let today = NaiveDate::from_ymd_opt(2025, 9, 22).unwrap();
        let linked = render_today_banner(today, &race_days(&["20250922"])).into_string();
        assert!(linked.contains("../races/20250922/index.html"));
        assert!(linked.contains("2025/09/22"));

        let plain = render_today_banner(today, &race_days(&["20250928"])).into_string();
        assert!(!plain.contains("<a "));
        assert!(plain.contains("本日開催のレースはありません"));
    }

    fn sample_index() -> RaceIndex {
        serde_json::from_value(json!({
            "20250922": { "東京": ["R1", "R2"], "阪神": ["R11"] },
            "20250928": { "中山": ["R5"] }
        }))
        .unwrap()
    }

    #[test]
    fn home_defaults_to_first_date() {
        let page = render_home(&sample_index(), None);
        assert!(page.contains("20250922 の開催場一覧"));
        assert!(page.contains(r#"href="races/20250922/東京_r1.html""#));
        assert!(page.contains("阪神 R11"));
        assert!(!page.contains("中山 R5"));
        assert!(page.contains(r#"href="/?date=20250928""#));
    }

    #[test]
    fn home_lists_selected_date() {
        let page = render_home(&sample_index(), Some("20250928"));
        assert!(page.contains(r#"href="races/20250928/中山_r5.html""#));
        assert!(!page.contains("東京 R1"));
    }

    #[test]
    fn home_handles_empty_and_unknown() {
        let empty = render_home(&RaceIndex::default(), None);
        assert!(!empty.contains("の開催場一覧"));

        let unknown = render_home(&sample_index(), Some("20990101"));
        assert!(!unknown.contains("の開催場一覧"));
        assert!(unknown.contains(r#"href="/?date=20250922""#));
    }

    #[test]
    fn day_page_links_neighbouring_race_days() {
        let mut index = sample_index();
        index.insert("20251004".to_string(), BTreeMap::new());

        assert_eq!(adjacent_days(&index, "20250928"), (Some("20250922"), Some("20251004")));
        assert_eq!(adjacent_days(&index, "20250922"), (None, Some("20250928")));
        assert_eq!(adjacent_days(&index, "20251004"), (Some("20250928"), None));

        let page = render_day_page("20250928", &index["20250928"], Some("20250922"), Some("20251004"));
        assert!(page.contains(r#"<a href="../20250922/index.html">← 前の日</a> (2025/09/22)"#));
        assert!(page.contains(r#"<a href="../20251004/index.html">→ 次の日</a> (2025/10/04)"#));
        assert!(page.contains(r#"href="中山_r5.html""#));
    }

    #[test]
    fn day_page_disables_missing_neighbours() {
        let index = sample_index();

        let first = render_day_page("20250922", &index["20250922"], None, Some("20250928"));
        assert!(first.contains(r#"<span class="disabled">← 前の日</span>"#));
        assert!(first.contains(r#"<a href="../20250928/index.html">→ 次の日</a>"#));

        let last = render_day_page("20250928", &index["20250928"], Some("20250922"), None);
        assert!(last.contains(r#"<a href="../20250922/index.html">← 前の日</a>"#));
        assert!(last.contains(r#"<span class="disabled">→ 次の日</span>"#));
    }

    #[test]
    fn template_markers_in_titles_stay_literal() {
        let predictions = RacePredictions {
            race_title: "{{BODY}} Cup".to_string(),
            predictions: vec![HorsePrediction {
                horse: "Marker".to_string(),
                ..HorsePrediction::default()
            }],
            ..RacePredictions::default()
        };
        let page = render_predictions_page(&predictions, None, "/predictions");
        assert!(page.contains("<title>{{BODY}} Cup</title>"));
        assert_eq!(page.matches("Marker").count(), 1);
        assert_eq!(page.matches(r#"id="predictions-table""#).count(), 1);
    }

    #[test]
    fn fixture_text_is_escaped() {
        let predictions = RacePredictions {
            race_title: "<script>".to_string(),
            ..RacePredictions::default()
        };
        let page = render_predictions_page(&predictions, None, "/predictions");
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn predictions_table_formats_and_sorts() {
        let horse = |name: &str, odds: f64| HorsePrediction {
            horse: name.to_string(),
            weight_now: json!(470),
            weight_diff: json!(-2),
            last3f_time: 33.9,
            last3f_diff: 0.25,
            odds,
            score: json!(80),
            expected_value: 1.234,
        };
        let predictions = RacePredictions {
            predictions: vec![horse("Slow", 30.0), horse("Fast", 1.8)],
            ..RacePredictions::default()
        };

        let spec = SortSpec::new(6, SortDir::Asc).unwrap();
        let table = render_predictions_table(&predictions, Some(spec), "/predictions").into_string();

        assert!(table.contains("<td>33.90</td>"));
        assert!(table.contains("<td>1.23</td>"));
        let fast = table.find("Fast").unwrap();
        let slow = table.find("Slow").unwrap();
        assert!(fast < slow);
        assert!(table.contains("/predictions?sort=6&amp;dir=desc"));
        assert!(table.contains("/predictions?sort=0&amp;dir=asc"));
    }
}
