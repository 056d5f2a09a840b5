/// Canonical forecast input (§ external interface).
///
/// The engine consumes one JSON document per week. `count` rows expand into
/// that many tour instances; the canonical text below is the sole input to
/// `input_hash`.
use serde::{Deserialize, Serialize};

use crate::domain::errors::{Result, SolveError};
use crate::domain::models::{Tour, Weekday};
use crate::hash;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    pub tenant_code: String,
    pub site_code: String,
    /// Monday anchoring the forecast week.
    pub week_anchor_date: chrono::NaiveDate,
    #[serde(default)]
    pub service_code: Option<String>,
    pub tours: Vec<ForecastTour>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastTour {
    pub external_id: String,
    /// 1 = Monday .. 7 = Sunday.
    pub day: u8,
    pub start_time: String,
    pub end_time: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub crosses_midnight: bool,
    #[serde(default)]
    pub depot: Option<String>,
    #[serde(default)]
    pub skill: Option<String>,
}

fn default_count() -> u32 {
    1
}

/// Parse a 24-hour "HH:MM" into minutes-of-day.
pub fn parse_hhmm(text: &str) -> Result<i32> {
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() != 2 {
        return Err(SolveError::Validation(format!("Bad time: {text}")));
    }
    let hours: i32 = parts[0]
        .parse()
        .map_err(|_| SolveError::Validation(format!("Bad time: {text}")))?;
    let minutes: i32 = parts[1]
        .parse()
        .map_err(|_| SolveError::Validation(format!("Bad time: {text}")))?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(SolveError::Validation(format!("Bad time: {text}")));
    }
    Ok(hours * 60 + minutes)
}

pub fn minutes_to_hhmm(minutes: i32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

impl Forecast {
    pub fn from_json(text: &str) -> Result<Forecast> {
        serde_json::from_str(text)
            .map_err(|e| SolveError::Validation(format!("Forecast JSON: {e}")))
    }

    /// Validate every row and expand `count` into tour instances.
    ///
    /// Instance ids are the external id for `count == 1`, or
    /// `<external_id>#<n>` (1-based) otherwise.
    pub fn expand_tours(&self) -> Result<Vec<Tour>> {
        let mut tours = Vec::new();

        for row in &self.tours {
            if !(1..=7).contains(&row.day) {
                return Err(SolveError::Validation(format!(
                    "Tour {}: day {} out of 1..7",
                    row.external_id, row.day
                )));
            }
            let day = Weekday::from_index(row.day - 1).expect("1..7 checked");

            let start_min = parse_hhmm(&row.start_time)?;
            let end_min = parse_hhmm(&row.end_time)?;
            if end_min <= start_min && !row.crosses_midnight {
                return Err(SolveError::Validation(format!(
                    "Tour {}: end {} not after start {} and not flagged cross-midnight",
                    row.external_id, row.end_time, row.start_time
                )));
            }
            if row.count < 1 {
                return Err(SolveError::Validation(format!(
                    "Tour {}: count must be >= 1",
                    row.external_id
                )));
            }

            for n in 1..=row.count {
                let id = if row.count == 1 {
                    row.external_id.clone()
                } else {
                    format!("{}#{}", row.external_id, n)
                };
                tours.push(Tour::new(
                    id,
                    day,
                    start_min,
                    end_min,
                    row.crosses_midnight,
                    row.depot.clone(),
                    row.skill.clone(),
                )?);
            }
        }

        Ok(tours)
    }
}

/// Canonical text: one `"<day-abbr> <HH:MM>-<HH:MM>"` line per tour instance
/// (plus `" [Depot <depot>]"` where set), sorted lexicographically.
pub fn canonical_forecast_text(tours: &[Tour]) -> String {
    let mut lines: Vec<String> = tours
        .iter()
        .map(|t| {
            let mut line = format!(
                "{} {}-{}",
                t.day.as_str(),
                minutes_to_hhmm(t.start_min),
                minutes_to_hhmm(t.end_min)
            );
            if let Some(depot) = &t.depot {
                line.push_str(&format!(" [Depot {depot}]"));
            }
            line
        })
        .collect();
    lines.sort();
    lines.join("\n")
}

pub fn input_hash(tours: &[Tour]) -> String {
    hash::sha256_hex(canonical_forecast_text(tours).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forecast_json(tours: &str) -> String {
        format!(
            r#"{{
                "tenant_code": "wien",
                "site_code": "hub-1",
                "week_anchor_date": "2026-01-05",
                "tours": {tours}
            }}"#
        )
    }

    #[test]
    fn count_expands_into_instances() {
        let doc = forecast_json(
            r#"[{"external_id": "T1", "day": 1, "start_time": "06:00", "end_time": "09:00", "count": 3}]"#,
        );
        let tours = Forecast::from_json(&doc).unwrap().expand_tours().unwrap();
        assert_eq!(tours.len(), 3);
        assert_eq!(tours[0].id, "T1#1");
        assert_eq!(tours[2].id, "T1#3");
        assert!(tours.iter().all(|t| t.start_min == 360 && t.end_min == 540));
    }

    #[test]
    fn equal_times_rejected_without_midnight_flag() {
        let doc = forecast_json(
            r#"[{"external_id": "T1", "day": 1, "start_time": "06:00", "end_time": "06:00"}]"#,
        );
        let err = Forecast::from_json(&doc).unwrap().expand_tours();
        assert!(err.is_err());
    }

    #[test]
    fn cross_midnight_is_explicit_not_inferred() {
        let doc = forecast_json(
            r#"[{"external_id": "T1", "day": 6, "start_time": "22:00", "end_time": "02:00", "crosses_midnight": true}]"#,
        );
        let tours = Forecast::from_json(&doc).unwrap().expand_tours().unwrap();
        assert_eq!(tours[0].duration_min(), 240);
    }

    #[test]
    fn day_out_of_range_rejected() {
        let doc = forecast_json(
            r#"[{"external_id": "T1", "day": 8, "start_time": "06:00", "end_time": "09:00"}]"#,
        );
        assert!(Forecast::from_json(&doc).unwrap().expand_tours().is_err());
    }

    #[test]
    fn canonical_text_is_sorted_and_stable() {
        let doc = forecast_json(
            r#"[
                {"external_id": "B", "day": 2, "start_time": "06:00", "end_time": "09:00"},
                {"external_id": "A", "day": 1, "start_time": "07:30", "end_time": "11:00", "depot": "West"}
            ]"#,
        );
        let tours = Forecast::from_json(&doc).unwrap().expand_tours().unwrap();
        let text = canonical_forecast_text(&tours);
        assert_eq!(text, "Mon 07:30-11:00 [Depot West]\nTue 06:00-09:00");

        // Hash only depends on the canonical text, not row order.
        let mut reversed = tours.clone();
        reversed.reverse();
        assert_eq!(input_hash(&tours), input_hash(&reversed));
    }
}
