//! # UV Panel Rendering
//!
//! This module turns the Poller's display state into something a person can
//! read. The Poller only knows the [`Render`] trait; [`AsciiRenderer`] is the
//! terminal implementation used by the binary and handy for development
//! without a mirror attached.
//!
//! ## Panel Layout (Ready state)
//! ```text
//! UV INDEX 6.4 HIGH
//! 0 ───────────◆────────── 11+
//!  1pm 6.9   2pm 5.8   3pm 4.1   4pm 2.7
//!  Sat 8.2   Sun 7.9
//! ```
//! The hourly and daily rows are controlled by `[display]` in the config.

use crate::config::DisplayConfig;
use crate::poller::DisplayState;
use crate::{UvReading, UvSnapshot};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Timelike};
use std::collections::BTreeMap;
use std::io::Write;

/// What the Poller hands to a renderer after every transition.
#[derive(Clone, Copy, Debug)]
pub struct View<'a> {
    pub state: DisplayState,
    /// Last good snapshot, possibly stale
    pub snapshot: Option<&'a UvSnapshot>,
}

/// Side-effecting sink for display updates.
pub trait Render {
    fn render(&mut self, view: &View<'_>);
}

/// WHO exposure category for a UV index value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UvLevel {
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
}

impl UvLevel {
    pub fn from_uvi(uvi: f64) -> Self {
        if uvi <= 2.0 {
            UvLevel::Low
        } else if uvi <= 5.0 {
            UvLevel::Moderate
        } else if uvi <= 7.0 {
            UvLevel::High
        } else if uvi <= 10.0 {
            UvLevel::VeryHigh
        } else {
            UvLevel::Extreme
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UvLevel::Low => "LOW",
            UvLevel::Moderate => "MODERATE",
            UvLevel::High => "HIGH",
            UvLevel::VeryHigh => "VERY HIGH",
            UvLevel::Extreme => "EXTREME",
        }
    }
}

/// One entry of the hourly row.
#[derive(Clone, Debug, PartialEq)]
pub struct HourlyEntry {
    /// 12-hour clock label such as `1pm`
    pub label: String,
    pub uvi: f64,
}

/// Format a UV value as a whole number or with one decimal.
pub fn format_uvi(uvi: f64, round: bool) -> String {
    if round {
        format!("{}", uvi.round() as i64)
    } else {
        format!("{:.1}", uvi)
    }
}

/// Marker position on the 0 to 11+ spectrum, as a percentage.
pub fn spectrum_position(uvi: f64) -> f64 {
    (uvi / 11.0 * 100.0).clamp(0.0, 100.0)
}

/// `1am` … `12pm` label for an instant in the given zone.
fn hour_label<Tz: TimeZone>(time: &DateTime<Tz>) -> String {
    let hour = time.hour();
    let suffix = if hour >= 12 { "pm" } else { "am" };
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}{}", hour12, suffix)
}

/// The next `hours` forecast readings strictly after `now`.
pub fn hourly_forecast<Tz: TimeZone>(
    forecast: &[UvReading],
    now: &DateTime<Tz>,
    hours: usize,
) -> Vec<HourlyEntry> {
    let tz = now.timezone();
    forecast
        .iter()
        .filter(|reading| reading.time > *now)
        .take(hours)
        .map(|reading| HourlyEntry {
            label: hour_label(&reading.time.with_timezone(&tz)),
            uvi: reading.uvi,
        })
        .collect()
}

/// Highest forecast value per calendar day in `tz`, in date order.
pub fn daily_maxima<Tz: TimeZone>(forecast: &[UvReading], tz: &Tz) -> Vec<(NaiveDate, f64)> {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for reading in forecast {
        let day = reading.time.with_timezone(tz).date_naive();
        by_day
            .entry(day)
            .and_modify(|max| *max = max.max(reading.uvi))
            .or_insert(reading.uvi);
    }
    by_day.into_iter().collect()
}

/// Status line for every state that has no data panel.
pub fn status_text(state: DisplayState) -> &'static str {
    match state {
        DisplayState::Uninitialized | DisplayState::AwaitingFirstData => "Loading …",
        DisplayState::MissingCoords => "Please set latitude and longitude in the config file",
        DisplayState::TransientError => "Error fetching UV data",
        DisplayState::Ready => "No UV data",
    }
}

/// Draw the panel for `view` as plain text.
///
/// `now` decides which forecast hours are still ahead and which day is today.
pub fn draw_panel<Tz: TimeZone>(
    view: &View<'_>,
    display: &DisplayConfig,
    header: Option<&str>,
    now: &DateTime<Tz>,
) -> String {
    let mut lines: Vec<String> = Vec::new();
    if let Some(header) = header {
        lines.push(header.to_string());
    }

    let snapshot = match (view.state, view.snapshot) {
        (DisplayState::Ready, Some(snapshot)) => snapshot,
        (state, _) => {
            lines.push(status_text(state).to_string());
            return lines.join("\n");
        }
    };

    let current = snapshot.now.uvi;
    lines.push(format!(
        "{} {} {}",
        display.label,
        format_uvi(current, display.round_value),
        UvLevel::from_uvi(current).label()
    ));

    if display.show_spectrum {
        const WIDTH: usize = 22;
        let marker = (spectrum_position(current) / 100.0 * (WIDTH - 1) as f64).round() as usize;
        let bar: String = (0..WIDTH)
            .map(|i| if i == marker { '◆' } else { '─' })
            .collect();
        lines.push(format!("0 {} 11+", bar));
    }

    if display.show_hourly {
        let hourly = hourly_forecast(&snapshot.forecast, now, display.hourly_hours);
        if !hourly.is_empty() {
            let row: Vec<String> = hourly
                .iter()
                .map(|h| format!("{:>4} {}", h.label, format_uvi(h.uvi, display.round_value)))
                .collect();
            lines.push(row.join("  "));
        }
    }

    if display.show_forecast {
        let today = now.date_naive();
        let days: Vec<String> = daily_maxima(&snapshot.forecast, &now.timezone())
            .into_iter()
            .filter(|(day, _)| *day > today)
            .take(display.forecast_days)
            .map(|(day, max)| {
                format!(
                    "{:>4} {}",
                    day.format("%a"),
                    format_uvi(max, display.round_value)
                )
            })
            .collect();
        if !days.is_empty() {
            lines.push(days.join("  "));
        }
    }

    lines.join("\n")
}

/// Renders each view as a text panel to any writer (stdout by default).
pub struct AsciiRenderer<W: Write> {
    out: W,
    display: DisplayConfig,
    header: Option<String>,
}

impl AsciiRenderer<std::io::Stdout> {
    pub fn stdout(display: DisplayConfig, header: Option<String>) -> Self {
        AsciiRenderer::new(std::io::stdout(), display, header)
    }
}

impl<W: Write> AsciiRenderer<W> {
    pub fn new(out: W, display: DisplayConfig, header: Option<String>) -> Self {
        AsciiRenderer {
            out,
            display,
            header,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Render for AsciiRenderer<W> {
    fn render(&mut self, view: &View<'_>) {
        let panel = draw_panel(view, &self.display, self.header.as_deref(), &Local::now());
        if let Err(e) = writeln!(self.out, "{}\n", panel).and_then(|_| self.out.flush()) {
            log::error!("Failed to draw UV panel: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 21, 12, 30, 0).unwrap()
    }

    fn test_snapshot() -> UvSnapshot {
        let start = Utc.with_ymd_and_hms(2024, 6, 21, 12, 0, 0).unwrap();
        let forecast = (0..40)
            .map(|h| UvReading {
                uvi: (8.0 - (h % 24) as f64 * 0.5).max(0.0),
                time: start + Duration::hours(h),
            })
            .collect();
        UvSnapshot {
            now: UvReading {
                uvi: 6.4,
                time: start,
            },
            forecast,
        }
    }

    #[test]
    fn test_uv_level_thresholds() {
        assert_eq!(UvLevel::from_uvi(0.0), UvLevel::Low);
        assert_eq!(UvLevel::from_uvi(2.0), UvLevel::Low);
        assert_eq!(UvLevel::from_uvi(2.1), UvLevel::Moderate);
        assert_eq!(UvLevel::from_uvi(5.0), UvLevel::Moderate);
        assert_eq!(UvLevel::from_uvi(7.0), UvLevel::High);
        assert_eq!(UvLevel::from_uvi(10.0), UvLevel::VeryHigh);
        assert_eq!(UvLevel::from_uvi(10.5), UvLevel::Extreme);
    }

    #[test]
    fn test_format_uvi() {
        assert_eq!(format_uvi(6.44, false), "6.4");
        assert_eq!(format_uvi(6.5, true), "7");
        assert_eq!(format_uvi(0.0, false), "0.0");
    }

    #[test]
    fn test_spectrum_position_caps_at_eleven() {
        assert_eq!(spectrum_position(0.0), 0.0);
        assert!((spectrum_position(5.5) - 50.0).abs() < 1e-9);
        assert_eq!(spectrum_position(14.0), 100.0);
    }

    #[test]
    fn test_hourly_forecast_skips_past_hours() {
        let snapshot = test_snapshot();
        let hourly = hourly_forecast(&snapshot.forecast, &noon(), 4);

        let labels: Vec<&str> = hourly.iter().map(|h| h.label.as_str()).collect();
        assert_eq!(labels, vec!["1pm", "2pm", "3pm", "4pm"]);
        assert_eq!(hourly[0].uvi, 7.5);
    }

    #[test]
    fn test_hour_labels_wrap_at_midnight_and_noon() {
        let midnight = Utc.with_ymd_and_hms(2024, 6, 22, 0, 0, 0).unwrap();
        let noon = Utc.with_ymd_and_hms(2024, 6, 22, 12, 0, 0).unwrap();
        assert_eq!(hour_label(&midnight), "12am");
        assert_eq!(hour_label(&noon), "12pm");
    }

    #[test]
    fn test_daily_maxima_groups_by_day() {
        let snapshot = test_snapshot();
        let days = daily_maxima(&snapshot.forecast, &Utc);

        assert_eq!(days.len(), 3);
        assert_eq!(days[0].0, NaiveDate::from_ymd_opt(2024, 6, 21).unwrap());
        assert_eq!(days[0].1, 8.0);
        // Next day starts at h=12 → 8.0 - 12*0.5 = 2.0, rising at h=24 back to 8.0
        assert_eq!(days[1].1, 8.0);
    }

    #[test]
    fn test_panel_states() {
        let display = DisplayConfig::default();
        let view = View {
            state: DisplayState::MissingCoords,
            snapshot: None,
        };
        assert!(draw_panel(&view, &display, None, &noon()).contains("latitude"));

        let view = View {
            state: DisplayState::TransientError,
            snapshot: None,
        };
        assert_eq!(
            draw_panel(&view, &display, Some("UV Index"), &noon()),
            "UV Index\nError fetching UV data"
        );
    }

    #[test]
    fn test_ready_panel_content() {
        let snapshot = test_snapshot();
        let display = DisplayConfig {
            show_forecast: true,
            ..DisplayConfig::default()
        };
        let view = View {
            state: DisplayState::Ready,
            snapshot: Some(&snapshot),
        };

        let panel = draw_panel(&view, &display, None, &noon());
        let lines: Vec<&str> = panel.lines().collect();

        assert_eq!(lines[0], "UV INDEX 6.4 HIGH");
        assert!(lines[1].starts_with("0 ") && lines[1].ends_with(" 11+"));
        assert!(lines[2].contains("1pm 7.5"));
        // Today (Fri) is excluded from the daily row
        assert!(lines[3].contains("Sat 8.0"));
        assert!(!lines[3].contains("Fri"));
    }

    #[test]
    fn test_ascii_renderer_writes_panel() {
        let mut renderer = AsciiRenderer::new(Vec::new(), DisplayConfig::default(), None);
        renderer.render(&View {
            state: DisplayState::AwaitingFirstData,
            snapshot: None,
        });

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.starts_with("Loading"));
    }
}
