//! Presentation math for session summaries. No I/O.

use chrono::NaiveDate;
use serde::Serialize;

use crate::inference::SessionSummary;

/// Good/bad share of a session, ready for a pie chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub summary: SessionSummary,
    pub good_percent: f64,
    pub bad_percent: f64,
}

impl SessionReport {
    pub fn from_summary(summary: SessionSummary) -> Self {
        let (good_percent, bad_percent) = shares(summary.good_seconds, summary.bad_seconds);
        Self {
            summary,
            good_percent,
            bad_percent,
        }
    }

    pub fn good_label(&self) -> String {
        format!(
            "Good Posture: {:.1}% ({:.2}s)",
            self.good_percent, self.summary.good_seconds
        )
    }

    pub fn bad_label(&self) -> String {
        format!(
            "Bad Posture: {:.1}% ({:.2}s)",
            self.bad_percent, self.summary.bad_seconds
        )
    }

    pub fn alarms_label(&self) -> String {
        format!("Alarms Triggered: {}", self.summary.alarm_count)
    }
}

/// Percent split of two durations; a zero total splits as 0/0.
pub fn shares(good: f64, bad: f64) -> (f64, f64) {
    let total = good + bad;
    if total <= 0.0 {
        return (0.0, 0.0);
    }
    (good / total * 100.0, bad / total * 100.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub summary: SessionSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub good_minutes: f64,
    pub bad_minutes: f64,
    pub alarms: u32,
}

/// Trend series over several days plus overall totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryReport {
    pub points: Vec<HistoryPoint>,
    pub total_good_minutes: f64,
    pub total_bad_minutes: f64,
    pub good_percent: f64,
    pub bad_percent: f64,
}

impl HistoryReport {
    pub fn from_daily(mut days: Vec<DailySummary>) -> Self {
        days.sort_by_key(|day| day.date);

        let points: Vec<HistoryPoint> = days
            .iter()
            .map(|day| HistoryPoint {
                date: day.date,
                good_minutes: day.summary.good_seconds / 60.0,
                bad_minutes: day.summary.bad_seconds / 60.0,
                alarms: day.summary.alarm_count,
            })
            .collect();

        let total_good_minutes: f64 = points.iter().map(|p| p.good_minutes).sum();
        let total_bad_minutes: f64 = points.iter().map(|p| p.bad_minutes).sum();
        let (good_percent, bad_percent) = shares(total_good_minutes, total_bad_minutes);

        Self {
            points,
            total_good_minutes,
            total_bad_minutes,
            good_percent,
            bad_percent,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn total_alarms(&self) -> u32 {
        self.points.iter().map(|p| p.alarms).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(good: f64, bad: f64, alarms: u32) -> SessionSummary {
        SessionSummary {
            good_seconds: good,
            bad_seconds: bad,
            alarm_count: alarms,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn splits_good_and_bad_time() {
        let report = SessionReport::from_summary(summary(120.0, 30.0, 0));
        assert!(approx(report.good_percent, 80.0));
        assert!(approx(report.bad_percent, 20.0));
    }

    #[test]
    fn zero_total_yields_zero_percentages() {
        let report = SessionReport::from_summary(summary(0.0, 0.0, 0));
        assert_eq!(report.good_percent, 0.0);
        assert_eq!(report.bad_percent, 0.0);
        assert!(!report.good_percent.is_nan());
    }

    #[test]
    fn labels_match_the_chart_tooltips() {
        let report = SessionReport::from_summary(summary(3.0, 2.0, 1));
        assert_eq!(report.good_label(), "Good Posture: 60.0% (3.00s)");
        assert_eq!(report.bad_label(), "Bad Posture: 40.0% (2.00s)");
        assert_eq!(report.alarms_label(), "Alarms Triggered: 1");
    }

    #[test]
    fn history_sorts_days_and_converts_to_minutes() {
        let day = |d: u32| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
        let history = HistoryReport::from_daily(vec![
            DailySummary {
                date: day(5),
                summary: summary(600.0, 0.0, 2),
            },
            DailySummary {
                date: day(3),
                summary: summary(120.0, 180.0, 1),
            },
        ]);

        assert_eq!(history.points.len(), 2);
        assert_eq!(history.points[0].date, day(3));
        assert!(approx(history.points[0].good_minutes, 2.0));
        assert!(approx(history.points[0].bad_minutes, 3.0));
        assert!(approx(history.total_good_minutes, 12.0));
        assert!(approx(history.total_bad_minutes, 3.0));
        assert!(approx(history.good_percent, 80.0));
        assert!(approx(history.bad_percent, 20.0));
        assert_eq!(history.total_alarms(), 3);
    }

    #[test]
    fn empty_history_has_zero_shares() {
        let history = HistoryReport::from_daily(Vec::new());
        assert!(history.is_empty());
        assert_eq!((history.good_percent, history.bad_percent), (0.0, 0.0));
    }
}
