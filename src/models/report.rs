use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A saved analysis report, as listed by `GET /analysis/reports`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub report_name: String,
    pub created_at: NaiveDateTime,
}

/// A full report including its generated metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDetail {
    #[serde(flatten)]
    pub summary: Report,
    pub report_data: ReportData,
}

/// The analysis payload embedded in a report.
///
/// The five metric sections are produced server-side from whatever columns
/// the uploaded data happens to contain, so their inner shape is dynamic
/// and kept as raw JSON. Missing sections parse as `Null` rather than
/// failing the whole report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportData {
    #[serde(default)]
    pub report_date: String,
    #[serde(default)]
    pub total_users: u64,
    #[serde(default)]
    pub usage_patterns: Value,
    #[serde(default)]
    pub content_performance: Value,
    #[serde(default)]
    pub user_segments: Value,
    #[serde(default)]
    pub search_patterns: Value,
    #[serde(default)]
    pub retention_metrics: Value,
}

/// All five per-file metric sections fetched in one go.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsBundle {
    pub usage_patterns: Value,
    pub content_performance: Value,
    pub user_segments: Value,
    pub search_patterns: Value,
    pub retention: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_report_summary() {
        let json = r#"{"id": 7, "report_name": "Q1", "created_at": "2025-03-31T23:59:59"}"#;
        let report: Report = serde_json::from_str(json).unwrap();
        assert_eq!(report.id, 7);
        assert_eq!(report.report_name, "Q1");
    }

    #[test]
    fn parses_report_detail_with_dynamic_sections() {
        let json = r#"{
            "id": 7,
            "report_name": "Q1",
            "created_at": "2025-03-31T23:59:59",
            "report_data": {
                "report_date": "2025-03-31",
                "total_users": 412,
                "usage_patterns": {"daily_active_users": {"2025-03-30": 51}},
                "content_performance": {"top_rated": {"Dune": 4.8}},
                "user_segments": {"by_account_type": {"student": 300}},
                "search_patterns": {"top_queries": {"rust": 12}},
                "retention_metrics": {"monthly_retention": 0.82}
            }
        }"#;

        let detail: ReportDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.summary.report_name, "Q1");
        assert_eq!(detail.report_data.total_users, 412);
        assert_eq!(
            detail.report_data.usage_patterns["daily_active_users"]["2025-03-30"],
            51
        );
    }

    #[test]
    fn tolerates_missing_metric_sections() {
        let json = r#"{
            "id": 8,
            "report_name": "empty",
            "created_at": "2025-04-01T00:00:00",
            "report_data": {"report_date": "2025-04-01", "total_users": 0}
        }"#;

        let detail: ReportDetail = serde_json::from_str(json).unwrap();
        assert!(detail.report_data.usage_patterns.is_null());
        assert!(detail.report_data.retention_metrics.is_null());
    }
}
