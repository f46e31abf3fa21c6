use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// An uploaded library-usage data file.
///
/// Timestamps come back without a zone offset, hence `NaiveDateTime`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataFile {
    pub id: i64,
    pub filename: String,
    pub upload_date: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_data_file_record() {
        let json = r#"{"id": 3, "filename": "spring.json", "upload_date": "2025-04-01T09:30:00"}"#;
        let file: DataFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.id, 3);
        assert_eq!(file.filename, "spring.json");
        assert_eq!(file.upload_date.format("%Y-%m-%d").to_string(), "2025-04-01");
    }
}
