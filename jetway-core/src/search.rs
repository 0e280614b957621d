use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

/// `GET /flights/search` query. All three fields are required.
#[derive(Debug, Clone, Deserialize)]
pub struct FlightSearchQuery {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
}

impl FlightSearchQuery {
    /// Departure window `[00:00, 24:00)` of the requested UTC calendar day.
    pub fn departure_window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.date.and_time(NaiveTime::MIN).and_utc();
        (start, start + chrono::Duration::days(1))
    }

    pub fn matches_route(&self, origin_code: &str, destination_code: &str) -> bool {
        self.origin.eq_ignore_ascii_case(origin_code)
            && self.destination.eq_ignore_ascii_case(destination_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_search_query_deserialization() {
        let json = r#"{ "origin": "JFK", "destination": "LHR", "date": "2025-12-25" }"#;
        let query: FlightSearchQuery = serde_json::from_str(json).expect("Failed to deserialize");
        assert_eq!(query.origin, "JFK");
        assert_eq!(query.date, NaiveDate::from_ymd_opt(2025, 12, 25).unwrap());
    }

    #[test]
    fn test_departure_window_covers_one_day() {
        let query = FlightSearchQuery {
            origin: "jfk".into(),
            destination: "LHR".into(),
            date: NaiveDate::from_ymd_opt(2025, 12, 25).unwrap(),
        };
        let (start, end) = query.departure_window();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 12, 25, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2025, 12, 26, 0, 0, 0).unwrap());
        assert!(query.matches_route("JFK", "lhr"));
        assert!(!query.matches_route("LHR", "JFK"));
    }
}
