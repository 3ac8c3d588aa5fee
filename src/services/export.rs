//! CSV rendering of the member list.

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::domain::Member;

pub const CSV_HEADER: &str = "ID,Username,Email,Image";

/// Render members as RFC 4180 CSV with CRLF line endings.
#[must_use]
pub fn members_to_csv(members: &[Member]) -> String {
    let mut csv = String::with_capacity(64 * (members.len() + 1));
    csv.push_str(CSV_HEADER);
    csv.push_str("\r\n");

    for member in members {
        let _ = write!(
            csv,
            "{},{},{},{}\r\n",
            escape(&member.id),
            escape(&member.username),
            escape(&member.email),
            escape(member.image.as_deref().unwrap_or_default()),
        );
    }

    csv
}

/// `members_export_<YYYY-mm-dd_HH-MM-SS>.csv`
#[must_use]
pub fn filename(at: DateTime<Utc>) -> String {
    format!("members_export_{}.csv", at.format("%Y-%m-%d_%H-%M-%S"))
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn member(username: &str, image: Option<&str>) -> Member {
        Member {
            id: "0b6c3c1e-0000-4000-8000-000000000001".to_string(),
            username: username.to_string(),
            email: "m@example.com".to_string(),
            image: image.map(ToString::to_string),
            created_at: "2026-01-01T00:00:00.000000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000000Z".to_string(),
        }
    }

    #[test]
    fn test_empty_export_is_header_only() {
        assert_eq!(members_to_csv(&[]), "ID,Username,Email,Image\r\n");
    }

    #[test]
    fn test_quotes_special_fields() {
        let csv = members_to_csv(&[member("Doe, \"JD\"", Some("data:image/png;base64,AAA"))]);
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "0b6c3c1e-0000-4000-8000-000000000001,\"Doe, \"\"JD\"\"\",m@example.com,\"data:image/png;base64,AAA\""
        );
    }

    #[test]
    fn test_missing_image_is_empty_field() {
        let csv = members_to_csv(&[member("plain", None)]);
        assert!(csv.lines().nth(1).unwrap().ends_with("m@example.com,"));
    }

    #[test]
    fn test_export_filename() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(filename(at), "members_export_2026-03-09_07-05-01.csv");
    }
}
