//! Maps loosely-shaped service records onto [`Report`] and [`ReportDetail`].
//!
//! The list and detail endpoints disagree on field names, so every canonical
//! field has an ordered list of candidates; the first one that is present
//! (and, for dates, parseable) wins. Only a missing identifier is an error.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{Highlight, RawRecord, Report, ReportDetail, ReportId, UNKNOWN_AUTHOR, UNTITLED};

const ID_FIELDS: &[&str] = &["id", "record_no", "report_no"];
const TITLE_FIELDS: &[&str] = &["title", "r_title"];
const DATE_FIELDS: &[&str] = &["date", "r_date", "createdDate"];
const AUTHOR_FIELDS: &[&str] = &["author"];
const MEDIA_FIELDS: &[&str] = &["video_url", "thumbnail_url"];
const SUMMARY_FIELDS: &[&str] = &["r_content", "summary"];
const STATS_FIELDS: &[&str] = &["behavior_stats", "behaviorStats"];

/// No identifier could be resolved for a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("record has no identifier (tried {})", ID_FIELDS.join(", "))]
pub struct NormalizationError;

/// Normalize a list record.
///
/// `fallback_id` is used when none of the identifier fields are present,
/// e.g. the id a detail view was routed with.
pub fn normalize(raw: &RawRecord, fallback_id: Option<&ReportId>) -> Result<Report, NormalizationError> {
    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);

    let id = first_usable(fields, ID_FIELDS, scalar_id)
        .or_else(|| fallback_id.cloned())
        .ok_or(NormalizationError)?;

    let title = first_usable(fields, TITLE_FIELDS, non_blank_str)
        .unwrap_or_else(|| UNTITLED.to_string());

    let date = first_usable(fields, DATE_FIELDS, parse_date);

    let author = first_usable(fields, AUTHOR_FIELDS, non_blank_str)
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

    Ok(Report {
        id,
        title,
        date,
        author,
    })
}

/// Normalize a detail record, including the media, summary, highlight and
/// behaviour-stat fields. Absent optional fields become empty values.
pub fn normalize_detail(
    raw: &RawRecord,
    fallback_id: Option<&ReportId>,
) -> Result<ReportDetail, NormalizationError> {
    let report = normalize(raw, fallback_id)?;
    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);

    let video_url = first_present(fields, MEDIA_FIELDS)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let summary = first_present(fields, SUMMARY_FIELDS)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default();

    let highlights = match fields.get("highlights") {
        Some(Value::Array(items)) => items.iter().filter_map(parse_highlight).collect(),
        _ => Vec::new(),
    };

    let behavior_stats = match first_present(fields, STATS_FIELDS) {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };

    Ok(ReportDetail {
        report,
        video_url,
        summary,
        highlights,
        behavior_stats,
    })
}

/// First candidate that is present and not `null`.
fn first_present<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|v| !v.is_null())
}

/// First candidate that `parse` accepts. Unusable values (blank strings,
/// unparseable dates, wrong JSON kinds) fall through to the next field.
fn first_usable<T>(
    fields: &Map<String, Value>,
    keys: &[&str],
    parse: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find_map(parse)
}

fn scalar_id(v: &Value) -> Option<ReportId> {
    match v {
        Value::Number(n) => Some(ReportId::new(n.to_string())),
        Value::String(s) if !s.trim().is_empty() => Some(ReportId::new(s.trim())),
        _ => None,
    }
}

fn non_blank_str(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse the date shapes the service has been seen to emit.
fn parse_date(v: &Value) -> Option<NaiveDate> {
    match v {
        Value::String(s) => parse_date_str(s.trim()),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    }
}

fn parse_date_str(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

fn parse_highlight(v: &Value) -> Option<Highlight> {
    let obj = v.as_object()?;
    let label = obj
        .get("label")
        .and_then(|l| match l {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_default();
    Some(Highlight {
        start: obj.get("start").and_then(seconds),
        end: obj.get("end").and_then(seconds),
        label,
    })
}

fn seconds(v: &Value) -> Option<f64> {
    let secs = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    secs.filter(|s| s.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn report_no_only_uses_placeholders() {
        let r = normalize(&json!({"report_no": 7}), None).unwrap();
        assert_eq!(r.id, ReportId::from(7u64));
        assert_eq!(r.title, UNTITLED);
        assert_eq!(r.date, None);
        assert_eq!(r.author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn id_priority_order() {
        let r = normalize(&json!({"id": 1, "record_no": 2, "report_no": 3}), None).unwrap();
        assert_eq!(r.id.as_str(), "1");
        let r = normalize(&json!({"id": null, "record_no": 2, "report_no": 3}), None).unwrap();
        assert_eq!(r.id.as_str(), "2");
        let r = normalize(&json!({"report_no": "r-3"}), None).unwrap();
        assert_eq!(r.id.as_str(), "r-3");
        let r = normalize(&json!({"id": " ", "record_no": 8}), None).unwrap();
        assert_eq!(r.id.as_str(), "8");
    }

    #[test]
    fn fallback_id_used_last() {
        let route = ReportId::from("55");
        let r = normalize(&json!({"title": "x"}), Some(&route)).unwrap();
        assert_eq!(r.id, route);
        let r = normalize(&json!({"record_no": 9}), Some(&route)).unwrap();
        assert_eq!(r.id.as_str(), "9");
    }

    #[test]
    fn missing_id_fails() {
        assert_eq!(normalize(&json!({"title": "x"}), None), Err(NormalizationError));
        assert_eq!(normalize(&json!({"id": null}), None), Err(NormalizationError));
        assert_eq!(normalize(&json!({"id": "  "}), None), Err(NormalizationError));
        assert_eq!(normalize(&json!({"id": [1]}), None), Err(NormalizationError));
        assert_eq!(normalize(&json!(42), None), Err(NormalizationError));
    }

    #[test]
    fn non_object_with_fallback_normalizes() {
        let route = ReportId::from(3u64);
        let r = normalize(&Value::Null, Some(&route)).unwrap();
        assert_eq!(r.id, route);
        assert_eq!(r.title, UNTITLED);
    }

    #[test]
    fn title_falls_back_to_legacy_field() {
        let r = normalize(&json!({"id": 1, "r_title": "Legacy"}), None).unwrap();
        assert_eq!(r.title, "Legacy");
        let r = normalize(&json!({"id": 1, "title": "New", "r_title": "Legacy"}), None).unwrap();
        assert_eq!(r.title, "New");
        let r = normalize(&json!({"id": 1, "title": "  ", "r_title": "Legacy"}), None).unwrap();
        assert_eq!(r.title, "Legacy");
        let r = normalize(&json!({"id": 1, "title": "", "r_title": null}), None).unwrap();
        assert_eq!(r.title, UNTITLED);
    }

    #[test]
    fn date_priority_and_fallthrough() {
        let r = normalize(
            &json!({"id": 1, "date": "2024-01-02", "r_date": "2023-05-05"}),
            None,
        )
        .unwrap();
        assert_eq!(r.date, ymd(2024, 1, 2));

        let r = normalize(
            &json!({"id": 1, "date": "garbage", "r_date": "2023-05-05"}),
            None,
        )
        .unwrap();
        assert_eq!(r.date, ymd(2023, 5, 5));

        let r = normalize(&json!({"id": 1, "createdDate": "2022-12-31T23:00:00Z"}), None).unwrap();
        assert_eq!(r.date, ymd(2022, 12, 31));
    }

    #[test]
    fn unparseable_dates_are_unknown() {
        let r = normalize(&json!({"id": 1, "date": "-", "r_date": "", "createdDate": true}), None)
            .unwrap();
        assert_eq!(r.date, None);
    }

    #[test]
    fn date_formats() {
        assert_eq!(parse_date_str("2024-03-04 10:11:12"), ymd(2024, 3, 4));
        assert_eq!(parse_date_str("2024-03-04T10:11:12.345"), ymd(2024, 3, 4));
        assert_eq!(parse_date_str("2024/03/04"), ymd(2024, 3, 4));
        assert_eq!(parse_date_str("2024.03.04"), ymd(2024, 3, 4));
        assert_eq!(parse_date_str("2024-02-30"), None);
        assert_eq!(parse_date(&json!(1_704_067_200_000i64)), ymd(2024, 1, 1));
    }

    #[test]
    fn detail_fields_default_to_empty() {
        let d = normalize_detail(&json!({}), Some(&ReportId::from("12"))).unwrap();
        assert_eq!(d.report.id.as_str(), "12");
        assert_eq!(d.video_url, "");
        assert_eq!(d.summary, "");
        assert!(d.highlights.is_empty());
        assert!(d.behavior_stats.is_empty());
    }

    #[test]
    fn detail_fields_first_present_wins() {
        let d = normalize_detail(
            &json!({
                "record_no": 5,
                "r_title": "Playground",
                "thumbnail_url": "https://cdn/x.jpg",
                "summary": "later",
                "r_content": "first",
                "highlights": [
                    {"start": 1, "end": "4.5", "label": "smile"},
                    "junk",
                    {"label": "wave"}
                ],
                "behavior_stats": {"smile": 3}
            }),
            None,
        )
        .unwrap();
        assert_eq!(d.report.title, "Playground");
        assert_eq!(d.video_url, "https://cdn/x.jpg");
        assert_eq!(d.summary, "first");
        assert_eq!(d.highlights.len(), 2);
        assert_eq!(d.highlights[0].start, Some(1.0));
        assert_eq!(d.highlights[0].end, Some(4.5));
        assert_eq!(d.highlights[1].caption(), "wave");
        assert_eq!(d.behavior_stats["smile"], 3);
    }

    #[test]
    fn highlights_not_array_is_empty() {
        let d = normalize_detail(&json!({"id": 1, "highlights": {"a": 1}}), None).unwrap();
        assert!(d.highlights.is_empty());
        let d = normalize_detail(&json!({"id": 1, "behaviorStats": [1, 2]}), None).unwrap();
        assert!(d.behavior_stats.is_empty());
    }

    #[test]
    fn every_single_id_field_normalizes() {
        for key in ID_FIELDS {
            for value in [json!(1), json!("abc"), json!(2.5)] {
                let mut obj = Map::new();
                obj.insert(key.to_string(), value);
                obj.insert("date".into(), json!(null));
                assert!(normalize(&Value::Object(obj), None).is_ok(), "{key}");
            }
        }
    }
}
