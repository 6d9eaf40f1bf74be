// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed SQL operations, one module per table group.

pub mod campaigns;
pub mod events;
pub mod messages;
pub mod mobile;
pub mod notifications;
pub mod recipients;
pub mod services;
pub mod tags;
pub mod templates;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, params};

use campaigner_core::CampaignerError;
use campaigner_core::types::{ALL_TAG, Tag, TagId};

/// Render a timestamp the way every table stores it.
pub(crate) fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn now_ts() -> String {
    ts(Utc::now())
}

/// Parse a stored timestamp column.
pub(crate) fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_opt_ts(idx: usize, raw: Option<String>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    raw.map(|r| parse_ts(idx, &r)).transpose()
}

/// Parse a strum-backed enum column.
pub(crate) fn parse_enum<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// `?1, ?2, ... ?n` for an `IN (...)` clause.
pub(crate) fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ")
}

pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Add `(subscriber_id, tag_id)` links to a `*_subscriber_tags` table.
/// Links that already exist are left alone.
pub(crate) fn link_tags(
    conn: &Connection,
    table: &str,
    subscriber_id: i64,
    tag_ids: &[TagId],
) -> rusqlite::Result<()> {
    let sql = format!("INSERT OR IGNORE INTO {table} (subscriber_id, tag_id) VALUES (?1, ?2)");
    let mut stmt = conn.prepare(&sql)?;
    for tag_id in tag_ids {
        stmt.execute(params![subscriber_id, tag_id.0])?;
    }
    Ok(())
}

pub(crate) fn unlink_tags(
    conn: &Connection,
    table: &str,
    subscriber_id: i64,
    tag_ids: &[TagId],
) -> rusqlite::Result<()> {
    let sql = format!("DELETE FROM {table} WHERE subscriber_id = ?1 AND tag_id = ?2");
    let mut stmt = conn.prepare(&sql)?;
    for tag_id in tag_ids {
        stmt.execute(params![subscriber_id, tag_id.0])?;
    }
    Ok(())
}

/// Tags linked to one subscriber in a `*_subscriber_tags` table, by name.
pub(crate) fn tags_held(conn: &Connection, table: &str, subscriber_id: i64) -> rusqlite::Result<Vec<Tag>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT t.id, t.name FROM tags t
         JOIN {table} st ON st.tag_id = t.id
         WHERE st.subscriber_id = ?1
         ORDER BY t.name"
    ))?;
    let rows = stmt.query_map(params![subscriber_id], |row| {
        Ok(Tag {
            id: TagId(row.get(0)?),
            name: row.get(1)?,
        })
    })?;
    rows.collect()
}

/// Every subscriber keeps `"all"`; removing it is a validation error.
pub(crate) fn ensure_all_tag_kept(tag_names: &[String]) -> Result<(), CampaignerError> {
    if tag_names.iter().any(|n| Tag::normalize_name(n) == ALL_TAG) {
        return Err(CampaignerError::Validation(format!(
            "tag `{ALL_TAG}` cannot be removed from a subscriber"
        )));
    }
    Ok(())
}

pub(crate) fn ensure_tags_given(tag_names: &[String]) -> Result<(), CampaignerError> {
    if tag_names.is_empty() {
        return Err(CampaignerError::Validation("no tags given".into()));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_sort_as_strings() {
        let early = DateTime::parse_from_rfc3339("2026-01-02T03:04:05.006Z")
            .unwrap()
            .with_timezone(&Utc);
        let late = early + chrono::Duration::milliseconds(1);
        assert_eq!(ts(early), "2026-01-02T03:04:05.006Z");
        assert!(ts(early) < ts(late));
        assert_eq!(parse_ts(0, &ts(early)).unwrap(), early);
    }

    #[test]
    fn bad_timestamp_is_a_conversion_error() {
        let err = parse_ts(4, "yesterday").unwrap_err();
        assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(4, ..)));
    }

    #[test]
    fn placeholder_list() {
        assert_eq!(placeholders(3), "?1, ?2, ?3");
    }
}
