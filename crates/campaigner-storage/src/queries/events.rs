// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Unsubscribe events: the recorded reason a subscriber left.

use campaigner_core::CampaignerError;
use campaigner_core::types::UnsubscribeEvent;
use rusqlite::{OptionalExtension, params};

use super::now_ts;
use crate::database::{Database, map_tr_err};

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<UnsubscribeEvent> {
    Ok(UnsubscribeEvent {
        id: row.get(0)?,
        kind: row.get(1)?,
        reason: row.get(2)?,
    })
}

pub async fn create_unsubscribe_event(
    db: &Database,
    kind: u8,
    reason: &str,
) -> Result<UnsubscribeEvent, CampaignerError> {
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO email_unsubscribe_events (kind, reason, created_at)
                 VALUES (?1, ?2, ?3)",
                params![kind, reason, now_ts()],
            )?;
            Ok(UnsubscribeEvent {
                id: conn.last_insert_rowid(),
                kind,
                reason,
            })
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_unsubscribe_event(
    db: &Database,
    id: i64,
) -> Result<Option<UnsubscribeEvent>, CampaignerError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, kind, reason FROM email_unsubscribe_events WHERE id = ?1",
                params![id],
                row_to_event,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_unsubscribe_events(
    db: &Database,
) -> Result<Vec<UnsubscribeEvent>, CampaignerError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, kind, reason FROM email_unsubscribe_events ORDER BY id")?;
            let rows = stmt.query_map([], row_to_event)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
