// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The message ledger: one row per attempted delivery.
//!
//! `(subscriber_id, source_id, source_type)` is unique, so a row's existence
//! means "already attempted" whatever its outcome.

use rusqlite::{OptionalExtension, params};

use campaigner_core::CampaignerError;
use campaigner_core::types::{DeliveryMessage, ServiceId, SourceType, SubscriberId};

use super::{parse_enum, parse_opt_ts, parse_ts, ts};
use crate::database::{Database, map_tr_err};

const COLUMNS: &str = "id, subscriber_id, source_id, source_type, recipient_email, \
                       email_service_id, from_email, from_name, subject, body, \
                       queued_at, sent_at, failed_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeliveryMessage> {
    Ok(DeliveryMessage {
        id: Some(row.get(0)?),
        subscriber_id: SubscriberId(row.get(1)?),
        source_id: row.get(2)?,
        source_type: parse_enum(3, &row.get::<_, String>(3)?)?,
        recipient_email: row.get(4)?,
        email_service_id: ServiceId(row.get(5)?),
        from_email: row.get(6)?,
        from_name: row.get(7)?,
        subject: row.get(8)?,
        body: row.get(9)?,
        queued_at: parse_ts(10, &row.get::<_, String>(10)?)?,
        sent_at: parse_opt_ts(11, row.get(11)?)?,
        failed_at: parse_opt_ts(12, row.get(12)?)?,
    })
}

pub async fn exists(
    db: &Database,
    subscriber_id: SubscriberId,
    source_id: i64,
    source_type: SourceType,
) -> Result<bool, CampaignerError> {
    let source_type = source_type.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT 1 FROM email_messages
                 WHERE subscriber_id = ?1 AND source_id = ?2 AND source_type = ?3",
                params![subscriber_id.0, source_id, source_type],
                |_| Ok(()),
            )
            .optional()
        })
        .await
        .map(|row| row.is_some())
        .map_err(map_tr_err)
}

/// Insert a message. Returns the new row id, or `None` when a row with the
/// same dedup key is already there.
pub async fn create(db: &Database, msg: &DeliveryMessage) -> Result<Option<i64>, CampaignerError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO email_messages (subscriber_id, source_id, source_type, recipient_email,
                                             email_service_id, from_email, from_name, subject, body,
                                             queued_at, sent_at, failed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(subscriber_id, source_id, source_type) DO NOTHING",
                params![
                    msg.subscriber_id.0,
                    msg.source_id,
                    msg.source_type.to_string(),
                    msg.recipient_email,
                    msg.email_service_id.0,
                    msg.from_email,
                    msg.from_name,
                    msg.subject,
                    msg.body,
                    ts(msg.queued_at),
                    msg.sent_at.map(ts),
                    msg.failed_at.map(ts),
                ],
            )?;
            Ok((inserted > 0).then(|| conn.last_insert_rowid()))
        })
        .await
        .map_err(map_tr_err)
}

/// Persist the outcome of a created message.
///
/// Only a row with no outcome yet is written, so a recorded `sent_at` or
/// `failed_at` is never cleared or replaced.
pub async fn update(db: &Database, msg: &DeliveryMessage) -> Result<(), CampaignerError> {
    let Some(id) = msg.id else {
        return Err(CampaignerError::InvalidTransition {
            entity: "delivery message",
            id: 0,
            detail: "message has not been persisted".into(),
        });
    };
    if msg.sent_at.is_none() && msg.failed_at.is_none() {
        return Ok(());
    }
    let sent_at = msg.sent_at.map(ts);
    let failed_at = msg.failed_at.map(ts);
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE email_messages SET sent_at = ?1, failed_at = ?2
                 WHERE id = ?3 AND sent_at IS NULL AND failed_at IS NULL",
                params![sent_at, failed_at, id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(CampaignerError::InvalidTransition {
            entity: "delivery message",
            id,
            detail: "missing, or outcome already recorded".into(),
        });
    }
    Ok(())
}

pub async fn get_message(db: &Database, id: i64) -> Result<Option<DeliveryMessage>, CampaignerError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM email_messages WHERE id = ?1"),
                params![id],
                row_to_message,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Every message produced by one source (e.g. one campaign), in insert order.
pub async fn list_for_source(
    db: &Database,
    source_id: i64,
    source_type: SourceType,
) -> Result<Vec<DeliveryMessage>, CampaignerError> {
    let source_type = source_type.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM email_messages
                 WHERE source_id = ?1 AND source_type = ?2
                 ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![source_id, source_type], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
