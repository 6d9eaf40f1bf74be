// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email template CRUD.
//!
//! Campaigns copy a template's content when they are created or updated, so
//! edits here never reach an existing campaign.

use campaigner_core::CampaignerError;
use campaigner_core::types::EmailTemplate;
use rusqlite::{OptionalExtension, params};

use super::{now_ts, parse_ts};
use crate::database::{Database, map_tr_err};

const COLUMNS: &str = "id, name, content, created_at, updated_at";

fn row_to_template(row: &rusqlite::Row<'_>) -> rusqlite::Result<EmailTemplate> {
    Ok(EmailTemplate {
        id: row.get(0)?,
        name: row.get(1)?,
        content: row.get(2)?,
        created_at: parse_ts(3, &row.get::<_, String>(3)?)?,
        updated_at: parse_ts(4, &row.get::<_, String>(4)?)?,
    })
}

pub async fn create_template(
    db: &Database,
    name: &str,
    content: &str,
) -> Result<EmailTemplate, CampaignerError> {
    let name = name.to_string();
    let content = content.to_string();
    db.connection()
        .call(move |conn| {
            let now = now_ts();
            conn.execute(
                "INSERT INTO email_templates (name, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?3)",
                params![name, content, now],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM email_templates WHERE id = ?1"),
                params![id],
                row_to_template,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Replace a template's name and content. Returns `false` if it does not exist.
pub async fn update_template(
    db: &Database,
    id: i64,
    name: &str,
    content: &str,
) -> Result<bool, CampaignerError> {
    let name = name.to_string();
    let content = content.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE email_templates SET name = ?1, content = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![name, content, now_ts(), id],
            )
        })
        .await
        .map(|n| n > 0)
        .map_err(map_tr_err)
}

/// Delete a template. Campaigns built from it keep their copied content.
pub async fn delete_template(db: &Database, id: i64) -> Result<bool, CampaignerError> {
    db.connection()
        .call(move |conn| conn.execute("DELETE FROM email_templates WHERE id = ?1", params![id]))
        .await
        .map(|n| n > 0)
        .map_err(map_tr_err)
}

pub async fn get_template(db: &Database, id: i64) -> Result<Option<EmailTemplate>, CampaignerError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM email_templates WHERE id = ?1"),
                params![id],
                row_to_template,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_templates(db: &Database) -> Result<Vec<EmailTemplate>, CampaignerError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM email_templates ORDER BY id"))?;
            let rows = stmt.query_map([], row_to_template)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
