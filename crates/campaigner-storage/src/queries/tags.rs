// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tag operations. Names are stored lower-case and are unique.

use campaigner_core::types::{ALL_TAG, Tag, TagId};
use campaigner_core::CampaignerError;
use rusqlite::{OptionalExtension, params};

use super::now_ts;
use crate::database::{Database, map_tr_err};

fn row_to_tag(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: TagId(row.get(0)?),
        name: row.get(1)?,
    })
}

fn normalized(name: &str) -> Result<String, CampaignerError> {
    let name = Tag::normalize_name(name);
    if name.is_empty() {
        return Err(CampaignerError::Validation("tag name must not be empty".into()));
    }
    Ok(name)
}

/// Get-or-create a tag by name.
pub async fn create_tag(db: &Database, name: &str) -> Result<Tag, CampaignerError> {
    let name = normalized(name)?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tags (name, created_at) VALUES (?1, ?2)
                 ON CONFLICT(name) DO NOTHING",
                params![name, now_ts()],
            )?;
            conn.query_row(
                "SELECT id, name FROM tags WHERE name = ?1",
                params![name],
                row_to_tag,
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_tag_by_name(db: &Database, name: &str) -> Result<Option<Tag>, CampaignerError> {
    let name = Tag::normalize_name(name);
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name FROM tags WHERE name = ?1",
                params![name],
                row_to_tag,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_tags(db: &Database) -> Result<Vec<Tag>, CampaignerError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY name")?;
            let rows = stmt.query_map([], row_to_tag)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a tag by name. Returns `false` if no such tag exists.
///
/// The reserved `"all"` tag cannot be deleted.
pub async fn delete_tag(db: &Database, name: &str) -> Result<bool, CampaignerError> {
    let name = Tag::normalize_name(name);
    if name == ALL_TAG {
        return Err(CampaignerError::Validation(format!(
            "tag `{ALL_TAG}` is reserved and cannot be deleted"
        )));
    }
    db.connection()
        .call(move |conn| conn.execute("DELETE FROM tags WHERE name = ?1", params![name]))
        .await
        .map(|n| n > 0)
        .map_err(map_tr_err)
}

/// Map tag names to ids.
///
/// With `create_missing`, unknown names are created. Otherwise any unknown
/// name is a validation error naming every missing tag.
pub async fn resolve_tag_ids(
    db: &Database,
    names: &[String],
    create_missing: bool,
) -> Result<Vec<TagId>, CampaignerError> {
    let mut ids = Vec::with_capacity(names.len());
    let mut missing = Vec::new();
    for name in names {
        let tag = if create_missing {
            Some(create_tag(db, name).await?)
        } else {
            get_tag_by_name(db, name).await?
        };
        match tag {
            Some(tag) if !ids.contains(&tag.id) => ids.push(tag.id),
            Some(_) => {}
            None => missing.push(Tag::normalize_name(name)),
        }
    }
    if !missing.is_empty() {
        return Err(CampaignerError::Validation(format!(
            "unknown tags: {}",
            missing.join(", ")
        )));
    }
    Ok(ids)
}
