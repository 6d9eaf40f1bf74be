// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign CRUD and the lifecycle queries the dispatcher runs.

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params, params_from_iter};
use tracing::debug;

use campaigner_core::CampaignerError;
use campaigner_core::types::{Campaign, CampaignId, CampaignStatus, ServiceId, TagId};

use super::{now_ts, parse_enum, parse_opt_ts, parse_ts, placeholders, ts};
use crate::database::{Database, map_tr_err};
use crate::models::CampaignDraft;
use crate::queries::{services, templates};

const COLUMNS: &str = "id, name, email_service_id, template_id, status, scheduled_at, \
                       from_email, from_name, subject, content, created_at, updated_at";

fn row_to_campaign(row: &rusqlite::Row<'_>) -> rusqlite::Result<Campaign> {
    Ok(Campaign {
        id: CampaignId(row.get(0)?),
        name: row.get(1)?,
        email_service_id: ServiceId(row.get(2)?),
        template_id: row.get(3)?,
        status: parse_enum(4, &row.get::<_, String>(4)?)?,
        scheduled_at: parse_opt_ts(5, row.get(5)?)?,
        from_email: row.get(6)?,
        from_name: row.get(7)?,
        subject: row.get(8)?,
        content: row.get(9)?,
        created_at: parse_ts(10, &row.get::<_, String>(10)?)?,
        updated_at: parse_ts(11, &row.get::<_, String>(11)?)?,
    })
}

/// The oldest draft (by creation time, then id) that is due at `now`.
pub async fn next_eligible(
    db: &Database,
    now: DateTime<Utc>,
) -> Result<Option<Campaign>, CampaignerError> {
    let now = ts(now);
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM campaigns
                     WHERE status = 'draft' AND (scheduled_at IS NULL OR scheduled_at <= ?1)
                     ORDER BY created_at ASC, id ASC
                     LIMIT 1"
                ),
                params![now],
                row_to_campaign,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Compare-and-set on the status column.
///
/// Returns `false` if the campaign is no longer in `from` (or does not exist).
/// Edges outside the lifecycle are rejected before touching the store.
pub async fn transition_status(
    db: &Database,
    id: CampaignId,
    from: CampaignStatus,
    to: CampaignStatus,
) -> Result<bool, CampaignerError> {
    if !from.can_transition_to(to) {
        return Err(CampaignerError::InvalidTransition {
            entity: "campaign",
            id: id.0,
            detail: format!("{from} -> {to} is not a lifecycle edge"),
        });
    }
    let (from_s, to_s) = (from.to_string(), to.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaigns SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND status = ?4",
                params![to_s, now_ts(), id.0, from_s],
            )
        })
        .await
        .map(|n| n > 0)
        .map_err(map_tr_err)
}

/// Set the status without looking at the current one.
pub async fn update_status(
    db: &Database,
    id: CampaignId,
    status: CampaignStatus,
) -> Result<(), CampaignerError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE campaigns SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status, now_ts(), id.0],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn tags_for(db: &Database, id: CampaignId) -> Result<Vec<TagId>, CampaignerError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT tag_id FROM campaign_tags WHERE campaign_id = ?1 ORDER BY tag_id",
            )?;
            let rows = stmt.query_map(params![id.0], |row| Ok(TagId(row.get(0)?)))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_campaign(db: &Database, id: CampaignId) -> Result<Option<Campaign>, CampaignerError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM campaigns WHERE id = ?1"),
                params![id.0],
                row_to_campaign,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// All campaigns, optionally filtered by status, oldest first.
pub async fn list_campaigns(
    db: &Database,
    status: Option<CampaignStatus>,
) -> Result<Vec<Campaign>, CampaignerError> {
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM campaigns
                 WHERE ?1 IS NULL OR status = ?1
                 ORDER BY created_at ASC, id ASC"
            ))?;
            let rows = stmt.query_map(params![status], row_to_campaign)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Checks shared by create and update. Returns the template content to copy.
async fn validate_draft(
    db: &Database,
    draft: &CampaignDraft,
    tag_ids: &[TagId],
) -> Result<String, CampaignerError> {
    if tag_ids.is_empty() {
        return Err(CampaignerError::Validation(
            "a campaign needs at least one tag".into(),
        ));
    }
    if !draft.from_email.contains('@') {
        return Err(CampaignerError::Validation(format!(
            "`{}` is not a valid sender address",
            draft.from_email
        )));
    }
    if services::get_service(db, draft.email_service_id).await?.is_none() {
        return Err(CampaignerError::Validation(format!(
            "email service {} does not exist",
            draft.email_service_id
        )));
    }

    let ids: Vec<i64> = tag_ids.iter().map(|t| t.0).collect();
    let wanted = ids.len() as i64;
    let known: i64 = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM tags WHERE id IN ({})",
                    placeholders(ids.len())
                ),
                params_from_iter(ids.iter()),
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)?;
    if known != wanted {
        return Err(CampaignerError::Validation(
            "campaign references unknown or duplicate tags".into(),
        ));
    }

    templates::get_template(db, draft.template_id)
        .await?
        .map(|t| t.content)
        .ok_or_else(|| {
            CampaignerError::Validation(format!("template {} does not exist", draft.template_id))
        })
}

fn replace_tags(
    tx: &rusqlite::Transaction<'_>,
    id: i64,
    tag_ids: &[TagId],
) -> rusqlite::Result<()> {
    tx.execute("DELETE FROM campaign_tags WHERE campaign_id = ?1", params![id])?;
    for tag in tag_ids {
        tx.execute(
            "INSERT INTO campaign_tags (campaign_id, tag_id) VALUES (?1, ?2)",
            params![id, tag.0],
        )?;
    }
    Ok(())
}

/// Create a draft campaign, copying the template's current content into it.
pub async fn create_campaign(
    db: &Database,
    draft: &CampaignDraft,
    tag_ids: &[TagId],
) -> Result<Campaign, CampaignerError> {
    let content = validate_draft(db, draft, tag_ids).await?;
    let draft = draft.clone();
    let tag_ids = tag_ids.to_vec();
    let campaign = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let now = now_ts();
            tx.execute(
                "INSERT INTO campaigns (name, email_service_id, template_id, status, scheduled_at,
                                        from_email, from_name, subject, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 'draft', ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                params![
                    draft.name,
                    draft.email_service_id.0,
                    draft.template_id,
                    draft.scheduled_at.map(ts),
                    draft.from_email,
                    draft.from_name,
                    draft.subject,
                    content,
                    now,
                ],
            )?;
            let id = tx.last_insert_rowid();
            replace_tags(&tx, id, &tag_ids)?;
            let campaign = tx.query_row(
                &format!("SELECT {COLUMNS} FROM campaigns WHERE id = ?1"),
                params![id],
                row_to_campaign,
            )?;
            tx.commit()?;
            Ok(campaign)
        })
        .await
        .map_err(map_tr_err)?;
    debug!(campaign_id = %campaign.id, "campaign created");
    Ok(campaign)
}

/// Edit a draft campaign: re-copies the template content and replaces the
/// tag set. Returns `false` if the campaign does not exist.
///
/// Only drafts can be edited.
pub async fn update_campaign(
    db: &Database,
    id: CampaignId,
    draft: &CampaignDraft,
    tag_ids: &[TagId],
) -> Result<bool, CampaignerError> {
    let Some(current) = get_campaign(db, id).await? else {
        return Ok(false);
    };
    if current.status != CampaignStatus::Draft {
        return Err(CampaignerError::Validation(format!(
            "campaign {id} is {} and can no longer be edited",
            current.status
        )));
    }
    let content = validate_draft(db, draft, tag_ids).await?;
    let draft = draft.clone();
    let tag_ids = tag_ids.to_vec();
    let updated = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let n = tx.execute(
                "UPDATE campaigns
                 SET name = ?1, email_service_id = ?2, template_id = ?3, scheduled_at = ?4,
                     from_email = ?5, from_name = ?6, subject = ?7, content = ?8, updated_at = ?9
                 WHERE id = ?10 AND status = 'draft'",
                params![
                    draft.name,
                    draft.email_service_id.0,
                    draft.template_id,
                    draft.scheduled_at.map(ts),
                    draft.from_email,
                    draft.from_name,
                    draft.subject,
                    content,
                    now_ts(),
                    id.0,
                ],
            )?;
            if n == 0 {
                return Ok(false);
            }
            replace_tags(&tx, id.0, &tag_ids)?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)?;
    if !updated {
        // Picked by a scheduler between the read and the write.
        return Err(CampaignerError::Validation(format!(
            "campaign {id} left draft while being edited"
        )));
    }
    Ok(true)
}

/// Delete a campaign and its tag links. A campaign that is being sent
/// cannot be deleted.
pub async fn delete_campaign(db: &Database, id: CampaignId) -> Result<bool, CampaignerError> {
    let deleted = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM campaigns WHERE id = ?1 AND status != 'sending'",
                params![id.0],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if deleted > 0 {
        return Ok(true);
    }
    match get_campaign(db, id).await? {
        Some(c) => Err(CampaignerError::Validation(format!(
            "campaign {id} is {} and cannot be deleted",
            c.status
        ))),
        None => Ok(false),
    }
}
