// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mobile (SMS) subscribers, their tags, and their unsubscribe events.
//!
//! Subscribers are looked up by mobile number, which is unique.

use rusqlite::{OptionalExtension, params};
use tracing::debug;

use campaigner_core::CampaignerError;
use campaigner_core::types::{ALL_TAG, Tag, UnsubscribeEvent};

use super::{
    ensure_all_tag_kept, ensure_tags_given, is_unique_violation, link_tags, now_ts, parse_opt_ts,
    parse_ts, tags_held, unlink_tags,
};
use crate::database::{Database, map_tr_err};
use crate::models::{MobileSubscriber, NewMobileSubscriber};
use crate::queries::tags;

const TAG_LINKS: &str = "mobile_subscriber_tags";

const COLUMNS: &str = "s.id, s.country_code, s.mobile, s.first_name, s.last_name, \
                       s.unsubscribed_at, s.unsubscribed_event_id, s.created_at";

const ACTIVE: &str = "s.unsubscribed_at IS NULL AND s.unsubscribed_event_id IS NULL";

fn row_to_subscriber(row: &rusqlite::Row<'_>) -> rusqlite::Result<MobileSubscriber> {
    Ok(MobileSubscriber {
        id: row.get(0)?,
        country_code: row.get(1)?,
        mobile: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        unsubscribed_at: parse_opt_ts(5, row.get(5)?)?,
        unsubscribed_event_id: row.get(6)?,
        created_at: parse_ts(7, &row.get::<_, String>(7)?)?,
    })
}

/// Subscribe a mobile number. Tag handling matches email subscription: an
/// empty list assigns `"all"`, unknown names need `create_missing_tags`.
pub async fn subscribe(
    db: &Database,
    subscriber: &NewMobileSubscriber,
    tag_names: &[String],
    create_missing_tags: bool,
) -> Result<MobileSubscriber, CampaignerError> {
    let mobile = subscriber.mobile.trim().to_string();
    if mobile.is_empty() || !mobile.chars().all(|c| c.is_ascii_digit() || c == '+') {
        return Err(CampaignerError::Validation(format!(
            "`{mobile}` is not a valid mobile number"
        )));
    }

    let names = if tag_names.is_empty() {
        vec![ALL_TAG.to_string()]
    } else {
        tag_names.to_vec()
    };
    let tag_ids = tags::resolve_tag_ids(db, &names, create_missing_tags).await?;

    let new = subscriber.clone();
    let number = mobile.clone();
    let inserted = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let now = now_ts();
            let res = tx.execute(
                "INSERT INTO mobile_subscribers
                     (country_code, mobile, first_name, last_name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![new.country_code.trim(), number, new.first_name, new.last_name, now],
            );
            match res {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => return Ok(None),
                Err(e) => return Err(e),
            }
            let id = tx.last_insert_rowid();
            link_tags(&tx, TAG_LINKS, id, &tag_ids)?;
            let stored = tx.query_row(
                &format!("SELECT {COLUMNS} FROM mobile_subscribers s WHERE s.id = ?1"),
                params![id],
                row_to_subscriber,
            )?;
            tx.commit()?;
            Ok(Some(stored))
        })
        .await
        .map_err(map_tr_err)?;

    let stored = inserted
        .ok_or_else(|| CampaignerError::Validation(format!("`{mobile}` is already subscribed")))?;
    debug!(mobile_subscriber_id = stored.id, "mobile subscriber created");
    Ok(stored)
}

pub async fn get_by_mobile(
    db: &Database,
    mobile: &str,
) -> Result<Option<MobileSubscriber>, CampaignerError> {
    let mobile = mobile.trim().to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM mobile_subscribers s WHERE s.mobile = ?1"),
                params![mobile],
                row_to_subscriber,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

async fn require(db: &Database, mobile: &str) -> Result<MobileSubscriber, CampaignerError> {
    get_by_mobile(db, mobile)
        .await?
        .ok_or_else(|| CampaignerError::Validation(format!("mobile `{mobile}` is not subscribed")))
}

pub async fn subscriber_tags(db: &Database, mobile: &str) -> Result<Vec<Tag>, CampaignerError> {
    let id = require(db, mobile).await?.id;
    db.connection()
        .call(move |conn| tags_held(conn, TAG_LINKS, id))
        .await
        .map_err(map_tr_err)
}

pub async fn assign_tags(
    db: &Database,
    mobile: &str,
    tag_names: &[String],
    create_missing_tags: bool,
) -> Result<(), CampaignerError> {
    ensure_tags_given(tag_names)?;
    let tag_ids = tags::resolve_tag_ids(db, tag_names, create_missing_tags).await?;
    let id = require(db, mobile).await?.id;
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            link_tags(&tx, TAG_LINKS, id, &tag_ids)?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn remove_tags(
    db: &Database,
    mobile: &str,
    tag_names: &[String],
) -> Result<(), CampaignerError> {
    ensure_tags_given(tag_names)?;
    ensure_all_tag_kept(tag_names)?;
    let tag_ids = tags::resolve_tag_ids(db, tag_names, false).await?;
    let id = require(db, mobile).await?.id;
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            unlink_tags(&tx, TAG_LINKS, id, &tag_ids)?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Unsubscribe a mobile number with the event that caused it. Returns
/// `false` when the number is already unsubscribed.
pub async fn unsubscribe(db: &Database, mobile: &str, event_id: i64) -> Result<bool, CampaignerError> {
    if get_unsubscribe_event(db, event_id).await?.is_none() {
        return Err(CampaignerError::Validation(format!(
            "mobile unsubscribe event {event_id} does not exist"
        )));
    }
    let id = require(db, mobile).await?.id;
    let changed = db
        .connection()
        .call(move |conn| {
            let now = now_ts();
            conn.execute(
                &format!(
                    "UPDATE mobile_subscribers AS s
                     SET unsubscribed_at = ?1, unsubscribed_event_id = ?2, updated_at = ?1
                     WHERE s.id = ?3 AND {ACTIVE}"
                ),
                params![now, event_id, id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed > 0 {
        debug!(mobile_subscriber_id = id, event_id, "mobile subscriber unsubscribed");
    }
    Ok(changed > 0)
}

/// Active mobile subscribers holding the named tag. An unknown tag matches
/// nobody.
pub async fn list_for_tag(
    db: &Database,
    tag_name: &str,
) -> Result<Vec<MobileSubscriber>, CampaignerError> {
    let Some(tag) = tags::get_tag_by_name(db, tag_name).await? else {
        return Ok(Vec::new());
    };
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM mobile_subscribers s
                 JOIN {TAG_LINKS} st ON st.subscriber_id = s.id
                 WHERE st.tag_id = ?1 AND {ACTIVE}
                 ORDER BY s.id"
            ))?;
            let rows = stmt.query_map(params![tag.id.0], row_to_subscriber)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_unsubscribed(db: &Database) -> Result<Vec<MobileSubscriber>, CampaignerError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM mobile_subscribers s
                 WHERE NOT ({ACTIVE})
                 ORDER BY s.id"
            ))?;
            let rows = stmt.query_map([], row_to_subscriber)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

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
                "INSERT INTO mobile_unsubscribe_events (kind, reason, created_at)
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
                "SELECT id, kind, reason FROM mobile_unsubscribe_events WHERE id = ?1",
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
                conn.prepare("SELECT id, kind, reason FROM mobile_unsubscribe_events ORDER BY id")?;
            let rows = stmt.query_map([], row_to_event)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
