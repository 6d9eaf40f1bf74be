// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push-notification drivers and the device tokens registered under them.
//!
//! Tokens have no unsubscribe state; removing a token deletes it.

use rusqlite::{OptionalExtension, params};
use tracing::debug;

use campaigner_core::CampaignerError;
use campaigner_core::types::{ALL_TAG, Tag};

use super::{
    ensure_all_tag_kept, ensure_tags_given, is_unique_violation, link_tags, now_ts, parse_ts,
    tags_held, unlink_tags,
};
use crate::database::{Database, map_tr_err};
use crate::models::{NewNotificationSubscriber, NotificationDriver, NotificationSubscriber};
use crate::queries::tags;

const TAG_LINKS: &str = "notification_subscriber_tags";

const COLUMNS: &str = "s.id, s.token, s.driver_id, s.first_name, s.last_name, s.created_at";

fn row_to_subscriber(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationSubscriber> {
    Ok(NotificationSubscriber {
        id: row.get(0)?,
        token: row.get(1)?,
        driver_id: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        created_at: parse_ts(5, &row.get::<_, String>(5)?)?,
    })
}

fn row_to_driver(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationDriver> {
    Ok(NotificationDriver {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

/// Register a driver, or return the existing one with the same name.
pub async fn create_driver(db: &Database, name: &str) -> Result<NotificationDriver, CampaignerError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(CampaignerError::Validation("driver name is empty".into()));
    }
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO notification_drivers (name, created_at) VALUES (?1, ?2)
                 ON CONFLICT(name) DO NOTHING",
                params![name, now_ts()],
            )?;
            conn.query_row(
                "SELECT id, name FROM notification_drivers WHERE name = ?1",
                params![name],
                row_to_driver,
            )
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_driver(db: &Database, id: i64) -> Result<Option<NotificationDriver>, CampaignerError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name FROM notification_drivers WHERE id = ?1",
                params![id],
                row_to_driver,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_drivers(db: &Database) -> Result<Vec<NotificationDriver>, CampaignerError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM notification_drivers ORDER BY id")?;
            let rows = stmt.query_map([], row_to_driver)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Register a device token under an existing driver.
///
/// Tags work as for email subscription. The driver must exist, and a token
/// can be registered once.
pub async fn add_token(
    db: &Database,
    subscriber: &NewNotificationSubscriber,
    tag_names: &[String],
    create_missing_tags: bool,
) -> Result<NotificationSubscriber, CampaignerError> {
    let token = subscriber.token.trim().to_string();
    if token.is_empty() {
        return Err(CampaignerError::Validation("notification token is empty".into()));
    }
    if get_driver(db, subscriber.driver_id).await?.is_none() {
        return Err(CampaignerError::Validation(format!(
            "notification driver {} does not exist",
            subscriber.driver_id
        )));
    }

    let names = if tag_names.is_empty() {
        vec![ALL_TAG.to_string()]
    } else {
        tag_names.to_vec()
    };
    let tag_ids = tags::resolve_tag_ids(db, &names, create_missing_tags).await?;

    let new = subscriber.clone();
    let value = token.clone();
    let inserted = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let now = now_ts();
            let res = tx.execute(
                "INSERT INTO notification_subscribers
                     (token, driver_id, first_name, last_name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![value, new.driver_id, new.first_name, new.last_name, now],
            );
            match res {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => return Ok(None),
                Err(e) => return Err(e),
            }
            let id = tx.last_insert_rowid();
            link_tags(&tx, TAG_LINKS, id, &tag_ids)?;
            let stored = tx.query_row(
                &format!("SELECT {COLUMNS} FROM notification_subscribers s WHERE s.id = ?1"),
                params![id],
                row_to_subscriber,
            )?;
            tx.commit()?;
            Ok(Some(stored))
        })
        .await
        .map_err(map_tr_err)?;

    let stored = inserted
        .ok_or_else(|| CampaignerError::Validation("notification token is already registered".into()))?;
    debug!(notification_subscriber_id = stored.id, driver_id = stored.driver_id, "token registered");
    Ok(stored)
}

pub async fn get_by_token(
    db: &Database,
    token: &str,
) -> Result<Option<NotificationSubscriber>, CampaignerError> {
    let token = token.trim().to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM notification_subscribers s WHERE s.token = ?1"),
                params![token],
                row_to_subscriber,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

async fn require(db: &Database, token: &str) -> Result<NotificationSubscriber, CampaignerError> {
    get_by_token(db, token)
        .await?
        .ok_or_else(|| CampaignerError::Validation("notification token is not registered".into()))
}

pub async fn token_tags(db: &Database, token: &str) -> Result<Vec<Tag>, CampaignerError> {
    let id = require(db, token).await?.id;
    db.connection()
        .call(move |conn| tags_held(conn, TAG_LINKS, id))
        .await
        .map_err(map_tr_err)
}

pub async fn assign_tags(
    db: &Database,
    token: &str,
    tag_names: &[String],
    create_missing_tags: bool,
) -> Result<(), CampaignerError> {
    ensure_tags_given(tag_names)?;
    let tag_ids = tags::resolve_tag_ids(db, tag_names, create_missing_tags).await?;
    let id = require(db, token).await?.id;
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            link_tags(&tx, TAG_LINKS, id, &tag_ids)?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn remove_tags(db: &Database, token: &str, tag_names: &[String]) -> Result<(), CampaignerError> {
    ensure_tags_given(tag_names)?;
    ensure_all_tag_kept(tag_names)?;
    let tag_ids = tags::resolve_tag_ids(db, tag_names, false).await?;
    let id = require(db, token).await?.id;
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            unlink_tags(&tx, TAG_LINKS, id, &tag_ids)?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a token and its tag links. Returns `false` if it was not registered.
pub async fn remove_token(db: &Database, token: &str) -> Result<bool, CampaignerError> {
    let token = token.trim().to_string();
    let removed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM notification_subscribers WHERE token = ?1",
                params![token],
            )
        })
        .await
        .map_err(map_tr_err)?;
    Ok(removed > 0)
}

/// Tokens holding the named tag, optionally only those under one driver.
/// An unknown tag matches nobody.
pub async fn list_for_tag(
    db: &Database,
    tag_name: &str,
    driver_id: Option<i64>,
) -> Result<Vec<NotificationSubscriber>, CampaignerError> {
    let Some(tag) = tags::get_tag_by_name(db, tag_name).await? else {
        return Ok(Vec::new());
    };
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM notification_subscribers s
                 JOIN {TAG_LINKS} st ON st.subscriber_id = s.id
                 WHERE st.tag_id = ?1 AND (?2 IS NULL OR s.driver_id = ?2)
                 ORDER BY s.id"
            ))?;
            let rows = stmt.query_map(params![tag.id.0, driver_id], row_to_subscriber)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
