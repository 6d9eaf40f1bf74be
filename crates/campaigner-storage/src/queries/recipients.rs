// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email subscribers, their tag memberships, and unsubscribe state.

use rusqlite::{OptionalExtension, params, params_from_iter};
use tracing::debug;

use campaigner_core::CampaignerError;
use campaigner_core::types::{ALL_TAG, Recipient, SubscriberId, Tag, TagId};

const TAG_LINKS: &str = "email_subscriber_tags";

use super::{
    ensure_all_tag_kept, is_unique_violation, link_tags, now_ts, parse_opt_ts, parse_ts,
    placeholders, tags_held, unlink_tags,
};
use crate::database::{Database, map_tr_err};
use crate::models::NewSubscriber;
use crate::queries::{events, tags};

const COLUMNS: &str =
    "s.id, s.email, s.first_name, s.last_name, s.unsubscribed_at, s.unsubscribed_event_id, s.created_at";

fn row_to_recipient(row: &rusqlite::Row<'_>) -> rusqlite::Result<Recipient> {
    Ok(Recipient {
        id: SubscriberId(row.get(0)?),
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        unsubscribed_at: parse_opt_ts(4, row.get(4)?)?,
        unsubscribed_event_id: row.get(5)?,
        created_at: parse_ts(6, &row.get::<_, String>(6)?)?,
    })
}

/// Recipients holding at least one of `tag_ids`, each exactly once, by id.
///
/// With `exclude_unsubscribed`, a recipient with either unsubscribe column
/// set is left out.
pub async fn find_by_tags(
    db: &Database,
    tag_ids: &[TagId],
    exclude_unsubscribed: bool,
) -> Result<Vec<Recipient>, CampaignerError> {
    if tag_ids.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = tag_ids.iter().map(|t| t.0).collect();
    let filter = if exclude_unsubscribed {
        " AND s.unsubscribed_at IS NULL AND s.unsubscribed_event_id IS NULL"
    } else {
        ""
    };
    let sql = format!(
        "SELECT DISTINCT {COLUMNS}
         FROM email_subscribers s
         JOIN email_subscriber_tags st ON st.subscriber_id = s.id
         WHERE st.tag_id IN ({}){filter}
         ORDER BY s.id",
        placeholders(ids.len())
    );
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(ids.iter()), row_to_recipient)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Subscribe a new address.
///
/// An empty `tag_names` list assigns the reserved `"all"` tag. With
/// `create_missing_tags`, unknown tag names are created; otherwise they are
/// a validation error. A second subscription for the same address is a
/// validation error.
pub async fn subscribe(
    db: &Database,
    subscriber: &NewSubscriber,
    tag_names: &[String],
    create_missing_tags: bool,
) -> Result<Recipient, CampaignerError> {
    let email = subscriber.email.trim().to_string();
    if !is_plausible_address(&email) {
        return Err(CampaignerError::Validation(format!(
            "`{email}` is not a valid email address"
        )));
    }

    let names = if tag_names.is_empty() {
        vec![ALL_TAG.to_string()]
    } else {
        tag_names.to_vec()
    };
    let tag_ids = tags::resolve_tag_ids(db, &names, create_missing_tags).await?;

    let first_name = subscriber.first_name.clone();
    let last_name = subscriber.last_name.clone();
    let inserted = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let now = now_ts();
            let res = tx.execute(
                "INSERT INTO email_subscribers (email, first_name, last_name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![email, first_name, last_name, now],
            );
            match res {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => return Ok(None),
                Err(e) => return Err(e),
            }
            let id = tx.last_insert_rowid();
            link_tags(&tx, TAG_LINKS, id, &tag_ids)?;
            let recipient = tx.query_row(
                &format!("SELECT {COLUMNS} FROM email_subscribers s WHERE s.id = ?1"),
                params![id],
                row_to_recipient,
            )?;
            tx.commit()?;
            Ok(Some(recipient))
        })
        .await
        .map_err(map_tr_err)?;

    let recipient = inserted.ok_or_else(|| {
        CampaignerError::Validation(format!("`{}` is already subscribed", subscriber.email.trim()))
    })?;
    debug!(subscriber_id = %recipient.id, "subscriber created");
    Ok(recipient)
}

fn is_plausible_address(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

pub async fn get_subscriber(
    db: &Database,
    id: SubscriberId,
) -> Result<Option<Recipient>, CampaignerError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM email_subscribers s WHERE s.id = ?1"),
                params![id.0],
                row_to_recipient,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Tags held by one subscriber, by name.
pub async fn subscriber_tags(
    db: &Database,
    id: SubscriberId,
) -> Result<Vec<Tag>, CampaignerError> {
    db.connection()
        .call(move |conn| tags_held(conn, TAG_LINKS, id.0))
        .await
        .map_err(map_tr_err)
}

/// Add tags to a subscriber. Tags the subscriber already holds are ignored.
pub async fn assign_tags(
    db: &Database,
    id: SubscriberId,
    tag_names: &[String],
    create_missing_tags: bool,
) -> Result<(), CampaignerError> {
    let tag_ids = tags::resolve_tag_ids(db, tag_names, create_missing_tags).await?;
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            link_tags(&tx, TAG_LINKS, id.0, &tag_ids)?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Remove tags from a subscriber. Removing `"all"` is rejected.
pub async fn remove_tags(
    db: &Database,
    id: SubscriberId,
    tag_names: &[String],
) -> Result<(), CampaignerError> {
    ensure_all_tag_kept(tag_names)?;
    let tag_ids = tags::resolve_tag_ids(db, tag_names, false).await?;
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            unlink_tags(&tx, TAG_LINKS, id.0, &tag_ids)?;
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Unsubscribe a subscriber, recording the event that caused it.
///
/// Sets both unsubscribe columns. Returns `false` if the subscriber does not
/// exist or is already unsubscribed.
pub async fn unsubscribe(
    db: &Database,
    id: SubscriberId,
    event_id: i64,
) -> Result<bool, CampaignerError> {
    if events::get_unsubscribe_event(db, event_id).await?.is_none() {
        return Err(CampaignerError::Validation(format!(
            "unsubscribe event {event_id} does not exist"
        )));
    }
    let changed = db
        .connection()
        .call(move |conn| {
            let now = now_ts();
            conn.execute(
                "UPDATE email_subscribers
                 SET unsubscribed_at = ?1, unsubscribed_event_id = ?2, updated_at = ?1
                 WHERE id = ?3 AND unsubscribed_at IS NULL AND unsubscribed_event_id IS NULL",
                params![now, event_id, id.0],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if changed > 0 {
        debug!(subscriber_id = %id, event_id, "subscriber unsubscribed");
    }
    Ok(changed > 0)
}

/// Active (not unsubscribed) subscribers holding the named tag.
pub async fn list_for_tag(db: &Database, tag_name: &str) -> Result<Vec<Recipient>, CampaignerError> {
    match tags::get_tag_by_name(db, tag_name).await? {
        Some(tag) => find_by_tags(db, &[tag.id], true).await,
        None => Ok(Vec::new()),
    }
}

pub async fn list_unsubscribed(db: &Database) -> Result<Vec<Recipient>, CampaignerError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM email_subscribers s
                 WHERE s.unsubscribed_at IS NOT NULL OR s.unsubscribed_event_id IS NOT NULL
                 ORDER BY s.id"
            ))?;
            let rows = stmt.query_map([], row_to_recipient)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::open_db;

    fn new_sub(email: &str) -> NewSubscriber {
        NewSubscriber {
            email: email.to_string(),
            first_name: "Test".into(),
            last_name: "Reader".into(),
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn empty_tag_list_assigns_all() {
        let (db, _dir) = open_db().await;
        let r = subscribe(&db, &new_sub("a@example.org"), &[], false).await.unwrap();
        let held: Vec<String> = subscriber_tags(&db, r.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(held, vec!["all"]);
        assert!(!r.is_unsubscribed());
    }

    #[tokio::test]
    async fn unknown_tags_need_create_missing() {
        let (db, _dir) = open_db().await;
        let err = subscribe(&db, &new_sub("a@example.org"), &names(&["vip"]), false)
            .await
            .unwrap_err();
        assert!(matches!(err, CampaignerError::Validation(_)));

        let r = subscribe(&db, &new_sub("a@example.org"), &names(&["VIP"]), true)
            .await
            .unwrap();
        assert_eq!(subscriber_tags(&db, r.id).await.unwrap()[0].name, "vip");
    }

    #[tokio::test]
    async fn duplicate_and_malformed_addresses_are_rejected() {
        let (db, _dir) = open_db().await;
        subscribe(&db, &new_sub("a@example.org"), &[], false).await.unwrap();

        let dup = subscribe(&db, &new_sub("a@example.org"), &[], false).await.unwrap_err();
        assert!(dup.to_string().contains("already subscribed"));

        for bad in ["", "nobody", "@example.org", "a b@example.org"] {
            let err = subscribe(&db, &new_sub(bad), &[], false).await.unwrap_err();
            assert!(matches!(err, CampaignerError::Validation(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn find_by_tags_deduplicates_across_tags() {
        let (db, _dir) = open_db().await;
        let both = subscribe(&db, &new_sub("both@example.org"), &names(&["a", "b"]), true)
            .await
            .unwrap();
        let only_b = subscribe(&db, &new_sub("b@example.org"), &names(&["b"]), true)
            .await
            .unwrap();
        let tag_ids = tags::resolve_tag_ids(&db, &names(&["a", "b"]), false).await.unwrap();

        let found = find_by_tags(&db, &tag_ids, true).await.unwrap();
        let ids: Vec<SubscriberId> = found.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![both.id, only_b.id]);
    }

    #[tokio::test]
    async fn unsubscribed_are_excluded_only_when_asked() {
        let (db, _dir) = open_db().await;
        let r = subscribe(&db, &new_sub("gone@example.org"), &[], false).await.unwrap();
        let event = events::create_unsubscribe_event(&db, 1, "bye").await.unwrap();
        assert!(unsubscribe(&db, r.id, event.id).await.unwrap());
        assert!(!unsubscribe(&db, r.id, event.id).await.unwrap());

        let gone = get_subscriber(&db, r.id).await.unwrap().unwrap();
        assert!(gone.unsubscribed_at.is_some());
        assert_eq!(gone.unsubscribed_event_id, Some(event.id));

        let all = tags::get_tag_by_name(&db, "all").await.unwrap().unwrap();
        assert!(find_by_tags(&db, &[all.id], true).await.unwrap().is_empty());
        assert_eq!(find_by_tags(&db, &[all.id], false).await.unwrap().len(), 1);
        assert_eq!(list_unsubscribed(&db).await.unwrap(), vec![gone]);
        assert!(list_for_tag(&db, "all").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn event_id_alone_marks_unsubscribed() {
        let (db, _dir) = open_db().await;
        let r = subscribe(&db, &new_sub("half@example.org"), &[], false).await.unwrap();
        let event = events::create_unsubscribe_event(&db, 0, "").await.unwrap();
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE email_subscribers SET unsubscribed_event_id = ?1 WHERE id = ?2",
                    params![event.id, r.id.0],
                )
            })
            .await
            .map_err(map_tr_err)
            .unwrap();

        let all = tags::get_tag_by_name(&db, "all").await.unwrap().unwrap();
        assert!(find_by_tags(&db, &[all.id], true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsubscribe_requires_a_known_event() {
        let (db, _dir) = open_db().await;
        let r = subscribe(&db, &new_sub("a@example.org"), &[], false).await.unwrap();
        let err = unsubscribe(&db, r.id, 77).await.unwrap_err();
        assert!(matches!(err, CampaignerError::Validation(_)));
    }

    #[tokio::test]
    async fn tag_assignment_and_removal() {
        let (db, _dir) = open_db().await;
        let r = subscribe(&db, &new_sub("a@example.org"), &[], false).await.unwrap();
        assign_tags(&db, r.id, &names(&["vip", "beta"]), true).await.unwrap();
        assign_tags(&db, r.id, &names(&["vip"]), false).await.unwrap();
        assert_eq!(subscriber_tags(&db, r.id).await.unwrap().len(), 3);

        remove_tags(&db, r.id, &names(&["beta"])).await.unwrap();
        let err = remove_tags(&db, r.id, &names(&["ALL"])).await.unwrap_err();
        assert!(matches!(err, CampaignerError::Validation(_)));

        let held: Vec<String> = subscriber_tags(&db, r.id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(held, vec!["all", "vip"]);
    }

    #[tokio::test]
    async fn empty_tag_set_matches_nobody() {
        let (db, _dir) = open_db().await;
        subscribe(&db, &new_sub("a@example.org"), &[], false).await.unwrap();
        assert!(find_by_tags(&db, &[], true).await.unwrap().is_empty());
    }
}
