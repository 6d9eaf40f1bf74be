// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Email services: a transport type key plus the payload that configures it.

use campaigner_core::CampaignerError;
use campaigner_core::types::{ServiceConfig, ServiceId};
use rusqlite::{OptionalExtension, params};

use super::now_ts;
use crate::database::{Database, map_tr_err};

fn row_to_service(row: &rusqlite::Row<'_>) -> rusqlite::Result<ServiceConfig> {
    Ok(ServiceConfig {
        id: ServiceId(row.get(0)?),
        name: row.get(1)?,
        service_type: row.get(2)?,
        payload: row.get(3)?,
    })
}

/// Register a service. The payload is stored verbatim; only the matching
/// transport ever parses it.
pub async fn create_service(
    db: &Database,
    name: &str,
    service_type: &str,
    payload: &str,
) -> Result<ServiceConfig, CampaignerError> {
    if service_type.trim().is_empty() {
        return Err(CampaignerError::Validation("service type must not be empty".into()));
    }
    let name = name.trim().to_string();
    let service_type = service_type.trim().to_string();
    let payload = payload.to_string();
    db.connection()
        .call(move |conn| {
            let now = now_ts();
            conn.execute(
                "INSERT INTO email_services (name, service_type, payload, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![name, service_type, payload, now],
            )?;
            Ok(ServiceConfig {
                id: ServiceId(conn.last_insert_rowid()),
                name,
                service_type,
                payload,
            })
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_service(
    db: &Database,
    id: ServiceId,
) -> Result<Option<ServiceConfig>, CampaignerError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name, service_type, payload FROM email_services WHERE id = ?1",
                params![id.0],
                row_to_service,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_services(db: &Database) -> Result<Vec<ServiceConfig>, CampaignerError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name, service_type, payload FROM email_services ORDER BY id")?;
            let rows = stmt.query_map([], row_to_service)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_service(db: &Database, id: ServiceId) -> Result<bool, CampaignerError> {
    db.connection()
        .call(move |conn| conn.execute("DELETE FROM email_services WHERE id = ?1", params![id.0]))
        .await
        .map(|n| n > 0)
        .map_err(map_tr_err)
}
