use chrono::Utc;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    get_pool,
    models::{DEFAULT_GEOFENCE_RADIUS_M, Installation, InstallationInput, Post, PostInput},
    utils::sql,
};

const INSTALLATION_COLUMNS: &str = r#"
    id,
    tenant_id,
    name,
    address,
    code,
    latitude,
    longitude,
    geofence_radius_m,
    active,
    code_rotated_at,
    created_at,
    updated_at
"#;

const POST_COLUMNS: &str = r#"
    id,
    tenant_id,
    installation_id,
    name,
    shift_start,
    shift_end,
    active_weekdays,
    required_guards,
    overtime_rate,
    active,
    created_at,
    updated_at
"#;

pub async fn create_installation(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    input: &InstallationInput,
    code: &str,
) -> Result<Installation, sqlx::Error> {
    let now = Utc::now();

    sqlx::query_as::<_, Installation>(&sql(&format!(
        r#"
        INSERT INTO
            installations (
                tenant_id,
                name,
                address,
                code,
                latitude,
                longitude,
                geofence_radius_m,
                active,
                code_rotated_at,
                created_at,
                updated_at
            )
        VALUES
            (?, ?, ?, ?, ?, ?, ?, TRUE, ?, ?, ?)
        RETURNING {INSTALLATION_COLUMNS}
        "#
    )))
    .bind(tenant_id)
    .bind(&input.name)
    .bind(&input.address)
    .bind(code)
    .bind(input.latitude)
    .bind(input.longitude)
    .bind(input.geofence_radius_m.unwrap_or(DEFAULT_GEOFENCE_RADIUS_M))
    .bind(now)
    .bind(now)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_by_id(tenant_id: Uuid, id: Uuid) -> Result<Option<Installation>, sqlx::Error> {
    sqlx::query_as::<_, Installation>(&sql(&format!(
        r#"
        SELECT {INSTALLATION_COLUMNS}
        FROM installations
        WHERE id = ? AND tenant_id = ?
        "#
    )))
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(get_pool()?)
    .await
}

/// Lookup used by the public marking protocol; inactive sites never match.
pub async fn find_active_by_code(code: &str) -> Result<Option<Installation>, sqlx::Error> {
    sqlx::query_as::<_, Installation>(&sql(&format!(
        r#"
        SELECT {INSTALLATION_COLUMNS}
        FROM installations
        WHERE code = ? AND active = TRUE
        "#
    )))
    .bind(code.trim().to_uppercase())
    .fetch_optional(get_pool()?)
    .await
}

pub async fn list_installations(tenant_id: Uuid) -> Result<Vec<Installation>, sqlx::Error> {
    sqlx::query_as::<_, Installation>(&sql(&format!(
        r#"
        SELECT {INSTALLATION_COLUMNS}
        FROM installations
        WHERE tenant_id = ?
        ORDER BY name
        "#
    )))
    .bind(tenant_id)
    .fetch_all(get_pool()?)
    .await
}

pub async fn list_active_installation_ids(tenant_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(&sql(r#"
        SELECT id
        FROM installations
        WHERE tenant_id = ? AND active = TRUE
        ORDER BY name
    "#))
    .bind(tenant_id)
    .fetch_all(get_pool()?)
    .await
}

pub async fn update_code(
    tenant_id: Uuid,
    id: Uuid,
    code: &str,
) -> Result<Option<Installation>, sqlx::Error> {
    let now = Utc::now();

    sqlx::query_as::<_, Installation>(&sql(&format!(
        r#"
        UPDATE installations
        SET
            code = ?,
            code_rotated_at = ?,
            updated_at = ?
        WHERE id = ? AND tenant_id = ?
        RETURNING {INSTALLATION_COLUMNS}
        "#
    )))
    .bind(code)
    .bind(now)
    .bind(now)
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(get_pool()?)
    .await
}

pub async fn create_post(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    input: &PostInput,
    weekdays: &[String],
) -> Result<Post, sqlx::Error> {
    let now = Utc::now();

    sqlx::query_as::<_, Post>(&sql(&format!(
        r#"
        INSERT INTO
            posts (
                tenant_id,
                installation_id,
                name,
                shift_start,
                shift_end,
                active_weekdays,
                required_guards,
                overtime_rate,
                active,
                created_at,
                updated_at
            )
        VALUES
            (?, ?, ?, ?, ?, ?, ?, ?, TRUE, ?, ?)
        RETURNING {POST_COLUMNS}
        "#
    )))
    .bind(tenant_id)
    .bind(input.installation_id)
    .bind(&input.name)
    .bind(input.shift_start)
    .bind(input.shift_end)
    .bind(weekdays)
    .bind(input.required_guards.unwrap_or(1))
    .bind(&input.overtime_rate)
    .bind(now)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_post(tenant_id: Uuid, id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&sql(&format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts
        WHERE id = ? AND tenant_id = ?
        "#
    )))
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(get_pool()?)
    .await
}

pub async fn list_posts(tenant_id: Uuid, installation_id: Uuid) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&sql(&format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts
        WHERE tenant_id = ? AND installation_id = ?
        ORDER BY name
        "#
    )))
    .bind(tenant_id)
    .bind(installation_id)
    .fetch_all(get_pool()?)
    .await
}

pub async fn list_active_posts(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    installation_id: Uuid,
) -> Result<Vec<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&sql(&format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts
        WHERE tenant_id = ? AND installation_id = ? AND active = TRUE
        ORDER BY name
        "#
    )))
    .bind(tenant_id)
    .bind(installation_id)
    .fetch_all(&mut **tx)
    .await
}

/// Posts from `ids` that belong to the tenant, with their installation.
pub async fn tenant_post_installations(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    ids: &[Uuid],
) -> Result<Vec<(Uuid, Uuid)>, sqlx::Error> {
    sqlx::query_as::<_, (Uuid, Uuid)>(&sql(r#"
        SELECT id, installation_id
        FROM posts
        WHERE tenant_id = ? AND id = ANY(?)
    "#))
    .bind(tenant_id)
    .bind(ids)
    .fetch_all(&mut **tx)
    .await
}

/// Soft deactivation; posts with history are never deleted.
pub async fn set_post_active(
    tenant_id: Uuid,
    id: Uuid,
    active: bool,
) -> Result<Option<Post>, sqlx::Error> {
    sqlx::query_as::<_, Post>(&sql(&format!(
        r#"
        UPDATE posts
        SET active = ?, updated_at = ?
        WHERE id = ? AND tenant_id = ?
        RETURNING {POST_COLUMNS}
        "#
    )))
    .bind(active)
    .bind(Utc::now())
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(get_pool()?)
    .await
}
