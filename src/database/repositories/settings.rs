use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::database::{get_pool, utils::sql};

pub async fn find_document(tenant_id: Uuid) -> Result<Option<Value>, sqlx::Error> {
    sqlx::query_scalar::<_, Value>(&sql(r#"
        SELECT document
        FROM tenant_settings
        WHERE tenant_id = ?
    "#))
    .bind(tenant_id)
    .fetch_optional(get_pool()?)
    .await
}

pub async fn upsert_document(tenant_id: Uuid, document: &Value) -> Result<(), sqlx::Error> {
    sqlx::query(&sql(r#"
        INSERT INTO
            tenant_settings (tenant_id, document, updated_at)
        VALUES
            (?, ?, ?)
        ON CONFLICT (tenant_id) DO UPDATE
        SET
            document = EXCLUDED.document,
            updated_at = EXCLUDED.updated_at
    "#))
    .bind(tenant_id)
    .bind(document)
    .bind(Utc::now())
    .execute(get_pool()?)
    .await?;

    Ok(())
}
