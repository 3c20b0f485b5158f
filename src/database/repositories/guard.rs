use chrono::Utc;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::database::{
    get_pool,
    models::{BankAccount, BankAccountInput, Guard, GuardInput},
    utils::sql,
};

const GUARD_COLUMNS: &str = r#"
    id,
    tenant_id,
    rut,
    first_name,
    last_name,
    email,
    phone,
    installation_id,
    active,
    blacklisted,
    created_at,
    updated_at
"#;

pub async fn create_guard(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: Uuid,
    rut: &str,
    input: &GuardInput,
) -> Result<Guard, sqlx::Error> {
    let now = Utc::now();

    sqlx::query_as::<_, Guard>(&sql(&format!(
        r#"
        INSERT INTO
            guards (
                tenant_id,
                rut,
                first_name,
                last_name,
                email,
                phone,
                installation_id,
                active,
                blacklisted,
                created_at,
                updated_at
            )
        VALUES
            (?, ?, ?, ?, ?, ?, ?, TRUE, FALSE, ?, ?)
        RETURNING {GUARD_COLUMNS}
        "#
    )))
    .bind(tenant_id)
    .bind(rut)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(input.installation_id)
    .bind(now)
    .bind(now)
    .fetch_one(&mut **tx)
    .await
}

/// Adds an account and makes it the guard's only default one.
pub async fn create_default_bank_account(
    tx: &mut Transaction<'_, Postgres>,
    guard_id: Uuid,
    input: &BankAccountInput,
) -> Result<BankAccount, sqlx::Error> {
    sqlx::query(&sql(r#"
        UPDATE guard_bank_accounts
        SET is_default = FALSE
        WHERE guard_id = ? AND is_default = TRUE
    "#))
    .bind(guard_id)
    .execute(&mut **tx)
    .await?;

    sqlx::query_as::<_, BankAccount>(&sql(r#"
        INSERT INTO
            guard_bank_accounts (
                guard_id,
                bank_name,
                account_type,
                account_number,
                is_default,
                created_at
            )
        VALUES
            (?, ?, ?, ?, TRUE, ?)
        RETURNING
            id,
            guard_id,
            bank_name,
            account_type,
            account_number,
            is_default,
            created_at
    "#))
    .bind(guard_id)
    .bind(&input.bank_name)
    .bind(&input.account_type)
    .bind(&input.account_number)
    .bind(Utc::now())
    .fetch_one(&mut **tx)
    .await
}

pub async fn find_by_id(tenant_id: Uuid, id: Uuid) -> Result<Option<Guard>, sqlx::Error> {
    sqlx::query_as::<_, Guard>(&sql(&format!(
        r#"
        SELECT {GUARD_COLUMNS}
        FROM guards
        WHERE id = ? AND tenant_id = ?
        "#
    )))
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(get_pool()?)
    .await
}

/// `rut` must already be normalized.
pub async fn find_by_rut(tenant_id: Uuid, rut: &str) -> Result<Option<Guard>, sqlx::Error> {
    sqlx::query_as::<_, Guard>(&sql(&format!(
        r#"
        SELECT {GUARD_COLUMNS}
        FROM guards
        WHERE tenant_id = ? AND rut = ?
        "#
    )))
    .bind(tenant_id)
    .bind(rut)
    .fetch_optional(get_pool()?)
    .await
}

pub async fn list_guards(tenant_id: Uuid) -> Result<Vec<Guard>, sqlx::Error> {
    sqlx::query_as::<_, Guard>(&sql(&format!(
        r#"
        SELECT {GUARD_COLUMNS}
        FROM guards
        WHERE tenant_id = ?
        ORDER BY last_name, first_name
        "#
    )))
    .bind(tenant_id)
    .fetch_all(get_pool()?)
    .await
}

pub async fn set_flags(
    tenant_id: Uuid,
    id: Uuid,
    active: bool,
    blacklisted: bool,
) -> Result<Option<Guard>, sqlx::Error> {
    sqlx::query_as::<_, Guard>(&sql(&format!(
        r#"
        UPDATE guards
        SET active = ?, blacklisted = ?, updated_at = ?
        WHERE id = ? AND tenant_id = ?
        RETURNING {GUARD_COLUMNS}
        "#
    )))
    .bind(active)
    .bind(blacklisted)
    .bind(Utc::now())
    .bind(id)
    .bind(tenant_id)
    .fetch_optional(get_pool()?)
    .await
}
