use uuid::Uuid;

use crate::database::{
    models::{Guard, GuardInput, GuardWithAccount, normalize_rut},
    repositories::{guard as guard_repo, installation as installation_repo},
    transaction::DatabaseTransaction,
};
use crate::error::AppError;

pub fn validate_guard(input: &GuardInput) -> Result<String, AppError> {
    if input.first_name.trim().is_empty() || input.last_name.trim().is_empty() {
        return Err(AppError::validation("First and last name are required"));
    }
    if let Some(account) = &input.bank_account {
        if account.account_number.trim().is_empty() || account.bank_name.trim().is_empty() {
            return Err(AppError::validation(
                "Bank account needs a bank name and an account number",
            ));
        }
    }

    normalize_rut(&input.rut)
        .ok_or_else(|| AppError::validation(format!("Invalid RUT: {}", input.rut)))
}

/// Create the guard and, when given, their default bank account. Either both
/// rows exist afterwards or neither does.
pub async fn create_guard(tenant_id: Uuid, input: GuardInput) -> Result<GuardWithAccount, AppError> {
    let rut = validate_guard(&input)?;

    if let Some(installation_id) = input.installation_id {
        installation_repo::find_by_id(tenant_id, installation_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Installation {} not found", installation_id))
            })?;
    }

    let created = DatabaseTransaction::run(move |tx| {
        Box::pin(async move {
            let guard = guard_repo::create_guard(tx, tenant_id, &rut, &input)
                .await
                .map_err(|e| match AppError::from(e) {
                    AppError::Conflict(_) => {
                        AppError::conflict(format!("A guard with RUT {} already exists", rut))
                    }
                    other => other,
                })?;

            let bank_account = match &input.bank_account {
                Some(account) => {
                    Some(guard_repo::create_default_bank_account(tx, guard.id, account).await?)
                }
                None => None,
            };

            Ok(GuardWithAccount {
                guard,
                bank_account,
            })
        })
    })
    .await?;

    log::info!(
        "Guard {} created (bank account: {})",
        created.guard.id,
        created.bank_account.is_some()
    );
    Ok(created)
}

pub async fn list_guards(tenant_id: Uuid) -> Result<Vec<Guard>, AppError> {
    Ok(guard_repo::list_guards(tenant_id).await?)
}

/// Toggle the flags that gate planning and marking.
pub async fn set_flags(
    tenant_id: Uuid,
    id: Uuid,
    active: bool,
    blacklisted: bool,
) -> Result<Guard, AppError> {
    let guard = guard_repo::set_flags(tenant_id, id, active, blacklisted)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Guard {} not found", id)))?;

    log::info!(
        "Guard {} flags set: active={}, blacklisted={}",
        guard.id,
        guard.active,
        guard.blacklisted
    );
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::BankAccountInput;
    use pretty_assertions::assert_eq;

    fn input(rut: &str) -> GuardInput {
        GuardInput {
            rut: rut.to_string(),
            first_name: "Ana".to_string(),
            last_name: "Soto".to_string(),
            email: None,
            phone: None,
            installation_id: None,
            bank_account: None,
        }
    }

    #[test]
    fn test_rut_is_normalized() {
        assert_eq!(validate_guard(&input("12.345.678-5")).unwrap(), "12345678-5");
    }

    #[test]
    fn test_invalid_rut_is_validation_error() {
        assert!(matches!(
            validate_guard(&input("12.345.678-0")),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_blank_account_number_is_rejected() {
        let with_blank_account = GuardInput {
            bank_account: Some(BankAccountInput {
                bank_name: "Banco Estado".to_string(),
                account_type: "cuenta_rut".to_string(),
                account_number: "  ".to_string(),
            }),
            ..input("12.345.678-5")
        };
        assert!(validate_guard(&with_blank_account).is_err());
    }
}
