use std::{future::Future, pin::Pin};

use sqlx::{Postgres, Transaction};

use crate::database::get_pool;
use crate::error::AppError;

pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AppError>> + Send + 'a>>;

#[derive(Debug)]
pub struct DatabaseTransaction;

impl DatabaseTransaction {
    /// Run a closure inside a transaction. Any error rolls back every write
    /// made through the transaction handle.
    pub async fn run<T, F>(f: F) -> Result<T, AppError>
    where
        F: for<'a> FnOnce(&'a mut Transaction<'static, Postgres>) -> TxFuture<'a, T>,
        T: Send,
    {
        let pool = get_pool()?;
        let mut tx = pool.begin().await?;

        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                log::warn!("Transaction failed with error: {}, rolling back", err);
                if let Err(rollback_err) = tx.rollback().await {
                    log::error!(
                        "Rollback failed after error (orig: {}, rollback: {})",
                        err,
                        rollback_err
                    );
                }
                Err(err)
            }
        }
    }
}
