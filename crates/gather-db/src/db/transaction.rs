//! Database transaction utilities
//!
//! This module provides utilities for working with database transactions,
//! particularly for multi-step operations that need atomicity.

use gather_core::AppError;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

/// A database transaction wrapper with explicit commit/rollback
///
/// A guard dropped without `commit` or `rollback` is rolled back by sqlx when
/// the connection returns to the pool; the drop is logged.
///
/// # Example
///
/// ```ignore
/// use gather_db::TransactionGuard;
///
/// async fn example(pool: &sqlx::PgPool) -> Result<(), gather_core::AppError> {
///     let mut tx = TransactionGuard::begin(pool).await?;
///     sqlx::query("UPDATE ...").execute(tx.conn()?).await?;
///     tx.commit().await
/// }
/// ```
pub struct TransactionGuard {
    transaction: Option<Transaction<'static, Postgres>>,
}

impl TransactionGuard {
    /// Begin a new database transaction
    pub async fn begin(pool: &PgPool) -> Result<Self, AppError> {
        let transaction = pool.begin().await?;
        Ok(Self {
            transaction: Some(transaction),
        })
    }

    /// Connection bound to the open transaction
    pub fn conn(&mut self) -> Result<&mut PgConnection, AppError> {
        match self.transaction.as_mut() {
            Some(tx) => Ok(&mut **tx),
            None => Err(AppError::Internal(
                "Transaction was already committed or rolled back".to_string(),
            )),
        }
    }

    /// Commit the transaction
    pub async fn commit(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.commit().await?;
        }
        Ok(())
    }

    /// Rollback the transaction
    pub async fn rollback(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.transaction.take() {
            tx.rollback().await?;
        }
        Ok(())
    }
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        if self.transaction.is_some() {
            tracing::warn!(
                "Transaction was dropped without explicit commit or rollback - rolling back"
            );
        }
    }
}
