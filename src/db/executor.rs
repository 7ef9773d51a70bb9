//! Read-only scalar execution

use crate::db::scalar::ScalarValue;
use crate::error::{InsightsError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Row, TypeInfo};
use tracing::{debug, info};
use uuid::Uuid;

const READ_ONLY_KEYWORDS: [&str; 2] = ["SELECT", "WITH"];

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run one read-only statement and return its first column of the first
    /// row, or zero when there is no row or the value is NULL.
    async fn execute_scalar(&self, sql: &str) -> Result<ScalarValue>;
}

/// Fail fast on anything that does not start with SELECT (or a WITH query).
pub fn ensure_read_only(sql: &str) -> Result<()> {
    let first_word = sql
        .trim_start()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .next()
        .unwrap_or("")
        .to_ascii_uppercase();

    if READ_ONLY_KEYWORDS.contains(&first_word.as_str()) {
        Ok(())
    } else {
        Err(InsightsError::DisallowedStatement(format!(
            "only SELECT statements are allowed, got: {}",
            sql.trim().chars().take(80).collect::<String>()
        )))
    }
}

pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueryExecutor for PgExecutor {
    async fn execute_scalar(&self, sql: &str) -> Result<ScalarValue> {
        ensure_read_only(sql)?;
        info!("Executing SQL: {}", sql);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| InsightsError::Database(format!("Failed to open transaction: {}", e)))?;

        // A WITH query could still carry a data-modifying CTE.
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(|e| InsightsError::Database(format!("Failed to set read-only mode: {}", e)))?;

        let row = sqlx::query(sql).fetch_optional(&mut *tx).await?;
        let value = match row {
            Some(row) => decode_first_column(&row)?,
            None => ScalarValue::zero(),
        };

        tx.rollback()
            .await
            .map_err(|e| InsightsError::Database(format!("Failed to close transaction: {}", e)))?;

        debug!("Query result: {}", value);
        Ok(value)
    }
}

fn decode_first_column(row: &PgRow) -> Result<ScalarValue> {
    let Some(column) = row.columns().first() else {
        return Ok(ScalarValue::zero());
    };
    let type_name = column.type_info().name().to_string();

    let value = match type_name.as_str() {
        "INT2" => row.try_get::<Option<i16>, _>(0)?.map(|v| ScalarValue::Integer(v.into())),
        "INT4" => row.try_get::<Option<i32>, _>(0)?.map(|v| ScalarValue::Integer(v.into())),
        "INT8" => row.try_get::<Option<i64>, _>(0)?.map(ScalarValue::Integer),
        "FLOAT4" => row.try_get::<Option<f32>, _>(0)?.map(|v| ScalarValue::Float(v.into())),
        "FLOAT8" => row.try_get::<Option<f64>, _>(0)?.map(ScalarValue::Float),
        "NUMERIC" => row.try_get::<Option<Decimal>, _>(0)?.map(ScalarValue::Decimal),
        "BOOL" => row.try_get::<Option<bool>, _>(0)?.map(ScalarValue::Bool),
        "UUID" => row.try_get::<Option<Uuid>, _>(0)?.map(ScalarValue::Uuid),
        "DATE" => row.try_get::<Option<NaiveDate>, _>(0)?.map(ScalarValue::Date),
        "TIMESTAMP" => row.try_get::<Option<NaiveDateTime>, _>(0)?.map(ScalarValue::Timestamp),
        "TIMESTAMPTZ" => row.try_get::<Option<DateTime<Utc>>, _>(0)?.map(ScalarValue::TimestampTz),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => row.try_get::<Option<String>, _>(0)?.map(ScalarValue::Text),
        other => {
            return Err(InsightsError::Database(format!(
                "Unsupported result column type {} for column {}",
                other,
                column.name()
            )))
        }
    };

    Ok(value.unwrap_or_else(ScalarValue::zero))
}
