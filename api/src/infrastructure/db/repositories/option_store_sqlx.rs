use async_trait::async_trait;
use sqlx::Row;

use crate::application::ports::option_store::OptionStore;
use crate::infrastructure::db::PgPool;

pub struct SqlxOptionStore {
    pub pool: PgPool,
}

impl SqlxOptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OptionStore for SqlxOptionStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        let row = sqlx::query(r#"SELECT option_value FROM flygit_options WHERE option_name = $1"#)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.get("option_value");
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn put(&self, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
        let raw = serde_json::to_string(value)?;
        sqlx::query(
            r#"INSERT INTO flygit_options (option_name, option_value)
               VALUES ($1, $2)
               ON CONFLICT (option_name)
               DO UPDATE SET option_value = EXCLUDED.option_value, updated_at = now()"#,
        )
        .bind(key)
        .bind(raw)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
