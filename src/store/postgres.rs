use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use tracing::info;

use super::{PermissionStore, StoreError};
use crate::config::StorageConfig;
use crate::models::{ApplyStatus, ExternalPermission, ExternalPermissionApplyRecord, Space};

/// Postgres-backed permission tables.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &StorageConfig) -> Result<Self, StoreError> {
        let url = config
            .database_url
            .as_deref()
            .ok_or(StoreError::ConfigMissing("DATABASE_URL"))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await?;
        info!("Connected permission store (max_connections={})", config.max_connections);
        Ok(Self::new(pool))
    }

    /// Applies the bundled `migrations/` directory.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Permission schema is up to date");
        Ok(())
    }

    fn grant_from_row(row: &PgRow) -> Result<ExternalPermission, StoreError> {
        Ok(ExternalPermission {
            id: row.try_get("id")?,
            authorized_user: row.try_get("authorized_user")?,
            space_uid: row.try_get("space_uid")?,
            action_id: row.try_get("action_id")?,
            resources: row.try_get("resources")?,
            expire_time: row.try_get("expire_time")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn apply_record_from_row(row: &PgRow) -> Result<ExternalPermissionApplyRecord, StoreError> {
        let status: String = row.try_get("status")?;
        let status = ApplyStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("apply record status '{}'", status)))?;
        Ok(ExternalPermissionApplyRecord {
            id: row.try_get("id")?,
            sn: row.try_get("sn")?,
            authorized_users: row.try_get("authorized_users")?,
            space_uid: row.try_get("space_uid")?,
            action_id: row.try_get("action_id")?,
            resources: row.try_get("resources")?,
            expire_time: row.try_get("expire_time")?,
            status,
            created_at: row.try_get("created_at")?,
        })
    }

    fn space_from_row(row: &PgRow) -> Result<Space, StoreError> {
        Ok(Space {
            id: row.try_get("id")?,
            space_type_id: row.try_get("space_type_id")?,
            space_type_name: row.try_get("space_type_name")?,
            space_id: row.try_get("space_id")?,
            space_name: row.try_get("space_name")?,
            space_uid: row.try_get("space_uid")?,
            space_code: row.try_get("space_code")?,
            bk_biz_id: row.try_get("bk_biz_id")?,
            time_zone: row.try_get("time_zone")?,
        })
    }
}

fn dedup_in_order(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

#[async_trait]
impl PermissionStore for PgStore {
    async fn active_action_ids(
        &self,
        authorized_user: &str,
        space_uid: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT action_id FROM external_permission
            WHERE authorized_user = $1 AND space_uid = $2 AND expire_time > $3
            ORDER BY created_at, id
            "#,
        )
        .bind(authorized_user)
        .bind(space_uid)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let ids = rows
            .iter()
            .map(|row| row.try_get::<String, _>("action_id"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dedup_in_order(ids))
    }

    async fn active_grant(
        &self,
        authorized_user: &str,
        space_uid: &str,
        action_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ExternalPermission>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, authorized_user, space_uid, action_id, resources, expire_time, created_at
            FROM external_permission
            WHERE authorized_user = $1 AND space_uid = $2 AND action_id = $3 AND expire_time > $4
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .bind(authorized_user)
        .bind(space_uid)
        .bind(action_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::grant_from_row).transpose()
    }

    async fn authorized_spaces(&self, authorized_user: &str, now: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT space_uid FROM external_permission
            WHERE authorized_user = $1 AND expire_time > $2
            ORDER BY created_at, id
            "#,
        )
        .bind(authorized_user)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        let spaces = rows
            .iter()
            .map(|row| row.try_get::<String, _>("space_uid"))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dedup_in_order(spaces))
    }

    async fn authorizer(&self, space_uid: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query("SELECT authorizer FROM authorizer_settings WHERE space_uid = $1")
            .bind(space_uid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.try_get("authorizer")).transpose()?)
    }

    async fn spaces(&self, space_uids: &[String]) -> Result<Vec<Space>, StoreError> {
        if space_uids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query(
            r#"
            SELECT id, space_type_id, space_type_name, space_id, space_name, space_uid,
                   space_code, bk_biz_id, time_zone
            FROM space
            WHERE space_uid = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(space_uids)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::space_from_row).collect()
    }

    async fn apply_record_by_sn(&self, sn: &str) -> Result<Option<ExternalPermissionApplyRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, sn, authorized_users, space_uid, action_id, resources, expire_time, status, created_at
            FROM external_permission_apply_record
            WHERE sn = $1
            "#,
        )
        .bind(sn)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::apply_record_from_row).transpose()
    }

    async fn finish_apply_record(
        &self,
        record_id: i64,
        status: ApplyStatus,
        grants: Vec<ExternalPermission>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Only a pending record may move; a concurrent callback loses here.
        let updated = sqlx::query(
            "UPDATE external_permission_apply_record SET status = $2 WHERE id = $1 AND status = 'pending'",
        )
        .bind(record_id)
        .bind(status.as_str())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("pending apply record {}", record_id)));
        }

        for grant in grants {
            sqlx::query(
                "DELETE FROM external_permission WHERE authorized_user = $1 AND space_uid = $2 AND action_id = $3",
            )
            .bind(&grant.authorized_user)
            .bind(&grant.space_uid)
            .bind(&grant.action_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO external_permission
                    (authorized_user, space_uid, action_id, resources, expire_time, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(&grant.authorized_user)
            .bind(&grant.space_uid)
            .bind(&grant.action_id)
            .bind(&grant.resources)
            .bind(grant.expire_time)
            .bind(grant.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
