use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tokio::sync::Mutex;

use ebbinghaus_algo::{LearningUnit, ReviewOffsets, UnitReview};

use crate::db::config::SqliteConfig;
use crate::db::sqlite_schema::{
    split_sql_statements, strip_comment_lines, EBBINGHAUS_SCHEMA_SQL, SCHEMA_VERSION,
};
use crate::db::{
    apply_learned, apply_review_completion, check_target, EbbinghausPlan, MutationOutcome,
    StoreError,
};

const PLAN_COLUMNS: &str = r#""id","userId","wordbookId","totalWords","targetWords","wordsPerDay","reviewOffsets","createdAt","updatedAt""#;

/// Durable store backed by a local SQLite file.
///
/// Mutations run in a transaction behind a process-wide write lock, so two
/// completion requests for the same cell are applied one after the other
/// and each observes the previous one's result.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl SqliteStore {
    pub async fn open(config: &SqliteConfig) -> Result<Self, SqliteInitError> {
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SqliteInitError::Io(e.to_string()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(config.journal_mode.to_sqlx())
            .busy_timeout(config.busy_timeout)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(SqliteInitError::Sqlx)?;

        run_sqlite_migrations(&pool).await?;
        tracing::info!(path = %config.path.display(), "sqlite plan store ready");

        Ok(Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub(crate) async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub(crate) async fn insert_plan(&self, plan: &EbbinghausPlan) -> Result<(), StoreError> {
        let offsets_json = serde_json::to_string(&plan.review_offsets)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let _guard = self.write_lock.lock().await;
        sqlx::query(
            r#"INSERT INTO "ebbinghaus_plans" ("id","userId","wordbookId","totalWords","targetWords","wordsPerDay","reviewOffsets","createdAt","updatedAt")
               VALUES (?,?,?,?,?,?,?,?,?)"#,
        )
        .bind(&plan.id)
        .bind(&plan.user_id)
        .bind(&plan.wordbook_id)
        .bind(plan.total_words)
        .bind(plan.target_words)
        .bind(plan.words_per_day)
        .bind(offsets_json)
        .bind(format_ts(plan.created_at))
        .bind(format_ts(plan.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub(crate) async fn get_plan(&self, plan_id: &str) -> Result<Option<EbbinghausPlan>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        fetch_plan(&mut conn, plan_id).await
    }

    pub(crate) async fn update_provisioned_words(
        &self,
        plan_id: &str,
        total_words: i64,
        now: DateTime<Utc>,
    ) -> Result<EbbinghausPlan, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"UPDATE "ebbinghaus_plans" SET "totalWords" = ?, "updatedAt" = ? WHERE "id" = ?"#,
        )
        .bind(total_words)
        .bind(format_ts(now))
        .bind(plan_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::PlanNotFound(plan_id.to_string()));
        }

        let plan = fetch_plan(&mut tx, plan_id)
            .await?
            .ok_or_else(|| StoreError::PlanNotFound(plan_id.to_string()))?;
        tx.commit().await?;
        Ok(plan)
    }

    pub(crate) async fn list_units(&self, plan_id: &str) -> Result<Vec<LearningUnit>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        if fetch_plan(&mut conn, plan_id).await?.is_none() {
            return Err(StoreError::PlanNotFound(plan_id.to_string()));
        }

        let unit_rows = sqlx::query(
            r#"SELECT "id","unitNumber","isLearned","learnedAt"
               FROM "learning_units" WHERE "planId" = ? ORDER BY "unitNumber" ASC"#,
        )
        .bind(plan_id)
        .fetch_all(&mut *conn)
        .await?;

        let review_rows = sqlx::query(
            r#"SELECT r."unitId", r."reviewOrder", r."scheduledDate", r."isCompleted", r."completedAt"
               FROM "unit_reviews" r
               JOIN "learning_units" u ON u."id" = r."unitId"
               WHERE u."planId" = ?
               ORDER BY r."reviewOrder" ASC"#,
        )
        .bind(plan_id)
        .fetch_all(&mut *conn)
        .await?;

        let mut reviews_by_unit: HashMap<String, Vec<UnitReview>> = HashMap::new();
        for row in &review_rows {
            let unit_id: String = row.try_get("unitId")?;
            reviews_by_unit
                .entry(unit_id)
                .or_default()
                .push(map_review_row(row)?);
        }

        unit_rows
            .iter()
            .map(|row| {
                let (unit_id, mut unit) = map_unit_row(row)?;
                unit.reviews = reviews_by_unit.remove(&unit_id).unwrap_or_default();
                Ok(unit)
            })
            .collect()
    }

    pub(crate) async fn mutate_unit(
        &self,
        plan_id: &str,
        unit_number: u32,
        review_order: Option<u32>,
        at: DateTime<Utc>,
    ) -> Result<MutationOutcome, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let plan = fetch_plan(&mut tx, plan_id)
            .await?
            .ok_or_else(|| StoreError::PlanNotFound(plan_id.to_string()))?;
        check_target(&plan, unit_number, review_order)?;

        let (unit_id, mut unit) = match fetch_unit(&mut tx, plan_id, unit_number).await? {
            Some(existing) => existing,
            None => (uuid::Uuid::new_v4().to_string(), LearningUnit::new(unit_number)),
        };

        let changed = match review_order {
            None => apply_learned(&mut unit, at),
            Some(order) => apply_review_completion(&mut unit, order, &plan.review_offsets, at),
        };

        if changed {
            write_unit(&mut tx, plan_id, &unit_id, &unit, at).await?;
        }
        tx.commit().await?;

        Ok(MutationOutcome { unit, changed })
    }
}

async fn run_sqlite_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    let version: Option<String> =
        sqlx::query_scalar(r#"SELECT "value" FROM "_db_metadata" WHERE "key" = 'schema_version'"#)
            .fetch_optional(pool)
            .await
            .unwrap_or(None);

    if version.is_some() {
        return Ok(());
    }

    for stmt in split_sql_statements(EBBINGHAUS_SCHEMA_SQL) {
        let Some(sql) = strip_comment_lines(&stmt) else {
            continue;
        };
        sqlx::query(&sql)
            .execute(pool)
            .await
            .map_err(SqliteInitError::Sqlx)?;
    }

    sqlx::query(
        r#"INSERT OR REPLACE INTO "_db_metadata" ("key", "value") VALUES ('schema_version', ?)"#,
    )
    .bind(SCHEMA_VERSION)
    .execute(pool)
    .await
    .map_err(SqliteInitError::Sqlx)?;

    Ok(())
}

async fn fetch_plan(
    conn: &mut SqliteConnection,
    plan_id: &str,
) -> Result<Option<EbbinghausPlan>, StoreError> {
    let sql = format!(r#"SELECT {PLAN_COLUMNS} FROM "ebbinghaus_plans" WHERE "id" = ?"#);
    let row = sqlx::query(&sql)
        .bind(plan_id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(map_plan_row).transpose()
}

async fn fetch_unit(
    conn: &mut SqliteConnection,
    plan_id: &str,
    unit_number: u32,
) -> Result<Option<(String, LearningUnit)>, StoreError> {
    let row = sqlx::query(
        r#"SELECT "id","unitNumber","isLearned","learnedAt"
           FROM "learning_units" WHERE "planId" = ? AND "unitNumber" = ?"#,
    )
    .bind(plan_id)
    .bind(i64::from(unit_number))
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let (unit_id, mut unit) = map_unit_row(&row)?;

    let review_rows = sqlx::query(
        r#"SELECT "reviewOrder","scheduledDate","isCompleted","completedAt"
           FROM "unit_reviews" WHERE "unitId" = ? ORDER BY "reviewOrder" ASC"#,
    )
    .bind(&unit_id)
    .fetch_all(&mut *conn)
    .await?;
    unit.reviews = review_rows
        .iter()
        .map(map_review_row)
        .collect::<Result<_, _>>()?;

    Ok(Some((unit_id, unit)))
}

async fn write_unit(
    conn: &mut SqliteConnection,
    plan_id: &str,
    unit_id: &str,
    unit: &LearningUnit,
    at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let now = format_ts(at);
    sqlx::query(
        r#"INSERT INTO "learning_units" ("id","planId","unitNumber","isLearned","learnedAt","createdAt","updatedAt")
           VALUES (?,?,?,?,?,?,?)
           ON CONFLICT ("planId","unitNumber") DO UPDATE SET
             "isLearned" = excluded."isLearned",
             "learnedAt" = excluded."learnedAt",
             "updatedAt" = excluded."updatedAt""#,
    )
    .bind(unit_id)
    .bind(plan_id)
    .bind(i64::from(unit.unit_number))
    .bind(unit.is_learned)
    .bind(unit.learned_at.map(format_ts))
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    for review in &unit.reviews {
        sqlx::query(
            r#"INSERT INTO "unit_reviews" ("id","unitId","reviewOrder","scheduledDate","isCompleted","completedAt")
               VALUES (?,?,?,?,?,?)
               ON CONFLICT ("unitId","reviewOrder") DO UPDATE SET
                 "scheduledDate" = COALESCE("unit_reviews"."scheduledDate", excluded."scheduledDate"),
                 "isCompleted" = excluded."isCompleted",
                 "completedAt" = excluded."completedAt""#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(unit_id)
        .bind(i64::from(review.review_order))
        .bind(review.scheduled_date.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(review.is_completed)
        .bind(review.completed_at.map(format_ts))
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

fn map_plan_row(row: &SqliteRow) -> Result<EbbinghausPlan, StoreError> {
    let offsets_json: String = row.try_get("reviewOffsets")?;
    let review_offsets: ReviewOffsets = serde_json::from_str(&offsets_json)
        .map_err(|e| StoreError::Corrupt(format!("reviewOffsets: {e}")))?;

    Ok(EbbinghausPlan {
        id: row.try_get("id")?,
        user_id: row.try_get("userId")?,
        wordbook_id: row.try_get("wordbookId")?,
        total_words: row.try_get("totalWords")?,
        target_words: row.try_get("targetWords")?,
        words_per_day: row.try_get("wordsPerDay")?,
        review_offsets,
        created_at: parse_ts(&row.try_get::<String, _>("createdAt")?)?,
        updated_at: parse_ts(&row.try_get::<String, _>("updatedAt")?)?,
    })
}

fn map_unit_row(row: &SqliteRow) -> Result<(String, LearningUnit), StoreError> {
    let unit_id: String = row.try_get("id")?;
    let learned_at: Option<String> = row.try_get("learnedAt")?;

    Ok((
        unit_id,
        LearningUnit {
            unit_number: to_u32(row.try_get("unitNumber")?, "unitNumber")?,
            is_learned: row.try_get("isLearned")?,
            learned_at: learned_at.as_deref().map(parse_ts).transpose()?,
            reviews: Vec::new(),
        },
    ))
}

fn map_review_row(row: &SqliteRow) -> Result<UnitReview, StoreError> {
    let scheduled: Option<String> = row.try_get("scheduledDate")?;
    let completed_at: Option<String> = row.try_get("completedAt")?;

    Ok(UnitReview {
        review_order: to_u32(row.try_get("reviewOrder")?, "reviewOrder")?,
        scheduled_date: scheduled
            .as_deref()
            .map(|s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map_err(|e| StoreError::Corrupt(format!("scheduledDate {s}: {e}")))
            })
            .transpose()?,
        is_completed: row.try_get("isCompleted")?,
        completed_at: completed_at.as_deref().map(parse_ts).transpose()?,
    })
}

fn to_u32(value: i64, column: &str) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{column} out of range: {value}")))
}

fn format_ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp {value}: {e}")))
}

#[derive(Debug, thiserror::Error)]
pub enum SqliteInitError {
    #[error("IO error: {0}")]
    Io(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
