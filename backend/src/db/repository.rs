use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::models::{
    DetailRow, HistoryRow, NewClassification, NewImage, NewReport, NewUser, UserRow,
};

/// Upper bound on history rows returned per user.
pub const HISTORY_LIMIT: i64 = 200;

/// All database access for the service. Insert methods used by the upload
/// pipeline take an open transaction so Image, Classification and Report
/// commit atomically.
#[derive(Clone)]
pub struct AnalysisRepository {
    pool: SqlitePool,
}

impl AnalysisRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (name, email, password_hash, password_salt, role, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.password_salt)
        .bind(&user.role)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRow>, sqlx::Error> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password_hash, password_salt, role, created_at
             FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn insert_image(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        image: &NewImage,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO images (user_id, file_path, size_bytes, format, state, uploaded_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(image.user_id)
        .bind(&image.file_path)
        .bind(image.size_bytes)
        .bind(&image.format)
        .bind(&image.state)
        .bind(image.uploaded_at)
        .execute(&mut **tx)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn insert_classification(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        classification: &NewClassification,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO classifications (image_id, label, confidence, model_used, classified_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(classification.image_id)
        .bind(&classification.label)
        .bind(classification.confidence)
        .bind(&classification.model_used)
        .bind(classification.classified_at)
        .execute(&mut **tx)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn insert_report(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        report: &NewReport,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO reports (classification_id, content, format, generated_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(report.classification_id)
        .bind(&report.content)
        .bind(&report.format)
        .bind(report.generated_at)
        .execute(&mut **tx)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Newest-first classifications across all of the user's images, joined
    /// with their report content when present. `id DESC` breaks ties between
    /// rows classified within the same timestamp granule.
    pub async fn history_for_user(&self, user_id: i64) -> Result<Vec<HistoryRow>, sqlx::Error> {
        sqlx::query_as::<_, HistoryRow>(
            "SELECT c.id AS classification_id, c.label, c.classified_at,
                    r.content AS report_content
             FROM classifications c
             JOIN images i ON i.id = c.image_id
             LEFT JOIN reports r ON r.classification_id = c.id
             WHERE i.user_id = ?
             ORDER BY c.classified_at DESC, c.id DESC
             LIMIT ?",
        )
        .bind(user_id)
        .bind(HISTORY_LIMIT)
        .fetch_all(&self.pool)
        .await
    }

    /// Single classification scoped to its owner; None covers both "does not
    /// exist" and "owned by someone else".
    pub async fn detail_for_user(
        &self,
        classification_id: i64,
        user_id: i64,
    ) -> Result<Option<DetailRow>, sqlx::Error> {
        sqlx::query_as::<_, DetailRow>(
            "SELECT c.id AS classification_id, c.label, c.classified_at,
                    i.file_path AS image_path, r.content AS report_content
             FROM classifications c
             JOIN images i ON i.id = c.image_id
             LEFT JOIN reports r ON r.classification_id = c.id
             WHERE c.id = ? AND i.user_id = ?",
        )
        .bind(classification_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Stored report content for the PDF endpoint, scoped to the owner.
    pub async fn report_content_for_user(
        &self,
        classification_id: i64,
        user_id: i64,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT r.content
             FROM reports r
             JOIN classifications c ON c.id = r.classification_id
             JOIN images i ON i.id = c.image_id
             WHERE r.classification_id = ? AND i.user_id = ?",
        )
        .bind(classification_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }
}
