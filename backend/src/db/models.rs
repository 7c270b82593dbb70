use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Registered account row.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub role: String,
}

pub struct NewImage {
    pub user_id: i64,
    pub file_path: String,
    pub size_bytes: i64,
    pub format: String,
    pub state: String,
    pub uploaded_at: DateTime<Utc>,
}

pub struct NewClassification {
    pub image_id: i64,
    pub label: String,
    /// Fraction in [0, 1], already rounded to 4 decimal places.
    pub confidence: f64,
    pub model_used: String,
    pub classified_at: DateTime<Utc>,
}

pub struct NewReport {
    pub classification_id: i64,
    pub content: String,
    pub format: String,
    pub generated_at: DateTime<Utc>,
}

/// Joined row backing one history entry. `report_content` is NULL when no
/// report row exists for the classification.
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub classification_id: i64,
    pub label: String,
    pub classified_at: DateTime<Utc>,
    pub report_content: Option<String>,
}

/// Joined row backing the detail view; adds the image location so the
/// fallback branch can rebuild the public URL.
#[derive(Debug, Clone, FromRow)]
pub struct DetailRow {
    pub classification_id: i64,
    pub label: String,
    pub classified_at: DateTime<Utc>,
    pub image_path: String,
    pub report_content: Option<String>,
}
