use jsonwebtoken::Algorithm;
use std::env;
use std::path::PathBuf;

/// Runtime configuration, read once at startup. Every variable has a default so
/// a development instance runs without any environment set.
#[derive(Clone, Debug)]
pub struct Settings {
    pub app_name: String,
    pub database_path: PathBuf,
    pub jwt_secret: String,
    pub jwt_algorithm: String,
    pub token_expire_minutes: i64,
    pub upload_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub model_path: PathBuf,
    pub port: u16,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Settings {
    pub fn from_env() -> Self {
        Settings {
            app_name: env_or("APP_NAME", "MinerIA"),
            database_path: env_or("DATABASE_PATH", "data/mineria.db").into(),
            jwt_secret: env_or("JWT_SECRET_KEY", "CHANGE_ME"),
            jwt_algorithm: env_or("JWT_ALGORITHM", "HS256"),
            token_expire_minutes: env_or("ACCESS_TOKEN_EXPIRE_MINUTES", "60")
                .parse()
                .unwrap_or(60),
            upload_dir: env_or("UPLOAD_DIR", "uploads").into(),
            reports_dir: env_or("REPORTS_DIR", "reports").into(),
            model_path: env_or("MODEL_PATH", "model_data/model_copper.onnx").into(),
            port: env_or("PORT", "8000").parse().unwrap_or(8000),
        }
    }

    /// Token signing algorithm; unknown names fall back to HS256 with a warning.
    pub fn signing_algorithm(&self) -> Algorithm {
        self.jwt_algorithm.parse().unwrap_or_else(|_| {
            log::warn!(
                "Unknown JWT_ALGORITHM '{}', falling back to HS256",
                self.jwt_algorithm
            );
            Algorithm::HS256
        })
    }
}
