use std::path::Path;
use std::sync::Arc;

use jsonwebtoken::Algorithm;
use sqlx::SqlitePool;
use tempfile::TempDir;

use backend::analysis::pipeline::AnalysisService;
use backend::auth::jwt::JwtService;
use backend::auth::password::{generate_salt, hash_password};
use backend::db::init::init_database;
use backend::db::models::NewUser;
use backend::db::repository::AnalysisRepository;
use backend::ml::model::{Classifier, InferenceError, Prediction};
use backend::report::pdf::PdfRenderer;
use backend::routes::AppState;
use backend::storage::LocalStorage;
use shared::CopperLabel;

pub const TEST_SECRET: &str = "test-secret";

/// Classifier stub returning one fixed verdict for every image.
pub struct FixedClassifier {
    pub label: CopperLabel,
    pub confidence: f64,
}

impl Classifier for FixedClassifier {
    fn predict_path(&self, _path: &Path) -> Result<Prediction, InferenceError> {
        Ok(Prediction {
            label: self.label,
            confidence: self.confidence,
        })
    }
}

/// Classifier stub that always fails.
pub struct BrokenClassifier;

impl Classifier for BrokenClassifier {
    fn predict_path(&self, _path: &Path) -> Result<Prediction, InferenceError> {
        Err(InferenceError::Execution("simulated failure".into()))
    }
}

/// One fully wired application over temp dirs and a temp database.
pub struct TestContext {
    pub state: AppState,
    pub pool: SqlitePool,
    pub jwt: JwtService,
    pub repo: AnalysisRepository,
    _dirs: TempDir,
}

impl TestContext {
    pub async fn new(classifier: Arc<dyn Classifier>) -> TestContext {
        let dirs = tempfile::tempdir().unwrap();
        let pool = init_database(&dirs.path().join("test.db")).await.unwrap();
        let storage =
            LocalStorage::new(dirs.path().join("uploads"), dirs.path().join("reports")).unwrap();

        let repo = AnalysisRepository::new(pool.clone());
        let jwt = JwtService::new(TEST_SECRET, Algorithm::HS256, 60);
        let pipeline = AnalysisService::new(
            repo.clone(),
            classifier,
            storage.clone(),
            PdfRenderer::new(),
        );

        let state = AppState {
            repo: repo.clone(),
            jwt: jwt.clone(),
            pipeline,
            upload_dir: storage.upload_dir().to_path_buf(),
            reports_dir: storage.reports_dir().to_path_buf(),
        };

        TestContext {
            state,
            pool,
            jwt,
            repo,
            _dirs: dirs,
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.state.upload_dir
    }

    pub fn reports_dir(&self) -> &Path {
        &self.state.reports_dir
    }

    pub async fn register_user(&self, name: &str, email: &str, password: &str, role: &str) -> i64 {
        let salt = generate_salt();
        self.repo
            .create_user(&NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash: hash_password(password, &salt),
                password_salt: salt,
                role: role.to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn token_for(&self, email: &str) -> String {
        let user = self
            .repo
            .find_user_by_email(email)
            .await
            .unwrap()
            .expect("user must be registered first");
        self.jwt.generate_token(&user).unwrap()
    }
}

/// Number of files currently sitting in a directory.
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

/// Minimal real PNG for upload bodies.
pub fn tiny_png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([120, 80, 40]));
    let mut cursor = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, image::ImageFormat::Png)
        .unwrap();
    cursor.into_inner()
}

/// Builds a two-part multipart body (metadata + file) and its content-type
/// header value.
pub fn multipart_body(
    metadata: &str,
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> (String, Vec<u8>) {
    let boundary = "mineria-test-boundary";
    let mut body = Vec::new();

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"metadata\"\r\n\r\n");
    body.extend_from_slice(metadata.as_bytes());
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={boundary}"), body)
}
