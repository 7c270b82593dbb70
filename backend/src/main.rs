use std::sync::Arc;

use actix_web::HttpServer;
use backend::analysis::pipeline::AnalysisService;
use backend::auth::jwt::JwtService;
use backend::config::Settings;
use backend::db::init::init_database;
use backend::db::repository::AnalysisRepository;
use backend::ml::model::{Classifier, CopperModel};
use backend::report::pdf::PdfRenderer;
use backend::routes::{build_app, AppState};
use backend::storage::LocalStorage;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let settings = Settings::from_env();
    log::info!("Starting {}", settings.app_name);

    let pool = init_database(&settings.database_path)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let storage = LocalStorage::new(&settings.upload_dir, &settings.reports_dir)?;

    let model = match CopperModel::load(&settings.model_path) {
        Ok(model) => model,
        Err(e) => {
            log::error!(
                "Failed to load model from {}: {}",
                settings.model_path.display(),
                e
            );
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Model loading failed: {}", e),
            ));
        }
    };
    let classifier: Arc<dyn Classifier> = Arc::new(model);
    log::info!("Model loaded from {}", settings.model_path.display());

    let repo = AnalysisRepository::new(pool);
    let jwt = JwtService::new(
        &settings.jwt_secret,
        settings.signing_algorithm(),
        settings.token_expire_minutes,
    );
    let pipeline = AnalysisService::new(
        repo.clone(),
        classifier,
        storage.clone(),
        PdfRenderer::new(),
    );

    let state = AppState {
        repo,
        jwt,
        pipeline,
        upload_dir: settings.upload_dir.clone(),
        reports_dir: settings.reports_dir.clone(),
    };

    let bind_address = format!("0.0.0.0:{}", settings.port);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || build_app(state.clone()))
        .bind(&bind_address)?
        .run()
        .await
}
