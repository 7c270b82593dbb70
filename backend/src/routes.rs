use actix_cors::Cors;
use actix_files::Files;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::header;
use actix_web::{web, App, Error, HttpResponse};
use serde_json::json;
use std::path::PathBuf;

use crate::analysis::pipeline::AnalysisService;
use crate::analysis::routes as analysis_routes;
use crate::auth::jwt::JwtService;
use crate::auth::middleware::AuthMiddleware;
use crate::auth::routes as auth_routes;
use crate::db::repository::AnalysisRepository;

/// Shared handles the HTTP layer needs. Built once in main, cloned into each
/// worker's App; tests build the same tree directly.
#[derive(Clone)]
pub struct AppState {
    pub repo: AnalysisRepository,
    pub jwt: JwtService,
    pub pipeline: AnalysisService,
    pub upload_dir: PathBuf,
    pub reports_dir: PathBuf,
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Backend MinerIA OK" }))
}

fn cors() -> Cors {
    Cors::default()
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
        ])
        .max_age(3600)
}

/// Full application tree: open auth routes, token-guarded analysis routes and
/// the two static mounts.
pub fn build_app(
    state: AppState,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    let auth_guard = AuthMiddleware::new(state.jwt.clone());
    App::new()
        .wrap(cors())
        .app_data(web::Data::new(state.repo.clone()))
        .app_data(web::Data::new(state.jwt.clone()))
        .app_data(web::Data::new(state.pipeline.clone()))
        .service(
            web::scope("/api/auth")
                .route("/register", web::post().to(auth_routes::register))
                .route("/login", web::post().to(auth_routes::login)),
        )
        .service(
            web::scope("/api/analysis")
                .wrap(auth_guard)
                .route("/upload", web::post().to(analysis_routes::upload))
                .route("/history", web::get().to(analysis_routes::history))
                .route("/{id}/pdf", web::get().to(analysis_routes::download_pdf))
                .route("/{id}", web::get().to(analysis_routes::detail)),
        )
        .service(Files::new("/uploads", state.upload_dir.clone()))
        .service(Files::new("/reports", state.reports_dir.clone()))
        .service(web::resource("/").route(web::get().to(index)))
}
