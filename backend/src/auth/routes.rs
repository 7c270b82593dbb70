use actix_web::{web, HttpResponse};
use log::{error, info};

use super::jwt::JwtService;
use super::models::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UserInfo};
use super::password;
use crate::db::models::NewUser;
use crate::db::repository::AnalysisRepository;
use crate::error::ApiError;

pub async fn register(
    repo: web::Data<AnalysisRepository>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    if repo.find_user_by_email(&body.email).await?.is_some() {
        return Err(ApiError::BadRequest(
            "Ya existe un usuario con ese correo".into(),
        ));
    }

    let salt = password::generate_salt();
    let hash = password::hash_password(&body.password, &salt);
    let id = repo
        .create_user(&NewUser {
            name: body.name,
            email: body.email.clone(),
            password_hash: hash,
            password_salt: salt,
            role: body.role,
        })
        .await?;

    info!("Registered user {} ({})", id, body.email);
    Ok(HttpResponse::Ok().json(RegisterResponse {
        id,
        email: body.email,
    }))
}

pub async fn login(
    repo: web::Data<AnalysisRepository>,
    jwt: web::Data<JwtService>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();

    let user = repo
        .find_user_by_email(&body.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Correo o contraseña incorrectos".into()))?;

    if !password::verify_password(&body.password, &user.password_salt, &user.password_hash) {
        return Err(ApiError::Unauthorized(
            "Correo o contraseña incorrectos".into(),
        ));
    }

    // Role comparison ignores case and surrounding whitespace; the stored
    // value is echoed back untouched.
    if user.role.trim().to_lowercase() != body.role.trim().to_lowercase() {
        return Err(ApiError::Forbidden(
            "Rol incorrecto para este usuario".into(),
        ));
    }

    let token = jwt.generate_token(&user).map_err(|e| {
        error!("Token generation failed for {}: {:?}", user.email, e);
        ApiError::Internal("No se pudo generar el token".into())
    })?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        token,
        user: UserInfo::from(&user),
    }))
}
