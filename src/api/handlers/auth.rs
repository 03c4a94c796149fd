use actix_web::{
    web::{self, Data, Json, Path},
    HttpRequest, HttpResponse, Scope,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::api::types::{ApiError, ApiResponse};
use crate::core::auth::{AuthService, SecondFactorSelection};
use crate::core::template::Modality;

#[derive(Debug, Deserialize)]
pub struct PasswordRequest {
    pub identity: String,
    pub secret: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
    pub modality: Modality,
    pub sample: Vec<f32>,
}

#[derive(Debug, Deserialize)]
pub struct ReverifyRequest {
    pub identity: String,
    pub embedding: Vec<f32>,
}

pub fn scope() -> Scope {
    web::scope("/auth")
        .service(web::resource("/password").route(web::post().to(verify_password)))
        .service(web::resource("/factors/{token}").route(web::get().to(select_second_factor)))
        .service(web::resource("/verify").route(web::post().to(verify_second_factor)))
        .service(web::resource("/face/reverify").route(web::post().to(reverify_face)))
}

fn caller_origin(req: &HttpRequest) -> Option<String> {
    req.connection_info()
        .realip_remote_addr()
        .map(str::to_string)
}

async fn verify_password(
    service: Data<AuthService>,
    request: Json<PasswordRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let session = service
        .verify_password(&request.identity, &request.secret, caller_origin(&req))
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Password verified, second factor required",
        Some(json!({ "token": session.token })),
    )))
}

async fn select_second_factor(
    service: Data<AuthService>,
    token: Path<String>,
) -> Result<HttpResponse, ApiError> {
    match service.select_second_factor(&token).await? {
        SecondFactorSelection::Required(factors) => Ok(HttpResponse::Ok().json(
            ApiResponse::success(
                "Select a second factor",
                Some(json!({
                    "fingerprint": factors.fingerprint,
                    "face": factors.face,
                })),
            ),
        )),
        SecondFactorSelection::WavedThrough(auth) => {
            info!(identity = %auth.identity, "authenticated without a second factor");
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                "Authenticated without a second factor",
                Some(serde_json::to_value(&auth).unwrap_or_default()),
            )))
        }
    }
}

async fn verify_second_factor(
    service: Data<AuthService>,
    request: Json<VerifyRequest>,
) -> Result<HttpResponse, ApiError> {
    let auth = service
        .verify_second_factor(&request.token, request.modality, &request.sample)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Authentication successful",
        Some(serde_json::to_value(&auth).unwrap_or_default()),
    )))
}

async fn reverify_face(
    service: Data<AuthService>,
    request: Json<ReverifyRequest>,
) -> Result<HttpResponse, ApiError> {
    let verified = service
        .reverify_face(&request.identity, &request.embedding)
        .await?;

    if verified {
        Ok(HttpResponse::Ok().json(ApiResponse::success("Face verified", None)))
    } else {
        Ok(HttpResponse::Unauthorized().json(ApiResponse::error("Face verification failed")))
    }
}
