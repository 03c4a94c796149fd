use actix_web::{
    web::{self, Data, Json},
    HttpResponse, Scope,
};
use serde::Deserialize;
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::api::types::{ApiError, ApiResponse};
use crate::core::enrollment::{EnrollmentOutcome, EnrollmentProgress, EnrollmentService};

#[derive(Debug, Deserialize)]
pub struct FingerprintEnrollRequest {
    pub identity: String,
}

#[derive(Debug, Deserialize)]
pub struct FaceEnrollRequest {
    pub identity: String,
    pub embedding: Vec<f32>,
}

pub fn scope() -> Scope {
    web::scope("/enroll")
        .service(web::resource("/fingerprint").route(web::post().to(enroll_fingerprint)))
        .service(web::resource("/face").route(web::post().to(enroll_face)))
}

async fn enroll_fingerprint(
    service: Data<EnrollmentService>,
    request: Json<FingerprintEnrollRequest>,
) -> Result<HttpResponse, ApiError> {
    info!(identity = %request.identity, "received fingerprint enrollment request");

    let (progress_tx, mut progress_rx) = mpsc::channel::<EnrollmentProgress>(16);
    let (_cancel_tx, mut cancel_rx) = watch::channel(false);

    // Surface device interaction progress in the log; a streaming caller
    // would subscribe to this channel instead.
    let drain = tokio::spawn(async move {
        while let Some(update) = progress_rx.recv().await {
            info!(
                phase = ?update.phase,
                percent = update.percent,
                "{}",
                update.message
            );
        }
    });

    let outcome = service
        .enroll_fingerprint(&request.identity, &progress_tx, &mut cancel_rx)
        .await;

    drop(progress_tx);
    let _ = drain.await;

    match outcome? {
        EnrollmentOutcome::Committed => Ok(HttpResponse::Ok().json(ApiResponse::success(
            "Fingerprint enrolled successfully",
            None,
        ))),
        EnrollmentOutcome::Rejected { reason } => {
            Ok(HttpResponse::BadRequest().json(ApiResponse::error(&reason)))
        }
    }
}

async fn enroll_face(
    service: Data<EnrollmentService>,
    request: Json<FaceEnrollRequest>,
) -> Result<HttpResponse, ApiError> {
    info!(identity = %request.identity, "received face enrollment request");

    service
        .enroll_face(&request.identity, &request.embedding)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Face template enrolled successfully",
        None,
    )))
}
