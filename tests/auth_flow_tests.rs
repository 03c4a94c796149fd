// tests/auth_flow_tests.rs
mod common;

use std::sync::Arc;

use tempfile::tempdir;
use tokio::sync::{mpsc, watch};

use biofactor::core::auth::{AuthService, SecondFactorSelection};
use biofactor::core::enrollment::{EnrollmentOutcome, EnrollmentService};
use biofactor::core::template::Modality;
use biofactor::storage::TemplateStore;
use biofactor::utils::config::Config;
use biofactor::utils::error::CoreError;
use common::{ScriptedScanner, StaticCredentials};

/// Embedding with enough variance to pass the liveness check.
fn live_embedding(dim: usize) -> Vec<f32> {
    (0..dim)
        .map(|i| if i % 2 == 0 { 0.5 } else { -0.5 })
        .collect()
}

fn build_auth(config: &Config, store: Arc<TemplateStore>) -> AuthService {
    AuthService::new(
        config,
        Arc::new(StaticCredentials::with_user("user@example.com", "hunter2")),
        store,
    )
}

#[tokio::test]
async fn test_end_to_end_face_authentication() {
    let dir = tempdir().unwrap();
    let config = common::test_config(dir.path(), 300, 8);
    let store = Arc::new(TemplateStore::new(&config.storage).unwrap());

    let embedding = live_embedding(8);
    let enrollment = EnrollmentService::new(
        store.clone(),
        Arc::new(ScriptedScanner::new(vec![], vec![])),
        &config,
    );
    enrollment
        .enroll_face("user@example.com", &embedding)
        .await
        .unwrap();

    let auth = build_auth(&config, store);

    let session = auth
        .verify_password("user@example.com", "hunter2", Some("10.0.0.1".into()))
        .await
        .unwrap();

    match auth.select_second_factor(&session.token).await.unwrap() {
        SecondFactorSelection::Required(factors) => {
            assert!(factors.face);
            assert!(!factors.fingerprint);
        }
        SecondFactorSelection::WavedThrough(_) => panic!("face is enrolled"),
    }

    // Presenting the exact stored embedding authenticates
    let authenticated = auth
        .verify_second_factor(&session.token, Modality::Face, &embedding)
        .await
        .unwrap();

    assert_eq!(authenticated.identity, "user@example.com");
    assert_eq!(authenticated.second_factor, Some(Modality::Face));

    // The pending session was consumed
    assert!(matches!(
        auth.verify_second_factor(&session.token, Modality::Face, &embedding)
            .await,
        Err(CoreError::Auth(_))
    ));
}

#[tokio::test]
async fn test_end_to_end_fingerprint_authentication() {
    let dir = tempdir().unwrap();
    let config = common::test_config(dir.path(), 300, 8);
    let store = Arc::new(TemplateStore::new(&config.storage).unwrap());

    let template = vec![12.0, 7.0, 99.0, 3.0];
    let enrollment = EnrollmentService::new(
        store.clone(),
        Arc::new(ScriptedScanner::for_enrollment(
            template.clone(),
            template.clone(),
        )),
        &config,
    );

    let (progress_tx, _progress_rx) = mpsc::channel(32);
    let (_cancel_tx, mut cancel_rx) = watch::channel(false);
    let outcome = enrollment
        .enroll_fingerprint("user@example.com", &progress_tx, &mut cancel_rx)
        .await
        .unwrap();
    assert_eq!(outcome, EnrollmentOutcome::Committed);

    let auth = build_auth(&config, store);
    let session = auth
        .verify_password("user@example.com", "hunter2", None)
        .await
        .unwrap();

    let authenticated = auth
        .verify_second_factor(&session.token, Modality::Fingerprint, &template)
        .await
        .unwrap();
    assert_eq!(authenticated.second_factor, Some(Modality::Fingerprint));
}

#[tokio::test]
async fn test_invalid_password_rejected() {
    let dir = tempdir().unwrap();
    let config = common::test_config(dir.path(), 300, 8);
    let store = Arc::new(TemplateStore::new(&config.storage).unwrap());
    let auth = build_auth(&config, store);

    let result = auth
        .verify_password("user@example.com", "wrong", None)
        .await;
    assert!(matches!(result, Err(CoreError::Auth(_))));
}

#[tokio::test]
async fn test_failed_attempt_can_be_retried_within_window() {
    let dir = tempdir().unwrap();
    let config = common::test_config(dir.path(), 300, 8);
    let store = Arc::new(TemplateStore::new(&config.storage).unwrap());

    let embedding = live_embedding(8);
    store.upsert_face("user@example.com", &embedding).await.unwrap();

    let auth = build_auth(&config, store);
    let session = auth
        .verify_password("user@example.com", "hunter2", None)
        .await
        .unwrap();

    // Far-off candidate fails but does not consume the session
    let far: Vec<f32> = embedding.iter().map(|x| x + 10.0).collect();
    assert!(matches!(
        auth.verify_second_factor(&session.token, Modality::Face, &far)
            .await,
        Err(CoreError::Auth(_))
    ));

    let authenticated = auth
        .verify_second_factor(&session.token, Modality::Face, &embedding)
        .await
        .unwrap();
    assert_eq!(authenticated.identity, "user@example.com");
}

#[tokio::test]
async fn test_session_expiry_rejects_correct_sample() {
    let dir = tempdir().unwrap();
    // One-second window stands in for the production five minutes
    let config = common::test_config(dir.path(), 1, 8);
    let store = Arc::new(TemplateStore::new(&config.storage).unwrap());

    let embedding = live_embedding(8);
    store.upsert_face("user@example.com", &embedding).await.unwrap();

    let auth = build_auth(&config, store);
    let session = auth
        .verify_password("user@example.com", "hunter2", None)
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(1200)).await;

    assert!(matches!(
        auth.verify_second_factor(&session.token, Modality::Face, &embedding)
            .await,
        Err(CoreError::SessionExpired)
    ));

    // Expired sessions are discarded, not restored
    assert!(matches!(
        auth.verify_second_factor(&session.token, Modality::Face, &embedding)
            .await,
        Err(CoreError::Auth(_))
    ));
}

#[tokio::test]
async fn test_unenrolled_user_waved_through_with_flag() {
    let dir = tempdir().unwrap();
    let config = common::test_config(dir.path(), 300, 8);
    let store = Arc::new(TemplateStore::new(&config.storage).unwrap());
    let auth = build_auth(&config, store);

    let session = auth
        .verify_password("user@example.com", "hunter2", None)
        .await
        .unwrap();

    match auth.select_second_factor(&session.token).await.unwrap() {
        SecondFactorSelection::WavedThrough(authenticated) => {
            assert_eq!(authenticated.identity, "user@example.com");
            assert_eq!(authenticated.second_factor, None);
        }
        SecondFactorSelection::Required(_) => panic!("nothing is enrolled"),
    }
}

#[tokio::test]
async fn test_unenrolled_user_blocked_without_flag() {
    let dir = tempdir().unwrap();
    let mut config = common::test_config(dir.path(), 300, 8);
    config.auth.allow_unenrolled_login = false;

    let store = Arc::new(TemplateStore::new(&config.storage).unwrap());
    let auth = build_auth(&config, store);

    let session = auth
        .verify_password("user@example.com", "hunter2", None)
        .await
        .unwrap();

    assert!(matches!(
        auth.select_second_factor(&session.token).await,
        Err(CoreError::Auth(_))
    ));
}

#[tokio::test]
async fn test_flat_sample_fails_liveness_even_when_distance_matches() {
    let dir = tempdir().unwrap();
    let config = common::test_config(dir.path(), 300, 8);
    let store = Arc::new(TemplateStore::new(&config.storage).unwrap());

    // A stored template with no variance; replaying it matches on distance
    // but fails the liveness heuristic
    let flat = vec![0.05; 8];
    store.upsert_face("user@example.com", &flat).await.unwrap();

    let auth = build_auth(&config, store);
    let session = auth
        .verify_password("user@example.com", "hunter2", None)
        .await
        .unwrap();

    match auth
        .verify_second_factor(&session.token, Modality::Face, &flat)
        .await
    {
        Err(CoreError::Auth(message)) => assert!(message.contains("liveness")),
        other => panic!("expected liveness failure, got {:?}", other.map(|a| a.identity)),
    }
}

#[tokio::test]
async fn test_dimension_mismatch_never_returns_a_verdict() {
    let dir = tempdir().unwrap();
    let config = common::test_config(dir.path(), 300, 8);
    let store = Arc::new(TemplateStore::new(&config.storage).unwrap());

    store
        .upsert_face("user@example.com", &live_embedding(8))
        .await
        .unwrap();

    let auth = build_auth(&config, store);
    let session = auth
        .verify_password("user@example.com", "hunter2", None)
        .await
        .unwrap();

    assert!(matches!(
        auth.verify_second_factor(&session.token, Modality::Face, &live_embedding(4))
            .await,
        Err(CoreError::DimensionMismatch {
            stored: 8,
            presented: 4
        })
    ));
}

#[tokio::test]
async fn test_lockout_blocks_after_repeated_failures() {
    let dir = tempdir().unwrap();
    let mut config = common::test_config(dir.path(), 300, 8);
    config.auth.lockout_enabled = true;
    config.auth.lockout_max_failures = 2;

    let store = Arc::new(TemplateStore::new(&config.storage).unwrap());
    let embedding = live_embedding(8);
    store.upsert_face("user@example.com", &embedding).await.unwrap();

    let auth = build_auth(&config, store);
    let session = auth
        .verify_password("user@example.com", "hunter2", Some("10.0.0.1".into()))
        .await
        .unwrap();

    let far: Vec<f32> = embedding.iter().map(|x| x + 10.0).collect();
    for _ in 0..2 {
        assert!(auth
            .verify_second_factor(&session.token, Modality::Face, &far)
            .await
            .is_err());
    }

    // Even the correct sample is blocked now
    match auth
        .verify_second_factor(&session.token, Modality::Face, &embedding)
        .await
    {
        Err(CoreError::Auth(message)) => assert!(message.contains("too many")),
        other => panic!("expected lockout, got {:?}", other.map(|a| a.identity)),
    }
}

#[tokio::test]
async fn test_reverify_face_uses_looser_threshold() {
    let dir = tempdir().unwrap();
    let config = common::test_config(dir.path(), 300, 8);
    let store = Arc::new(TemplateStore::new(&config.storage).unwrap());

    let embedding = live_embedding(8);
    store.upsert_face("user@example.com", &embedding).await.unwrap();

    let auth = build_auth(&config, store);

    // Offset of 0.5 along one axis: beyond the 0.4 login threshold but
    // inside the 0.6 re-verify threshold
    let mut nearby = embedding.clone();
    nearby[0] += 0.5;

    assert!(auth
        .reverify_face("user@example.com", &nearby)
        .await
        .unwrap());
    assert!(!auth
        .reverify_face("user@example.com", &live_embedding(8).iter().map(|x| x + 10.0).collect::<Vec<_>>())
        .await
        .unwrap());

    // Nothing stored reads as not-verified, not as an error
    assert!(!auth
        .reverify_face("other@example.com", &embedding)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_concurrent_verifications_cannot_both_succeed() {
    let dir = tempdir().unwrap();
    let config = common::test_config(dir.path(), 300, 8);
    let store = Arc::new(TemplateStore::new(&config.storage).unwrap());

    let embedding = live_embedding(8);
    store.upsert_face("user@example.com", &embedding).await.unwrap();

    let auth = Arc::new(build_auth(&config, store));
    let session = auth
        .verify_password("user@example.com", "hunter2", None)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let auth = auth.clone();
        let token = session.token.clone();
        let sample = embedding.clone();
        handles.push(tokio::spawn(async move {
            auth.verify_second_factor(&token, Modality::Face, &sample)
                .await
                .is_ok()
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }
    assert_eq!(successes, 1);
}
