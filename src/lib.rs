pub mod api;
pub mod core;
pub mod storage;
pub mod utils;

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use tracing::{debug, info};

use crate::{
    api::handlers,
    core::{
        auth::{AuthService, CredentialVerifier},
        enrollment::{device::FingerprintScanner, EnrollmentService},
    },
    storage::TemplateStore,
    utils::{config::Config, error::Result},
};

pub struct Application {
    config: Arc<Config>,
    enrollment: Arc<EnrollmentService>,
    auth: Arc<AuthService>,
}

impl Application {
    pub fn new(
        config: Config,
        credentials: Arc<dyn CredentialVerifier>,
        scanner: Arc<dyn FingerprintScanner>,
    ) -> Result<Self> {
        let config = Arc::new(config);

        info!("Initializing template store...");
        let store = Arc::new(TemplateStore::new(&config.storage)?);

        info!("Initializing services...");
        let enrollment = Arc::new(EnrollmentService::new(store.clone(), scanner, &config));
        let auth = Arc::new(AuthService::new(&config, credentials, store));

        Ok(Self {
            config,
            enrollment,
            auth,
        })
    }

    pub async fn run(&self) -> Result<()> {
        self.start_session_maintenance();

        info!(
            "Starting API server on {}:{}",
            self.config.node.host, self.config.node.port
        );

        let enrollment = self.enrollment.clone();
        let auth = self.auth.clone();

        HttpServer::new(move || {
            App::new()
                .app_data(web::Data::from(enrollment.clone()))
                .app_data(web::Data::from(auth.clone()))
                .service(handlers::enrollment::scope())
                .service(handlers::auth::scope())
        })
        .bind((self.config.node.host.as_str(), self.config.node.port))?
        .run()
        .await?;

        Ok(())
    }

    // Pending sessions are normally consumed or rejected; the sweep catches
    // the ones whose callers never came back.
    fn start_session_maintenance(&self) {
        let auth = self.auth.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
            loop {
                interval.tick().await;
                let purged = auth.purge_expired_sessions();
                if purged > 0 {
                    debug!(purged, "dropped expired second-factor sessions");
                }
            }
        });
    }
}
