#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![deny(unused_features)]
#![warn(unused_crate_dependencies)]

pub mod api;
pub mod api_doc;
pub mod app;

use std::sync::Arc;

use api_doc::ApiDoc;
use app::{AdminAccounts, AppState};
use axum::Router;
use config::Config;
use database::DatabaseHandleCreator;
use error_stack::{Result, ResultExt};
use image_moderation::ImageModerator;
use model::AccountId;
use server_data::{ContentStore, DatabaseSanctionStore, SanctionStore};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub const API_DOC_URL: &str = "/api-doc/moderation_backend_api.json";

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("HTTP client creation failed")]
    HttpClient,
    #[error("Image moderation initialization failed")]
    ImageModeration,
    #[error("Database initialization failed")]
    Database,
    #[error("Binding socket failed")]
    Bind,
    #[error("Server failed")]
    Serve,
}

pub struct ModerationBackend {
    config: Arc<Config>,
}

impl ModerationBackend {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub async fn run(self) -> Result<(), ServerError> {
        info!("Backend version: {}", self.config.backend_semver_version());

        let client = reqwest::Client::builder()
            .build()
            .change_context(ServerError::HttpClient)?;
        let moderator = ImageModerator::from_settings(self.config.image_moderation(), client)
            .change_context(ServerError::ImageModeration)?;
        info!("Image moderation enabled: {}", moderator.enabled());

        let (write, read, close) = DatabaseHandleCreator::create_from_config(&self.config)
            .await
            .change_context(ServerError::Database)?;
        let sanctions: Arc<dyn SanctionStore> = Arc::new(DatabaseSanctionStore::new(write, read));

        let admins = AdminAccounts::new(
            self.config
                .admin_accounts()
                .iter()
                .copied()
                .map(AccountId::new),
        );
        info!("Admin accounts: {}", self.config.admin_accounts().len());

        let state = AppState::new(
            moderator,
            sanctions,
            ContentStore::from_config(&self.config),
            admins,
        );
        let router = self.create_public_router(state);

        let addr = self.config.socket().public_api;
        let listener = TcpListener::bind(addr)
            .await
            .change_context(ServerError::Bind)
            .attach_printable(addr)?;
        info!("Public API is available on {}", addr);

        let result = axum::serve(listener, router)
            .with_graceful_shutdown(wait_quit_signal())
            .await
            .change_context(ServerError::Serve);

        close.close().await;
        info!("Server quit done");

        result
    }

    fn create_public_router(&self, state: AppState) -> Router {
        let router = api::create_router(state);
        let router = if self.config.debug_mode() {
            router.merge(SwaggerUi::new("/swagger-ui").url(API_DOC_URL, ApiDoc::openapi()))
        } else {
            router
        };
        router.layer(TraceLayer::new_for_http())
    }
}

async fn wait_quit_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Quit signal received"),
        Err(e) => error!("Waiting quit signal failed: {}", e),
    }
}
