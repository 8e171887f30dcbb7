use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod asset;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod folder;
pub mod hashing;
pub mod library;
pub mod metrics;
pub mod storage;

pub use crate::config::MediaConfig;
pub use crate::db::AppState;
pub use crate::error::{MediaError, MediaResult};
pub use crate::library::MediaLibrary;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new("Unauthorized", message)
    }

    pub fn not_found(message: &str) -> Self {
        Self::new("NotFound", message)
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn conflict(message: &str) -> Self {
        Self::new("Conflict", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::asset::handlers::upload_asset,
        crate::asset::handlers::get_asset,
        crate::asset::handlers::update_asset_metadata,
        crate::asset::handlers::delete_asset,
        crate::asset::handlers::get_assets_by_ids,
        crate::asset::handlers::move_assets,
        crate::asset::handlers::bulk_delete_assets,
        crate::folder::handlers::create_folder,
        crate::folder::handlers::list_root,
        crate::folder::handlers::list_folder,
        crate::folder::handlers::update_folder,
        crate::folder::handlers::delete_folders
    ),
    components(
        schemas(
            asset::models::Asset,
            asset::models::AssetMetadataUpdate,
            asset::models::UploadOutcome,
            asset::models::AssetMove,
            asset::models::AssetDeletion,
            asset::handlers::UploadAssetForm,
            asset::handlers::AssetIdsRequest,
            asset::handlers::MoveAssetsRequest,
            folder::models::Folder,
            folder::models::Breadcrumb,
            folder::models::FolderContents,
            folder::models::FolderDeletion,
            folder::models::FolderUpdate,
            folder::handlers::CreateFolderRequest,
            folder::handlers::DeleteFoldersRequest,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Media Assets", description = "Upload, edit, move and delete stored files."),
        (name = "Media Folders", description = "Folder hierarchy and recursive delete.")
    ),
    servers(
        (url = "http://127.0.0.1:8080", description = "Localhost")
    )
)]
pub struct ApiDoc;

/// Registers every media route. Literal segments come before `{id}` so they
/// are not captured as ids.
pub fn configure_media_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/media")
            .service(
                web::resource("/assets").route(web::post().to(asset::handlers::upload_asset)),
            )
            .service(
                web::resource("/assets/by-ids")
                    .route(web::post().to(asset::handlers::get_assets_by_ids)),
            )
            .service(
                web::resource("/assets/move").route(web::post().to(asset::handlers::move_assets)),
            )
            .service(
                web::resource("/assets/bulk-delete")
                    .route(web::post().to(asset::handlers::bulk_delete_assets)),
            )
            .service(
                web::resource("/assets/{id}")
                    .route(web::get().to(asset::handlers::get_asset))
                    .route(web::patch().to(asset::handlers::update_asset_metadata))
                    .route(web::delete().to(asset::handlers::delete_asset)),
            )
            .service(
                web::resource("/folders")
                    .route(web::get().to(folder::handlers::list_root))
                    .route(web::post().to(folder::handlers::create_folder)),
            )
            .service(
                web::resource("/folders/delete")
                    .route(web::post().to(folder::handlers::delete_folders)),
            )
            .service(
                web::resource("/folders/{id}")
                    .route(web::get().to(folder::handlers::list_folder))
                    .route(web::patch().to(folder::handlers::update_folder)),
            ),
    );
}

pub async fn run() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match MediaConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let app_state = match AppState::new_with_config(&config).await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to initialise the media store. Check DATABASE_URL and UPLOAD_ROOT. Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let prometheus = PrometheusMetricsBuilder::new("church_media_server")
        .endpoint("/metrics")
        .build()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    log::info!(
        "Starting server at http://{} (uploads served from {} at {})",
        config.bind_address,
        config.upload_root.display(),
        config.public_prefix
    );

    let public_prefix = config.public_prefix.clone();
    let upload_root = config.upload_root.clone();

    HttpServer::new(move || {
        let app_state = app_state.clone();
        let prometheus = prometheus.clone();
        let cors = Cors::default()
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://localhost:8080")
            .allowed_origin("http://127.0.0.1:8080")
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Compress::default())
            .wrap(prometheus)
            .wrap(cors)
            .app_data(app_state)
            .configure(configure_media_routes)
            .route("/metrics/media", web::get().to(metrics::media_metrics))
            .service(actix_files::Files::new(&public_prefix, upload_root.clone()))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind(config.bind_address.as_str())?
    .run()
    .await
}
