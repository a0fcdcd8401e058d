//! Axum router construction.
//!
//! Builds the full application router with the image API, middleware
//! layers, OpenAPI docs and static file serving.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use std::path::PathBuf;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::context::AppContext;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_check,
        routes::images::list_images,
        routes::images::upload_image,
        routes::images::get_image,
        routes::images::update_image,
        routes::images::delete_image,
        routes::images::image_file,
    ),
    components(schemas(
        gl_core::ImageRecord,
        gl_core::ImagePatch,
        gl_core::ImageList,
        gl_core::FieldIssue,
        crate::error::ErrorBody,
        routes::images::UploadForm,
        routes::images::DeleteResponse,
    ))
)]
pub struct ApiDoc;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route(
            "/images",
            get(routes::images::list_images).post(routes::images::upload_image),
        )
        .route(
            "/images/:id",
            get(routes::images::get_image)
                .put(routes::images::update_image)
                .delete(routes::images::delete_image),
        )
        .route("/images/:id/file", get(routes::images::image_file));

    // Uploads over the file ceiling must still reach the pipeline so they
    // get a descriptive rejection.
    let body_limit = ctx.config.server.max_body_bytes;

    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api/v1", api)
        .merge(SwaggerUi::new("/api-docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    // Static file serving for UI build.
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {:?}", dir);
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                tower_http::services::ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(tower_http::services::ServeFile::new(index_path)),
            );
        }
    }

    app
}
