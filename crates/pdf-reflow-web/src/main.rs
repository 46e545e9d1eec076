//! PDF Reflow Web - Web server for translating PDF documents.

mod helpers;
mod routes;
mod state;
mod templates;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use clap::Parser;
use pdf_reflow_core::AppConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter, prelude::*};

use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "pdf-reflow-web")]
#[command(author, version, about = "PDF Reflow Web Server", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(long, env = "PDF_REFLOW_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to bind to
    #[arg(short, long, env = "PDF_REFLOW_PORT", default_value = "3000")]
    port: u16,

    /// Config file path
    #[arg(short, long, env = "PDF_REFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Local directory with pre-downloaded models
    #[arg(long, env = "PDF_REFLOW_MODELS_DIR")]
    models_dir: Option<PathBuf>,

    /// Hub repository with converted Marian tokenizers
    #[arg(long, env = "PDF_REFLOW_TOKENIZER_REPO")]
    tokenizer_repo: Option<String>,

    /// Directory for temporary uploads
    #[arg(long, env = "PDF_REFLOW_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,

    /// Maximum upload size in megabytes
    #[arg(long, env = "PDF_REFLOW_MAX_UPLOAD_MB", default_value = "50")]
    max_upload_mb: usize,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Clear translation cache on startup
    #[arg(long)]
    clear_cache: bool,
}

/// Build the router with all routes and middleware.
fn app(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        // Pages
        .route("/", get(routes::index).post(routes::translate_form))
        .route("/health", get(routes::health))
        // API endpoints
        .route("/api/translate", post(routes::translate_api))
        .route("/api/languages", get(routes::languages))
        // Middleware
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store, max-age=0"),
        ))
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    if let Some(dir) = args.models_dir {
        config.engine.models_dir = Some(dir);
    }
    if let Some(repo) = args.tokenizer_repo {
        config.engine.tokenizer_repo = Some(repo);
    }
    if let Some(dir) = args.upload_dir {
        config.upload_dir = dir;
    }

    if args.clear_cache {
        match pdf_reflow_core::clear_translation_cache(&config.cache) {
            Ok(count) => info!("Cleared {} cached translations", count),
            Err(e) => tracing::warn!("Failed to clear cache: {}", e),
        }
    }

    // Validates the model source and opens the unit cache, so both fail fast here
    let state = Arc::new(
        AppState::new(config).context("Failed to initialize application state")?,
    );
    info!(
        "Serving {} target languages from {}",
        state.translator.registry().targets().len(),
        state.config.source_lang
    );

    let app = app(state, args.max_upload_mb.saturating_mul(1024 * 1024));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use pdf_reflow_core::{
        CacheConfig, EngineInfo, EngineLoader, ModelSpec, TranslationEngine,
    };
    use tower::ServiceExt;

    const BOUNDARY: &str = "reflow-test-boundary";

    struct UpperEngine(ModelSpec);

    impl TranslationEngine for UpperEngine {
        fn info(&self) -> EngineInfo {
            EngineInfo {
                name: "upper",
                model_id: self.0.model_id.clone(),
                source: self.0.source.clone(),
                target: self.0.target.clone(),
            }
        }

        fn translate_unit(&self, text: &str) -> pdf_reflow_core::Result<String> {
            Ok(text.to_uppercase())
        }
    }

    struct UpperLoader;

    impl EngineLoader for UpperLoader {
        fn load(&self, spec: &ModelSpec) -> pdf_reflow_core::Result<Arc<dyn TranslationEngine>> {
            Ok(Arc::new(UpperEngine(spec.clone())))
        }
    }

    fn test_app(upload_dir: &std::path::Path) -> Router {
        let config = AppConfig {
            cache: CacheConfig::disabled(),
            upload_dir: upload_dir.to_path_buf(),
            ..AppConfig::default()
        };
        let state = AppState::with_loader(config, Arc::new(UpperLoader)).unwrap();
        app(Arc::new(state), 10 * 1024 * 1024)
    }

    fn sample_pdf() -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{Dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ]));
        let resources_id = doc.add_object(Dictionary::from_iter([(
            "Font",
            Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
        )]));
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal("Hello world.")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", Object::Reference(resources_id)),
            ("MediaBox", Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()])),
        ]));
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
                ("Count", Object::Integer(1)),
            ])),
        );
        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn multipart_request(uri: &str, file: &[u8], target: &str) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"target_lang\"\r\n\r\n{target}\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"doc.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(dir.path())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_index_lists_languages() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(dir.path())
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("name=\"target_lang\""));
        assert!(html.contains("value=\"de\""));
    }

    #[tokio::test]
    async fn test_languages_json() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(dir.path())
            .oneshot(Request::builder().uri("/api/languages").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let languages: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(languages.as_array().unwrap().iter().any(|l| l["code"] == "fr"));
    }

    #[tokio::test]
    async fn test_translate_returns_pdf_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(dir.path())
            .oneshot(multipart_request("/api/translate", &sample_pdf(), "de"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"translated_pdf.pdf\""
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(body.starts_with(b"%PDF"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_language_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(dir.path())
            .oneshot(multipart_request("/api/translate", &sample_pdf(), "xx"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("xx"));
    }

    #[tokio::test]
    async fn test_invalid_pdf_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(dir.path())
            .oneshot(multipart_request("/api/translate", b"not a pdf", "de"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_form_error_renders_page() {
        let dir = tempfile::tempdir().unwrap();
        let response = test_app(dir.path())
            .oneshot(multipart_request("/", b"not a pdf", "de"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("role=\"alert\""));
    }

    #[test]
    fn test_state_refuses_config_without_tokenizer_source() {
        let err = AppState::new(AppConfig::default()).err().unwrap();
        assert!(format!("{err:#}").contains("engine.tokenizer_repo"));
    }
}
