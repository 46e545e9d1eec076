//! Translation routes - upload a PDF and receive the reflowed translation.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Multipart;
use pdf_reflow_core::Lang;
use std::sync::Arc;
use tracing::{error, info};

use crate::helpers::{CoreResultExt, ResultExt, RouteResult};
use crate::state::AppState;
use crate::templates::IndexTemplate;

/// File name of every translated download
const DOWNLOAD_NAME: &str = "translated_pdf.pdf";

/// Fields read from the multipart form
struct Upload {
    filename: String,
    bytes: Vec<u8>,
    target: Lang,
}

async fn read_upload(mut multipart: Multipart) -> RouteResult<Upload> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut target: Option<String> = None;

    while let Some(field) = multipart.next_field().await.or_bad_request()? {
        match field.name().unwrap_or("") {
            "file" => {
                let filename = field.file_name().unwrap_or("document.pdf").to_string();
                let data = field.bytes().await.or_bad_request()?;
                file = Some((filename, data.to_vec()));
            }
            "target_lang" => {
                target = Some(field.text().await.or_bad_request()?);
            }
            _ => {}
        }
    }

    let (filename, bytes) = file
        .filter(|(_, bytes)| !bytes.is_empty())
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "No file uploaded".to_string()))?;
    let target = target
        .map(|code| code.trim().to_string())
        .filter(|code| !code.is_empty())
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "No target language given".to_string()))?;

    Ok(Upload {
        filename,
        bytes,
        target: Lang::new(target),
    })
}

/// Run the blocking pipeline for one upload and build the download response.
async fn translate_upload(state: &AppState, upload: Upload) -> RouteResult<Response> {
    info!(
        "Translating {} ({} bytes) into {}",
        upload.filename,
        upload.bytes.len(),
        upload.target
    );

    let translator = Arc::clone(&state.translator);
    let target = upload.target;
    let bytes = upload.bytes;

    // Model inference is CPU-bound; keep it off the async workers
    let result = tokio::task::spawn_blocking(move || translator.submit(&bytes, &target))
        .await
        .map_err(|e| {
            error!("Translation task panicked: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Translation failed".to_string(),
            )
        })?
        .or_status()?;

    info!(
        "Finished {}: {} paragraphs, {} pages",
        upload.filename, result.stats.translated, result.report.pages
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/pdf")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{DOWNLOAD_NAME}\""),
        )
        .body(Body::from(result.pdf_bytes))
        .or_internal_error()
}

/// API endpoint: errors come back as plain text with the matching status.
pub async fn translate_api(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> RouteResult<Response> {
    let upload = read_upload(multipart).await?;
    translate_upload(&state, upload).await
}

/// Form endpoint: errors re-render the upload page with a message.
pub async fn translate_form(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Response {
    let outcome = match read_upload(multipart).await {
        Ok(upload) => translate_upload(&state, upload).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(response) => response,
        Err((status, message)) => {
            let page = IndexTemplate::new(
                state.language_options(),
                state.config.source_lang.as_str(),
                pdf_reflow_core::DEFAULT_TARGET_LANG,
            )
            .with_error(message);
            (status, page).into_response()
        }
    }
}
