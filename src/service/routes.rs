use std::path::Path;

use axum::{
    Form, Json,
    extract::{
        Multipart, Request, State,
        multipart::MultipartRejection,
        rejection::FormRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tokio::io::AsyncWriteExt;
use tower_http::services::ServeFile;

use super::error::ApiError;
use super::{Reply, StoreState};
use crate::api_bail;
use crate::ops::sources::local_file::OCTET_STREAM;
use crate::prelude::*;
use std::result::Result;

const UPLOAD_FIELD: &str = "image";
const SNIFF_LEN: usize = 512;
const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

const ALLOWED_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    OCTET_STREAM,
];

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    filename: String,
}

#[derive(Debug, Serialize)]
pub struct CurrentImage {
    current: Option<String>,
}

#[derive(Deserialize)]
pub struct SelectRequest {
    #[serde(default)]
    filename: String,
}

/// Media type of an upload judged by its leading bytes.
pub(super) fn detect_content_type(head: &[u8]) -> String {
    let head = &head[..head.len().min(SNIFF_LEN)];
    if let Some(kind) = infer::get(head) {
        return kind.mime_type().to_owned();
    }
    if head.iter().any(|&b| is_binary_control(b)) {
        OCTET_STREAM.to_owned()
    } else {
        PLAIN_TEXT.to_owned()
    }
}

fn is_binary_control(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f)
}

fn stored_name(original: &str) -> Option<String> {
    let base = Path::new(original).file_name()?.to_str()?;
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    Some(format!("{nanos}-{base}"))
}

pub async fn upload(
    State(state): State<Arc<StoreState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Reply<UploadedFile>>), ApiError> {
    let Ok(mut multipart) = multipart else {
        api_bail!(BAD_REQUEST, "Invalid file upload");
    };
    let (original, contents) = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.name() == Some(UPLOAD_FIELD) => {
                let Some(original) = field.file_name().map(str::to_owned) else {
                    api_bail!(BAD_REQUEST, "Invalid file upload");
                };
                match field.bytes().await {
                    Ok(contents) => break (original, contents),
                    Err(err) => {
                        debug!("upload body unreadable: {err}");
                        api_bail!(BAD_REQUEST, "Invalid file upload");
                    }
                }
            }
            Ok(Some(_)) => continue,
            Ok(None) => api_bail!(BAD_REQUEST, "Invalid file upload"),
            Err(err) => {
                debug!("multipart stream unreadable: {err}");
                api_bail!(BAD_REQUEST, "Invalid file upload");
            }
        }
    };
    if contents.is_empty() {
        api_bail!(INTERNAL_SERVER_ERROR, "Error reading file content");
    }

    let media_type = detect_content_type(&contents);
    if !ALLOWED_TYPES.contains(&media_type.as_str()) {
        api_bail!(BAD_REQUEST, "Unsupported file type: {media_type}");
    }

    let Some(filename) = stored_name(&original) else {
        api_bail!(BAD_REQUEST, "Invalid file upload");
    };
    let path = state.upload_dir().join(&filename);
    let mut dst = tokio::fs::File::create(&path).await.map_err(|err| {
        error!(path = %path.display(), "cannot create file: {err}");
        ApiError::internal("Error creating file on server")
    })?;
    let written = async {
        dst.write_all(&contents).await?;
        dst.flush().await
    }
    .await;
    if let Err(err) = written {
        error!(path = %path.display(), "cannot write file: {err}");
        api_bail!(INTERNAL_SERVER_ERROR, "Error saving file content");
    }

    info!(%filename, %media_type, bytes = contents.len(), "stored upload");
    Ok((
        StatusCode::CREATED,
        Json(Reply::ok(
            "File uploaded successfully",
            Some(UploadedFile { filename }),
        )),
    ))
}

pub async fn select_image(
    State(state): State<Arc<StoreState>>,
    form: Result<Form<SelectRequest>, FormRejection>,
) -> Result<Json<Reply<()>>, ApiError> {
    let filename = form.map(|Form(req)| req.filename).unwrap_or_default();
    if filename.is_empty() {
        api_bail!(BAD_REQUEST, "Missing filename parameter");
    }
    let Some(path) = state.resolve(&filename) else {
        api_bail!(NOT_FOUND, "File not found");
    };
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => {}
        _ => api_bail!(NOT_FOUND, "File not found"),
    }

    info!(%filename, "image selected");
    state.set_current(filename);
    Ok(Json(Reply::ok("Image selected successfully", None)))
}

pub async fn list_images(
    State(state): State<Arc<StoreState>>,
) -> Result<Json<Reply<Vec<String>>>, ApiError> {
    let read_error = |err: std::io::Error| {
        error!(dir = %state.upload_dir().display(), "cannot list uploads: {err}");
        ApiError::internal("Error reading upload directory")
    };
    let mut entries = tokio::fs::read_dir(state.upload_dir())
        .await
        .map_err(read_error)?;
    let mut filenames = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
        if !is_dir {
            filenames.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    filenames.sort();
    Ok(Json(Reply::ok("", Some(filenames))))
}

pub async fn current_image(State(state): State<Arc<StoreState>>) -> Json<Reply<CurrentImage>> {
    Json(Reply::ok(
        "",
        Some(CurrentImage {
            current: state.current(),
        }),
    ))
}

/// Serves the active image itself.
pub async fn stream(State(state): State<Arc<StoreState>>, req: Request) -> Response {
    let Some(filename) = state.current() else {
        return (StatusCode::NOT_FOUND, "No image currently selected").into_response();
    };
    let Some(path) = state.resolve(&filename).filter(|p| p.is_file()) else {
        return (StatusCode::NOT_FOUND, "Selected image no longer exists").into_response();
    };
    match ServeFile::new(&path).try_call(req).await {
        Ok(resp) => resp.map(axum::body::Body::new),
        Err(err) => {
            error!(path = %path.display(), "cannot stream image: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error reading selected image").into_response()
        }
    }
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}
