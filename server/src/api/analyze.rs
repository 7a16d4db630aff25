use axum::{
    extract::{multipart::MultipartRejection, Extension, Multipart, Query, State},
    Json,
};
use common::{Profile, ResponseEnvelope, TimelineExtractor};
use serde::Deserialize;
use tracing::info;

use super::client_ip::ClientIp;
use super::error::AppError;
use crate::http_server::HttpServerState;
use crate::ingest::IngestError;

/// Form field carrying the replay
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeQuery {
    /// Overrides the configured default profile
    pub profile: Option<String>,
}

/// `POST /analyze`: multipart upload of one replay, answered with the
/// match envelope and its event timeline.
pub async fn analyze(
    State(state): State<HttpServerState>,
    Extension(client): Extension<ClientIp>,
    Query(query): Query<AnalyzeQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ResponseEnvelope>, AppError> {
    let profile = match query.profile.as_deref() {
        Some(name) => name.parse::<Profile>()?,
        None => state.config.profile,
    };

    // A request that is not multipart at all has no file either.
    let mut multipart = multipart.map_err(|_| IngestError::NoFile)?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("<unnamed>").to_string();
        let bytes = field.bytes().await?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = upload.ok_or(IngestError::NoFile)?;
    info!(
        "Received file: {} ({} bytes) from {}",
        filename,
        bytes.len(),
        client
    );

    let replay = state.ingestor.clone().ingest(bytes.to_vec()).await?;

    let extractor = TimelineExtractor::new(profile, state.config.unknown_player);
    let envelope = extractor.extract(&replay)?;

    info!(
        "Analyzed {}: {} {} events",
        filename,
        envelope.events().len(),
        profile
    );
    Ok(Json(envelope))
}
