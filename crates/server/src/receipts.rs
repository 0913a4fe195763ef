//! Receipts API endpoints.

use api_types::{
    HsaStatus as ApiHsaStatus,
    receipt::{
        DuplicateKind as ApiDuplicateKind, MarkUsed, ReceiptList, ReceiptUpdate, ReceiptView,
        ReceiptsResponse, UploadCreated,
    },
};
use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::Utc;
use engine::{DuplicateKind, EngineError, HsaStatus, MoneyCents, Receipt, UploadCmd, UploadOutcome};

use crate::{ServerError, server::ServerState};

pub(crate) fn view(receipt: &Receipt) -> ReceiptView {
    ReceiptView {
        id: receipt.id,
        user_id: receipt.user_id.clone(),
        vendor: receipt.vendor.clone(),
        total_amount_minor: receipt.total_amount.cents(),
        date: receipt.date,
        hsa_qualified: receipt.hsa_qualified(),
        hsa_status: api_status(receipt.hsa_status),
        image_path: receipt.image_path.to_string_lossy().into_owned(),
        image_url: format!("/receipts/file/{}", receipt.id),
        used: receipt.used,
        used_at: receipt.used_at,
        use_reason: receipt.use_reason.clone(),
        created_at: receipt.created_at,
    }
}

pub(crate) fn duplicate_kind(kind: DuplicateKind) -> ApiDuplicateKind {
    match kind {
        DuplicateKind::ExactImage => ApiDuplicateKind::ExactImage,
        DuplicateKind::SamePurchase => ApiDuplicateKind::SamePurchase,
    }
}

fn api_status(status: HsaStatus) -> ApiHsaStatus {
    match status {
        HsaStatus::Yes => ApiHsaStatus::Yes,
        HsaStatus::No => ApiHsaStatus::No,
        HsaStatus::Partially => ApiHsaStatus::Partially,
    }
}

fn engine_status(status: ApiHsaStatus) -> HsaStatus {
    match status {
        ApiHsaStatus::Yes => HsaStatus::Yes,
        ApiHsaStatus::No => HsaStatus::No,
        ApiHsaStatus::Partially => HsaStatus::Partially,
    }
}

fn parse_id(raw: &str) -> Result<i64, ServerError> {
    raw.trim()
        .parse()
        .map_err(|_| ServerError::Generic(format!("invalid receipt id: {raw}")))
}

pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ReceiptList>,
) -> Result<Json<ReceiptsResponse>, ServerError> {
    let household = query.user_id.as_deref();
    let receipts = if query.eligible.unwrap_or(false) {
        state.engine.eligible_receipts(household).await?
    } else {
        state.engine.receipts(household).await?
    };

    Ok(Json(ReceiptsResponse {
        receipts: receipts.iter().map(view).collect(),
    }))
}

pub async fn get(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<ReceiptView>, ServerError> {
    let receipt = state.engine.receipt(parse_id(&id)?).await?;
    Ok(Json(view(&receipt)))
}

pub async fn upload(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> Result<Json<UploadCreated>, ServerError> {
    let mut file: Option<(String, Bytes)> = None;
    let mut allow_similar = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ServerError::Generic(format!("invalid multipart body: {err}")))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let name = field.file_name().unwrap_or("receipt").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ServerError::Generic(format!("failed to read file: {err}")))?;
                file = Some((name, bytes));
            }
            "allow_similar" => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| ServerError::Generic(format!("invalid allow_similar: {err}")))?;
                allow_similar = value.trim().eq_ignore_ascii_case("true");
            }
            _ => {}
        }
    }

    let (name, bytes) = file.ok_or_else(|| ServerError::Generic("No file uploaded".to_string()))?;
    let cmd = UploadCmd::new(name, bytes.to_vec(), Utc::now()).allow_similar(allow_similar);

    match state.engine.upload(cmd, &state.ocr).await? {
        UploadOutcome::Created(receipt) => Ok(Json(UploadCreated {
            message: "Receipt uploaded successfully".to_string(),
            receipt: view(&receipt),
        })),
        UploadOutcome::Duplicate(duplicate) => Err(duplicate.into()),
    }
}

pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<ReceiptUpdate>,
) -> Result<Json<ReceiptView>, ServerError> {
    let id = parse_id(&id)?;
    let update = engine::ReceiptUpdate {
        vendor: payload.vendor,
        total_amount: payload.total_amount_minor.map(MoneyCents::new),
        date: payload.date,
        hsa_status: payload.hsa_status.map(engine_status),
        used: payload.used,
        use_reason: payload.use_reason,
    };
    if update.is_empty() {
        return Err(ServerError::Generic("no fields to update".to_string()));
    }

    let receipt = state.engine.update_receipt(id, update).await?;
    Ok(Json(view(&receipt)))
}

pub async fn mark_used(
    State(state): State<ServerState>,
    Json(payload): Json<MarkUsed>,
) -> Result<Json<ReceiptsResponse>, ServerError> {
    let receipts = state
        .engine
        .mark_used(&payload.ids, payload.use_reason.as_deref())
        .await?;

    Ok(Json(ReceiptsResponse {
        receipts: receipts.iter().map(view).collect(),
    }))
}

pub async fn delete(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<ReceiptView>, ServerError> {
    let receipt = state.engine.delete_receipt(parse_id(&id)?).await?;
    Ok(Json(view(&receipt)))
}

pub async fn file(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let id = parse_id(&id)?;
    let (path, content_type) = state.engine.receipt_file(id).await?;
    let bytes = tokio::fs::read(&path).await.map_err(|err| {
        tracing::warn!("failed to read image {} of receipt {id}: {err}", path.display());
        ServerError::from(EngineError::KeyNotFound(format!("image of receipt {id}")))
    })?;

    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
