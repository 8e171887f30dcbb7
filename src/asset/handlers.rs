use actix_multipart::Multipart;
use actix_web::{
    web::{self, Json, Path},
    HttpRequest, HttpResponse, Responder,
};
use futures_util::TryStreamExt;
use log::{debug, error, info};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::asset::models::{Asset, AssetDeletion, AssetMetadataUpdate, AssetMove, UploadOutcome};
use crate::auth::caller_from_request;
use crate::db::AppState;
use crate::error::{MediaError, MediaResult};
use crate::library::UploadRequest;
use crate::ErrorResponse;

/// Multipart form accepted by the upload endpoint.
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct UploadAssetForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Target folder; omit to upload into the root.
    pub folder_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetIdsRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MoveAssetsRequest {
    pub asset_ids: Vec<Uuid>,
    /// `null` or omitted moves the assets to the root.
    pub target_folder_id: Option<Uuid>,
}

async fn read_field(field: &mut actix_multipart::Field, limit: usize) -> MediaResult<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| MediaError::validation(format!("Malformed multipart body: {e}")))?
    {
        if bytes.len() + chunk.len() > limit {
            return Err(MediaError::validation(format!(
                "Field exceeds the limit of {limit} bytes"
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Buffers the `file` part (capped at `max_bytes`) and the optional
/// `folderId` part of an upload form.
async fn read_upload_form(mut payload: Multipart, max_bytes: usize) -> MediaResult<UploadRequest> {
    let mut file: Option<(Vec<u8>, String, String)> = None;
    let mut folder_id: Option<Uuid> = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| MediaError::validation(format!("Malformed multipart body: {e}")))?
    {
        let field_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .unwrap_or_default()
            .to_string();

        match field_name.as_str() {
            "file" => {
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .map(str::to_string)
                    .ok_or_else(|| MediaError::validation("The file part has no filename"))?;
                let declared = field
                    .content_type()
                    .map(|m| m.essence_str().to_string())
                    .filter(|m| m != "application/octet-stream");
                let mime_type = declared.unwrap_or_else(|| {
                    mime_guess::from_path(&filename)
                        .first_or_octet_stream()
                        .essence_str()
                        .to_string()
                });

                let bytes = read_field(&mut field, max_bytes).await?;
                debug!("Received file '{}' ({} bytes, {})", filename, bytes.len(), mime_type);
                file = Some((bytes, filename, mime_type));
            }
            "folderId" => {
                let raw = read_field(&mut field, 64).await?;
                let value = String::from_utf8(raw)
                    .map_err(|_| MediaError::validation("folderId is not valid UTF-8"))?;
                let value = value.trim();
                if !value.is_empty() {
                    folder_id = Some(
                        Uuid::parse_str(value)
                            .map_err(|_| MediaError::validation("folderId is not a valid UUID"))?,
                    );
                }
            }
            _ => {
                continue;
            }
        }
    }

    let (bytes, filename, mime_type) =
        file.ok_or_else(|| MediaError::validation("No file was uploaded"))?;
    Ok(UploadRequest {
        bytes,
        filename,
        mime_type,
        folder_id,
    })
}

#[utoipa::path(
    context_path = "/api/media",
    tag = "Media Assets",
    post,
    path = "/assets",
    request_body(content = inline(UploadAssetForm), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "New asset stored", body = UploadOutcome),
        (status = 200, description = "Identical content already stored; existing asset returned", body = UploadOutcome),
        (status = 400, description = "Invalid or oversized upload", body = ErrorResponse),
        (status = 401, description = "Missing token or role not allowed", body = ErrorResponse),
        (status = 404, description = "Target folder not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_asset(
    req: HttpRequest,
    payload: Multipart,
    data: web::Data<AppState>,
) -> impl Responder {
    info!("Executing upload_asset handler");
    let caller = match caller_from_request(&req) {
        Ok(caller) => caller,
        Err(e) => return HttpResponse::from(e),
    };

    // Read one byte past the limit so oversize input reaches the library check.
    let limit = data.library.max_upload_bytes().saturating_add(1);
    let request = match read_upload_form(payload, limit).await {
        Ok(request) => request,
        Err(e) => {
            error!("Rejected upload form: {}", e);
            return HttpResponse::from(e);
        }
    };

    match data.library.upload(&caller, request).await {
        Ok(outcome) if outcome.is_new_upload => HttpResponse::Created().json(outcome),
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => {
            error!("Upload failed: {}", e);
            HttpResponse::from(e)
        }
    }
}

#[utoipa::path(
    context_path = "/api/media",
    tag = "Media Assets",
    get,
    path = "/assets/{id}",
    responses(
        (status = 200, description = "Asset found", body = Asset),
        (status = 404, description = "Asset not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "ID of the asset to retrieve")
    )
)]
pub async fn get_asset(id: Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    let asset_id = id.into_inner();
    debug!("Executing get_asset handler for ID: {}", asset_id);
    match data.library.get_asset(asset_id).await {
        Ok(asset) => HttpResponse::Ok().json(asset),
        Err(e) => HttpResponse::from(e),
    }
}

#[utoipa::path(
    context_path = "/api/media",
    tag = "Media Assets",
    patch,
    path = "/assets/{id}",
    request_body = AssetMetadataUpdate,
    responses(
        (status = 200, description = "Metadata updated", body = Asset),
        (status = 400, description = "Nothing to update or blank display name", body = ErrorResponse),
        (status = 401, description = "Missing token or role not allowed", body = ErrorResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "ID of the asset to edit")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_asset_metadata(
    req: HttpRequest,
    id: Path<Uuid>,
    body: Json<AssetMetadataUpdate>,
    data: web::Data<AppState>,
) -> impl Responder {
    let asset_id = id.into_inner();
    info!("Executing update_asset_metadata handler for ID: {}", asset_id);
    let caller = match caller_from_request(&req) {
        Ok(caller) => caller,
        Err(e) => return HttpResponse::from(e),
    };

    match data
        .library
        .update_asset_metadata(&caller, asset_id, &body)
        .await
    {
        Ok(asset) => HttpResponse::Ok().json(asset),
        Err(e) => HttpResponse::from(e),
    }
}

#[utoipa::path(
    context_path = "/api/media",
    tag = "Media Assets",
    delete,
    path = "/assets/{id}",
    responses(
        (status = 204, description = "Asset deleted"),
        (status = 401, description = "Missing token or role not allowed", body = ErrorResponse),
        (status = 404, description = "Asset not found", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "ID of the asset to delete")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_asset(
    req: HttpRequest,
    id: Path<Uuid>,
    data: web::Data<AppState>,
) -> impl Responder {
    let asset_id = id.into_inner();
    info!("Executing delete_asset handler for ID: {}", asset_id);
    let caller = match caller_from_request(&req) {
        Ok(caller) => caller,
        Err(e) => return HttpResponse::from(e),
    };

    match data.library.delete_asset(&caller, asset_id).await {
        Ok(_) => HttpResponse::NoContent().finish(),
        Err(e) => {
            error!("Failed to delete asset {}: {}", asset_id, e);
            HttpResponse::from(e)
        }
    }
}

#[utoipa::path(
    context_path = "/api/media",
    tag = "Media Assets",
    post,
    path = "/assets/by-ids",
    request_body = AssetIdsRequest,
    responses(
        (status = 200, description = "Assets that exist among the requested ids", body = Vec<Asset>),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn get_assets_by_ids(
    body: Json<AssetIdsRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    debug!("Executing get_assets_by_ids handler for {} ids", body.ids.len());
    match data.library.get_assets_by_ids(&body.ids).await {
        Ok(assets) => HttpResponse::Ok().json(assets),
        Err(e) => HttpResponse::from(e),
    }
}

#[utoipa::path(
    context_path = "/api/media",
    tag = "Media Assets",
    post,
    path = "/assets/move",
    request_body = MoveAssetsRequest,
    responses(
        (status = 200, description = "Assets moved", body = AssetMove),
        (status = 400, description = "No asset ids supplied", body = ErrorResponse),
        (status = 401, description = "Missing token or role not allowed", body = ErrorResponse),
        (status = 404, description = "Target folder not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn move_assets(
    req: HttpRequest,
    body: Json<MoveAssetsRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    info!("Executing move_assets handler for {} assets", body.asset_ids.len());
    let caller = match caller_from_request(&req) {
        Ok(caller) => caller,
        Err(e) => return HttpResponse::from(e),
    };

    match data
        .library
        .move_assets(&caller, &body.asset_ids, body.target_folder_id)
        .await
    {
        Ok(moved) => HttpResponse::Ok().json(moved),
        Err(e) => HttpResponse::from(e),
    }
}

#[utoipa::path(
    context_path = "/api/media",
    tag = "Media Assets",
    post,
    path = "/assets/bulk-delete",
    request_body = AssetIdsRequest,
    responses(
        (status = 200, description = "Best-effort delete report", body = AssetDeletion),
        (status = 400, description = "No asset ids supplied", body = ErrorResponse),
        (status = 401, description = "Missing token or role not allowed", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn bulk_delete_assets(
    req: HttpRequest,
    body: Json<AssetIdsRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    info!("Executing bulk_delete_assets handler for {} assets", body.ids.len());
    let caller = match caller_from_request(&req) {
        Ok(caller) => caller,
        Err(e) => return HttpResponse::from(e),
    };

    match data.library.bulk_delete_assets(&caller, &body.ids).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            error!("Bulk delete failed: {}", e);
            HttpResponse::from(e)
        }
    }
}
