use actix_web::{
    web::{self, Json, Path},
    HttpRequest, HttpResponse, Responder,
};
use log::{error, info};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::caller_from_request;
use crate::db::AppState;
use crate::folder::models::{Folder, FolderContents, FolderDeletion, FolderUpdate};
use crate::ErrorResponse;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    #[schema(example = "Bulletins")]
    pub name: String,
    /// Omit for a root folder.
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFoldersRequest {
    pub folder_ids: Vec<Uuid>,
}

#[utoipa::path(
    context_path = "/api/media",
    tag = "Media Folders",
    post,
    path = "/folders",
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Folder created", body = Folder),
        (status = 400, description = "Invalid folder name", body = ErrorResponse),
        (status = 401, description = "Missing token or role not allowed", body = ErrorResponse),
        (status = 404, description = "Parent folder not found", body = ErrorResponse),
        (status = 409, description = "A sibling folder already has this name", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_folder(
    req: HttpRequest,
    body: Json<CreateFolderRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    info!("Executing create_folder handler for folder: {}", body.name);
    let caller = match caller_from_request(&req) {
        Ok(caller) => caller,
        Err(e) => return HttpResponse::from(e),
    };

    match data
        .library
        .create_folder(&caller, &body.name, body.parent_id)
        .await
    {
        Ok(folder) => HttpResponse::Created().json(folder),
        Err(e) => {
            error!("Failed to create folder '{}': {}", body.name, e);
            HttpResponse::from(e)
        }
    }
}

#[utoipa::path(
    context_path = "/api/media",
    tag = "Media Folders",
    get,
    path = "/folders",
    responses(
        (status = 200, description = "Root folders and root assets", body = FolderContents),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    )
)]
pub async fn list_root(data: web::Data<AppState>) -> impl Responder {
    match data.library.list_folder_contents(None).await {
        Ok(contents) => HttpResponse::Ok().json(contents),
        Err(e) => HttpResponse::from(e),
    }
}

#[utoipa::path(
    context_path = "/api/media",
    tag = "Media Folders",
    get,
    path = "/folders/{id}",
    responses(
        (status = 200, description = "Child folders, assets and breadcrumbs", body = FolderContents),
        (status = 404, description = "Folder not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "ID of the folder to open")
    )
)]
pub async fn list_folder(id: Path<Uuid>, data: web::Data<AppState>) -> impl Responder {
    match data.library.list_folder_contents(Some(id.into_inner())).await {
        Ok(contents) => HttpResponse::Ok().json(contents),
        Err(e) => HttpResponse::from(e),
    }
}

#[utoipa::path(
    context_path = "/api/media",
    tag = "Media Folders",
    patch,
    path = "/folders/{id}",
    request_body = FolderUpdate,
    responses(
        (status = 200, description = "Folder renamed and/or moved", body = Folder),
        (status = 400, description = "Invalid name or move into own subtree", body = ErrorResponse),
        (status = 401, description = "Missing token or role not allowed", body = ErrorResponse),
        (status = 404, description = "Folder or new parent not found", body = ErrorResponse),
        (status = 409, description = "A sibling folder already has this name", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "ID of the folder to change")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_folder(
    req: HttpRequest,
    id: Path<Uuid>,
    body: Json<FolderUpdate>,
    data: web::Data<AppState>,
) -> impl Responder {
    let folder_id = id.into_inner();
    info!("Executing update_folder handler for ID: {}", folder_id);
    let caller = match caller_from_request(&req) {
        Ok(caller) => caller,
        Err(e) => return HttpResponse::from(e),
    };

    match data.library.update_folder(&caller, folder_id, &body).await {
        Ok(folder) => HttpResponse::Ok().json(folder),
        Err(e) => HttpResponse::from(e),
    }
}

#[utoipa::path(
    context_path = "/api/media",
    tag = "Media Folders",
    post,
    path = "/folders/delete",
    request_body = DeleteFoldersRequest,
    responses(
        (status = 200, description = "Folders, descendants and their assets deleted", body = FolderDeletion),
        (status = 400, description = "No folder ids supplied", body = ErrorResponse),
        (status = 401, description = "Missing token or role not allowed", body = ErrorResponse),
        (status = 500, description = "Internal Server Error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_folders(
    req: HttpRequest,
    body: Json<DeleteFoldersRequest>,
    data: web::Data<AppState>,
) -> impl Responder {
    info!("Executing delete_folders handler for {} folders", body.folder_ids.len());
    let caller = match caller_from_request(&req) {
        Ok(caller) => caller,
        Err(e) => return HttpResponse::from(e),
    };

    match data.library.delete_folders(&caller, &body.folder_ids).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => {
            error!("Folder delete failed: {}", e);
            HttpResponse::from(e)
        }
    }
}
