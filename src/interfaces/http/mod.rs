pub mod types;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::error::{InternalError, JsonPayloadError};
use actix_web::http::StatusCode;
use actix_web::{delete, dev::Server, get, post, put, web, App, HttpResponse, HttpServer};
use tracing::{error, info, warn};

use crate::application::{ExportedFile, TaxonomyUseCase};
use crate::domain::app_config::AppConfig;
use crate::domain::error::{AppError, Result};
use crate::domain::{TaxonId, TaxonomyKind};
use crate::infrastructure::tabular::TabularFormat;
use types::{
    CreateTaxonRequest, ErrorResponse, ExportQuery, IconRequest, ImportRequest, ImportResponse,
    SubcategoryQuery, SubcategoryRequest,
};

pub struct HttpState {
    pub taxonomy: Arc<TaxonomyUseCase>,
    pub default_export_format: TabularFormat,
    pub max_upload_bytes: usize,
}

fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::ValidationError(_) | AppError::FormatError(_) | AppError::ParseError(_) => {
            StatusCode::BAD_REQUEST
        }
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Conflict(_) => StatusCode::CONFLICT,
        AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: AppError) -> HttpResponse {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(error = %err, "Request failed");
    } else {
        warn!(error = %err, "Request rejected");
    }
    HttpResponse::build(status).json(ErrorResponse {
        success: false,
        message: err.to_string(),
    })
}

fn payload_too_large(limit: usize) -> HttpResponse {
    warn!(limit, "Request body exceeds upload limit");
    HttpResponse::PayloadTooLarge().json(ErrorResponse {
        success: false,
        message: format!("Request body exceeds the {} byte upload limit", limit),
    })
}

/// JSON extractor rejections use the same `{success, message}` envelope as
/// every other error.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(move |err, _req| {
            let response = match &err {
                JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
                    payload_too_large(limit)
                }
                _ => {
                    warn!(error = %err, "Rejected JSON body");
                    HttpResponse::BadRequest().json(ErrorResponse {
                        success: false,
                        message: format!("Invalid JSON body: {}", err),
                    })
                }
            };
            InternalError::from_response(err, response).into()
        })
}

fn respond<T: serde::Serialize>(result: Result<T>) -> HttpResponse {
    match result {
        Ok(body) => HttpResponse::Ok().json(body),
        Err(e) => error_response(e),
    }
}

fn parse_kind(raw: &str) -> Result<TaxonomyKind> {
    raw.parse::<TaxonomyKind>()
}

#[post("/taxonomies/{kind}/import")]
async fn import_entities(
    data: web::Data<HttpState>,
    kind: web::Path<String>,
    req: web::Json<ImportRequest>,
) -> HttpResponse {
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(e) => return error_response(e),
    };
    info!(kind = %kind, entities = req.entities.len(), "Importing taxonomy entities");

    match data
        .taxonomy
        .import_entities(kind, req.into_inner().entities)
        .await
    {
        Ok(report) => HttpResponse::Ok().json(ImportResponse::completed(report)),
        Err(e) => error_response(e),
    }
}

#[post("/taxonomies/{kind}/import/upload")]
async fn import_upload(
    data: web::Data<HttpState>,
    kind: web::Path<String>,
    payload: web::Payload,
) -> HttpResponse {
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(e) => return error_response(e),
    };
    let body = match payload.to_bytes_limited(data.max_upload_bytes).await {
        Ok(Ok(body)) => body,
        Ok(Err(e)) => {
            return error_response(AppError::IoError(format!("Failed to read upload: {}", e)))
        }
        Err(_) => return payload_too_large(data.max_upload_bytes),
    };
    info!(kind = %kind, bytes = body.len(), "Importing taxonomy upload");

    match data.taxonomy.import_upload(kind, &body).await {
        Ok(report) => HttpResponse::Ok().json(ImportResponse::completed(report)),
        Err(e) => error_response(e),
    }
}

#[get("/taxonomies/{kind}/export")]
async fn export_template(
    data: web::Data<HttpState>,
    kind: web::Path<String>,
    query: web::Query<ExportQuery>,
) -> HttpResponse {
    let result: Result<ExportedFile> = async {
        let kind = parse_kind(&kind)?;
        let format = match query.format.as_deref() {
            Some(raw) => raw.parse::<TabularFormat>()?,
            None => data.default_export_format,
        };
        data.taxonomy.export_template(kind, format).await
    }
    .await;

    match result {
        Ok(file) => HttpResponse::Ok()
            .content_type(file.content_type)
            .insert_header((
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", file.file_name),
            ))
            .body(file.bytes),
        Err(e) => error_response(e),
    }
}

#[get("/taxonomies/{kind}")]
async fn list_taxa(data: web::Data<HttpState>, kind: web::Path<String>) -> HttpResponse {
    match parse_kind(&kind) {
        Ok(kind) => respond(data.taxonomy.list(kind).await),
        Err(e) => error_response(e),
    }
}

#[post("/taxonomies/{kind}")]
async fn create_taxon(
    data: web::Data<HttpState>,
    kind: web::Path<String>,
    req: web::Json<CreateTaxonRequest>,
) -> HttpResponse {
    match parse_kind(&kind) {
        Ok(kind) => respond(
            data.taxonomy
                .create_one(kind, &req.name, req.icon.as_deref())
                .await,
        ),
        Err(e) => error_response(e),
    }
}

#[delete("/taxonomies/{kind}/{id}")]
async fn delete_taxon(
    data: web::Data<HttpState>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (kind, id) = path.into_inner();
    let result = match parse_kind(&kind) {
        Ok(kind) => data.taxonomy.delete_one(kind, &TaxonId(id)).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => error_response(e),
    }
}

#[put("/taxonomies/{kind}/{id}/icon")]
async fn update_icon(
    data: web::Data<HttpState>,
    path: web::Path<(String, String)>,
    req: web::Json<IconRequest>,
) -> HttpResponse {
    let (kind, id) = path.into_inner();
    match parse_kind(&kind) {
        Ok(kind) => respond(
            data.taxonomy
                .update_icon(kind, &TaxonId(id), &req.icon)
                .await,
        ),
        Err(e) => error_response(e),
    }
}

#[post("/taxonomies/{kind}/{id}/subcategories")]
async fn add_subcategory(
    data: web::Data<HttpState>,
    path: web::Path<(String, String)>,
    req: web::Json<SubcategoryRequest>,
) -> HttpResponse {
    let (kind, id) = path.into_inner();
    match parse_kind(&kind) {
        Ok(kind) => respond(
            data.taxonomy
                .add_subcategory(kind, &TaxonId(id), &req.name)
                .await,
        ),
        Err(e) => error_response(e),
    }
}

#[delete("/taxonomies/{kind}/{id}/subcategories")]
async fn remove_subcategory(
    data: web::Data<HttpState>,
    path: web::Path<(String, String)>,
    query: web::Query<SubcategoryQuery>,
) -> HttpResponse {
    let (kind, id) = path.into_inner();
    match parse_kind(&kind) {
        Ok(kind) => respond(
            data.taxonomy
                .remove_subcategory(kind, &TaxonId(id), &query.name)
                .await,
        ),
        Err(e) => error_response(e),
    }
}

/// Registers every taxonomy route. Upload precedes the `{id}` routes so
/// `/import/upload` is never read as an id.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(import_upload)
        .service(import_entities)
        .service(export_template)
        .service(list_taxa)
        .service(create_taxon)
        .service(update_icon)
        .service(add_subcategory)
        .service(remove_subcategory)
        .service(delete_taxon);
}

pub fn start_server(taxonomy: Arc<TaxonomyUseCase>, config: &AppConfig) -> Result<Server> {
    let default_export_format = config.import.default_export_format.parse::<TabularFormat>()?;
    let max_upload_bytes = config.import.max_upload_bytes;
    let state = web::Data::new(HttpState {
        taxonomy,
        default_export_format,
        max_upload_bytes,
    });

    let bind = (config.server.host.clone(), config.server.port);
    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Admin UI is served from another origin

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .app_data(json_config(max_upload_bytes))
            .service(web::scope("/api").configure(configure))
    })
    .bind(bind.clone())
    .map_err(|e| AppError::IoError(format!("Failed to bind {}:{}: {}", bind.0, bind.1, e)))?
    .run();

    info!(host = %bind.0, port = bind.1, "Taxonomy API listening");
    Ok(server)
}
