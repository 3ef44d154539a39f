use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use fraghub_core::materials::{MaterialDetail, MaterialInput};
use fraghub_core::AppState;
use fraghub_db::materials::MaterialRow;
use fraghub_models::content::MaterialCategory;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;

const POPULAR_LIMIT: i64 = 12;

fn material_to_json(m: &MaterialRow) -> Value {
    json!({
        "id": m.id,
        "title": m.title,
        "description": m.description,
        "category": m.category,
        "file_url": m.file_url,
        "link": m.link,
        "youtube_embed": m.youtube_embed,
        "downloads": m.downloads,
        "created_at": m.created_at.to_rfc3339(),
        "updated_at": m.updated_at.to_rfc3339(),
    })
}

fn materials_json(materials: &[MaterialRow]) -> Vec<Value> {
    materials.iter().map(material_to_json).collect()
}

fn detail_to_json(detail: &MaterialDetail) -> Value {
    let mut value = material_to_json(&detail.material);
    value["similar"] = json!(materials_json(&detail.similar));
    value
}

#[derive(Deserialize)]
pub struct MaterialsQuery {
    pub category: Option<String>,
}

pub async fn list_materials(
    State(state): State<AppState>,
    Query(query): Query<MaterialsQuery>,
) -> Result<Json<Value>, ApiError> {
    let category = query
        .category
        .as_deref()
        .map(str::parse::<MaterialCategory>)
        .transpose()?;
    let materials = fraghub_db::materials::list_materials(&state.db, category).await?;
    let counts: Vec<Value> = fraghub_core::materials::category_counts(&state.db)
        .await?
        .into_iter()
        .map(|(category, count)| json!({ "category": category, "count": count }))
        .collect();
    Ok(Json(json!({
        "materials": materials_json(&materials),
        "categories": counts,
    })))
}

pub async fn list_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let category: MaterialCategory = category.parse()?;
    let materials = fraghub_db::materials::list_materials(&state.db, Some(category)).await?;
    Ok(Json(json!({
        "category": category,
        "materials": materials_json(&materials),
    })))
}

pub async fn list_popular(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let materials = fraghub_db::materials::list_popular(&state.db, POPULAR_LIMIT).await?;
    Ok(Json(json!({ "materials": materials_json(&materials) })))
}

pub async fn get_material(
    State(state): State<AppState>,
    Path(material_id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let detail = fraghub_core::materials::get_material(&state.db, material_id).await?;
    Ok(Json(detail_to_json(&detail)))
}

/// Counts the download and sends the client on to the file.
pub async fn download(
    State(state): State<AppState>,
    Path(material_id): Path<i64>,
) -> Result<Response, ApiError> {
    let download = fraghub_core::materials::download(&state.db, material_id).await?;
    let body = json!({ "downloads": download.downloads, "redirect": download.file_url });
    Ok((StatusCode::SEE_OTHER, [(header::LOCATION, download.file_url)], Json(body)).into_response())
}

#[derive(Deserialize)]
pub struct MaterialRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: MaterialCategory,
    pub file_url: Option<String>,
    pub link: Option<String>,
    #[serde(default)]
    pub youtube_embed: String,
}

impl From<MaterialRequest> for MaterialInput {
    fn from(body: MaterialRequest) -> Self {
        MaterialInput {
            title: body.title,
            description: body.description,
            category: body.category,
            file_url: body.file_url,
            link: body.link,
            youtube_embed: body.youtube_embed,
        }
    }
}

pub async fn create_material(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<MaterialRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let material =
        fraghub_core::materials::create_material(&state.db, &auth.actor(), &body.into()).await?;
    Ok((StatusCode::CREATED, Json(material_to_json(&material))))
}

pub async fn update_material(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(material_id): Path<i64>,
    Json(body): Json<MaterialRequest>,
) -> Result<Json<Value>, ApiError> {
    let material =
        fraghub_core::materials::update_material(&state.db, &auth.actor(), material_id, &body.into())
            .await?;
    Ok(Json(material_to_json(&material)))
}

pub async fn delete_material(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(material_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    fraghub_core::materials::delete_material(&state.db, &auth.actor(), material_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
