//! Product route handlers.
//!
//! Reads are public. Writes take a multipart form and require an admin.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::instrument;

use techmart_core::ProductId;
use techmart_core::api::{ApiMessage, ProductQuery, ProductResponse, ProductsResponse};

use crate::error::{AppError, Result};
use crate::extract::ApiQuery;
use crate::middleware::RequireAdmin;
use crate::services::catalog::{CatalogError, ProductForm};
use crate::services::images::ImageUpload;
use crate::state::AppState;

fn parse_product_id(raw: &str) -> Result<ProductId> {
    raw.parse()
        .map_err(|_| AppError::Catalog(CatalogError::NotFound))
}

/// Read every field of a product form. Unknown fields are ignored.
async fn read_form(mut multipart: Multipart) -> Result<ProductForm> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            "image" | "additionalImages" => {
                let file_name = field.file_name().unwrap_or("upload").to_owned();
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field.bytes().await?;
                if bytes.is_empty() {
                    continue;
                }
                let upload = ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                };
                if name == "image" {
                    form.image = Some(upload);
                } else {
                    form.additional_images.push(upload);
                }
            }
            "existingAdditionalImages" => {
                form.existing_additional_images.push(field.text().await?);
            }
            _ => {
                let slot = match name.as_str() {
                    "name" => &mut form.name,
                    "description" => &mut form.description,
                    "price" => &mut form.price,
                    "originalPrice" => &mut form.original_price,
                    "quantity" => &mut form.quantity,
                    "category" => &mut form.category,
                    "brand" => &mut form.brand,
                    "featured" => &mut form.featured,
                    "specs" => &mut form.specs,
                    "existingImage" => &mut form.existing_image,
                    _ => continue,
                };
                *slot = Some(field.text().await?);
            }
        }
    }

    Ok(form)
}

/// `GET /api/products?category=&featured=`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<ProductsResponse>> {
    let products = state.catalog().list(&query).await?;
    Ok(Json(ProductsResponse {
        success: true,
        products,
    }))
}

/// `GET /api/products/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductResponse>> {
    let product = state.catalog().get(parse_product_id(&id)?).await?;
    Ok(Json(ProductResponse {
        success: true,
        message: None,
        product,
    }))
}

/// `POST /api/products/add`
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let form = read_form(multipart).await?;
    let product = state.catalog().create(form).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProductResponse {
            success: true,
            message: Some("Product created".to_owned()),
            product,
        }),
    ))
}

/// `PUT /api/products/{id}`
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ProductResponse>> {
    let id = parse_product_id(&id)?;
    let form = read_form(multipart).await?;
    let product = state.catalog().update(id, form).await?;
    Ok(Json(ProductResponse {
        success: true,
        message: Some("Product updated".to_owned()),
        product,
    }))
}

/// `DELETE /api/products/{id}`
#[instrument(skip_all, fields(admin_id = %admin.id, product_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<ApiMessage>> {
    state.catalog().delete(parse_product_id(&id)?).await?;
    Ok(Json(ApiMessage::ok("Product deleted")))
}
