use actix_web::{web, HttpRequest, HttpResponse};
use mime_guess::from_path;
use rust_embed::RustEmbed;

use crate::core::assets::AssetKind;
use crate::core::errors::{ApiError, ApiResult};
use crate::AppState;

#[derive(RustEmbed)]
#[folder = "static"]
pub(crate) struct Assets;

fn content_type(file_path: &str) -> String {
    from_path(file_path).first_or_octet_stream().to_string()
}

/// Files compiled into the binary: stylesheets, scripts and the favicon.
pub async fn serve_static(req: HttpRequest) -> ApiResult<HttpResponse> {
    let file_path = req.path().trim_start_matches('/');
    if file_path.split('/').any(|part| part == "..") {
        return Err(ApiError::not_found("File not found"));
    }

    let file = Assets::get(file_path).ok_or_else(|| ApiError::not_found("File not found"))?;

    Ok(HttpResponse::Ok()
        .content_type(content_type(file_path))
        .body(file.data.into_owned()))
}

/// Uploaded pictures, read from the asset root on every request.
pub async fn serve_upload(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let directory = req.path().trim_start_matches('/').split('/').next().unwrap_or_default();
    let kind = AssetKind::from_directory(directory).ok_or_else(|| ApiError::not_found("File not found"))?;

    let file_name = path.into_inner();
    let bytes = state.assets.read(kind, &file_name).await?;

    Ok(HttpResponse::Ok()
        .content_type(content_type(&file_name))
        .body(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_assets_are_embedded() {
        assert!(Assets::get("index.html").is_some());
        assert!(Assets::get("css/app.css").is_some());
        assert!(Assets::get("js/app.js").is_some());
        assert!(Assets::get("favicon.ico").is_some());
    }

    #[test]
    fn content_types_follow_extensions() {
        assert_eq!(content_type("css/app.css"), "text/css");
        assert_eq!(content_type("ev1.jpg"), "image/jpeg");
        assert_eq!(content_type("blob"), "application/octet-stream");
    }
}
