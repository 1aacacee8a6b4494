use actix_web::{web, HttpRequest, HttpResponse};

use crate::core::errors::{ApiError, ApiResult};
use crate::core::helpers::checked_id;
use crate::core::resource;
use crate::core::store::Filter;
use crate::models::{Event, Place, User};
use crate::static_server::Assets;
use crate::AppState;

const TITLE_PLACEHOLDER: &str = "PAGE_TITLE";

fn page_title(path: &str) -> &'static str {
    match path.trim_end_matches('/') {
        "" | "/index.html" => "Home",
        "/activity" => "Activity",
        "/about" => "About",
        "/profile" => "My profile",
        "/register" => "Register",
        "/login" => "Log in",
        "/create" => "Create event",
        "/place" => "Create place",
        "/places" => "Places",
        "/events" => "Events",
        _ => "Marquee",
    }
}

fn render(title: &str) -> ApiResult<HttpResponse> {
    let template = Assets::get("index.html").ok_or_else(|| ApiError::internal("Shell template missing", "index.html"))?;
    let html = String::from_utf8(template.data.into_owned())
        .map_err(|e| ApiError::internal("Shell template is not UTF-8", e))?;

    let escaped = html_escape::encode_text(title);
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html.replace(TITLE_PLACEHOLDER, &escaped)))
}

pub async fn render_page(req: HttpRequest) -> ApiResult<HttpResponse> {
    render(page_title(req.path()))
}

pub async fn render_user_page(path: web::Path<String>, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let username = path.into_inner();
    let user = resource::find_one::<User>(state.store.as_ref(), &Filter::new().eq("username", username.as_str()))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    render(&user.username)
}

pub async fn render_event_page(path: web::Path<String>, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let event_id = path.into_inner();
    checked_id(&event_id)?;

    let event: Event = resource::load(state.store.as_ref(), &event_id).await?;
    render(&event.title)
}

pub async fn render_place_page(path: web::Path<String>, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let place_id = path.into_inner();
    checked_id(&place_id)?;

    let place: Place = resource::load(state.store.as_ref(), &place_id).await?;
    render(&place.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_pages_have_titles() {
        assert_eq!(page_title("/"), "Home");
        assert_eq!(page_title("/events/"), "Events");
        assert_eq!(page_title("/nowhere"), "Marquee");
    }
}
