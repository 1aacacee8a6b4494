use actix_web::{web, HttpRequest, HttpResponse};

use crate::auth::AuthUser;
use crate::core::errors::{ApiError, ApiResult};
use crate::core::form::FormData;
use crate::core::helpers::{checked_id, generate_id, TICKET_ID_LENGTH};
use crate::core::resource::{self, Stocked};
use crate::core::store::{Filter, Update};
use crate::models::{Event, Ticket};
use crate::AppState;

fn scoped(event_id: &str, ticket_id: &str) -> Filter {
    Filter::new().eq("eventid", event_id).eq("ticketid", ticket_id)
}

/// Price and count fields shared by tickets and merch: present, numeric and
/// non-negative.
pub(crate) fn price(form: &FormData) -> ApiResult<Option<f64>> {
    match form.number("price")? {
        Some(p) if p < 0.0 => Err(ApiError::bad_request("Price cannot be negative")),
        other => Ok(other),
    }
}

pub(crate) fn count(form: &FormData, key: &str) -> ApiResult<Option<i64>> {
    match form.integer(key)? {
        Some(n) if n < 0 => Err(ApiError::bad_request(format!("{} cannot be negative", key))),
        other => Ok(other),
    }
}

/// Units requested by a purchase body; defaults to one.
pub(crate) fn requested_quantity(form: &FormData) -> ApiResult<i64> {
    match form.integer("quantity")? {
        None => Ok(1),
        Some(n) if n >= 1 => Ok(n),
        Some(_) => Err(ApiError::bad_request("Quantity must be at least 1")),
    }
}

fn changes(form: &FormData) -> ApiResult<Update> {
    let mut update = Update::new();
    if form.has("name") {
        update = update.set("name", form.required("name")?);
    }
    if let Some(p) = price(form)? {
        update = update.set("price", p);
    }
    if let Some(q) = count(form, "quantity")? {
        update = update.set("quantity", q);
    }
    Ok(update)
}

pub async fn create_ticket(
    req: HttpRequest,
    path: web::Path<String>,
    payload: web::Payload,
    user: AuthUser,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let event_id = path.into_inner();
    checked_id(&event_id)?;

    let store = state.store.as_ref();
    resource::load_owned::<Event>(store, &event_id, &user.user_id).await?;

    let form = FormData::read(req.headers(), payload).await?;
    let ticket = Ticket {
        ticket_id: generate_id(TICKET_ID_LENGTH),
        event_id,
        name: form.required("name")?,
        price: price(&form)?.ok_or_else(|| ApiError::bad_request("price is required"))?,
        quantity: count(&form, "quantity")?.ok_or_else(|| ApiError::bad_request("quantity is required"))?,
    };

    resource::insert(store, &ticket).await?;
    log::info!("User {} added ticket {} to event {}", user.user_id, ticket.ticket_id, ticket.event_id);

    Ok(HttpResponse::Created().json(ticket))
}

pub async fn list_tickets(path: web::Path<String>, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let event_id = path.into_inner();
    checked_id(&event_id)?;

    let tickets: Vec<Ticket> =
        resource::find_all(state.store.as_ref(), &Filter::new().eq("eventid", event_id.as_str())).await?;
    Ok(HttpResponse::Ok().json(tickets))
}

pub async fn get_ticket(path: web::Path<(String, String)>, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let (event_id, ticket_id) = path.into_inner();
    checked_id(&event_id)?;
    checked_id(&ticket_id)?;

    let ticket: Ticket = resource::load_where(state.store.as_ref(), &scoped(&event_id, &ticket_id)).await?;
    Ok(HttpResponse::Ok().json(ticket))
}

pub async fn edit_ticket(
    req: HttpRequest,
    path: web::Path<(String, String)>,
    payload: web::Payload,
    user: AuthUser,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let (event_id, ticket_id) = path.into_inner();
    checked_id(&event_id)?;
    checked_id(&ticket_id)?;

    let store = state.store.as_ref();
    resource::load_owned::<Event>(store, &event_id, &user.user_id).await?;

    let form = FormData::read(req.headers(), payload).await?;
    let merged: Ticket = resource::patch_where(store, &scoped(&event_id, &ticket_id), &changes(&form)?).await?;

    Ok(HttpResponse::Ok().json(merged))
}

pub async fn delete_ticket(
    path: web::Path<(String, String)>,
    user: AuthUser,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let (event_id, ticket_id) = path.into_inner();
    checked_id(&event_id)?;
    checked_id(&ticket_id)?;

    let store = state.store.as_ref();
    resource::load_owned::<Event>(store, &event_id, &user.user_id).await?;
    resource::remove_where::<Ticket>(store, &scoped(&event_id, &ticket_id)).await?;

    log::info!("User {} deleted ticket {}", user.user_id, ticket_id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Ticket deleted successfully",
    })))
}

pub async fn buy_ticket(
    req: HttpRequest,
    path: web::Path<(String, String)>,
    payload: web::Payload,
    user: AuthUser,
    state: web::Data<AppState>,
) -> ApiResult<HttpResponse> {
    let (event_id, ticket_id) = path.into_inner();
    checked_id(&event_id)?;
    checked_id(&ticket_id)?;

    let form = FormData::read(req.headers(), payload).await?;
    let quantity = requested_quantity(&form)?;

    let ticket: Ticket = resource::purchase(state.store.as_ref(), &scoped(&event_id, &ticket_id), quantity).await?;
    log::info!("User {} bought {} x ticket {}", user.user_id, quantity, ticket_id);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "Ticket purchased successfully",
        "remaining": ticket.stock(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_quantity_defaults_to_one() {
        let empty = FormData::from_json_bytes(b"").unwrap();
        let three = FormData::from_json(serde_json::json!({ "quantity": 3 })).unwrap();
        let zero = FormData::from_json(serde_json::json!({ "quantity": 0 })).unwrap();

        assert_eq!(requested_quantity(&empty).unwrap(), 1);
        assert_eq!(requested_quantity(&three).unwrap(), 3);
        assert!(requested_quantity(&zero).is_err());
    }

    #[test]
    fn negative_price_is_rejected() {
        let form = FormData::from_json(serde_json::json!({ "price": -1 })).unwrap();

        assert!(changes(&form).is_err());
    }
}
