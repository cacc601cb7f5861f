use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::session::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::classes::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::students::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::fees::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::payments::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::certificates::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::content::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::staff::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::gallery::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::assets::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::orders::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::reports::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::backup_exchange::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
