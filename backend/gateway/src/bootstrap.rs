//! Client bootstrap document.
//!
//! Everything a browser client needs to open its stream and seed its stores:
//! endpoint paths, the client id key, the reconnect timer and every handler's
//! default state.

use axum::{extract::State, Json};
use serde::Serialize;

use statecast_core::StoreDescriptor;

use crate::server::GatewayState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootstrap {
    pub event_url: String,
    pub action_url: String,
    pub client_id_key: String,
    pub reconnect_interval: i64,
    pub stores: Vec<StoreDescriptor>,
}

/// Handler for `GET <bootstrapUrl>`.
pub async fn get_bootstrap(State(state): State<GatewayState>) -> Json<Bootstrap> {
    let routes = &state.config.routes;
    Json(Bootstrap {
        event_url: routes.event_url.clone(),
        action_url: routes.action_url.clone(),
        client_id_key: routes.client_id_key.clone(),
        reconnect_interval: state.config.stream.reconnect_interval_ms,
        stores: state.hub.dispatcher().stores().await,
    })
}
