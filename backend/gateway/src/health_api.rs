//! Gateway Health API
//!
//! Reports live connection, client, subscriber and handler counts.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::GatewayState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub connections: usize,
    pub clients: usize,
    pub subscribers: usize,
    pub handlers: usize,
    pub timestamp: DateTime<Utc>,
}

/// Handler for `GET /health`
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReport> {
    let hub = &state.hub;
    Json(HealthReport {
        status: "ok".into(),
        connections: hub.registry().connection_count().await,
        clients: hub.registry().client_count().await,
        subscribers: hub.broker().subscriber_count(),
        handlers: hub.dispatcher().len(),
        timestamp: Utc::now(),
    })
}
