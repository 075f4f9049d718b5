use axum::Json;
use axum::extract::State;
use uuid::Uuid;

use barlink_types::api::NegotiateResponse;

use crate::state::AppState;

/// Connection info for the real-time gateway, mirroring the negotiate
/// handshake the mobile clients already speak: a WebSocket URL plus an
/// opaque access token. The gateway itself performs no authentication,
/// so the token is advisory.
pub async fn negotiate(State(state): State<AppState>) -> Json<NegotiateResponse> {
    Json(NegotiateResponse {
        url: gateway_url(&state.public_url),
        access_token: Uuid::new_v4().to_string(),
    })
}

fn gateway_url(public_url: &str) -> String {
    let base = public_url.trim_end_matches('/');
    let ws_base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{ws_base}/gateway")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_url_switches_scheme() {
        assert_eq!(gateway_url("http://localhost:3000"), "ws://localhost:3000/gateway");
        assert_eq!(gateway_url("https://bar.example/"), "wss://bar.example/gateway");
    }
}
