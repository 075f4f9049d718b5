use axum::Json;
use axum::extract::State;
use tracing::info;

use barlink_types::api::SeatRequest;
use barlink_types::events::{CONNECT_SEAT_TARGET, DISCONNECT_SEAT_TARGET};

use crate::error::{ApiError, join_error, require};
use crate::state::AppState;

#[derive(Clone, Copy)]
enum SeatAction {
    Add,
    Remove,
}

/// Claim or release a seat. The seat row is upserted first; the gateway
/// event goes out only once the write has succeeded.
pub async fn connect_seat(
    State(state): State<AppState>,
    Json(req): Json<SeatRequest>,
) -> Result<&'static str, ApiError> {
    let user = require(req.user, "user")?;
    let seat = require(req.seat, "seat")?;
    let action = match require(req.action, "action")?.as_str() {
        "add" => SeatAction::Add,
        "remove" => SeatAction::Remove,
        other => return Err(ApiError::invalid(format!("unknown action '{other}'"))),
    };
    let venue = req
        .venue
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| state.default_venue.clone());

    match action {
        SeatAction::Add => info!("assigning {user} to seat {seat} in {venue}"),
        SeatAction::Remove => info!("releasing seat {seat} in {venue}"),
    }

    // Run the blocking table upsert off the async runtime
    let seats = state.seats.clone();
    {
        let (venue, seat, user) = (venue.clone(), seat.clone(), user.clone());
        tokio::task::spawn_blocking(move || match action {
            SeatAction::Add => seats.assign(&venue, &seat, &user),
            SeatAction::Remove => seats.release(&venue, &seat),
        })
        .await
        .map_err(join_error)??;
    }

    match action {
        SeatAction::Add => state
            .dispatcher
            .publish(CONNECT_SEAT_TARGET, vec![seat.into(), user.into()]),
        SeatAction::Remove => state
            .dispatcher
            .publish(DISCONNECT_SEAT_TARGET, vec![seat.into()]),
    }

    Ok("seat updated")
}
