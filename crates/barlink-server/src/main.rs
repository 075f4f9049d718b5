use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use barlink_api::mail::{Mailer, SmtpConfig};
use barlink_api::state::{AppState, AppStateInner};
use barlink_api::storage::BlobStore;
use barlink_api::{blobs, chat, mail, negotiate, qr, seats, tables};
use barlink_db::{Database, MessageStore, SeatStore, TableStore};
use barlink_gateway::connection;
use barlink_gateway::dispatcher::Dispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "barlink=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let host = env_or("BARLINK_HOST", "0.0.0.0");
    let port: u16 = env_or("BARLINK_PORT", "3000").parse()?;
    let db_path = env_or("BARLINK_DB_PATH", "barlink.db");
    let blob_dir = env_or("BARLINK_BLOB_DIR", "blobs");
    let public_url = env_or("BARLINK_PUBLIC_URL", &format!("http://localhost:{port}"));
    let default_venue = env_or("BARLINK_VENUE", "bar_1");
    let chat_table = env_or("BARLINK_CHAT_TABLE", "BarTable");
    let seat_table = env_or("BARLINK_SEAT_TABLE", "BarTable");

    // Init storage
    let db = Database::open(&PathBuf::from(&db_path))?;
    let tables_port: Arc<dyn TableStore> = Arc::new(db);
    let blobs_store = Arc::new(BlobStore::new(PathBuf::from(&blob_dir)).await?);

    // Shared state
    let dispatcher = Dispatcher::new();
    let state: AppState = Arc::new(AppStateInner {
        tables: tables_port.clone(),
        messages: MessageStore::new(tables_port.clone(), chat_table),
        seats: SeatStore::new(tables_port, seat_table),
        blobs: blobs_store,
        dispatcher,
        mailer: mailer_from_env()?,
        default_venue,
        public_url,
    });

    // Routes
    let app = Router::new()
        .route("/seats", post(seats::connect_seat))
        .route("/tables/entities", post(tables::upsert_entity))
        .route("/tables/query", post(tables::query_entities))
        .route("/tables/delete", post(tables::delete_entity))
        .route("/chat/messages", post(chat::send_message))
        .route("/chat/read", post(chat::mark_read))
        .route("/chat/group", post(chat::conversation_group))
        .route("/blobs", post(blobs::upload_blob))
        .route("/blobs/{container}/{name}", get(blobs::download_blob))
        .route("/qr/generate", get(qr::generate_query).post(qr::generate_body))
        .route("/qr/decode", get(qr::decode_query).post(qr::decode_body))
        .route("/email/pdf", post(mail::send_pdf_by_email))
        .route("/negotiate", post(negotiate::negotiate))
        .route("/gateway", get(ws_upgrade))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Barlink server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Build the SMTP mailer when BARLINK_SMTP_HOST is set; the email endpoint
/// reports upstream-unavailable without one.
fn mailer_from_env() -> anyhow::Result<Option<Mailer>> {
    let Ok(host) = std::env::var("BARLINK_SMTP_HOST") else {
        warn!("BARLINK_SMTP_HOST not set, email delivery disabled");
        return Ok(None);
    };

    let config = SmtpConfig {
        host,
        port: env_or("BARLINK_SMTP_PORT", "587").parse()?,
        username: env_or("BARLINK_SMTP_USERNAME", ""),
        password: env_or("BARLINK_SMTP_PASSWORD", ""),
        from: std::env::var("BARLINK_SMTP_FROM")
            .map_err(|_| anyhow::anyhow!("BARLINK_SMTP_FROM is required when SMTP is enabled"))?,
    };

    Ok(Some(Mailer::new(&config)?))
}
