use std::sync::Arc;

use barlink_db::{MessageStore, SeatStore, TableStore};
use barlink_gateway::dispatcher::Dispatcher;

use crate::mail::Mailer;
use crate::storage::BlobStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub tables: Arc<dyn TableStore>,
    pub messages: MessageStore,
    pub seats: SeatStore,
    pub blobs: Arc<BlobStore>,
    pub dispatcher: Dispatcher,
    /// `None` when no SMTP transport is configured; the email endpoint then
    /// reports the upstream as unavailable.
    pub mailer: Option<Mailer>,
    /// Venue scope used when a seat request does not name one.
    pub default_venue: String,
    /// External base URL, used to build blob and gateway URLs.
    pub public_url: String,
}
