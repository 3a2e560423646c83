//! `api` crate: the RepairBuddies HTTP surface.
//!
//! JSON over HTTP under `/api/v1`, bearer-token sessions, and three
//! server-sent-event streams (auth state, chat messages, timeslot
//! availability).  Handlers only translate between HTTP and the services
//! in the `matching` crate.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::info;

pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::{ApiError, AppError};
pub use router::create_router;
pub use state::AppState;


/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_router(state)).await
}
