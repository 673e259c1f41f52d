//! HTTP surface of the price alert service: health, stored prices and
//! history, a test alert, and an on-demand poll.

pub mod handlers;
pub mod server;
pub mod state;

pub use server::ApiServer;
pub use state::AppState;
