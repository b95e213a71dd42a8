//! Trellis API crate - axum HTTP transport for the retrieval engine.
//!
//! Node and edge CRUD, vector / graph / hybrid search, snapshot export and
//! import, and a health check. Engine errors map to HTTP status codes by
//! kind; see [`ApiError`].

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
