pub mod coordinator;
pub mod error;
pub mod http;
pub mod metrics;
pub mod scoring;
pub mod session;
pub mod sink;
pub mod store;

pub use error::ServerError;
pub use http::{create_router, AppState};
pub use session::{SessionDeps, SessionManager, SessionRuntime};
pub use sink::{BroadcastSink, Sink, SinkMessage};
pub use store::{InMemoryStore, NoopStore, Store};
