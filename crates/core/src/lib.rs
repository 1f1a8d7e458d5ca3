//! Domain model and event bus shared by every boardroom Q&A crate.

pub mod error;
pub mod event;
pub mod model;

pub use error::CoreError;
pub use event::{Event, EventBus, EventSubscriber, EventType};
pub use model::{
    AgentSessionContext, CandidateQuestion, Claim, ClaimType, DataReadiness, Exchange,
    ExchangeOutcome, ExchangeTurn, PresenterProfile, SessionContext, SessionState, Speaker,
    Strategy,
};
