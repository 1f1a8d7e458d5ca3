//! Session configuration and persona/prompt templates.

pub mod personas;
pub mod session;

pub use personas::{all_templates, get_agent_templates, PersonaTemplate};
pub use session::{load_session_config, ConfigError, Intensity, SessionConfig};
