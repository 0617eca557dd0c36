pub mod escalation;
pub mod events;
pub mod fallback;
pub mod providers;
pub mod session;

pub use escalation::EscalationController;
pub use events::{AnswerSource, ChatEvent};
pub use session::SessionStore;
