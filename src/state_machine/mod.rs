// Booking session state machine
//
// A tagged state enum plus a pure transition function. The session
// orchestrator owns one `SessionStateMachine` and routes every state change
// through it.

pub mod events;
pub mod session_state_machine;
pub mod states;

pub use events::SessionEvent;
pub use session_state_machine::{determine_target_state, SessionStateMachine};
pub use states::{FailedStage, SessionState};
