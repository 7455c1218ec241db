pub mod chat;
pub mod dispatch;
pub mod providers;
pub mod server;
pub mod state;

pub use chat::{
    ConversationHistory, GenerateRequest, Part, Role, Turn, ValidationError,
    build_generate_request,
};
pub use dispatch::{
    AttemptFailure, DispatchError, DispatchOutcome, DispatchSink, Dispatcher, OVERLOADED_MESSAGE,
    TracingSink,
};
pub use providers::{TransportError, Upstream, UpstreamResponse};
pub use state::{AppState, LogEntry};
