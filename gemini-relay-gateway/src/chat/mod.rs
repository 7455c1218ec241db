pub mod extract;
pub mod history;
pub mod request;
pub mod title;

pub use extract::{FALLBACK_REPLY, first_text, reply_or_fallback};
pub use history::{ConversationHistory, InlineData, Part, Role, Turn};
pub use request::{GenerateRequest, ValidationError, build_generate_request};
pub use title::{FALLBACK_TITLE, clean_title, generate_title};
