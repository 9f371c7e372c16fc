//! FloraChat Engine
//!
//! Core chat semantics: session identity, relay integration, the auto-reply
//! engine, and the customer/agent endpoint controllers. Persistence and the
//! hosted relay live in `florachat-shared` and `florachat-api`.

pub mod autoreply;
pub mod console;
pub mod customer;
pub mod identity;
pub mod relay;

pub use autoreply::{instant_answer, AutoReplyConfig, AutoReplyEngine, EngineState, WELCOME_TEXT};
pub use console::{session_summaries, AgentConsole};
pub use customer::{CustomerChat, DeliveryStatus};
pub use identity::{resolve_session_id, CustomerIdentity, FileSessionCache, MemorySessionCache, SessionCache};
pub use relay::{LocalRelay, Relay, RelaySubscription};
