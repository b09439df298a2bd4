pub mod call_gateway;
pub mod session_manager;

pub use call_gateway::{CallGateway, CallTicket, HttpCallGateway};
pub use session_manager::{ScheduleSnapshot, SessionError, SessionManager, StartedSession};
