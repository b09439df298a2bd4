pub mod live_call;
pub mod refund;
pub mod schedule;
pub mod session;
pub mod slot;
pub mod status;
