pub mod message;
pub mod scenario;
pub mod status;
pub mod task;
