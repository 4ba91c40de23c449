pub mod contexts;
pub mod processor;
pub mod worker;
