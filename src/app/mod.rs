pub mod cli;
pub mod notifier;
