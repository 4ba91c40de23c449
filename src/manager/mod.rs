pub mod launch_manager;
pub mod launcher;
