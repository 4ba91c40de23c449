use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{error, info};

use crate::config::PlaygroundConfig;
use crate::error::{PlaygroundError, Result};
use crate::manager::launcher::TaskLauncher;
use crate::models::{
    message::LauncherMessage,
    scenario::Scenario,
    status::{StatusSlot, StatusSubscription},
};
use crate::worker::worker::spawn_worker_thread;

pub struct LaunchManager {
    sender: Sender<LauncherMessage>,
    receiver: Receiver<LauncherMessage>,
    status: StatusSlot,
    launcher: Option<TaskLauncher>,
    worker: Option<thread::JoinHandle<()>>,
}

impl LaunchManager {
    pub fn new(config: &PlaygroundConfig) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let launcher = TaskLauncher::new(config)?;
        Ok(LaunchManager {
            sender,
            receiver,
            status: launcher.status().clone(),
            launcher: Some(launcher),
            worker: None,
        })
    }

    pub fn start(&mut self) -> Result<()> {
        let launcher = self.launcher.take().ok_or(PlaygroundError::AlreadyStarted)?;
        let worker = spawn_worker_thread(self.receiver.clone(), launcher).map_err(PlaygroundError::Runtime)?;
        self.worker = Some(worker);
        info!("Launcher started.");
        Ok(())
    }

    pub fn scenarios(&self) -> &'static [Scenario] {
        &Scenario::ALL
    }

    pub fn trigger(&self, scenario: Scenario) -> Result<()> {
        if self.worker.is_none() {
            return Err(PlaygroundError::LauncherClosed);
        }
        self.sender
            .send(LauncherMessage::Launch(scenario))
            .map_err(|_| PlaygroundError::LauncherClosed)
    }

    pub fn subscribe(&self) -> StatusSubscription {
        self.status.subscribe()
    }

    pub fn latest_status(&self) -> String {
        self.status.current()
    }

    /// Stops the dispatch thread and tears the session down.
    pub fn shutdown(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.sender.send(LauncherMessage::Shutdown);
            if worker.join().is_err() {
                error!("Launcher thread panicked");
            }
        }
    }
}

impl Drop for LaunchManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn test_config() -> PlaygroundConfig {
        PlaygroundConfig {
            work_unit: 1000,
            pool_threads: Some(2),
            global_threads: Some(2),
            pause_ms: 50,
            ..Default::default()
        }
    }

    #[test]
    fn trigger_publishes_through_the_session() {
        let mut manager = LaunchManager::new(&test_config()).unwrap();
        let mut sub = manager.subscribe();
        manager.start().unwrap();

        manager.trigger(Scenario::LaunchOnMain).unwrap();
        let message = block_on(sub.next()).unwrap();
        assert!(message.starts_with("Luke is executing on thread: main-loop"), "{message}");
        assert_eq!(manager.latest_status(), message);
    }

    #[test]
    fn trigger_before_start_is_rejected() {
        let manager = LaunchManager::new(&test_config()).unwrap();
        assert!(matches!(manager.trigger(Scenario::LaunchOnPool), Err(PlaygroundError::LauncherClosed)));
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut manager = LaunchManager::new(&test_config()).unwrap();
        manager.start().unwrap();
        assert!(matches!(manager.start(), Err(PlaygroundError::AlreadyStarted)));
    }

    #[test]
    fn trigger_after_shutdown_is_rejected() {
        let mut manager = LaunchManager::new(&test_config()).unwrap();
        manager.start().unwrap();
        manager.shutdown();
        assert!(matches!(manager.trigger(Scenario::LaunchOnMain), Err(PlaygroundError::LauncherClosed)));
    }

    #[test]
    fn menu_lists_every_scenario() {
        let manager = LaunchManager::new(&test_config()).unwrap();
        assert_eq!(manager.scenarios().len(), 14);
        assert_eq!(manager.scenarios()[11].label(), "Multiple dependent async - wrong way");
    }
}
