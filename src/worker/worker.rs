use std::{io, thread};

use crossbeam_channel::Receiver;
use log::{error, info};

use crate::manager::launcher::TaskLauncher;
use crate::models::{message::LauncherMessage, scenario::Scenario};

/// Moves the launcher session onto its own thread and serves trigger
/// requests until told to shut down. The session is torn down when the
/// thread exits.
pub fn spawn_worker_thread(
    receiver: Receiver<LauncherMessage>,
    launcher: TaskLauncher,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new().name("launcher".to_string()).spawn(move || {
        loop {
            match receiver.recv() {
                Ok(message) => match message {
                    LauncherMessage::Launch(scenario) => handle_launch(scenario, &launcher),
                    LauncherMessage::Shutdown => {
                        info!("Shutting down launcher session.");
                        break;
                    }
                },
                Err(e) => {
                    error!("Failed to receive message: {}", e);
                    break;
                }
            }
        }
        drop(launcher);
        info!("Launcher session closed.");
    })
}

fn handle_launch(scenario: Scenario, launcher: &TaskLauncher) {
    info!("Trigger {} '{}'.", scenario.number(), scenario.label());
    // The shell never waits; the launch logs its own outcome.
    drop(launcher.run(scenario));
}
