use super::scenario::Scenario;

#[derive(Debug)]
pub enum LauncherMessage {
    Launch(Scenario),
    Shutdown,
}
