use std::io::{self, Write};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEventKind},
    execute, terminal,
};

use crate::app::notifier::Notifier;
use crate::error::Result;
use crate::manager::launch_manager::LaunchManager;
use crate::models::scenario::Scenario;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Run(usize),
    Status,
    Acknowledge,
    Help,
    Exit,
    Empty,
    Invalid(String),
    Unknown(String),
}

pub fn parse_command(input: &str) -> Command {
    let mut args = input.split_whitespace();
    let command = args.next();

    match command {
        None => Command::Empty,
        Some("list") | Some("ls") => Command::List,
        Some("status") => Command::Status,
        Some("ok") => Command::Acknowledge,
        Some("help") | Some("?") => Command::Help,
        Some("exit") | Some("quit") => Command::Exit,
        Some("run") => match args.next() {
            Some(number) => parse_number(number),
            None => Command::Invalid("Trigger number must be specified.".to_string()),
        },
        Some(cmd) if cmd.chars().all(|c| c.is_ascii_digit()) => parse_number(cmd),
        Some(cmd) => Command::Unknown(cmd.to_string()),
    }
}

fn parse_number(input: &str) -> Command {
    match input.parse::<usize>() {
        Ok(number) if Scenario::from_number(number).is_ok() => Command::Run(number),
        Ok(number) => Command::Invalid(format!("No trigger numbered {}. Use `list` to see them.", number)),
        Err(_) => Command::Invalid("Invalid trigger number format.".to_string()),
    }
}

/// Leaves raw mode however the shell exits.
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

pub fn run_cli(manager: &mut LaunchManager, notifier: &Notifier) -> Result<()> {
    println!("Async playground started. Type `list` to see the triggers or `exit` to quit.");
    let mut commands_history: Vec<String> = Vec::new();
    let mut history_index = 0;

    let _raw = RawMode::enable()?;
    print_menu(manager);

    loop {
        print!("\r>>> ");
        io::stdout().flush()?;

        let Some(input) = read_line(&commands_history, &mut history_index)? else {
            continue;
        };

        if !input.trim().is_empty() {
            commands_history.push(input.clone());
        }
        history_index = commands_history.len();

        match parse_command(&input) {
            Command::List => print_menu(manager),
            Command::Run(number) => {
                let scenario = Scenario::from_number(number)?;
                match manager.trigger(scenario) {
                    Ok(()) => println!("\rTriggered {}: {}", number, scenario.label()),
                    Err(e) => println!("\rCould not trigger {}: {}", number, e),
                }
            }
            Command::Status => {
                let latest = manager.latest_status();
                if latest.is_empty() {
                    println!("\rNo task has reported yet.");
                } else {
                    println!("\rLatest status: {}", latest);
                }
                match notifier.current() {
                    Some(notification) => println!("\rShowing: {}   [Ok]", notification.text),
                    None => println!("\rNo notification showing."),
                }
            }
            Command::Acknowledge => {
                if notifier.acknowledge() {
                    println!("\rNotification dismissed.");
                } else {
                    println!("\rNothing to dismiss.");
                }
            }
            Command::Help => print_help(),
            Command::Exit => {
                println!("\rExiting the program...");
                break;
            }
            Command::Invalid(reason) => println!("\r{}", reason),
            Command::Unknown(cmd) => println!("\rUnknown command: {}. Please try again.", cmd),
            Command::Empty => continue,
        }
    }

    manager.shutdown();
    Ok(())
}

/// Reads one line in raw mode with Up/Down history. Returns `None` when the
/// user scrolls past the newest entry, which restarts the prompt.
fn read_line(commands_history: &[String], history_index: &mut usize) -> io::Result<Option<String>> {
    let mut input = String::new();
    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        if key_event.kind != KeyEventKind::Press {
            continue;
        }
        match key_event.code {
            KeyCode::Enter => {
                println!();
                return Ok(Some(input));
            }
            KeyCode::Up => {
                if *history_index > 0 {
                    *history_index -= 1;
                }
                if let Some(command) = commands_history.get(*history_index) {
                    input = command.clone();
                    redraw(&input)?;
                }
            }
            KeyCode::Down => {
                if *history_index < commands_history.len() {
                    *history_index += 1;
                }
                if *history_index == commands_history.len() {
                    clear_line()?;
                    return Ok(None);
                }
                if let Some(command) = commands_history.get(*history_index) {
                    input = command.clone();
                    redraw(&input)?;
                }
            }
            KeyCode::Char(c) => {
                input.push(c);
                print!("{}", c);
                io::stdout().flush()?;
            }
            KeyCode::Backspace => {
                input.pop();
                redraw(&input)?;
            }
            _ => {}
        }
    }
}

fn print_menu(manager: &LaunchManager) {
    println!("\r\tTriggers:");
    println!("\r{}", "-".repeat(60));
    for scenario in manager.scenarios() {
        println!("\r{:>3}  {}", scenario.number(), scenario.label());
    }
    println!("\r{}", "-".repeat(60));
    println!("\rUse `run <n>` or just `<n>` to fire a trigger.");
}

fn print_help() {
    println!("\rCommands:");
    println!("\r  list        show the triggers");
    println!("\r  run <n>     fire trigger n (or type just the number)");
    println!("\r  status      latest task status and the notification showing");
    println!("\r  ok          dismiss the notification");
    println!("\r  exit        quit");
}

fn redraw(input: &str) -> io::Result<()> {
    clear_line()?;
    print!(">>> {}", input);
    io::stdout().flush()
}

fn clear_line() -> io::Result<()> {
    execute!(
        io::stdout(),
        cursor::MoveToColumn(0),
        terminal::Clear(terminal::ClearType::CurrentLine)
    )
}
