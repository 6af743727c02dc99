//! Periodic alarm task with acknowledgments read from stdin.
//!
//! Stdin lines arrive over a channel and the wait on that channel doubles as
//! the poll interval. Each tick re-reads the data file if one-shot commands
//! in another shell changed it.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use medimate_core::{AlarmEngine, AlarmKey, AlarmPlayer, MedicineStore, ScheduleEntry};
use tracing::{info, warn};

/// Rings the terminal bell and prints due doses.
pub struct TerminalPlayer;

impl AlarmPlayer for TerminalPlayer {
    fn start(&self, entry: &ScheduleEntry) {
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "\x07[{}] Time to take {}. Type `ack` once taken.", entry.time, entry.medicine);
        let _ = out.flush();
    }

    fn stop(&self, key: &AlarmKey) {
        println!("[{}] {} silenced.", key.time, key.medicine);
    }
}

#[derive(Debug, PartialEq)]
enum WatchCommand {
    AckAll,
    Ack(ScheduleEntry),
    Pending,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Option<WatchCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let command = match (word, rest.trim()) {
        ("ack", "") => WatchCommand::AckAll,
        ("ack", rest) => match rest.split_once(char::is_whitespace) {
            Some((time, medicine)) => match time.parse() {
                Ok(time) => WatchCommand::Ack(ScheduleEntry::new(time, medicine.trim())),
                Err(_) => WatchCommand::Unknown(line.to_string()),
            },
            None => WatchCommand::Unknown(line.to_string()),
        },
        ("pending", _) => WatchCommand::Pending,
        ("quit" | "exit", _) => WatchCommand::Quit,
        _ => WatchCommand::Unknown(line.to_string()),
    };
    Some(command)
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Run until `quit`, polling at most `interval` apart.
pub fn run(mut store: MedicineStore, mut engine: AlarmEngine, interval: Duration) -> Result<()> {
    let lines = spawn_stdin_reader();
    let mut stdin_open = true;

    info!(interval_secs = interval.as_secs(), "Watching for due doses");
    println!("Watching {} medicines. Commands: ack [HH:MM name - dose], pending, quit", store.count());

    loop {
        engine.tick(&mut store, Local::now().naive_local());

        if !stdin_open {
            thread::sleep(interval);
            continue;
        }

        let line = match lines.recv_timeout(interval) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                info!("Stdin closed; alarms can no longer be acknowledged here");
                stdin_open = false;
                continue;
            }
        };

        match parse_command(&line) {
            None => {}
            Some(WatchCommand::Quit) => break,
            Some(WatchCommand::AckAll) => {
                if engine.acknowledge_all(&mut store) == 0 {
                    println!("No alarms ringing.");
                }
            }
            Some(WatchCommand::Ack(entry)) => {
                if !engine.acknowledge(&mut store, &entry) {
                    println!("No scheduled dose '{}' at {}.", entry.medicine, entry.time);
                }
            }
            Some(WatchCommand::Pending) => {
                let pending = engine.armed_entries();
                if pending.is_empty() {
                    println!("No alarms ringing.");
                }
                for entry in pending {
                    println!("[{}] {}", entry.time, entry.medicine);
                }
            }
            Some(WatchCommand::Unknown(input)) => {
                warn!(input = %input, "Unrecognized command");
                println!("Commands: ack [HH:MM name - dose], pending, quit");
            }
        }
    }

    info!("Stopped watching");
    Ok(())
}
