//! Operator console: REPL surface
//!
//! Lines are read on a dedicated thread (rustyline blocks) and handed to an
//! async processor that talks to the engine with [`SurfaceId::Console`] as
//! origin. Changes made elsewhere are echoed as they happen.

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tracing::debug;

use crate::engine::EngineHandle;
use crate::state::{ControlId, ControlSnapshot};
use crate::surface::{ResyncScope, Surface, SurfaceId};

const PROMPT: &str = "panel> ";

/// Parsed console command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Get(ControlId),
    Set(ControlId, i64),
    Toggle(ControlId),
    Show,
    Help,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };

        let command = match verb {
            "get" => ConsoleCommand::Get(next_control(&mut words)?),
            "toggle" => ConsoleCommand::Toggle(next_control(&mut words)?),
            "set" => {
                let id = next_control(&mut words)?;
                let raw = words.next().ok_or("missing value")?;
                let value = raw
                    .parse::<i64>()
                    .map_err(|_| format!("invalid value '{}'", raw))?;
                ConsoleCommand::Set(id, value)
            }
            "show" | "status" => ConsoleCommand::Show,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => return Err(format!("unknown command '{}'", other)),
        };
        Ok(Some(command))
    }
}

fn next_control<'a>(words: &mut impl Iterator<Item = &'a str>) -> Result<ControlId, String> {
    let name = words.next().ok_or("missing control name")?;
    name.parse::<ControlId>().map_err(|e| e.to_string())
}

const HELP: &str = "\
get <control>            show a control value
set <control> <value>    change a control
toggle <control>         flip a control
show                     show every control
quit                     stop the console
controls: btn1..btn3, slider1, btn2_1..btn2_10";

/// Run one command, returning the text to print
pub async fn execute(engine: &EngineHandle, command: ConsoleCommand) -> Result<String> {
    let out = match command {
        ConsoleCommand::Get(id) => format!("{} = {}", id, engine.get(id).await?),
        ConsoleCommand::Set(id, value) => {
            let applied = engine.apply_change(SurfaceId::Console, id, value).await?;
            format!("{} = {}", id, applied.value)
        }
        ConsoleCommand::Toggle(id) => {
            let applied = engine.toggle(SurfaceId::Console, id).await?;
            format!("{} = {}", id, applied.value)
        }
        ConsoleCommand::Show => engine.snapshot().await?.to_string(),
        ConsoleCommand::Help => HELP.to_string(),
        ConsoleCommand::Quit => String::new(),
    };
    Ok(out)
}

/// Console surface: prints changes made by other surfaces
#[derive(Debug, Default)]
pub struct ConsoleSurface;

impl Surface for ConsoleSurface {
    fn id(&self) -> SurfaceId {
        SurfaceId::Console
    }

    fn refresh(&self, control: ControlId, value: i32) {
        println!("{} {} = {}", "*".cyan(), control, value);
    }

    fn resync(&self, _scope: ResyncScope, snapshot: &ControlSnapshot) {
        println!("{} {}", "*".cyan(), snapshot);
    }
}

/// Read lines until `quit` or end of input
pub async fn run_repl(engine: EngineHandle) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<String>(8);

    std::thread::Builder::new()
        .name("console".into())
        .spawn(move || read_lines(tx))?;

    while let Some(line) = rx.recv().await {
        match ConsoleCommand::parse(&line) {
            Ok(None) => {}
            Ok(Some(ConsoleCommand::Quit)) => break,
            Ok(Some(command)) => match execute(&engine, command).await {
                Ok(out) => println!("{}", out.green()),
                Err(e) => println!("{} {}", "error:".red(), e),
            },
            Err(e) => println!("{} {} (try 'help')", "error:".red(), e),
        }
    }

    debug!("Console closed");
    Ok(())
}

fn read_lines(tx: mpsc::Sender<String>) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("console unavailable: {}", e);
            return;
        }
    };

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                let _ = tx.blocking_send("quit".into());
                break;
            }
            Err(e) => {
                eprintln!("console error: {}", e);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SyncEngine;
    use crate::state::{ControlState, MemoryStore};

    #[test]
    fn test_parse() {
        assert_eq!(ConsoleCommand::parse("   "), Ok(None));
        assert_eq!(
            ConsoleCommand::parse("set slider1 128"),
            Ok(Some(ConsoleCommand::Set(ControlId::Slider, 128)))
        );
        assert_eq!(
            ConsoleCommand::parse("toggle btn2_4"),
            Ok(Some(ConsoleCommand::Toggle(ControlId::PageButton(4))))
        );
        assert_eq!(
            ConsoleCommand::parse("get btn1"),
            Ok(Some(ConsoleCommand::Get(ControlId::Button(1))))
        );
        assert_eq!(ConsoleCommand::parse("exit"), Ok(Some(ConsoleCommand::Quit)));
    }

    #[test]
    fn test_parse_errors() {
        assert!(ConsoleCommand::parse("get").is_err());
        assert!(ConsoleCommand::parse("get btn9").is_err());
        assert!(ConsoleCommand::parse("set btn1").is_err());
        assert!(ConsoleCommand::parse("set btn1 on").is_err());
        assert!(ConsoleCommand::parse("dance").is_err());
    }

    #[tokio::test]
    async fn test_execute() {
        let engine = SyncEngine::spawn(ControlState::new(), Box::new(MemoryStore::new()));

        let out = execute(&engine, ConsoleCommand::Set(ControlId::Slider, 999))
            .await
            .unwrap();
        assert_eq!(out, "slider1 = 255");

        let out = execute(&engine, ConsoleCommand::Toggle(ControlId::Button(2)))
            .await
            .unwrap();
        assert_eq!(out, "btn2 = 1");

        let out = execute(&engine, ConsoleCommand::Show).await.unwrap();
        assert!(out.starts_with("page1 [ 0 1 0 ] slider1=255"));
    }
}
