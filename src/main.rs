// RusTECO: time-travel TECO editor core

use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::process::ExitCode;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing_subscriber::EnvFilter;

use rusteco::interpreter::cmdline::CmdlineEvent;
use rusteco::interpreter::constants::ESCAPE;
use rusteco::interpreter::engine::Interpreter;
use rusteco::interpreter::errors::ErrorKind;
use rusteco::interpreter::messages::Severity;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() > 2 {
        let program = args.first().map(|s| s.as_str()).unwrap_or("rusteco");
        eprintln!("Usage: {} [script.teco]", program);
        eprintln!();
        eprintln!("With a script, executes it in batch mode; without one (or");
        eprintln!("when the script does not request exit), starts the");
        eprintln!("interactive command line.");
        return ExitCode::FAILURE;
    }

    let mut interp = Interpreter::new();

    if let Some(script) = args.get(1) {
        let path = Path::new(script);
        if !path.exists() {
            eprintln!("Error: script \"{}\" not found", script);
            return ExitCode::FAILURE;
        }
        match interp.execute_file(path, true) {
            Ok(()) => {}
            Err(e) if e.kind == ErrorKind::Quit => return ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprint!("{}", e.frame_trace());
                return ExitCode::FAILURE;
            }
        }
        if interp.quit_requested() {
            return ExitCode::SUCCESS;
        }
    }

    if !io::stdin().is_terminal() {
        return ExitCode::SUCCESS;
    }

    match interactive(&mut interp) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Terminal error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Echo of the command line: control codes in caret notation, escape as `$`.
fn echo(bytes: &[u8]) -> String {
    let mut out = String::new();
    for &b in bytes {
        match b {
            ESCAPE => out.push('$'),
            b if b < 0x20 => {
                out.push('^');
                out.push((b | 0x40) as char);
            }
            b => out.push(b as char),
        }
    }
    out
}

fn redraw(interp: &Interpreter) -> io::Result<()> {
    let mut stdout = io::stdout();
    // message line above the prompt
    write!(stdout, "\r\x1b[K")?;
    if let Some((severity, text)) = &interp.messages.last {
        let prefix = match severity {
            Severity::User => "",
            Severity::Info => "-- ",
            Severity::Warning => "?? ",
            Severity::Error => "!! ",
        };
        write!(stdout, "{}{}\r\n\x1b[K", prefix, text)?;
    }
    write!(stdout, "*{}", echo(interp.cmdline_bytes()))?;
    stdout.flush()
}

fn interactive(interp: &mut Interpreter) -> io::Result<()> {
    interp.set_interactive(true);
    let interrupt = interp.interrupt_flag();
    enable_raw_mode()?;
    let result = interactive_loop(interp, &interrupt);
    disable_raw_mode()?;
    println!();
    result
}

fn interactive_loop(
    interp: &mut Interpreter,
    interrupt: &std::sync::Arc<std::sync::atomic::AtomicBool>,
) -> io::Result<()> {
    redraw(interp)?;
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind == KeyEventKind::Release {
            continue;
        }

        let event = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                // between characters this simply clears the flag again
                interrupt.store(true, std::sync::atomic::Ordering::Relaxed);
                continue;
            }
            (KeyCode::Char('d'), KeyModifiers::CONTROL) => return Ok(()),
            (KeyCode::Char(c), m) if m.is_empty() || m == KeyModifiers::SHIFT => {
                if c.is_ascii() {
                    interp.cmdline_keypress(c as u8)
                } else {
                    continue;
                }
            }
            (KeyCode::Char(c), KeyModifiers::CONTROL) if c.is_ascii_alphabetic() => {
                interp.cmdline_keypress((c as u8).to_ascii_uppercase() & 0x1F)
            }
            (KeyCode::Esc, _) => interp.cmdline_keypress(ESCAPE),
            (KeyCode::Enter, _) => interp.cmdline_keypress(b'\n'),
            (KeyCode::Tab, _) => interp.cmdline_keypress(b'\t'),
            (KeyCode::Backspace, _) => {
                interp.cmdline_rubout();
                redraw(interp)?;
                continue;
            }
            _ => continue,
        };

        redraw(interp)?;
        if event == CmdlineEvent::Terminated && interp.quit_requested() {
            return Ok(());
        }
    }
}
