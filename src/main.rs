// refscope: Interactive Object Graph Browser

use std::fs::File;
use std::io;
use std::panic;
use std::path::Path;

use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use env_logger::{Builder, Env, Target};
use ratatui::{Terminal, backend::CrosstermBackend};

use refscope::bridge::WORKER_NAME_PREFIX;
use refscope::config::Config;
use refscope::demo::{self, Demo};
use refscope::limits;
use refscope::registry::IdentityRegistry;
use refscope::session::Session;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command-line arguments
    let args: Vec<String> = std::env::args().collect();
    let program_name = args.first().map(|s| s.as_str()).unwrap_or("refscope");

    if args.len() > 2 || args.iter().skip(1).any(|a| a == "-h" || a == "--help") {
        print_usage(program_name);
        std::process::exit(if args.len() > 2 { 1 } else { 0 });
    }

    let demo = match args.get(1).map(|name| name.parse::<Demo>()) {
        None => Demo::default(),
        Some(Ok(demo)) => demo,
        Some(Err(e)) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage(program_name);
            std::process::exit(1);
        }
    };

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(config.log_file.as_deref())?;

    let (heap, root) = demo::build(demo)?;
    let registry = match IdentityRegistry::capture(&heap) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    log::info!("Browsing the {} demo from {}", demo, root.id());

    limits::install_memory_guard(config.memlimit_mb);

    let mut session = Session::new(root, registry, config)?;

    // Set up terminal
    install_panic_hook();
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = session.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    session.shutdown();

    session_result(res)
}

/// A failed session makes the process exit non-zero
fn session_result(res: io::Result<()>) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = res {
        log::error!("Session ended with an error: {}", err);
        return Err(err.into());
    }
    Ok(())
}

fn print_usage(program_name: &str) {
    eprintln!("Usage: {} [demo]", program_name);
    eprintln!();
    eprintln!("Demos:");
    eprintln!("  cycle    a list containing itself (default)");
    eprintln!("  int      the integer 42");
    eprintln!("  web      records with back-pointers and failing representations");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  REFSCOPE_WORKER_THREADS    representation workers (default 2)");
    eprintln!("  REFSCOPE_UI_POLL_INTERVAL  seconds between result drains (default 0.2)");
    eprintln!("  REFSCOPE_MEMLIMIT_MB       address-space headroom, 0 disables (default 1024)");
    eprintln!("  REFSCOPE_LOG_FILE          write logs here (otherwise they are discarded)");
}

fn init_logging(log_file: Option<&Path>) -> io::Result<()> {
    Builder::from_env(Env::default().default_filter_or("info"))
        .target(log_target(log_file)?)
        .init();
    Ok(())
}

/// stderr is unusable once the alternate screen is up, so logs go to the
/// configured file or nowhere.
fn log_target(log_file: Option<&Path>) -> io::Result<Target> {
    Ok(match log_file {
        Some(path) => Target::Pipe(Box::new(File::create(path)?)),
        None => Target::Pipe(Box::new(io::sink())),
    })
}

/// Worker panics are caught and shown as `repr error: Panic`; only log them.
/// Anywhere else, leave the alternate screen before the default hook prints.
fn install_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let on_worker = std::thread::current()
            .name()
            .is_some_and(|name| name.starts_with(WORKER_NAME_PREFIX));
        if on_worker {
            log::warn!("Representation worker panicked: {}", info);
            return;
        }
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        default_hook(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logs_never_target_stderr() {
        assert!(matches!(log_target(None).unwrap(), Target::Pipe(_)));

        let path = std::env::temp_dir().join(format!("refscope-log-{}.txt", std::process::id()));
        assert!(matches!(log_target(Some(&path)).unwrap(), Target::Pipe(_)));
        assert!(path.exists());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_failed_session_is_an_error() {
        assert!(session_result(Ok(())).is_ok());
        let err = io::Error::new(io::ErrorKind::BrokenPipe, "terminal went away");
        assert!(session_result(Err(err)).is_err());
    }
}
