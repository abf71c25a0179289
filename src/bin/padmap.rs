// Padmap CLI
// Feeds scripted or typed key events through a mapping session

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;

use padmap_core::{
    default_config_content, Action, Config, KeyCode, KeyOutcome, LoggingSink, MonotonicClock, OutputSink,
    Session,
};

/// Keyboard to virtual gamepad mapper
#[derive(Parser, Debug)]
#[command(name = "padmap")]
#[command(author = "padmap contributors")]
#[command(version)]
#[command(about = "Keyboard to virtual gamepad mapper", long_about = None)]
struct Args {
    /// TOML configuration file (defaults to ~/.config/padmap/config.toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Read key events from this file instead of stdin
    #[arg(short, long, value_name = "SCRIPT")]
    script: Option<PathBuf>,

    /// Log pad output instead of creating virtual devices
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// Print a starter config and exit
    #[arg(long)]
    print_default_config: bool,
}

/// One line of input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputLine {
    Key(KeyCode, Action),
    Wait(Duration),
}

/// Parse `press W`, `release SPACE`, `repeat A` or `wait 15`.
///
/// Blank lines and `#` comments yield `None`.
fn parse_input_line(line: &str) -> Result<Option<InputLine>> {
    let line = line.split('#').next().unwrap_or("").trim();
    let mut words = line.split_whitespace();
    let (verb, arg) = match (words.next(), words.next()) {
        (None, _) => return Ok(None),
        (Some(verb), Some(arg)) => (verb, arg),
        (Some(verb), None) => bail!("missing argument for '{}'", verb),
    };
    if let Some(extra) = words.next() {
        bail!("unexpected '{}'", extra);
    }

    if verb.eq_ignore_ascii_case("wait") {
        let millis: u64 = arg.parse().with_context(|| format!("invalid wait '{}'", arg))?;
        return Ok(Some(InputLine::Wait(Duration::from_millis(millis))));
    }

    let action = Action::from_str(verb).map_err(|e| anyhow!(e))?;
    let code = KeyCode::from_name(arg).ok_or_else(|| anyhow!("unknown key '{}'", arg))?;
    Ok(Some(InputLine::Key(code, action)))
}

/// How often blocked loops re-check the running flag
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Read input lines on their own thread so the main loop never blocks on I/O
fn spawn_input_thread(input: Box<dyn BufRead + Send>) -> Result<Receiver<io::Result<String>>> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("padmap-input".to_string())
        .spawn(move || {
            for line in input.lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("failed to spawn input thread")?;
    Ok(rx)
}

/// Sleep for `duration` unless `running` is cleared first
fn wait_while_running(duration: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + duration;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep((deadline - now).min(POLL_INTERVAL));
    }
}

/// Apply input lines to the session until input ends, an exit command
/// arrives or `running` is cleared.
fn feed_input(session: &Session, lines: &Receiver<io::Result<String>>, running: &AtomicBool) -> Result<()> {
    let mut number = 0usize;
    while running.load(Ordering::SeqCst) {
        let line = match lines.recv_timeout(POLL_INTERVAL) {
            Ok(line) => line.context("failed to read input")?,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        number += 1;

        match parse_input_line(&line) {
            Ok(Some(InputLine::Key(code, action))) => match session.handle_key(code, action) {
                KeyOutcome::Exit => break,
                KeyOutcome::Unmapped => log::debug!("{} {} not mapped", action, code),
                KeyOutcome::Handled => {}
            },
            Ok(Some(InputLine::Wait(duration))) => wait_while_running(duration, running),
            Ok(None) => {}
            Err(e) => log::warn!("line {}: {}", number, e),
        }
    }
    Ok(())
}

/// Main application state
struct Application {
    config: Config,
    args: Args,
    /// Cleared by the signal thread to stop reading input
    running: Arc<AtomicBool>,
}

impl Application {
    fn new(args: Args) -> Result<Self> {
        let config = match &args.config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => Config::load_default().context("failed to load default config")?,
        };

        Ok(Self {
            config,
            args,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    fn validate(&self) -> Result<()> {
        let config = &self.config;
        println!("Config OK");
        println!("  pads: {}", config.pad_count);
        println!("  start enabled: {}", config.start_enabled);
        if config.dispatch.is_immediate() {
            println!("  dispatch: immediate");
        } else {
            println!(
                "  dispatch: coalesced, window {:?}, tick {:?}",
                config.dispatch.flush_interval, config.dispatch.tick
            );
        }
        for (index, profile) in config.profiles.iter().enumerate() {
            let bindings: usize = (0..profile.pad_count())
                .filter_map(|pad| profile.bindings(pad))
                .map(|b| b.len())
                .sum();
            println!(
                "  profile {} '{}': {} binding(s), {} command(s)",
                index,
                profile.name(),
                bindings,
                profile.commands().len()
            );
        }
        Ok(())
    }

    fn build_sink(&self) -> Result<Box<dyn OutputSink>> {
        if self.args.dry_run {
            log::info!("dry run: logging pad output");
            return Ok(Box::new(LoggingSink::new()));
        }

        #[cfg(feature = "uinput")]
        {
            let sink = padmap_core::VirtualPadSink::new(self.config.pad_count)
                .context("failed to create virtual gamepads")?;
            log::info!("created {} virtual gamepad(s)", sink.pad_count());
            return Ok(Box::new(sink));
        }

        #[cfg(not(feature = "uinput"))]
        {
            log::warn!("built without uinput support, logging pad output instead");
            return Ok(Box::new(LoggingSink::new()));
        }
    }

    fn spawn_signal_thread(&self) -> Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGINT, SIGTERM]).context("failed to install signal handlers")?;
        let running = self.running.clone();
        std::thread::Builder::new()
            .name("padmap-signals".to_string())
            .spawn(move || {
                if let Some(signal) = signals.forever().next() {
                    log::info!("received signal {}, shutting down", signal);
                    running.store(false, Ordering::SeqCst);
                }
            })
            .context("failed to spawn signal thread")?;
        Ok(())
    }

    fn open_input(&self) -> Result<Box<dyn BufRead + Send>> {
        match &self.args.script {
            Some(path) => {
                let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
                Ok(Box::new(BufReader::new(file)))
            }
            None => Ok(Box::new(BufReader::new(io::stdin()))),
        }
    }

    fn run(&self) -> Result<()> {
        let sink = self.build_sink()?;
        let mut session = Session::from_config(&self.config, sink, Arc::new(MonotonicClock::new()));
        session.add_listener(Arc::new(|enabled: bool| {
            log::info!("padmap {}", if enabled { "active" } else { "paused" });
        }));

        if session.start().context("failed to start flush scheduler")? {
            log::debug!("flush scheduler running");
        }
        self.spawn_signal_thread()?;

        let lines = spawn_input_thread(self.open_input()?)?;
        let fed = feed_input(&session, &lines, &self.running);

        let report = session.stop();
        if report.is_clean() {
            log::debug!("stopped, {} event(s) applied on shutdown", report.applied);
        } else {
            for (device, error) in &report.failures {
                log::error!("pad{}: {}", device + 1, error);
            }
        }
        fed
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    if args.print_default_config {
        print!("{}", default_config_content());
        return Ok(());
    }

    let app = Application::new(args)?;

    if app.args.check_config {
        return app.validate();
    }

    app.run()
}
