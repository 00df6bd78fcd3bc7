mod cli;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use txmark::app::{App, InputMode, PromptKind, StatusLevel};
use txmark::config::{self, Config};
use txmark::infrastructure::runtime::{RuntimeBridge, WorkerSettings};
use txmark::store::LocalStore;
use txmark::ui;

use crate::cli::{Args, CliCommand};

fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = config::effective_config_path(args.config.as_deref());
    let config = match config_path.as_deref() {
        Some(path) => config::load_from(path),
        None => Config::default(),
    };
    let command = args.command.unwrap_or(CliCommand::Tui);
    let tui = matches!(command, CliCommand::Tui);
    init_logging(tui);

    let store_path = args
        .store
        .clone()
        .or_else(|| config.store_path())
        .context("no data directory; pass --store")?;
    let store = open_store(&store_path)?;

    if tui {
        run_tui(&config, store)
    } else {
        cli::run(command, &config, config_path.as_deref(), &store, &store_path)
    }
}

/// CLI runs log to stderr; the TUI logs to a file so the screen stays clean.
fn init_logging(to_file: bool) {
    let filter = EnvFilter::try_from_env("TXMARK_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    if !to_file {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .with_target(false)
            .try_init();
        return;
    }

    let Some(path) = config::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init();
    }
}

fn open_store(path: &Path) -> Result<LocalStore> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    LocalStore::open(path)
}

fn run_tui(config: &Config, store: LocalStore) -> Result<()> {
    let runtime = RuntimeBridge::new(WorkerSettings::from(config))?;
    let mut app = App::new(store);
    app.start();

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    info!("tui started");
    let res = run_app(&mut terminal, app, runtime);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("tui exited with error: {err:#}");
        eprintln!("{err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    runtime: RuntimeBridge,
) -> Result<()> {
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();

    loop {
        pump_background(&mut app, &runtime);
        terminal.draw(|f| ui::draw(f, &app))?;
        if app.should_quit {
            return Ok(());
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => handle_key(&mut app, key),
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
}

/// Feed worker events into the app and ship its queued commands
fn pump_background(app: &mut App, runtime: &RuntimeBridge) {
    for event in runtime.poll_events() {
        app.handle_event(event);
    }
    for command in app.take_commands() {
        if let Err(err) = runtime.send(command) {
            app.set_notice(format!("{err}"));
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }

    if app.show_help {
        if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q')) {
            app.show_help = false;
        }
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Prompt(kind) => handle_prompt_mode(app, key, kind),
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.show_help || matches!(app.input_mode, InputMode::Prompt(_)) {
        return;
    }
    match mouse.kind {
        MouseEventKind::ScrollUp => app.move_selection_up(),
        MouseEventKind::ScrollDown => app.move_selection_down(),
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match (key.code, key.modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => app.should_quit = true,
        (KeyCode::Char('q'), _) => app.should_quit = true,
        (KeyCode::Char('?'), _) => app.show_help = true,
        (KeyCode::Esc, _) => app.dismiss_notice(),
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => app.move_selection_down(),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => app.move_selection_up(),
        (KeyCode::Char('g'), _) | (KeyCode::Home, _) => app.select_first(),
        (KeyCode::Char('G'), _) | (KeyCode::End, _) => app.select_last(),
        (KeyCode::Char('r'), _) => app.request_refresh(),
        (KeyCode::Char('c'), _) => app.enter_prompt(PromptKind::Connect),
        (KeyCode::Char('D'), _) => app.disconnect(),
        (KeyCode::Char('e'), _) => app.enter_prompt(PromptKind::Label),
        (KeyCode::Char('d'), _) => app.enter_prompt(PromptKind::Description),
        (KeyCode::Char('n'), _) => app.enter_prompt(PromptKind::Nickname),
        (KeyCode::Char('a'), _) => app.request_analysis(),
        (KeyCode::Enter, _) => app.apply_selected_suggestion(),
        (KeyCode::Char('A'), _) => app.apply_all_suggestions(),
        (KeyCode::Char('x'), _) => app.export_pdf(),
        (KeyCode::Char('y'), _) => handle_copy_to_clipboard(app),
        _ => {}
    }
}

fn handle_prompt_mode(app: &mut App, key: KeyEvent, kind: PromptKind) {
    match key.code {
        KeyCode::Esc => app.exit_prompt(),
        KeyCode::Enter => app.apply_prompt(kind),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Char(ch) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                return;
            }
            app.input.push(ch);
        }
        _ => {}
    }
}

fn handle_copy_to_clipboard(app: &mut App) {
    use arboard::Clipboard;

    let Some(hash) = app.selected_hash().map(str::to_string) else {
        app.set_status("Nothing to copy", StatusLevel::Warn);
        return;
    };
    match Clipboard::new() {
        Ok(mut clipboard) => {
            if clipboard.set_text(hash.clone()).is_ok() {
                app.set_status(format!("Copied: {hash}"), StatusLevel::Info);
            } else {
                app.set_status("Failed to copy to clipboard", StatusLevel::Error);
            }
        }
        Err(_) => app.set_status("Clipboard not available", StatusLevel::Error),
    }
}
