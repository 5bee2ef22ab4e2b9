use crate::app::{update, AppMsg, Effect, FormPurpose, Route};
use crate::model::{load_config, AppConfig};
use crate::schema::{Form, FormResponse, SubmitReceipt, SubmitResponseRequest};
use crate::services::activation::DeferredActivation;
use crate::services::loader;
use crate::services::store::{open_store, FormStore, StoreRef};
use crate::widgets::builder::BuilderWidget;
use crate::widgets::chrome::{centered_rect, panel_block};
use crate::widgets::dashboard::DashboardWidget;
use crate::widgets::fill::FillWidget;
use crate::widgets::login::LoginWidget;
use crate::widgets::responses::ResponsesWidget;
use crate::widgets::status_bar::{draw_footer, draw_header};
use crate::widgets::Widget;
use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::collections::{HashSet, VecDeque};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TICK: Duration = Duration::from_millis(200);

pub(crate) fn run_effects(state: &mut AppState, effects: Vec<Effect>) {
    for eff in effects {
        match eff {
            Effect::LoadForms => {
                spawn_call(state, "forms".into(), LoadKind::Forms, loader::list_forms);
            }
            Effect::LoadForm { id, purpose } => {
                let key = format!("form:{id}");
                let kind = LoadKind::Form {
                    id: id.clone(),
                    purpose,
                };
                spawn_call(state, key, kind, move |s| loader::get_form(s, &id, purpose));
            }
            Effect::LoadResponses { form_id } => {
                let key = format!("responses:{form_id}");
                spawn_call(state, key, LoadKind::Responses, move |s| {
                    loader::load_responses(s, &form_id)
                });
            }
            Effect::SaveForm {
                id,
                request,
                session,
            } => {
                let key = format!("save:{}", id.as_deref().unwrap_or("new"));
                spawn_call(state, key, LoadKind::SaveForm { session }, move |s| {
                    loader::save_form(s, id.as_deref(), request)
                });
            }
            Effect::DeleteForm { id } => {
                let key = format!("delete-form:{id}");
                spawn_call(state, key, LoadKind::DeleteForm, move |s| {
                    loader::delete_form(s, &id)
                });
            }
            Effect::SubmitResponse { form_id, responses } => {
                let key = format!("submit:{form_id}");
                let req = SubmitResponseRequest { form_id, responses };
                spawn_call(state, key, LoadKind::Submit, move |s| {
                    loader::submit_response(s, &req)
                });
            }
            Effect::DeleteResponse { id } => {
                let key = format!("delete-response:{id}");
                spawn_call(state, key, LoadKind::DeleteResponse, move |s| {
                    loader::delete_response(s, &id)
                });
            }
            Effect::ScheduleReorderActivation { session, delay_ms } => {
                let Some(tx) = state.tx.clone() else {
                    continue;
                };
                state.dbg(format!("reorder activation in {delay_ms}ms (session {session})"));
                // Replacing the handle drops, and so cancels, the previous one.
                state.activation = Some(DeferredActivation::schedule(
                    Duration::from_millis(delay_ms),
                    move || {
                        let _ = tx.send(LoadMsg {
                            key: format!("activation:{session}"),
                            outcome: Ok(LoadOutcome::Activated),
                            kind: LoadKind::Activation { session },
                        });
                    },
                ));
            }
            Effect::ExportCsv { path, contents } => match write_export(&path, &contents) {
                Ok(()) => {
                    state.dbg(format!("exported {}", path.display()));
                    show_toast(
                        state,
                        format!("Exported to {}", path.display()),
                        ToastLevel::Success,
                        3,
                    );
                }
                Err(e) => {
                    let detail = format!("{e:#}");
                    tracing::warn!(error = %detail, "export failed");
                    state.dbg(format!("export failed: {detail}"));
                    show_toast(state, "Failed to export responses", ToastLevel::Error, 3);
                }
            },
            Effect::CopyToClipboard { text, success } => match copy_to_clipboard(&text) {
                Ok(()) => show_toast(state, success, ToastLevel::Success, 2),
                Err(e) => {
                    state.dbg(format!("clipboard: {e:#}"));
                    show_toast(state, format!("Clipboard unavailable: {text}"), ToastLevel::Error, 4);
                }
            },
            Effect::ShowToast {
                text,
                level,
                seconds,
            } => show_toast(state, text, level, seconds),
            Effect::Navigate(route) => {
                let effs = update(state, AppMsg::Navigate(route));
                run_effects(state, effs);
            }
            Effect::Back => {
                let effs = update(state, AppMsg::Back);
                run_effects(state, effs);
            }
            Effect::Login { id, password } => {
                let effs = update(state, AppMsg::Login { id, password });
                run_effects(state, effs);
            }
            Effect::Logout => {
                let effs = update(state, AppMsg::Logout);
                run_effects(state, effs);
            }
            Effect::Quit => state.should_quit = true,
        }
    }
}

fn show_toast(state: &mut AppState, text: impl Into<String>, level: ToastLevel, seconds: u64) {
    let ticks = seconds.saturating_mul(5); // ~200ms tick
    state.toast = Some(Toast {
        text: text.into(),
        level,
        expires_at_tick: state.tick.saturating_add(ticks),
    });
}

fn spawn_call<F>(state: &mut AppState, key: String, kind: LoadKind, job: F)
where
    F: FnOnce(&dyn FormStore) -> Result<LoadOutcome, String> + Send + 'static,
{
    let (Some(store), Some(tx)) = (state.store.clone(), state.tx.clone()) else {
        state.dbg(format!("{key}: no store configured"));
        return;
    };
    state.dbg(format!("store call {key}"));
    state.loading.insert(key.clone());
    loader::spawn_store_call(store, key, kind, tx, job);
}

fn write_export(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {dir:?}"))?;
    }
    fs::write(path, contents).with_context(|| format!("writing {path:?}"))
}

fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("opening clipboard")?;
    clipboard.set_text(text).context("setting clipboard text")?;
    Ok(())
}

/// Drains finished store calls and feeds them through `update`.
pub(crate) fn pump_loaded(state: &mut AppState) -> usize {
    let mut drained: Vec<LoadMsg> = Vec::new();
    if let Some(rx) = &state.rx {
        while let Ok(msg) = rx.try_recv() {
            drained.push(msg);
        }
    }
    let n = drained.len();
    for msg in drained {
        state.loading.remove(&msg.key);
        let outcome = msg.outcome;
        let effects = match msg.kind {
            LoadKind::Forms => update(state, AppMsg::LoadedForms { outcome }),
            LoadKind::Form { id, purpose } => {
                update(state, AppMsg::LoadedForm { id, purpose, outcome })
            }
            LoadKind::Responses => update(state, AppMsg::LoadedResponses { outcome }),
            LoadKind::SaveForm { session } => update(state, AppMsg::Saved { session, outcome }),
            LoadKind::DeleteForm => update(state, AppMsg::DeletedForm { outcome }),
            LoadKind::Submit => update(state, AppMsg::Submitted { outcome }),
            LoadKind::DeleteResponse => update(state, AppMsg::DeletedResponse { outcome }),
            LoadKind::Activation { session } => {
                update(state, AppMsg::ReorderActivated { session })
            }
        };
        run_effects(state, effects);
    }
    n
}

#[allow(clippy::large_enum_variant)]
pub(crate) enum Screen {
    Login(LoginWidget),
    Dashboard(DashboardWidget),
    Builder(BuilderWidget),
    Fill(FillWidget),
    Responses(ResponsesWidget),
    /// Waiting for one form, fetched for `purpose`.
    Loading { id: String, purpose: FormPurpose },
    Notice { title: String, text: String },
}

impl Default for Screen {
    fn default() -> Self {
        Screen::Login(LoginWidget::new())
    }
}

impl Screen {
    pub(crate) fn title(&self) -> String {
        match self {
            Screen::Login(_) => "Login".into(),
            Screen::Dashboard(_) => "Forms".into(),
            Screen::Builder(b) if b.form_id.is_some() => "Edit Form".into(),
            Screen::Builder(_) => "Create Form".into(),
            Screen::Fill(w) if w.session.is_preview() => format!("Preview: {}", w.title),
            Screen::Fill(w) => w.title.clone(),
            Screen::Responses(_) => "Responses".into(),
            Screen::Loading { .. } => "Loading".into(),
            Screen::Notice { title, .. } => title.clone(),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Screen::Login(_) => "login",
            Screen::Dashboard(_) => "dashboard",
            Screen::Builder(_) => "builder",
            Screen::Fill(_) => "fill",
            Screen::Responses(_) => "responses",
            Screen::Loading { .. } => "loading",
            Screen::Notice { .. } => "notice",
        }
    }

    pub(crate) fn widget_mut(&mut self) -> Option<&mut dyn Widget> {
        match self {
            Screen::Login(w) => Some(w),
            Screen::Dashboard(w) => Some(w),
            Screen::Builder(w) => Some(w),
            Screen::Fill(w) => Some(w),
            Screen::Responses(w) => Some(w),
            Screen::Loading { .. } | Screen::Notice { .. } => None,
        }
    }

    fn help(&self) -> &'static str {
        match self {
            Screen::Login(w) => w.help(),
            Screen::Dashboard(w) => w.help(),
            Screen::Builder(w) => w.help(),
            Screen::Fill(w) => w.help(),
            Screen::Responses(w) => w.help(),
            Screen::Loading { .. } => "Esc back",
            Screen::Notice { .. } => "Esc back  q quit",
        }
    }
}

#[derive(Default)]
pub(crate) struct AppState {
    pub(crate) config: AppConfig,
    pub(crate) config_path: Option<PathBuf>,
    pub(crate) store: Option<StoreRef>,
    pub(crate) screen: Screen,
    // screens to return to with Back (preview over builder)
    pub(crate) history: Vec<Screen>,
    pub(crate) authenticated: bool,
    pub(crate) public_form: Option<String>,
    pub(crate) tick: u64,
    pub(crate) loading: HashSet<String>,
    pub(crate) tx: Option<Sender<LoadMsg>>,
    rx: Option<Receiver<LoadMsg>>,
    pub(crate) toast: Option<Toast>,
    pub(crate) theme: crate::theme::Theme,
    // Debug log (rendered in bottom debug pane)
    pub(crate) debug_log: VecDeque<String>,
    pub(crate) show_debug: bool,
    pub(crate) builder_session: u64,
    pub(crate) activation: Option<DeferredActivation>,
    pub(crate) last_error: Option<String>,
    pub(crate) should_quit: bool,
}

impl AppState {
    pub(crate) fn new(config: AppConfig, store: Option<StoreRef>) -> Self {
        let (tx, rx) = mpsc::channel::<LoadMsg>();
        Self {
            config,
            store,
            tx: Some(tx),
            rx: Some(rx),
            theme: crate::theme::Theme::synthwave_dark(),
            ..Default::default()
        }
    }

    pub fn dbg(&mut self, msg: impl Into<String>) {
        const MAX_LOG_LINES: usize = 200;
        let msg = msg.into();
        tracing::debug!("{msg}");
        if self.debug_log.len() >= MAX_LOG_LINES {
            self.debug_log.pop_front();
        }
        self.debug_log.push_back(msg);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

pub struct Toast {
    pub text: String,
    pub level: ToastLevel,
    pub expires_at_tick: u64,
}

// Async loading support
pub(crate) enum LoadOutcome {
    Forms(Vec<Form>),
    Form(Form),
    Responses {
        form: Form,
        responses: Vec<FormResponse>,
    },
    Saved(Form),
    Deleted(String),
    Submitted(SubmitReceipt),
    Activated,
}

pub(crate) struct LoadMsg {
    pub(crate) key: String,
    pub(crate) outcome: Result<LoadOutcome, String>,
    pub(crate) kind: LoadKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum LoadKind {
    Forms,
    Form { id: String, purpose: FormPurpose },
    Responses,
    SaveForm { session: u64 },
    DeleteForm,
    Submit,
    DeleteResponse,
    Activation { session: u64 },
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(false)
}

/// File logging through `tracing`; nothing is installed without `log_file`
/// so the terminal stays clean.
fn init_logging(config: &AppConfig) -> Result<()> {
    let Some(path) = &config.log_file else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {path:?}"))?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .try_init()
        .context("installing log subscriber")?;
    Ok(())
}

/// First screen: the public fill-in route when a form id is given, otherwise
/// the login.
pub(crate) fn start(state: &mut AppState, public_form: Option<String>) {
    let route = match public_form {
        Some(id) => {
            state.public_form = Some(id.clone());
            Route::Fill(id)
        }
        None => Route::Login,
    };
    let effects = update(state, AppMsg::Navigate(route));
    run_effects(state, effects);
}

pub(crate) fn handle_key(state: &mut AppState, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('c') if ctrl => {
            state.should_quit = true;
            return;
        }
        KeyCode::F(2) => {
            state.show_debug = !state.show_debug;
            return;
        }
        _ => {}
    }
    let effects = match state.screen.widget_mut() {
        Some(w) => w.on_key(key),
        None => match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace => vec![Effect::Back],
            KeyCode::Char('q') => vec![Effect::Quit],
            _ => Vec::new(),
        },
    };
    run_effects(state, effects);
}

pub fn run() -> Result<()> {
    let (config, config_path) = load_config()?;
    init_logging(&config)?;
    let store = open_store(&config.store).context("opening form store")?;
    let mut state = AppState::new(config, Some(store));
    match &config_path {
        Some(p) => state.dbg(format!("config: {}", p.display())),
        None => state.dbg("config: built-in defaults"),
    }
    state.config_path = config_path;
    tracing::info!(store = ?state.config.store.kind, "formdeck starting");

    let public_form = std::env::var("FORMDECK_FORM_ID")
        .ok()
        .filter(|s| !s.trim().is_empty());
    start(&mut state, public_form);

    if env_flag("FORMDECK_HEADLESS") {
        return run_headless(&mut state);
    }

    // Setup terminal (interactive)
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let res = event_loop(&mut terminal, &mut state);
    disable_raw_mode()?;
    execute!(std::io::stdout(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    res
}

fn event_loop<B: Backend>(terminal: &mut Terminal<B>, state: &mut AppState) -> Result<()> {
    let mut last_tick = Instant::now();
    while !state.should_quit {
        terminal.draw(|f| ui(f, state))?;
        let timeout = TICK
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(state, key);
                }
            }
        }
        pump_loaded(state);
        if last_tick.elapsed() >= TICK {
            state.tick = state.tick.wrapping_add(1);
            last_tick = Instant::now();
        }
    }
    Ok(())
}

/// Smoke run on a `TestBackend`; prints a JSON summary when asked to.
fn run_headless(state: &mut AppState) -> Result<()> {
    let ticks: u64 = std::env::var("FORMDECK_TICKS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(10);
    let summary = env_flag("FORMDECK_SMOKE_SUMMARY");
    let mut login_done = false;
    let backend = ratatui::backend::TestBackend::new(100, 30);
    let mut terminal = Terminal::new(backend)?;
    for _ in 0..ticks {
        if !login_done && state.public_form.is_none() && env_flag("FORMDECK_HEADLESS_LOGIN") {
            let id = state.config.auth.admin_id.clone();
            let password = state.config.auth.admin_password.clone();
            let effs = update(state, AppMsg::Login { id, password });
            run_effects(state, effs);
            login_done = true;
        }
        terminal.draw(|f| ui(f, state))?;
        pump_loaded(state);
        state.tick = state.tick.wrapping_add(1);
        std::thread::sleep(TICK);
    }
    if summary {
        let summary = serde_json::json!({
            "ok": state.last_error.is_none(),
            "screen": state.screen.name(),
            "authenticated": state.authenticated,
            "public_form": state.public_form,
            "login_done": login_done,
            "pending_calls": state.loading.len(),
            "toast": state.toast.as_ref().map(|t| t.text.clone()),
        });
        println!("{summary}");
    }
    Ok(())
}

fn ui(f: &mut Frame, state: &mut AppState) {
    // Clear expired toast
    if let Some(t) = &state.toast {
        if state.tick >= t.expires_at_tick {
            state.toast = None;
        }
    }
    let screen = f.area();
    f.render_widget(Block::default().style(state.theme.base_style()), screen);

    const DEBUG_H: u16 = 6;
    let mut constraints = vec![Constraint::Length(1), Constraint::Min(0)];
    if state.show_debug {
        constraints.push(Constraint::Length(DEBUG_H));
    }
    constraints.push(Constraint::Length(1));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(screen);

    draw_header(f, chunks[0], state);
    let main = chunks[1];
    let tick = state.tick;
    match &mut state.screen {
        Screen::Loading { .. } => draw_loading(f, main, "Loading form...", tick),
        Screen::Notice { title, text } => draw_notice(f, main, title, text),
        other => {
            if let Some(w) = other.widget_mut() {
                w.render(f, main, true, tick);
            }
        }
    }
    if state.show_debug {
        draw_debug(f, chunks[2], state);
    }
    let help = state.screen.help();
    draw_footer(f, chunks[chunks.len() - 1], state, help);
}

fn draw_loading(f: &mut Frame, area: Rect, text: &str, tick: u64) {
    let spinner = ["⠋", "⠙", "⠸", "⠴", "⠦", "⠇"][tick as usize % 6];
    let rect = centered_rect(40, 20, area);
    let p = Paragraph::new(format!("{spinner} {text}"))
        .alignment(Alignment::Center)
        .block(panel_block("", false));
    f.render_widget(p, rect);
}

fn draw_notice(f: &mut Frame, area: Rect, title: &str, text: &str) {
    let rect = centered_rect(60, 30, area);
    let p = Paragraph::new(vec![
        Line::from(Span::styled(title.to_string(), crate::theme::text_error())),
        Line::raw(""),
        Line::raw(text.to_string()),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(panel_block(" Notice ", true));
    f.render_widget(Clear, rect);
    f.render_widget(p, rect);
}

fn draw_debug(f: &mut Frame, area: Rect, state: &AppState) {
    let b = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            "Debug (F2)",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        ));
    // Take last `area.height` lines
    let h = area.height.saturating_sub(1) as usize;
    let start = state.debug_log.len().saturating_sub(h);
    let lines: Vec<Line> = state
        .debug_log
        .iter()
        .skip(start)
        .map(|s| Line::raw(s.clone()))
        .collect();
    let p = Paragraph::new(lines)
        .style(Style::default().fg(Color::Gray))
        .block(b)
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}
