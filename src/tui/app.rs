//! TUI application state and main event loop

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::DefaultTerminal;
use std::time::Duration;

use super::backend::{Backend, BackendCommand, BackendResponse};
use super::conversation::ConversationView;
use super::inbox::InboxState;
use super::log_capture::LogBuffer;
use super::maintenance::MaintenanceView;
use super::profile;
use super::signin::SignInState;
use super::ui;
use super::visit::VisitForm;
use crate::config::Settings;
use crate::store::StoreState;

/// Redraw at least this often so relative times and the activity strip move.
const TICK: Duration = Duration::from_millis(500);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Inbox,
    Maintenance,
    Visit,
    Profile,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Inbox, Tab::Maintenance, Tab::Visit, Tab::Profile];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Inbox => "Inbox",
            Tab::Maintenance => "Maintenance",
            Tab::Visit => "Visit",
            Tab::Profile => "Profile",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|t| t == self).unwrap_or(0)
    }

    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the store task to restore or reject the cached session.
    #[default]
    Starting,
    SignIn,
    Ready,
}

/// Blocking error popup; any key dismisses it.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub title: String,
    pub body: String,
}

pub struct App {
    pub should_exit: bool,
    pub phase: Phase,
    pub tab: Tab,
    pub settings: Settings,
    /// Latest store snapshot.
    pub state: StoreState,
    pub sign_in: SignInState,
    pub inbox: InboxState,
    /// Open conversation screen, on top of the tabs.
    pub conversation: Option<ConversationView>,
    pub maintenance: MaintenanceView,
    pub visit: VisitForm,
    pub alert: Option<Alert>,
    pub status_message: Option<String>,
    /// A command is in flight.
    pub busy: bool,
    /// Live chat connected for the open conversation.
    pub live: bool,
    pub show_activity: bool,
    pub log: LogBuffer,
}

impl App {
    pub fn new(settings: Settings, log: LogBuffer) -> Self {
        Self {
            should_exit: false,
            phase: Phase::default(),
            tab: Tab::default(),
            settings,
            state: StoreState::default(),
            sign_in: SignInState::default(),
            inbox: InboxState::default(),
            conversation: None,
            maintenance: MaintenanceView::default(),
            visit: VisitForm::default(),
            alert: None,
            status_message: None,
            busy: false,
            live: false,
            show_activity: false,
            log,
        }
    }

    /// Fold a store task response into the UI.
    pub fn apply(&mut self, resp: BackendResponse) {
        match resp {
            BackendResponse::Snapshot(state) => {
                self.state = *state;
                if self.state.current_user.is_some() {
                    self.phase = Phase::Ready;
                }
                self.inbox.clamp(&self.state);
                self.maintenance.clamp(&self.state);
            }
            BackendResponse::SignedOut => {
                self.busy = false;
                self.phase = Phase::SignIn;
                self.conversation = None;
                self.live = false;
                self.tab = Tab::Inbox;
                self.sign_in.reset();
            }
            BackendResponse::DeviceCode { url, code } => {
                self.sign_in.device_code = Some((url, code));
            }
            BackendResponse::Done { message } => {
                self.busy = false;
                self.sign_in.device_code = None;
                if self.visit.submitted {
                    self.visit.clear();
                }
                self.status_message = Some(message);
            }
            BackendResponse::Failed { action, error } => {
                self.busy = false;
                self.sign_in.device_code = None;
                self.visit.submitted = false;
                self.alert = Some(Alert {
                    title: format!("{} failed", action),
                    body: error,
                });
            }
            BackendResponse::Live(connected) => self.live = connected,
        }
    }

    /// Handle one key press. Returns the command to send, if any.
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<BackendCommand> {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            self.should_exit = true;
            return None;
        }
        if self.alert.take().is_some() {
            return None;
        }
        if key.code == KeyCode::F(2) {
            self.show_activity = !self.show_activity;
            return None;
        }
        if self.busy {
            return None;
        }

        match self.phase {
            Phase::Starting => None,
            Phase::SignIn => self.sign_in.handle_key(key, &self.settings),
            Phase::Ready => self.handle_ready_key(key),
        }
    }

    fn handle_ready_key(&mut self, key: KeyEvent) -> Option<BackendCommand> {
        let Some(user) = self.state.current_user.clone() else {
            return None;
        };

        if let Some(view) = self.conversation.as_mut() {
            if key.code == KeyCode::Esc && !view.editing_photo() {
                self.conversation = None;
                self.live = false;
                return Some(BackendCommand::CloseConversationView);
            }
            return view.handle_key(key, &user, &self.state);
        }

        // Tab switching, unless a text field wants the key.
        let typing = match self.tab {
            Tab::Visit => true,
            Tab::Maintenance => self.maintenance.is_editing(),
            _ => false,
        };
        match key.code {
            KeyCode::Tab if !self.maintenance.is_editing() => {
                self.tab = self.tab.next();
                return None;
            }
            KeyCode::BackTab if !self.maintenance.is_editing() => {
                self.tab = self.tab.previous();
                return None;
            }
            KeyCode::Char('q') if !typing => {
                self.should_exit = true;
                return None;
            }
            KeyCode::Char('r') if !typing => return Some(BackendCommand::Refresh),
            KeyCode::Char('n') if !typing && !self.state.notices.is_empty() => {
                return Some(BackendCommand::DismissNotices)
            }
            _ => {}
        }

        match self.tab {
            Tab::Inbox => {
                let opened = self.inbox.handle_key(key, &self.state)?;
                self.conversation = Some(ConversationView::new(opened.clone()));
                Some(BackendCommand::OpenConversation(opened))
            }
            Tab::Maintenance => self.maintenance.handle_key(key, &user, &self.state),
            Tab::Visit => self.visit.handle_key(key, &self.state),
            Tab::Profile => profile::handle_key(key, &user),
        }
    }
}

/// Run the TUI until the user quits. Restores the terminal on every exit path.
pub async fn run(settings: Settings, log: LogBuffer) -> Result<()> {
    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal, settings, log).await;
    ratatui::restore();
    result
}

async fn run_app(terminal: &mut DefaultTerminal, settings: Settings, log: LogBuffer) -> Result<()> {
    let mut backend = Backend::start(settings.clone())?;
    let mut app = App::new(settings, log);
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(TICK);

    while !app.should_exit {
        terminal.draw(|frame| ui::render(frame, &app))?;

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    if let Some(cmd) = app.handle_key(key) {
                        app.busy = cmd.awaits_result();
                        app.status_message = None;
                        backend.send(cmd);
                    }
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            resp = backend.recv() => match resp {
                Some(resp) => app.apply(resp),
                None => anyhow::bail!("Store task stopped unexpectedly"),
            },
            _ = tick.tick() => {}
        }
    }

    Ok(())
}
