//! Sign-in screen.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
    Frame,
};

use super::backend::BackendCommand;
use super::input::TextInput;
use crate::config::Settings;

#[derive(Debug)]
pub struct SignInState {
    pub email: TextInput,
    pub password: TextInput,
    /// `true` while the password field has focus.
    password_focus: bool,
    /// Verification URL and user code while a Microsoft sign-in is pending.
    pub device_code: Option<(String, String)>,
}

impl Default for SignInState {
    fn default() -> Self {
        Self {
            email: TextInput::default(),
            password: TextInput::masked(),
            password_focus: false,
            device_code: None,
        }
    }
}

impl SignInState {
    /// Forget the typed password but keep the email for the next attempt.
    pub fn reset(&mut self) {
        self.password.clear();
        self.password_focus = false;
        self.device_code = None;
    }

    pub fn handle_key(&mut self, key: KeyEvent, settings: &Settings) -> Option<BackendCommand> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('o') if ctrl => {
                return settings
                    .microsoft_sign_in_enabled()
                    .then_some(BackendCommand::SignInMicrosoft);
            }
            _ if !settings.password_sign_in => return None,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.password_focus = !self.password_focus;
            }
            KeyCode::Enter if !self.password_focus => self.password_focus = true,
            KeyCode::Enter => {
                if self.email.is_blank() || self.password.value().is_empty() {
                    return None;
                }
                return Some(BackendCommand::SignIn {
                    email: self.email.value().trim().to_string(),
                    password: self.password.value().to_string(),
                });
            }
            _ => {
                if self.password_focus {
                    self.password.handle_key(key);
                } else {
                    self.email.handle_key(key);
                }
            }
        }
        None
    }
}

pub fn render(frame: &mut Frame, area: Rect, sign_in: &SignInState, settings: &Settings, busy: bool) {
    let [column] = Layout::horizontal([Constraint::Length(60)])
        .flex(Flex::Center)
        .areas(area);
    let [card] = Layout::vertical([Constraint::Length(14)])
        .flex(Flex::Center)
        .areas(column);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " propdesk ",
            Style::default().add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(card);
    frame.render_widget(block, card);

    let [intro, email_row, _, password_row, _, help] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Fill(1),
    ])
    .areas(inner);

    frame.render_widget(
        Paragraph::new(format!(" Sign in to {}", settings.api_url))
            .style(Style::default().fg(Color::Gray)),
        intro,
    );

    let typing = settings.password_sign_in && sign_in.device_code.is_none() && !busy;
    if settings.password_sign_in {
        sign_in
            .email
            .render(frame, email_row, "Email   ", "you@company.com", typing && !sign_in.password_focus);
        sign_in
            .password
            .render(frame, password_row, "Password", "", typing && sign_in.password_focus);
    }

    let mut lines = Vec::new();
    if let Some((url, code)) = &sign_in.device_code {
        lines.push(Line::from(vec![
            Span::raw("Open "),
            Span::styled(url.clone(), Style::default().fg(Color::Blue)),
        ]));
        lines.push(Line::from(vec![
            Span::raw("and enter "),
            Span::styled(
                code.clone(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        ]));
    } else if busy {
        lines.push(Line::from(Span::styled(
            "Signing in…",
            Style::default().fg(Color::Yellow),
        )));
    } else {
        let mut hints = Vec::new();
        if settings.password_sign_in {
            hints.push("Enter sign in");
        }
        if settings.microsoft_sign_in_enabled() {
            hints.push("Ctrl+O Microsoft");
        }
        hints.push("Ctrl+C quit");
        lines.push(Line::from(Span::styled(
            hints.join("  ·  "),
            Style::default().fg(Color::DarkGray),
        )));
        if !settings.password_sign_in && !settings.microsoft_sign_in_enabled() {
            lines.push(Line::from(Span::styled(
                "No sign-in method is configured.",
                Style::default().fg(Color::Red),
            )));
        }
    }
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), help);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn settings(password: bool, microsoft: bool) -> Settings {
        Settings::from_lookup(|k| match k {
            "PROPDESK_ENABLE_PASSWORD_SIGN_IN" => Some(password.to_string()),
            "PROPDESK_MS_CLIENT_ID" if microsoft => Some("client".into()),
            _ => None,
        })
    }

    #[test]
    fn test_password_sign_in() {
        let s = settings(true, false);
        let mut form = SignInState::default();
        for c in "pm@example.com".chars() {
            form.handle_key(key(KeyCode::Char(c)), &s);
        }
        // First Enter moves to the password field.
        assert!(form.handle_key(key(KeyCode::Enter), &s).is_none());
        assert!(form.handle_key(key(KeyCode::Enter), &s).is_none());
        for c in "secret".chars() {
            form.handle_key(key(KeyCode::Char(c)), &s);
        }
        match form.handle_key(key(KeyCode::Enter), &s) {
            Some(BackendCommand::SignIn { email, password }) => {
                assert_eq!(email, "pm@example.com");
                assert_eq!(password, "secret");
            }
            other => panic!("unexpected {:?}", other),
        }

        form.reset();
        assert!(form.password.value().is_empty());
        assert_eq!(form.email.value(), "pm@example.com");
    }

    #[test]
    fn test_disabled_methods() {
        let s = settings(false, false);
        let mut form = SignInState::default();
        form.handle_key(key(KeyCode::Char('a')), &s);
        assert!(form.email.value().is_empty());
        let ctrl_o = KeyEvent::new(KeyCode::Char('o'), KeyModifiers::CONTROL);
        assert!(form.handle_key(ctrl_o, &s).is_none());

        let s = settings(false, true);
        assert!(matches!(
            form.handle_key(ctrl_o, &s),
            Some(BackendCommand::SignInMicrosoft)
        ));
    }
}
