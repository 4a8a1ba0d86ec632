//! Profile tab: account details, notification toggle and sign-out.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::backend::BackendCommand;
use crate::config::Settings;
use crate::format;
use crate::models::User;

pub fn handle_key(key: KeyEvent, user: &User) -> Option<BackendCommand> {
    match key.code {
        KeyCode::Char('p') => Some(BackendCommand::SetPushNotifications(
            !user.notification_prefs.push,
        )),
        KeyCode::Char('l') => Some(BackendCommand::SignOut),
        _ => None,
    }
}

fn on_off(enabled: bool) -> Span<'static> {
    if enabled {
        Span::styled("on", Style::default().fg(Color::Green))
    } else {
        Span::styled("off", Style::default().fg(Color::DarkGray))
    }
}

fn profile_lines(user: &User, settings: &Settings) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::Gray);
    let row = |name: &'static str, value: String| {
        Line::from(vec![Span::styled(format!("{:<10}", name), label), Span::raw(value)])
    };

    let mut lines = vec![
        Line::from(Span::styled(
            user.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        row("Role", format::role_label(user.role).to_string()),
        row("Email", user.email.clone()),
    ];
    if let Some(phone) = &user.phone {
        lines.push(row("Phone", phone.clone()));
    }
    if let Some(company) = &user.company {
        lines.push(row("Company", company.clone()));
    }

    let prefs = &user.notification_prefs;
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Notifications",
        Style::default().fg(Color::Yellow),
    )));
    for (name, enabled) in [("Push", prefs.push), ("Email", prefs.email), ("SMS", prefs.sms)] {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<10}", name), label),
            on_off(enabled),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(row("Server", settings.api_url.clone()));
    if let Some(url) = &settings.support_url {
        lines.push(row("Support", url.clone()));
    }
    if let Some(url) = &settings.privacy_url {
        lines.push(row("Privacy", url.clone()));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "p toggle push  ·  l sign out",
        Style::default().fg(Color::DarkGray),
    )));
    lines
}

pub fn render(frame: &mut Frame, area: Rect, user: &User, settings: &Settings) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Profile ");
    frame.render_widget(
        Paragraph::new(profile_lines(user, settings))
            .block(block)
            .wrap(Wrap { trim: false }),
        area,
    );
}
