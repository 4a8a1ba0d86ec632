//! UI rendering for the TUI

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use super::app::{App, Phase, Tab};
use super::conversation;
use super::inbox;
use super::maintenance;
use super::profile;
use super::signin;
use super::visit;
use crate::format;
use crate::models::User;

const ACTIVITY_LINES: usize = 200;

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    match (app.phase, app.state.current_user.as_ref()) {
        (Phase::Ready, Some(user)) => render_ready(frame, app, user),
        (Phase::Starting, _) => {
            let [middle] = Layout::vertical([Constraint::Length(1)])
                .flex(ratatui::layout::Flex::Center)
                .areas(area);
            frame.render_widget(
                Paragraph::new("Restoring session…")
                    .style(Style::default().fg(Color::Gray))
                    .centered(),
                middle,
            );
        }
        _ => signin::render(frame, area, &app.sign_in, &app.settings, app.busy),
    }

    if app.show_activity {
        render_activity(frame, app);
    }
    if let Some(alert) = &app.alert {
        render_alert(frame, &alert.title, &alert.body);
    }
}

fn render_ready(frame: &mut Frame, app: &App, user: &User) {
    // Layout: header + tabs + content + status bar
    let [header_area, tabs_area, main_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(header_area, frame.buffer_mut(), app, user);
    render_tabs(tabs_area, frame.buffer_mut(), app);

    if let Some(view) = &app.conversation {
        conversation::render(frame, main_area, view, user, &app.state, app.live);
    } else {
        match app.tab {
            Tab::Inbox => inbox::render(main_area, frame.buffer_mut(), &app.inbox, &app.state),
            Tab::Maintenance => {
                maintenance::render(frame, main_area, &app.maintenance, user, &app.state)
            }
            Tab::Visit => visit::render(frame, main_area, &app.visit, &app.state),
            Tab::Profile => profile::render(frame, main_area, user, &app.settings),
        }
    }

    render_status(status_area, frame.buffer_mut(), app);
}

/// Render the header bar
fn render_header(area: Rect, buf: &mut Buffer, app: &App, user: &User) {
    let title = " propdesk";
    let unread = app.state.total_unread();
    let right = format!(
        "{} unread  {}  {} ({}) ",
        unread,
        if app.live { "● live" } else { "○" },
        user.name,
        format::role_label(user.role)
    );
    let padding = (area.width as usize).saturating_sub(title.width() + right.width());

    let unread_style = if unread > 0 {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let live_style = if app.live {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Gray)
    };

    let line = Line::from(vec![
        Span::styled(
            title,
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" ".repeat(padding)),
        Span::styled(format!("{} unread  ", unread), unread_style),
        Span::styled(if app.live { "● live  " } else { "○  " }, live_style),
        Span::styled(
            format!("{} ({}) ", user.name, format::role_label(user.role)),
            Style::default().fg(Color::Cyan),
        ),
    ]);
    Paragraph::new(line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

fn render_tabs(area: Rect, buf: &mut Buffer, app: &App) {
    let selected = Tab::ALL.iter().position(|t| *t == app.tab).unwrap_or(0);
    let dimmed = app.conversation.is_some();
    Tabs::new(Tab::ALL.iter().map(|t| t.title()))
        .select(selected)
        .style(Style::default().fg(if dimmed { Color::DarkGray } else { Color::Gray }))
        .highlight_style(
            Style::default()
                .fg(if dimmed { Color::Gray } else { Color::Yellow })
                .add_modifier(Modifier::BOLD),
        )
        .render(area, buf);
}

/// Render the status bar
fn render_status(area: Rect, buf: &mut Buffer, app: &App) {
    let sep = Span::styled(" | ", Style::default().fg(Color::Gray));
    let mut spans = Vec::new();

    if app.busy {
        spans.push(Span::styled(" Working… ", Style::default().fg(Color::Yellow)));
    } else if let Some(msg) = &app.status_message {
        spans.push(Span::styled(format!(" {} ", msg), Style::default().fg(Color::Green)));
    }

    if let Some(latest) = app.state.notices.last() {
        if !spans.is_empty() {
            spans.push(sep.clone());
        }
        let count = app.state.notices.len();
        spans.push(Span::styled(
            format!(
                " {}{} (n dismiss) ",
                latest.text,
                if count > 1 {
                    format!(" +{}", count - 1)
                } else {
                    String::new()
                }
            ),
            Style::default().fg(Color::LightRed),
        ));
    }

    if spans.is_empty() {
        let hint = if app.conversation.is_some() {
            " Esc back | F2 activity | Ctrl+C quit"
        } else {
            " Tab switch | r refresh | F2 activity | q quit"
        };
        spans.push(Span::styled(hint, Style::default().fg(Color::Gray)));
        if let Some(line) = app.log.latest() {
            spans.push(sep);
            let used: usize = spans.iter().map(|s| s.width()).sum();
            let room = (area.width as usize).saturating_sub(used);
            spans.push(Span::styled(
                format::truncate(&line, room),
                Style::default().fg(Color::Gray),
            ));
        }
    }

    Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

/// Recent log lines over the whole screen.
fn render_activity(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let popup = centered_rect(
        area.width.saturating_sub(4),
        area.height.saturating_sub(4),
        area,
    );
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(" Activity (F2 to close) ");
    let inner_height = block.inner(popup).height as usize;

    let lines: Vec<Line> = app
        .log
        .tail(ACTIVITY_LINES)
        .into_iter()
        .rev()
        .take(inner_height)
        .rev()
        .map(|l| {
            let style = if l.contains("ERROR") {
                Style::default().fg(Color::Red)
            } else if l.contains("WARN") {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::Gray)
            };
            Line::from(Span::styled(l, style))
        })
        .collect();
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

fn render_alert(frame: &mut Frame, title: &str, body: &str) {
    let area = frame.area();
    let width = 60.min(area.width.saturating_sub(2));
    let height = 8.min(area.height.saturating_sub(2));
    let popup = centered_rect(width, height, area);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(Span::styled(
            format!(" {} ", title),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Line::from(Span::styled(
            " Press any key ",
            Style::default().fg(Color::Gray),
        )));
    frame.render_widget(
        Paragraph::new(body.to_string())
            .block(block)
            .wrap(Wrap { trim: true }),
        popup,
    );
}

/// Return a centered sub-rect of the given size within `area`.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
