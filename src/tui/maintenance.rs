//! Maintenance tab: request list, detail pane and quick updates.

use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use super::backend::BackendCommand;
use super::input::TextInput;
use crate::format;
use crate::models::{Capability, MaintenanceRequest, MaintenanceStatus, Priority, User};
use crate::store::{StoreState, UpdateDraft};

#[derive(Debug, Default)]
pub struct MaintenanceView {
    /// `None` shows every status.
    pub status_filter: Option<MaintenanceStatus>,
    pub selected: usize,
    /// Open while writing an update for the selected request.
    pub update: Option<TextInput>,
}

fn next_filter(filter: Option<MaintenanceStatus>) -> Option<MaintenanceStatus> {
    match filter {
        None => Some(MaintenanceStatus::New),
        Some(MaintenanceStatus::Done) => None,
        Some(s) => Some(s.next()),
    }
}

fn filter_label(filter: Option<MaintenanceStatus>) -> &'static str {
    filter.map_or("All", format::maintenance_status_label)
}

impl MaintenanceView {
    pub fn is_editing(&self) -> bool {
        self.update.is_some()
    }

    pub fn clamp(&mut self, state: &StoreState) {
        let len = state.maintenance(self.status_filter).len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn selected_request<'a>(&self, state: &'a StoreState) -> Option<&'a MaintenanceRequest> {
        state.maintenance(self.status_filter).get(self.selected).copied()
    }

    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        user: &User,
        state: &StoreState,
    ) -> Option<BackendCommand> {
        if let Some(input) = self.update.as_mut() {
            match key.code {
                KeyCode::Esc => self.update = None,
                KeyCode::Enter => {
                    if input.is_blank() {
                        return None;
                    }
                    let note = input.take();
                    self.update = None;
                    let request = self.selected_request(state)?;
                    return Some(BackendCommand::AddMaintenanceUpdate {
                        maintenance_id: request.id.clone(),
                        draft: UpdateDraft {
                            note,
                            ..Default::default()
                        },
                    });
                }
                _ => {
                    input.handle_key(key);
                }
            }
            return None;
        }

        let len = state.maintenance(self.status_filter).len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < len {
                    self.selected += 1;
                }
            }
            KeyCode::Char('f') => {
                self.status_filter = next_filter(self.status_filter);
                self.selected = 0;
            }
            KeyCode::Char('s') if user.can(Capability::UpdateMaintenance) => {
                let request = self.selected_request(state)?;
                return Some(BackendCommand::SetMaintenanceStatus {
                    maintenance_id: request.id.clone(),
                    status: request.status.next(),
                });
            }
            KeyCode::Char('u') if self.selected_request(state).is_some() => {
                self.update = Some(TextInput::default());
            }
            _ => {}
        }
        None
    }
}

fn status_color(status: MaintenanceStatus) -> Color {
    match status {
        MaintenanceStatus::New => Color::Cyan,
        MaintenanceStatus::InProgress => Color::Yellow,
        MaintenanceStatus::Done => Color::Green,
    }
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::LightRed,
        Priority::Medium => Color::White,
        Priority::Low => Color::Gray,
    }
}

fn render_list(frame: &mut Frame, area: Rect, view: &MaintenanceView, state: &StoreState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Requests: {} (f) ", filter_label(view.status_filter)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = state.maintenance(view.status_filter);
    if rows.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                " No maintenance requests.",
                Style::default().fg(Color::DarkGray),
            )),
            inner,
        );
        return;
    }

    let height = inner.height as usize;
    let offset = view.selected.saturating_sub(height.saturating_sub(1));
    let width = inner.width as usize;
    for (row, (idx, m)) in rows.iter().enumerate().skip(offset).take(height).enumerate() {
        let base = if idx == view.selected {
            Style::default().bg(Color::DarkGray)
        } else {
            Style::default()
        };
        let status = format!("[{}]", format::maintenance_status_label(m.status));
        let title_width = width.saturating_sub(status.chars().count() + 2);
        let line = Line::from(vec![
            Span::styled(
                format!(" {:<w$}", format::truncate(&m.title, title_width), w = title_width),
                base.fg(priority_color(m.priority)),
            ),
            Span::styled(status, base.fg(status_color(m.status))),
        ]);
        frame.render_widget(
            Paragraph::new(line),
            Rect::new(inner.x, inner.y + row as u16, inner.width, 1),
        );
    }
}

fn detail_lines(request: &MaintenanceRequest, state: &StoreState) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::Gray);
    let mut lines = vec![
        Line::from(Span::styled(
            request.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("Status: ", label),
            Span::styled(
                format::maintenance_status_label(request.status),
                Style::default().fg(status_color(request.status)),
            ),
            Span::styled("   Priority: ", label),
            Span::styled(
                format::priority_label(request.priority),
                Style::default().fg(priority_color(request.priority)),
            ),
        ]),
        Line::from(vec![
            Span::styled("Updated: ", label),
            Span::raw(format::short_datetime(request.updated_at)),
        ]),
    ];
    if let Some(c) = request
        .conversation_id
        .as_deref()
        .and_then(|id| state.conversation(id))
    {
        lines.push(Line::from(vec![
            Span::styled("Conversation: ", label),
            Span::raw(format!("{} at {}", c.visitor_alias, c.property.name)),
        ]));
    }
    if let Some(url) = &request.external_url {
        lines.push(Line::from(vec![
            Span::styled("Record: ", label),
            Span::styled(url.clone(), Style::default().fg(Color::Blue)),
        ]));
    }
    lines.push(Line::from(""));
    if !request.summary.is_empty() {
        lines.push(Line::from(request.summary.clone()));
        lines.push(Line::from(""));
    }

    let notes = state.notes_for_maintenance(&request.id);
    lines.push(Line::from(Span::styled(
        format!("Notes ({})", notes.len()),
        Style::default().fg(Color::Yellow),
    )));
    let now = Utc::now();
    for note in notes {
        let who = note.author_name.clone().unwrap_or_else(|| "Staff".into());
        lines.push(Line::from(Span::styled(
            format!(
                "{} · {} · {}",
                who,
                format::note_source_label(note.source),
                format::relative_time(note.created_at, now)
            ),
            Style::default().fg(Color::DarkGray),
        )));
        if !note.note.is_empty() {
            lines.push(Line::from(format!("  {}", note.note)));
        }
        for url in note.photo_urls.iter().chain(&note.video_urls) {
            lines.push(Line::from(Span::styled(
                format!("  {}", url),
                Style::default().fg(Color::Blue),
            )));
        }
    }
    lines
}

pub fn render(frame: &mut Frame, area: Rect, view: &MaintenanceView, user: &User, state: &StoreState) {
    let [list_area, detail_area] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(area);
    render_list(frame, list_area, view, state);

    let [body_area, footer_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(3)]).areas(detail_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Detail ");
    let lines = view
        .selected_request(state)
        .map(|r| detail_lines(r, state))
        .unwrap_or_default();
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        body_area,
    );

    let footer = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = footer.inner(footer_area);
    frame.render_widget(footer, footer_area);
    match &view.update {
        Some(input) => input.render(frame, inner, "Update", "Enter to save, Esc to cancel", true),
        None => {
            let mut hints = vec!["j/k move", "f filter", "u add update"];
            if user.can(Capability::UpdateMaintenance) {
                hints.push("s next status");
            }
            frame.render_widget(
                Paragraph::new(Span::styled(
                    hints.join("  ·  "),
                    Style::default().fg(Color::DarkGray),
                )),
                inner,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake;
    use crate::models::Role;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn state() -> StoreState {
        let mut done = fake::maintenance("mr-2", None, -30);
        done.status = MaintenanceStatus::Done;
        StoreState {
            maintenance_requests: vec![fake::maintenance("mr-1", Some("c1"), 0), done],
            ..Default::default()
        }
    }

    #[test]
    fn test_status_cycle_needs_capability() {
        let s = state();
        let mut view = MaintenanceView::default();

        let tenant = fake::user("t", "Tess", Role::Tenant);
        assert!(view.handle_key(key(KeyCode::Char('s')), &tenant, &s).is_none());

        let manager = fake::user("pm", "Pat", Role::Manager);
        match view.handle_key(key(KeyCode::Char('s')), &manager, &s) {
            Some(BackendCommand::SetMaintenanceStatus {
                maintenance_id,
                status,
            }) => {
                assert_eq!(maintenance_id, "mr-1");
                assert_eq!(status, MaintenanceStatus::InProgress);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_filter_cycles_through_all() {
        let s = state();
        let user = fake::user("pm", "Pat", Role::Manager);
        let mut view = MaintenanceView::default();
        let mut seen = Vec::new();
        for _ in 0..4 {
            view.handle_key(key(KeyCode::Char('f')), &user, &s);
            seen.push(view.status_filter);
        }
        assert_eq!(
            seen,
            vec![
                Some(MaintenanceStatus::New),
                Some(MaintenanceStatus::InProgress),
                Some(MaintenanceStatus::Done),
                None
            ]
        );
    }

    #[test]
    fn test_update_flow() {
        let s = state();
        let user = fake::user("t", "Tess", Role::Tenant);
        let mut view = MaintenanceView::default();
        view.handle_key(key(KeyCode::Down), &user, &s);
        view.handle_key(key(KeyCode::Char('u')), &user, &s);
        assert!(view.is_editing());

        // Blank updates are not sent.
        assert!(view.handle_key(key(KeyCode::Enter), &user, &s).is_none());
        for c in "Fixed".chars() {
            view.handle_key(key(KeyCode::Char(c)), &user, &s);
        }
        match view.handle_key(key(KeyCode::Enter), &user, &s) {
            Some(BackendCommand::AddMaintenanceUpdate {
                maintenance_id,
                draft,
            }) => {
                assert_eq!(maintenance_id, "mr-2");
                assert_eq!(draft.note, "Fixed");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!view.is_editing());
    }

    #[test]
    fn test_escape_cancels_update() {
        let s = state();
        let user = fake::user("t", "Tess", Role::Tenant);
        let mut view = MaintenanceView::default();
        view.handle_key(key(KeyCode::Char('u')), &user, &s);
        view.handle_key(key(KeyCode::Esc), &user, &s);
        assert!(!view.is_editing());
    }

    #[test]
    fn test_detail_lists_notes() {
        let s = state();
        let request = s.maintenance_request("mr-1").cloned().unwrap();
        let lines = detail_lines(&request, &s);
        assert!(lines
            .iter()
            .any(|l| l.to_string().contains("Notes (0)")));
    }
}
