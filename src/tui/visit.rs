//! Visit tab: form for a site-visit note.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::backend::BackendCommand;
use super::input::TextInput;
use crate::store::{NoteDraft, StoreState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Field {
    #[default]
    Property,
    Unit,
    Maintenance,
    Note,
    Photos,
    Videos,
}

impl Field {
    const ALL: [Field; 6] = [
        Field::Property,
        Field::Unit,
        Field::Maintenance,
        Field::Note,
        Field::Photos,
        Field::Videos,
    ];

    fn label(&self) -> &'static str {
        match self {
            Field::Property => "Property",
            Field::Unit => "Unit",
            Field::Maintenance => "Maintenance",
            Field::Note => "Note",
            Field::Photos => "Photos",
            Field::Videos => "Videos",
        }
    }

    fn placeholder(&self) -> &'static str {
        match self {
            Field::Property => "property id (Ctrl+P picks from the inbox)",
            Field::Unit => "optional unit id",
            Field::Maintenance => "optional request id; left blank, one is created",
            Field::Note => "what you saw",
            Field::Photos => "photo URLs, comma separated",
            Field::Videos => "video URLs, comma separated",
        }
    }

    fn step(&self, forward: bool) -> Self {
        let idx = Self::ALL.iter().position(|f| f == self).unwrap_or(0);
        let len = Self::ALL.len();
        Self::ALL[if forward { (idx + 1) % len } else { (idx + len - 1) % len }]
    }
}

#[derive(Debug, Default)]
pub struct VisitForm {
    property: TextInput,
    unit: TextInput,
    maintenance: TextInput,
    note: TextInput,
    photos: TextInput,
    videos: TextInput,
    focus: Field,
    /// Set once a draft was handed to the store; cleared on the reply.
    pub submitted: bool,
}

/// Split a comma separated field into trimmed, non-empty entries.
fn split_urls(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn optional(value: &str) -> Option<String> {
    Some(value.trim().to_string()).filter(|v| !v.is_empty())
}

/// Distinct (property id, unit id) pairs seen in the inbox, in order.
fn known_places(state: &StoreState) -> Vec<(String, Option<String>)> {
    let mut out: Vec<(String, Option<String>)> = Vec::new();
    for c in &state.conversations {
        let place = (c.property.id.clone(), c.unit.as_ref().map(|u| u.id.clone()));
        if !out.contains(&place) {
            out.push(place);
        }
    }
    out
}

impl VisitForm {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn field_mut(&mut self, field: Field) -> &mut TextInput {
        match field {
            Field::Property => &mut self.property,
            Field::Unit => &mut self.unit,
            Field::Maintenance => &mut self.maintenance,
            Field::Note => &mut self.note,
            Field::Photos => &mut self.photos,
            Field::Videos => &mut self.videos,
        }
    }

    fn field(&self, field: Field) -> &TextInput {
        match field {
            Field::Property => &self.property,
            Field::Unit => &self.unit,
            Field::Maintenance => &self.maintenance,
            Field::Note => &self.note,
            Field::Photos => &self.photos,
            Field::Videos => &self.videos,
        }
    }

    pub fn draft(&self) -> NoteDraft {
        NoteDraft {
            property_id: self.property.value().trim().to_string(),
            unit_id: optional(self.unit.value()),
            maintenance_request_id: optional(self.maintenance.value()),
            note: self.note.value().trim().to_string(),
            photo_urls: split_urls(self.photos.value()),
            video_urls: split_urls(self.videos.value()),
        }
    }

    /// Step through the properties known from the inbox.
    fn cycle_place(&mut self, state: &StoreState) {
        let places = known_places(state);
        if places.is_empty() {
            return;
        }
        let current = (
            self.property.value().to_string(),
            optional(self.unit.value()),
        );
        let next = places
            .iter()
            .position(|p| *p == current)
            .map_or(0, |i| (i + 1) % places.len());
        let (property, unit) = places[next].clone();
        self.property.set(property);
        self.unit.set(unit.unwrap_or_default());
    }

    pub fn handle_key(&mut self, key: KeyEvent, state: &StoreState) -> Option<BackendCommand> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('s') if ctrl => {
                if self.submitted {
                    return None;
                }
                self.submitted = true;
                return Some(BackendCommand::AddVisitNote(self.draft()));
            }
            KeyCode::Char('p') if ctrl => self.cycle_place(state),
            KeyCode::Up => self.focus = self.focus.step(false),
            KeyCode::Down | KeyCode::Enter => self.focus = self.focus.step(true),
            _ => {
                let focus = self.focus;
                self.field_mut(focus).handle_key(key);
            }
        }
        None
    }
}

pub fn render(frame: &mut Frame, area: Rect, form: &VisitForm, state: &StoreState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" New site-visit note ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut constraints = vec![Constraint::Length(1); Field::ALL.len() * 2];
    constraints.push(Constraint::Fill(1));
    let rows = Layout::vertical(constraints).split(inner);

    for (i, field) in Field::ALL.iter().enumerate() {
        let row = rows[i * 2];
        let label = format!("{:<11}", field.label());
        form.field(*field)
            .render(frame, row, &label, field.placeholder(), form.focus == *field);
    }

    let property_name = state
        .conversations
        .iter()
        .find(|c| c.property.id == form.property.value().trim())
        .map(|c| c.property.name.clone());
    let mut footer = vec![Line::from(Span::styled(
        "Up/Down move  ·  Ctrl+P pick property  ·  Ctrl+S save  ·  Ctrl+U clear field",
        Style::default().fg(Color::DarkGray),
    ))];
    if let Some(name) = property_name {
        let earlier = state.notes_for_property(form.property.value().trim()).len();
        footer.insert(
            0,
            Line::from(Span::styled(
                format!("Property: {} ({} earlier notes)", name, earlier),
                Style::default().fg(Color::Cyan),
            )),
        );
    }
    if form.submitted {
        footer.push(Line::from(Span::styled(
            "Saving…",
            Style::default().fg(Color::Yellow),
        )));
    }
    if let Some(last) = rows.last() {
        frame.render_widget(Paragraph::new(footer), *last);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake;
    use crate::models::ConversationStatus;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_into(form: &mut VisitForm, s: &StoreState, text: &str) {
        for c in text.chars() {
            form.handle_key(key(KeyCode::Char(c)), s);
        }
    }

    #[test]
    fn test_fill_and_submit() {
        let s = StoreState {
            conversations: vec![fake::conversation("c1", ConversationStatus::New, 0)],
            ..Default::default()
        };
        let mut form = VisitForm::default();
        form.handle_key(ctrl('p'), &s);
        // Property, Unit, Maintenance, Note
        for _ in 0..3 {
            form.handle_key(key(KeyCode::Down), &s);
        }
        type_into(&mut form, &s, "Leak under sink");
        form.handle_key(key(KeyCode::Enter), &s);
        type_into(&mut form, &s, "https://a/1.jpg, ,https://a/2.jpg");

        let cmd = form.handle_key(ctrl('s'), &s);
        let Some(BackendCommand::AddVisitNote(draft)) = cmd else {
            panic!("expected a visit note, got {:?}", cmd);
        };
        assert_eq!(draft.property_id, "prop-1");
        assert_eq!(draft.unit_id.as_deref(), Some("unit-4b"));
        assert_eq!(draft.maintenance_request_id, None);
        assert_eq!(draft.note, "Leak under sink");
        assert_eq!(draft.photo_urls, vec!["https://a/1.jpg", "https://a/2.jpg"]);
        assert!(draft.video_urls.is_empty());

        assert!(form.submitted);
        assert!(form.handle_key(ctrl('s'), &s).is_none());
        form.clear();
        assert!(!form.submitted);
        assert!(form.draft().property_id.is_empty());
    }

    #[test]
    fn test_focus_wraps() {
        assert_eq!(Field::Property.step(false), Field::Videos);
        assert_eq!(Field::Videos.step(true), Field::Property);
    }

    #[test]
    fn test_known_places_are_distinct() {
        let mut other = fake::conversation("c2", ConversationStatus::New, 0);
        other.unit = None;
        let s = StoreState {
            conversations: vec![
                fake::conversation("c1", ConversationStatus::New, 0),
                fake::conversation("c3", ConversationStatus::Closed, 0),
                other,
            ],
            ..Default::default()
        };
        let places = known_places(&s);
        assert_eq!(places.len(), 2);

        let mut form = VisitForm::default();
        form.handle_key(ctrl('p'), &s);
        form.handle_key(ctrl('p'), &s);
        assert_eq!(form.draft().unit_id, None);
    }
}
