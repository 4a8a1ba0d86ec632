//! Single-line text field used by the compose bar and the forms.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Default)]
pub struct TextInput {
    value: String,
    /// Cursor as a char index into `value`.
    cursor: usize,
    /// Render as bullets.
    pub masked: bool,
}

impl TextInput {
    pub fn masked() -> Self {
        Self {
            masked: true,
            ..Self::default()
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn set(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.cursor = self.value.chars().count();
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Return the contents and empty the field.
    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.value)
    }

    fn byte_at(&self, char_idx: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    /// Apply an editing key. Returns false for keys the field does not use.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let len = self.value.chars().count();
        match key.code {
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => self.clear(),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                let at = self.byte_at(self.cursor);
                self.value.insert(at, c);
                self.cursor += 1;
            }
            KeyCode::Backspace if self.cursor > 0 => {
                let end = self.byte_at(self.cursor);
                let start = self.byte_at(self.cursor - 1);
                self.value.replace_range(start..end, "");
                self.cursor -= 1;
            }
            KeyCode::Delete if self.cursor < len => {
                let start = self.byte_at(self.cursor);
                let end = self.byte_at(self.cursor + 1);
                self.value.replace_range(start..end, "");
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(len),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = len,
            KeyCode::Backspace | KeyCode::Delete => {}
            _ => return false,
        }
        true
    }

    /// Visible slice for `width` columns and the cursor column within it.
    fn viewport(&self, width: usize) -> (String, usize) {
        let shown: String = if self.masked {
            "•".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        };
        if width == 0 {
            return (String::new(), 0);
        }

        let chars: Vec<char> = shown.chars().collect();
        let before: String = chars[..self.cursor.min(chars.len())].iter().collect();
        let mut start = 0;
        // Scroll right until the cursor fits.
        while before.chars().skip(start).collect::<String>().width() >= width {
            start += 1;
        }
        let mut visible = String::new();
        for ch in chars.iter().skip(start) {
            visible.push(*ch);
            if visible.width() > width {
                visible.pop();
                break;
            }
        }
        let cursor_col = before.chars().skip(start).collect::<String>().width();
        (visible, cursor_col)
    }

    /// Draw `label` then the field; places the terminal cursor when focused.
    pub fn render(
        &self,
        frame: &mut Frame,
        area: Rect,
        label: &str,
        placeholder: &str,
        focused: bool,
    ) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let label_text = if label.is_empty() {
            String::new()
        } else {
            format!("{}: ", label)
        };
        let label_style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Gray)
        };
        let field_width = (area.width as usize).saturating_sub(label_text.width());

        let mut spans = vec![Span::styled(label_text.clone(), label_style)];
        if self.value.is_empty() {
            spans.push(Span::styled(
                placeholder.to_string(),
                Style::default().fg(Color::DarkGray),
            ));
        } else {
            let (visible, _) = self.viewport(field_width);
            spans.push(Span::styled(visible, Style::default().fg(Color::White)));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);

        if focused {
            let (_, col) = self.viewport(field_width.saturating_sub(1));
            let offset = u16::try_from(label_text.width() + col).unwrap_or(u16::MAX);
            let last_col = area.x.saturating_add(area.width.saturating_sub(1));
            let x = area.x.saturating_add(offset).min(last_col);
            frame.set_cursor_position((x, area.y));
        }
    }
}
