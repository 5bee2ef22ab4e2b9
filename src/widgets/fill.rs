use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::*;
use tui_textarea::TextArea;

use crate::app::Effect;
use crate::schema::{
    FieldDefinition, FieldType, Form, FormPreview, FormSession, SessionPhase, SubmitGate,
    SubmitStatus,
};
use crate::widgets::chrome::{centered_rect, error_line, panel_block, seeded_textarea, textarea_key};

pub const THANK_YOU: &str = "Thank you for your submission!";
pub const RECORDED: &str = "Your response has been recorded successfully.";

fn number_char_ok(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '-' | '.' | 'e' | 'E' | '+')
}

/// Fill-in screen over a `FormSession`, live or preview.
pub struct FillWidget {
    /// `None` for a preview opened from the builder.
    pub form_id: Option<String>,
    pub title: String,
    pub description: String,
    pub session: FormSession,
    // rows are the fields followed by the submit button
    cursor: usize,
    choice_cursor: usize,
    overlay: Option<TextArea<'static>>,
}

impl FillWidget {
    pub fn live(form: &Form) -> Self {
        Self::with_session(
            Some(form.id.clone()),
            form.title.clone(),
            form.description.clone(),
            FormSession::new(form.fields.clone()),
        )
    }

    pub fn preview(p: FormPreview) -> Self {
        Self::with_session(None, p.title, p.description, FormSession::preview(p.fields))
    }

    fn with_session(
        form_id: Option<String>,
        title: String,
        description: String,
        session: FormSession,
    ) -> Self {
        Self {
            form_id,
            title,
            description,
            session,
            cursor: 0,
            choice_cursor: 0,
            overlay: None,
        }
    }

    pub fn finish_submit(&mut self, result: Result<(), String>) -> SubmitStatus {
        self.session.finish_submit(result)
    }

    fn row_count(&self) -> usize {
        self.session.schema().len() + 1
    }

    fn current_field(&self) -> Option<FieldDefinition> {
        self.session.schema().fields().get(self.cursor).cloned()
    }

    fn move_cursor(&mut self, forward: bool) {
        let n = self.row_count();
        self.cursor = if forward {
            (self.cursor + 1).min(n - 1)
        } else {
            self.cursor.saturating_sub(1)
        };
        self.choice_cursor = 0;
        if let Some(field) = self.current_field() {
            let current = self.session.text(&field.id).to_string();
            if let Some(i) = field.options().iter().position(|o| *o == current) {
                self.choice_cursor = i;
            }
        }
    }

    fn submit(&mut self) -> Vec<Effect> {
        match self.session.begin_submit() {
            SubmitGate::Ready(responses) => match &self.form_id {
                Some(form_id) => vec![Effect::SubmitResponse {
                    form_id: form_id.clone(),
                    responses,
                }],
                None => Vec::new(),
            },
            SubmitGate::Invalid => {
                let first = self
                    .session
                    .schema()
                    .fields()
                    .iter()
                    .position(|f| self.session.error_for(&f.id).is_some());
                if let Some(i) = first {
                    self.cursor = i;
                }
                Vec::new()
            }
            SubmitGate::Busy | SubmitGate::Previewed => Vec::new(),
        }
    }

    fn on_overlay_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('s') if ctrl => {
                if let (Some(ta), Some(field)) = (self.overlay.take(), self.current_field()) {
                    self.session.set_text(&field.id, ta.lines().join("\n"));
                }
            }
            KeyCode::Esc => self.overlay = None,
            _ => {
                if let (Some(ta), Some(ev)) = (self.overlay.as_mut(), textarea_key(key)) {
                    ta.input(ev);
                }
            }
        }
    }

    fn on_field_key(&mut self, field: &FieldDefinition, key: KeyEvent) {
        let id = field.id.as_str();
        let options = field.options();
        match field.field_type {
            FieldType::Text | FieldType::Email | FieldType::Number => match key.code {
                KeyCode::Char(c) => {
                    if field.field_type == FieldType::Number && !number_char_ok(c) {
                        return;
                    }
                    let mut s = self.session.text(id).to_string();
                    s.push(c);
                    self.session.set_text(id, s);
                }
                KeyCode::Backspace => {
                    let mut s = self.session.text(id).to_string();
                    s.pop();
                    self.session.set_text(id, s);
                }
                _ => {}
            },
            FieldType::Textarea => {
                if key.code == KeyCode::Enter {
                    self.overlay = Some(seeded_textarea(
                        self.session.text(id),
                        format!(" {} (Ctrl+S save, Esc cancel) ", field.label),
                    ));
                }
            }
            FieldType::Select | FieldType::Radio => {
                let step = match key.code {
                    KeyCode::Left => Some(false),
                    KeyCode::Right | KeyCode::Char(' ') => Some(true),
                    _ => None,
                };
                if let Some(forward) = step {
                    if options.is_empty() {
                        return;
                    }
                    let unset = self.session.text(id).is_empty();
                    if !unset {
                        self.choice_cursor = if forward {
                            (self.choice_cursor + 1) % options.len()
                        } else {
                            (self.choice_cursor + options.len() - 1) % options.len()
                        };
                    }
                    if let Some(opt) = options.get(self.choice_cursor) {
                        self.session.choose(id, opt);
                    }
                }
            }
            FieldType::Checkbox => match key.code {
                KeyCode::Left => self.choice_cursor = self.choice_cursor.saturating_sub(1),
                KeyCode::Right => {
                    self.choice_cursor = (self.choice_cursor + 1).min(options.len().saturating_sub(1))
                }
                KeyCode::Char(' ') | KeyCode::Enter => {
                    if let Some(opt) = options.get(self.choice_cursor) {
                        self.session.toggle_option(id, opt);
                    }
                }
                _ => {}
            },
        }
    }

    fn field_lines(&self, field: &FieldDefinition, active: bool, cursor_on: bool) -> Vec<Line<'static>> {
        let mut label = vec![Span::styled(
            format!("{}{}", if active { "› " } else { "  " }, field.label),
            if active {
                crate::theme::text_active_bold()
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            },
        )];
        if field.required {
            label.push(Span::styled(" *", crate::theme::text_error()));
        }
        let mut lines = vec![Line::from(label)];
        let value = self.session.text(&field.id);
        match field.field_type {
            FieldType::Text | FieldType::Email | FieldType::Number | FieldType::Textarea => {
                let mut spans = vec![Span::raw("    ")];
                if value.is_empty() && !field.placeholder().is_empty() {
                    spans.push(Span::styled(field.placeholder().to_string(), crate::theme::text_muted()));
                } else if field.field_type == FieldType::Textarea {
                    let mut it = value.lines();
                    spans.push(Span::raw(it.next().unwrap_or("").to_string()));
                    if it.next().is_some() {
                        spans.push(Span::styled(" …", crate::theme::text_muted()));
                    }
                } else {
                    spans.push(Span::raw(value.to_string()));
                }
                if active && cursor_on && field.field_type != FieldType::Textarea {
                    spans.push(Span::styled("█", crate::theme::text_editing_bold()));
                }
                lines.push(Line::from(spans));
            }
            FieldType::Select => {
                let shown = if value.is_empty() { "Select an option" } else { value };
                let style = if value.is_empty() {
                    crate::theme::text_muted()
                } else {
                    Style::default()
                };
                lines.push(Line::from(vec![
                    Span::raw("    ‹ "),
                    Span::styled(shown.to_string(), style),
                    Span::raw(" ›"),
                ]));
            }
            FieldType::Radio | FieldType::Checkbox => {
                let mut spans = vec![Span::raw("    ")];
                for (i, opt) in field.options().iter().enumerate() {
                    let on = if field.field_type == FieldType::Radio {
                        value == opt
                    } else {
                        self.session.is_checked(&field.id, opt)
                    };
                    let mark = match (field.field_type, on) {
                        (FieldType::Radio, true) => "(•)",
                        (FieldType::Radio, false) => "( )",
                        (_, true) => "[x]",
                        (_, false) => "[ ]",
                    };
                    let style = if active && i == self.choice_cursor {
                        crate::theme::list_cursor_style()
                    } else {
                        Style::default()
                    };
                    spans.push(Span::styled(format!("{mark} {opt}"), style));
                    spans.push(Span::raw("  "));
                }
                lines.push(Line::from(spans));
            }
        }
        if let Some(err) = self.session.error_for(&field.id) {
            lines.push(error_line(err.message()));
        }
        lines.push(Line::raw(""));
        lines
    }

    fn draw_submitted(&self, f: &mut Frame, area: Rect) {
        let rect = centered_rect(60, 40, area);
        let p = Paragraph::new(vec![
            Line::from(Span::styled("✓", crate::theme::text_success())),
            Line::from(Span::styled(THANK_YOU, crate::theme::title_style())),
            Line::raw(RECORDED),
        ])
        .alignment(Alignment::Center)
        .block(panel_block(format!(" {} ", self.title), true));
        f.render_widget(Clear, rect);
        f.render_widget(p, rect);
    }
}

impl crate::widgets::Widget for FillWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64) {
        if self.session.phase() == SessionPhase::Submitted {
            self.draw_submitted(f, area);
            return;
        }
        let cursor_on = tick % 2 == 0;
        let mut lines: Vec<Line> = Vec::new();
        if self.session.is_preview() {
            lines.push(Line::from(Span::styled(
                "Preview mode: submissions are not sent",
                crate::theme::text_editing_bold(),
            )));
        }
        if !self.description.is_empty() {
            lines.push(Line::from(Span::styled(self.description.clone(), crate::theme::text_muted())));
        }
        if let Some(n) = self.session.notice() {
            let style = if self.session.is_preview() {
                crate::theme::text_success()
            } else {
                crate::theme::text_error()
            };
            lines.push(Line::from(Span::styled(format!("{n}  (Esc to dismiss)"), style)));
        }
        lines.push(Line::raw(""));

        let mut cursor_line = 0usize;
        for (i, field) in self.session.schema().fields().iter().enumerate() {
            if i == self.cursor {
                cursor_line = lines.len();
            }
            lines.extend(self.field_lines(field, focused && i == self.cursor, cursor_on));
        }
        let submit_active = self.cursor >= self.session.schema().len();
        if submit_active {
            cursor_line = lines.len();
        }
        let label = if self.session.phase() == SessionPhase::Submitting {
            "[ Submitting... ]"
        } else {
            "[ Submit ]"
        };
        lines.push(Line::from(Span::styled(
            format!("{}{label}", if submit_active { "› " } else { "  " }),
            if submit_active {
                crate::theme::text_active_bold()
            } else {
                Style::default()
            },
        )));

        let inner_height = area.height.saturating_sub(2) as usize;
        let scroll = (cursor_line + 4).saturating_sub(inner_height) as u16;
        let p = Paragraph::new(lines)
            .block(panel_block(format!(" {} ", self.title), focused))
            .scroll((scroll, 0));
        f.render_widget(p, area);

        if let Some(ta) = self.overlay.as_ref() {
            let rect = centered_rect(70, 50, area);
            f.render_widget(Clear, rect);
            f.render_widget(ta, rect);
        }
    }

    fn on_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        if self.overlay.is_some() {
            self.on_overlay_key(key);
            return Vec::new();
        }
        if self.session.phase() == SessionPhase::Submitted {
            return match key.code {
                KeyCode::Esc | KeyCode::Enter => vec![Effect::Back],
                _ => Vec::new(),
            };
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('s') if ctrl => return self.submit(),
            KeyCode::Esc => {
                if self.session.notice().is_some() {
                    self.session.dismiss_notice();
                    return Vec::new();
                }
                return vec![Effect::Back];
            }
            KeyCode::Up | KeyCode::BackTab => {
                self.move_cursor(false);
                return Vec::new();
            }
            KeyCode::Down | KeyCode::Tab => {
                self.move_cursor(true);
                return Vec::new();
            }
            _ => {}
        }
        match self.current_field() {
            Some(field) => self.on_field_key(&field, key),
            None => {
                if key.code == KeyCode::Enter {
                    return self.submit();
                }
            }
        }
        Vec::new()
    }

    fn help(&self) -> &'static str {
        if self.overlay.is_some() {
            return "Ctrl+S save text  Esc cancel";
        }
        if self.session.phase() == SessionPhase::Submitted {
            return "Esc back";
        }
        match self.current_field().map(|f| f.field_type) {
            Some(FieldType::Textarea) => "Enter edit text  ↑/↓ move  Ctrl+S submit  Esc back",
            Some(FieldType::Select | FieldType::Radio) => "←/→ choose  ↑/↓ move  Ctrl+S submit  Esc back",
            Some(FieldType::Checkbox) => "←/→ option  Space toggle  ↑/↓ move  Ctrl+S submit  Esc back",
            Some(FieldType::Text | FieldType::Email | FieldType::Number) => {
                "type to fill  ↑/↓ move  Ctrl+S submit  Esc back"
            }
            None => "Enter submit  ↑ move  Esc back",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::renderer::PREVIEW_SUBMITTED;
    use crate::schema::response::FieldError;
    use crate::schema::{FormSchema, ResponseValue};
    use crate::widgets::Widget;
    use chrono::Utc;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(w: &mut FillWidget, s: &str) {
        for c in s.chars() {
            w.on_key(key(KeyCode::Char(c)));
        }
    }

    fn form() -> Form {
        let fields = FormSchema::from_fields(vec![
            FieldDefinition::new("name", FieldType::Text).with_label("Name").required(true),
            FieldDefinition::new("mail", FieldType::Email).with_label("Email"),
            FieldDefinition::new("age", FieldType::Number).with_label("Age"),
            FieldDefinition::new("tags", FieldType::Checkbox)
                .with_label("Tags")
                .with_options(["A", "B", "C"]),
            FieldDefinition::new("size", FieldType::Radio)
                .with_label("Size")
                .with_options(["S", "M", "L"]),
            FieldDefinition::new("notes", FieldType::Textarea).with_label("Notes"),
        ])
        .unwrap();
        Form {
            id: "f1".into(),
            title: "Signup".into(),
            description: "Tell us".into(),
            fields,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            is_active: true,
        }
    }

    fn submit_key() -> KeyEvent {
        KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL)
    }

    #[test]
    fn invalid_submit_jumps_to_first_error() {
        let mut w = FillWidget::live(&form());
        w.on_key(key(KeyCode::Down));
        type_str(&mut w, "foo");
        assert!(w.on_key(submit_key()).is_empty());
        assert_eq!(w.session.error_for("name"), Some(FieldError::Required));
        assert_eq!(w.session.error_for("mail"), Some(FieldError::InvalidEmail));
        assert_eq!(w.cursor, 0);
        type_str(&mut w, "Ann");
        assert!(w.session.error_for("name").is_none());
    }

    #[test]
    fn valid_submit_emits_payload_then_thanks() {
        let mut w = FillWidget::live(&form());
        type_str(&mut w, "Ann");
        w.on_key(key(KeyCode::Down));
        w.on_key(key(KeyCode::Down));
        type_str(&mut w, "4x2");
        assert_eq!(w.session.text("age"), "42");
        w.on_key(key(KeyCode::Down));
        w.on_key(key(KeyCode::Char(' ')));
        w.on_key(key(KeyCode::Right));
        w.on_key(key(KeyCode::Right));
        w.on_key(key(KeyCode::Char(' ')));
        w.on_key(key(KeyCode::Left));
        w.on_key(key(KeyCode::Left));
        w.on_key(key(KeyCode::Char(' ')));
        assert_eq!(
            w.session.value("tags"),
            Some(&ResponseValue::Choices(vec!["C".into()]))
        );
        w.on_key(key(KeyCode::Down));
        w.on_key(key(KeyCode::Right));
        w.on_key(key(KeyCode::Right));
        assert_eq!(w.session.text("size"), "M");

        match w.on_key(submit_key()).as_slice() {
            [Effect::SubmitResponse { form_id, responses }] => {
                assert_eq!(form_id, "f1");
                assert_eq!(responses.len(), 4);
            }
            _ => panic!("expected submit"),
        }
        assert_eq!(w.session.phase(), SessionPhase::Submitting);
        type_str(&mut w, "ignored");
        assert_eq!(w.finish_submit(Ok(())), SubmitStatus::Submitted);

        let backend = TestBackend::new(80, 20);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| w.render(f, f.area(), true, 0)).unwrap();
        let text: String = terminal.backend().buffer().content.iter().map(|c| c.symbol()).collect();
        assert!(text.contains(THANK_YOU));
    }

    #[test]
    fn textarea_overlay_commits_on_ctrl_s() {
        let mut w = FillWidget::live(&form());
        for _ in 0..5 {
            w.on_key(key(KeyCode::Down));
        }
        w.on_key(key(KeyCode::Enter));
        type_str(&mut w, "hi");
        w.on_key(key(KeyCode::Enter));
        type_str(&mut w, "there");
        assert_eq!(w.session.text("notes"), "");
        w.on_key(submit_key());
        assert_eq!(w.session.text("notes"), "hi\nthere");

        w.on_key(key(KeyCode::Enter));
        type_str(&mut w, "!");
        w.on_key(key(KeyCode::Esc));
        assert_eq!(w.session.text("notes"), "hi\nthere");
    }

    #[test]
    fn preview_never_emits_submit() {
        let f = form();
        let mut w = FillWidget::preview(FormPreview {
            title: f.title.clone(),
            description: String::new(),
            fields: f.fields.clone(),
        });
        type_str(&mut w, "Ann");
        assert!(w.on_key(submit_key()).is_empty());
        assert_eq!(w.session.notice(), Some(PREVIEW_SUBMITTED));
        assert!(w.on_key(key(KeyCode::Esc)).is_empty());
        assert!(w.session.notice().is_none());
        assert!(matches!(w.on_key(key(KeyCode::Esc)).as_slice(), [Effect::Back]));
    }

    #[test]
    fn failed_submit_shows_notice_and_stays_editable() {
        let mut w = FillWidget::live(&form());
        type_str(&mut w, "Ann");
        assert_eq!(w.on_key(submit_key()).len(), 1);
        assert_eq!(w.finish_submit(Err("boom".into())), SubmitStatus::Failed);
        assert_eq!(w.session.phase(), SessionPhase::Editable);

        let backend = TestBackend::new(100, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| w.render(f, f.area(), true, 0)).unwrap();
        let text: String = terminal.backend().buffer().content.iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Failed to submit form"));
        assert!(text.contains("Ann"));
    }
}
