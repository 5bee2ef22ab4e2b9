use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::*;
use tui_textarea::TextArea;

use crate::app::Effect;
use crate::app::Route;
use crate::schema::{FieldDefinition, FieldType, FieldUpdate, FormDraft};
use crate::ui::ToastLevel;
use crate::widgets::chrome::{input_line, panel_block, seeded_textarea, textarea_key};

pub const REORDER_PENDING: &str = "Reordering is not available yet";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Area {
    Title,
    Description,
    Palette,
    Canvas,
    Properties,
}

impl Area {
    const ORDER: [Area; 5] = [
        Area::Title,
        Area::Description,
        Area::Palette,
        Area::Canvas,
        Area::Properties,
    ];

    fn step(self, forward: bool) -> Area {
        let i = Self::ORDER.iter().position(|a| *a == self).unwrap_or(0);
        let n = Self::ORDER.len();
        let j = if forward { (i + 1) % n } else { (i + n - 1) % n };
        Self::ORDER[j]
    }
}

/// A field picked up on the canvas, waiting to be dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Grab {
    source: usize,
    target: usize,
}

/// One row of the properties panel for the selected field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PropRow {
    Label,
    Placeholder,
    Required,
    Option(usize),
    AddOption,
}

fn prop_rows(field: &FieldDefinition) -> Vec<PropRow> {
    let mut rows = vec![PropRow::Label];
    if field.field_type.is_choice() {
        rows.push(PropRow::Required);
        rows.extend((0..field.options().len()).map(PropRow::Option));
        rows.push(PropRow::AddOption);
    } else {
        rows.push(PropRow::Placeholder);
        rows.push(PropRow::Required);
    }
    rows
}

pub struct BuilderWidget {
    pub draft: FormDraft,
    /// Set when editing a stored form.
    pub form_id: Option<String>,
    pub session: u64,
    pub saving: bool,
    reorder_enabled: bool,
    focus: Area,
    description: TextArea<'static>,
    palette_cursor: usize,
    canvas_cursor: usize,
    grab: Option<Grab>,
    prop_cursor: usize,
    // text being typed into a property row
    prop_edit: Option<String>,
    error: Option<String>,
}

impl BuilderWidget {
    pub fn new(draft: FormDraft, form_id: Option<String>, session: u64) -> Self {
        let description = seeded_textarea(&draft.description, " Description ".to_string());
        Self {
            draft,
            form_id,
            session,
            saving: false,
            reorder_enabled: false,
            focus: Area::Title,
            description,
            palette_cursor: 0,
            canvas_cursor: 0,
            grab: None,
            prop_cursor: 0,
            prop_edit: None,
            error: None,
        }
    }

    pub fn enable_reorder(&mut self) {
        self.reorder_enabled = true;
    }

    #[cfg(test)]
    pub fn reorder_enabled(&self) -> bool {
        self.reorder_enabled
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.saving = false;
        self.error = Some(msg.into());
    }

    #[cfg(test)]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[cfg(test)]
    pub fn focus(&self) -> Area {
        self.focus
    }

    fn is_editing(&self) -> bool {
        self.prop_edit.is_some()
    }

    fn save(&mut self) -> Vec<Effect> {
        if self.saving {
            return Vec::new();
        }
        match self.draft.to_request() {
            Ok(request) => {
                self.saving = true;
                self.error = None;
                vec![Effect::SaveForm {
                    id: self.form_id.clone(),
                    request,
                    session: self.session,
                }]
            }
            Err(e) => {
                self.error = Some(e.to_string());
                vec![Effect::ShowToast {
                    text: e.to_string(),
                    level: ToastLevel::Error,
                    seconds: 3,
                }]
            }
        }
    }

    fn preview(&mut self) -> Vec<Effect> {
        match self.draft.preview() {
            Ok(p) => vec![Effect::Navigate(Route::Preview(p))],
            Err(e) => vec![Effect::ShowToast {
                text: e.to_string(),
                level: ToastLevel::Info,
                seconds: 3,
            }],
        }
    }

    fn field_at(&self, idx: usize) -> Option<&FieldDefinition> {
        self.draft.builder.schema().fields().get(idx)
    }

    fn on_title_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.focus = Area::Description,
            KeyCode::Backspace => {
                self.draft.title.pop();
            }
            KeyCode::Char(c) => self.draft.title.push(c),
            _ => {}
        }
    }

    fn on_description_key(&mut self, key: KeyEvent) {
        if let Some(ev) = textarea_key(key) {
            self.description.input(ev);
            self.draft.description = self.description.lines().join("\n");
        }
    }

    fn on_palette_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up => self.palette_cursor = self.palette_cursor.saturating_sub(1),
            KeyCode::Down => {
                self.palette_cursor = (self.palette_cursor + 1).min(FieldType::ALL.len() - 1)
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                let ty = FieldType::ALL[self.palette_cursor];
                let schema = self.draft.builder.add_field(ty);
                self.canvas_cursor = schema.len().saturating_sub(1);
            }
            _ => {}
        }
    }

    fn on_canvas_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        let len = self.draft.builder.schema().len();
        if let Some(grab) = self.grab.as_mut() {
            match key.code {
                KeyCode::Up => grab.target = grab.target.saturating_sub(1),
                KeyCode::Down => grab.target = (grab.target + 1).min(len.saturating_sub(1)),
                KeyCode::Enter | KeyCode::Char(' ') => {
                    let Grab { source, target } = *grab;
                    self.grab = None;
                    if self.draft.builder.reorder_fields(source, Some(target)) {
                        self.canvas_cursor = target;
                    }
                }
                KeyCode::Esc => {
                    let source = grab.source;
                    self.grab = None;
                    self.draft.builder.reorder_fields(source, None);
                }
                _ => {}
            }
            return Vec::new();
        }
        match key.code {
            KeyCode::Up => self.canvas_cursor = self.canvas_cursor.saturating_sub(1),
            KeyCode::Down => {
                self.canvas_cursor = (self.canvas_cursor + 1).min(len.saturating_sub(1))
            }
            KeyCode::Enter => {
                if let Some(id) = self.field_at(self.canvas_cursor).map(|f| f.id.clone()) {
                    self.draft.builder.select(&id);
                    self.prop_cursor = 0;
                    self.focus = Area::Properties;
                }
            }
            KeyCode::Char(' ') => {
                if len == 0 {
                    return Vec::new();
                }
                if !self.reorder_enabled {
                    return vec![Effect::ShowToast {
                        text: REORDER_PENDING.to_string(),
                        level: ToastLevel::Info,
                        seconds: 1,
                    }];
                }
                let source = self.canvas_cursor.min(len - 1);
                self.grab = Some(Grab {
                    source,
                    target: source,
                });
            }
            KeyCode::Char('x') | KeyCode::Delete => {
                if let Some(id) = self.field_at(self.canvas_cursor).map(|f| f.id.clone()) {
                    self.draft.builder.remove_field(&id);
                    let len = self.draft.builder.schema().len();
                    self.canvas_cursor = self.canvas_cursor.min(len.saturating_sub(1));
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn on_properties_key(&mut self, key: KeyEvent) {
        let Some(field) = self.draft.builder.selected_field().cloned() else {
            return;
        };
        let id = field.id.clone();
        let rows = prop_rows(&field);
        let row = rows
            .get(self.prop_cursor.min(rows.len() - 1))
            .copied()
            .unwrap_or(PropRow::Label);
        let builder = &mut self.draft.builder;

        if let Some(buf) = self.prop_edit.as_mut() {
            match key.code {
                KeyCode::Enter => {
                    let value = std::mem::take(buf);
                    self.prop_edit = None;
                    match row {
                        PropRow::Label => {
                            builder.update_field(&id, FieldUpdate::label(value));
                        }
                        PropRow::Placeholder => {
                            builder.update_field(&id, FieldUpdate::placeholder(value));
                        }
                        PropRow::Option(i) => {
                            builder.update_option(&id, i, value);
                        }
                        PropRow::Required | PropRow::AddOption => {}
                    }
                }
                KeyCode::Esc => self.prop_edit = None,
                KeyCode::Backspace => {
                    buf.pop();
                }
                KeyCode::Char(c) => buf.push(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Up => self.prop_cursor = self.prop_cursor.saturating_sub(1),
            KeyCode::Down => self.prop_cursor = (self.prop_cursor + 1).min(rows.len() - 1),
            KeyCode::Enter | KeyCode::Char(' ') => match row {
                PropRow::Label => self.prop_edit = Some(field.label.clone()),
                PropRow::Placeholder => self.prop_edit = Some(field.placeholder().to_string()),
                PropRow::Option(i) => {
                    self.prop_edit = field.options().get(i).cloned();
                }
                PropRow::Required => {
                    let required = !field.required;
                    builder.update_field(&id, FieldUpdate::required(required));
                }
                PropRow::AddOption => {
                    builder.add_option(&id);
                }
            },
            KeyCode::Char('x') | KeyCode::Delete => {
                if let PropRow::Option(i) = row {
                    if builder.remove_option(&id, i) {
                        // stay on an option row: same index, or the new last one
                        let first = rows
                            .iter()
                            .position(|r| matches!(r, PropRow::Option(_)))
                            .unwrap_or(0);
                        let last = first + field.options().len().saturating_sub(2);
                        self.prop_cursor = self.prop_cursor.clamp(first, last);
                    }
                }
            }
            _ => {}
        }
    }

    /// Field order as it will look after the pending drop.
    fn canvas_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.draft.builder.schema().len()).collect();
        if let Some(Grab { source, target }) = self.grab {
            if source < order.len() && target < order.len() {
                let moved = order.remove(source);
                order.insert(target, moved);
            }
        }
        order
    }

    fn draw_canvas(&self, f: &mut Frame, area: Rect) {
        let focused = self.focus == Area::Canvas;
        let title = if self.grab.is_some() {
            " Fields (moving: ↑/↓ place, Enter drop, Esc cancel) "
        } else {
            " Fields "
        };
        let block = panel_block(title, focused);
        let fields = self.draft.builder.schema().fields();
        if fields.is_empty() {
            let p = Paragraph::new(vec![
                Line::raw("No fields yet."),
                Line::from(Span::styled(
                    "Pick a field type from the palette to add one",
                    crate::theme::text_muted(),
                )),
            ])
            .block(block);
            f.render_widget(p, area);
            return;
        }
        let selected = self.draft.builder.selected_id();
        let items: Vec<ListItem> = self
            .canvas_order()
            .into_iter()
            .enumerate()
            .filter_map(|(pos, idx)| fields.get(idx).map(|fd| (pos, idx, fd)))
            .map(|(pos, idx, fd)| {
                let moving = self.grab.map(|g| g.source == idx).unwrap_or(false);
                let marker = if moving {
                    "≡ "
                } else if selected == Some(fd.id.as_str()) {
                    "• "
                } else {
                    "  "
                };
                let mut spans = vec![
                    Span::raw(format!("{marker}{}. ", pos + 1)),
                    Span::styled(
                        format!("[{}] ", fd.field_type.label()),
                        crate::theme::text_muted(),
                    ),
                    Span::raw(fd.label.clone()),
                ];
                if fd.required {
                    spans.push(Span::styled(" *", crate::theme::text_error()));
                }
                let style = if moving {
                    crate::theme::text_editing_bold()
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(spans)).style(style)
            })
            .collect();
        let cursor = self.grab.map(|g| g.target).unwrap_or(self.canvas_cursor);
        let list = List::new(items)
            .block(block)
            .highlight_style(crate::theme::list_cursor_style());
        let mut ls = ListState::default();
        ls.select(Some(cursor));
        f.render_stateful_widget(list, area, &mut ls);
    }

    fn draw_properties(&self, f: &mut Frame, area: Rect, tick: u64) {
        let focused = self.focus == Area::Properties;
        let block = panel_block(" Properties ", focused);
        let Some(field) = self.draft.builder.selected_field() else {
            let p = Paragraph::new(Line::from(Span::styled(
                "Select a field (Enter on the canvas) to edit its properties",
                crate::theme::text_muted(),
            )))
            .wrap(Wrap { trim: true })
            .block(block);
            f.render_widget(p, area);
            return;
        };
        let cursor_on = tick % 2 == 0;
        let rows = prop_rows(field);
        let mut lines = vec![Line::from(Span::styled(
            format!("{} ({})", field.field_type.label(), field.id),
            crate::theme::text_muted(),
        ))];
        for (i, row) in rows.iter().enumerate() {
            let active = focused && i == self.prop_cursor;
            let editing = active && self.is_editing();
            let shown = |current: &str| -> String {
                match (&self.prop_edit, editing) {
                    (Some(buf), true) => buf.clone(),
                    _ => current.to_string(),
                }
            };
            let line = match row {
                PropRow::Label => input_line("Label", &shown(&field.label), active, editing, cursor_on),
                PropRow::Placeholder => input_line(
                    "Placeholder",
                    &shown(field.placeholder()),
                    active,
                    editing,
                    cursor_on,
                ),
                PropRow::Required => {
                    let mark = if field.required { "[x]" } else { "[ ]" };
                    input_line("Required", mark, active, false, false)
                }
                PropRow::Option(o) => {
                    let current = field.options().get(*o).map(String::as_str).unwrap_or("");
                    input_line(
                        &format!("Option {}", o + 1),
                        &shown(current),
                        active,
                        editing,
                        cursor_on,
                    )
                }
                PropRow::AddOption => {
                    let style = if active {
                        crate::theme::text_active_bold()
                    } else {
                        crate::theme::text_muted()
                    };
                    Line::from(Span::styled(
                        format!("{}+ Add option", if active { "› " } else { "  " }),
                        style,
                    ))
                }
            };
            lines.push(line);
        }
        f.render_widget(Paragraph::new(lines).block(block), area);
    }
}

impl crate::widgets::Widget for BuilderWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(5),
                Constraint::Min(6),
            ])
            .split(area);

        let banner = if let Some(e) = &self.error {
            Line::from(Span::styled(format!(" {e}"), crate::theme::text_error()))
        } else if self.saving {
            Line::from(Span::styled(" Saving...", crate::theme::text_muted()))
        } else {
            let heading = if self.form_id.is_some() {
                " Edit form"
            } else {
                " New form"
            };
            Line::from(Span::styled(heading, crate::theme::text_active_bold()))
        };
        f.render_widget(Paragraph::new(banner), rows[0]);

        let title_focus = focused && self.focus == Area::Title;
        let title = input_line("Form Title", &self.draft.title, title_focus, title_focus, tick % 2 == 0);
        f.render_widget(
            Paragraph::new(title).block(panel_block(" Title ", title_focus)),
            rows[1],
        );

        let desc_focus = focused && self.focus == Area::Description;
        self.description
            .set_block(panel_block(" Description (optional) ", desc_focus));
        f.render_widget(&self.description, rows[2]);

        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(20),
                Constraint::Percentage(50),
                Constraint::Min(20),
            ])
            .split(rows[3]);

        let items: Vec<ListItem> = FieldType::ALL
            .iter()
            .map(|t| ListItem::new(t.label()))
            .collect();
        let palette_focus = focused && self.focus == Area::Palette;
        let palette = List::new(items)
            .block(panel_block(" Add field ", palette_focus))
            .highlight_style(crate::theme::list_cursor_style());
        let mut ps = ListState::default();
        if palette_focus {
            ps.select(Some(self.palette_cursor));
        }
        f.render_stateful_widget(palette, cols[0], &mut ps);

        self.draw_canvas(f, cols[1]);
        self.draw_properties(f, cols[2], tick);
    }

    fn on_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('s') if ctrl => return self.save(),
            KeyCode::Char('p') if ctrl => return self.preview(),
            _ => {}
        }
        if !self.is_editing() && self.grab.is_none() {
            match key.code {
                KeyCode::Tab => {
                    self.focus = self.focus.step(true);
                    return Vec::new();
                }
                KeyCode::BackTab => {
                    self.focus = self.focus.step(false);
                    return Vec::new();
                }
                KeyCode::Esc => {
                    if self.error.take().is_some() {
                        return Vec::new();
                    }
                    return vec![Effect::Back];
                }
                _ => {}
            }
        }
        match self.focus {
            Area::Title => self.on_title_key(key),
            Area::Description => self.on_description_key(key),
            Area::Palette => self.on_palette_key(key),
            Area::Canvas => return self.on_canvas_key(key),
            Area::Properties => self.on_properties_key(key),
        }
        Vec::new()
    }

    fn help(&self) -> &'static str {
        if self.is_editing() {
            return "type to edit  Enter apply  Esc cancel";
        }
        if self.grab.is_some() {
            return "↑/↓ choose position  Enter drop  Esc cancel";
        }
        match self.focus {
            Area::Title | Area::Description => "Tab next area  Ctrl+S save  Ctrl+P preview  Esc back",
            Area::Palette => "↑/↓ type  Enter add  Tab next  Ctrl+S save  Ctrl+P preview",
            Area::Canvas => "Enter edit  Space move  x remove  Tab next  Ctrl+S save  Ctrl+P preview",
            Area::Properties => "Enter edit/toggle  x remove option  Tab next  Ctrl+S save",
        }
    }
}
