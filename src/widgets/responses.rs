use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::*;
use std::path::PathBuf;

use crate::app::Effect;
use crate::schema::export::{export_csv, export_path};
use crate::schema::{Form, FormResponse};
use crate::ui::ToastLevel;
use crate::widgets::chrome::panel_block;
use crate::widgets::dashboard::LINK_COPIED;

pub const NOTHING_TO_EXPORT: &str = "No responses to export";

/// Submitted responses of one form with export and delete.
pub struct ResponsesWidget {
    pub form_id: String,
    pub form: Option<Form>,
    pub responses: Vec<FormResponse>,
    pub selected: usize,
    loading: bool,
    error: Option<String>,
    confirm_delete: Option<String>,
    export_dir: PathBuf,
    link: String,
}

impl ResponsesWidget {
    pub fn new(form_id: impl Into<String>, export_dir: PathBuf, link: String) -> Self {
        Self {
            form_id: form_id.into(),
            form: None,
            responses: Vec::new(),
            selected: 0,
            loading: true,
            error: None,
            confirm_delete: None,
            export_dir,
            link,
        }
    }

    pub fn set_data(&mut self, form: Form, responses: Vec<FormResponse>) {
        self.form = Some(form);
        self.responses = responses;
        self.loading = false;
        self.error = None;
        self.selected = self.selected.min(self.responses.len().saturating_sub(1));
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.loading = false;
        self.error = Some(msg.into());
    }

    #[cfg(test)]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn remove_response(&mut self, id: &str) {
        self.responses.retain(|r| r.id != id);
        self.selected = self.selected.min(self.responses.len().saturating_sub(1));
    }

    fn export(&self) -> Vec<Effect> {
        let Some(form) = &self.form else {
            return Vec::new();
        };
        if self.responses.is_empty() {
            return vec![Effect::ShowToast {
                text: NOTHING_TO_EXPORT.to_string(),
                level: ToastLevel::Info,
                seconds: 2,
            }];
        }
        vec![Effect::ExportCsv {
            path: export_path(&self.export_dir, &form.title),
            contents: export_csv(form, &self.responses),
        }]
    }
}

impl crate::widgets::Widget for ResponsesWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, _tick: u64) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(0)])
            .split(area);

        let title = self
            .form
            .as_ref()
            .map(|fm| fm.title.clone())
            .unwrap_or_else(|| self.form_id.clone());
        let banner = if self.confirm_delete.is_some() {
            Line::from(Span::styled(
                " Are you sure you want to delete this response? (y/n)",
                crate::theme::text_editing_bold(),
            ))
        } else if let Some(e) = &self.error {
            Line::from(Span::styled(format!(" {e}"), crate::theme::text_error()))
        } else {
            Line::from(vec![
                Span::styled(format!(" {title}"), crate::theme::text_active_bold()),
                Span::styled(
                    format!("  {} response(s)", self.responses.len()),
                    crate::theme::text_muted(),
                ),
            ])
        };
        f.render_widget(Paragraph::new(banner), chunks[0]);

        let block = panel_block(" Responses ", focused);
        let Some(form) = self.form.as_ref().filter(|_| !self.loading) else {
            let text = if self.loading {
                "Loading responses..."
            } else {
                ""
            };
            f.render_widget(Paragraph::new(text).block(block), chunks[1]);
            return;
        };
        if self.responses.is_empty() {
            let p = Paragraph::new(vec![
                Line::from(Span::styled("No responses yet", crate::theme::text_active_bold())),
                Line::raw("Share your form to start collecting responses!"),
                Line::from(Span::styled(self.link.clone(), crate::theme::text_muted())),
            ])
            .block(block);
            f.render_widget(p, chunks[1]);
            return;
        }

        let mut head = vec![Cell::from("Submitted")];
        head.extend(form.fields.fields().iter().map(|fd| Cell::from(fd.label.clone())));
        let header = Row::new(head).style(crate::theme::text_active_bold());
        let rows: Vec<Row> = self
            .responses
            .iter()
            .map(|r| {
                let mut cells = vec![Cell::from(
                    r.submitted_at
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M")
                        .to_string(),
                )];
                cells.extend(form.fields.fields().iter().map(|fd| {
                    let shown = r
                        .responses
                        .get(&fd.id)
                        .map(|v| v.display_joined())
                        .filter(|s| !s.is_empty())
                        .unwrap_or_else(|| "-".to_string());
                    Cell::from(shown)
                }));
                Row::new(cells)
            })
            .collect();
        let mut widths = vec![Constraint::Length(17)];
        widths.extend(form.fields.fields().iter().map(|_| Constraint::Min(8)));
        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(crate::theme::list_cursor_style());
        let mut ts = TableState::default();
        ts.select(Some(self.selected));
        f.render_stateful_widget(table, chunks[1], &mut ts);
    }

    fn on_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        if let Some(id) = self.confirm_delete.take() {
            return match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => vec![Effect::DeleteResponse { id }],
                _ => Vec::new(),
            };
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.responses.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('x') => return self.export(),
            KeyCode::Char('d') | KeyCode::Delete => {
                self.confirm_delete = self.responses.get(self.selected).map(|r| r.id.clone());
            }
            KeyCode::Char('c') => {
                return vec![Effect::CopyToClipboard {
                    text: self.link.clone(),
                    success: LINK_COPIED.to_string(),
                }]
            }
            KeyCode::Char('g') => {
                self.loading = true;
                return vec![Effect::LoadResponses {
                    form_id: self.form_id.clone(),
                }];
            }
            KeyCode::Esc => {
                if self.error.take().is_none() {
                    return vec![Effect::Back];
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn help(&self) -> &'static str {
        if self.confirm_delete.is_some() {
            "y confirm delete  any other key cancel"
        } else {
            "↑/↓ select  x export CSV  d delete  c copy link  g refresh  Esc back"
        }
    }
}
