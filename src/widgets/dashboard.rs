use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::app::{Effect, Route};
use crate::schema::Form;
use crate::ui::ToastLevel;
use crate::widgets::chrome::panel_block;

pub const LINK_COPIED: &str = "Form link copied to clipboard!";

/// Form list with per-form actions.
pub struct DashboardWidget {
    pub forms: Vec<Form>,
    pub selected: usize,
    pub loading: bool,
    error: Option<String>,
    // id awaiting delete confirmation
    confirm_delete: Option<String>,
    public_base_url: String,
}

impl DashboardWidget {
    pub fn new(public_base_url: impl Into<String>) -> Self {
        Self {
            forms: Vec::new(),
            selected: 0,
            loading: true,
            error: None,
            confirm_delete: None,
            public_base_url: public_base_url.into(),
        }
    }

    pub fn set_forms(&mut self, forms: Vec<Form>) {
        self.forms = forms;
        self.loading = false;
        self.error = None;
        self.selected = self.selected.min(self.forms.len().saturating_sub(1));
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.loading = false;
        self.error = Some(msg.into());
    }

    #[cfg(test)]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn remove_form(&mut self, id: &str) {
        self.forms.retain(|f| f.id != id);
        self.selected = self.selected.min(self.forms.len().saturating_sub(1));
    }

    pub fn selected_form(&self) -> Option<&Form> {
        self.forms.get(self.selected)
    }

    fn link(&self, id: &str) -> String {
        crate::model::form_link(&self.public_base_url, id)
    }

    fn on_confirm_key(&mut self, code: KeyCode) -> Vec<Effect> {
        let Some(id) = self.confirm_delete.take() else {
            return Vec::new();
        };
        match code {
            KeyCode::Char('y') | KeyCode::Char('Y') => vec![Effect::DeleteForm { id }],
            _ => Vec::new(),
        }
    }
}

impl crate::widgets::Widget for DashboardWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, _tick: u64) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(0)])
            .split(area);

        let banner = if let Some(id) = &self.confirm_delete {
            let title = self
                .forms
                .iter()
                .find(|f| &f.id == id)
                .map(|f| f.title.as_str())
                .unwrap_or("");
            Line::from(Span::styled(
                format!(" Are you sure you want to delete \"{title}\"? (y/n)"),
                crate::theme::text_editing_bold(),
            ))
        } else if let Some(e) = &self.error {
            Line::from(Span::styled(format!(" {e}  (Esc to dismiss)"), crate::theme::text_error()))
        } else {
            Line::from(Span::styled(
                format!(" {} form(s)", self.forms.len()),
                crate::theme::text_muted(),
            ))
        };
        f.render_widget(Paragraph::new(banner), chunks[0]);

        let block = panel_block(" Forms ", focused);
        if self.loading {
            f.render_widget(Paragraph::new("Loading forms...").block(block), chunks[1]);
            return;
        }
        if self.forms.is_empty() {
            let p = Paragraph::new(vec![
                Line::from(Span::styled("No forms created yet", crate::theme::text_active_bold())),
                Line::raw("Create your first form to get started (press n)"),
            ])
            .block(block);
            f.render_widget(p, chunks[1]);
            return;
        }

        let header = Row::new(["Title", "Description", "Fields", "Created", "Status"])
            .style(crate::theme::text_active_bold());
        let rows: Vec<Row> = self
            .forms
            .iter()
            .map(|form| {
                let description = if form.description.is_empty() {
                    "No description provided".to_string()
                } else {
                    form.description.clone()
                };
                let status = if form.is_active {
                    Span::styled("Active", crate::theme::text_success())
                } else {
                    Span::styled("Inactive", crate::theme::text_muted())
                };
                Row::new(vec![
                    Cell::from(form.title.clone()),
                    Cell::from(description),
                    Cell::from(form.fields.len().to_string()),
                    Cell::from(form.created_at.format("%Y-%m-%d").to_string()),
                    Cell::from(status),
                ])
            })
            .collect();
        let widths = [
            Constraint::Percentage(30),
            Constraint::Percentage(35),
            Constraint::Length(7),
            Constraint::Length(11),
            Constraint::Length(9),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(crate::theme::list_cursor_style());
        let mut ts = TableState::default();
        ts.select(Some(self.selected));
        f.render_stateful_widget(table, chunks[1], &mut ts);
    }

    fn on_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        if self.confirm_delete.is_some() {
            return self.on_confirm_key(key.code);
        }
        let selected_id = self.selected_form().map(|f| f.id.clone());
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.selected + 1 < self.forms.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('n') => return vec![Effect::Navigate(Route::NewForm)],
            KeyCode::Char('g') => {
                self.loading = true;
                return vec![Effect::LoadForms];
            }
            KeyCode::Char('l') => return vec![Effect::Logout],
            KeyCode::Char('q') => return vec![Effect::Quit],
            KeyCode::Esc => self.error = None,
            KeyCode::Enter | KeyCode::Char('v') => {
                if let Some(id) = selected_id {
                    return vec![Effect::Navigate(Route::Fill(id))];
                }
            }
            KeyCode::Char('e') => {
                if let Some(id) = selected_id {
                    return vec![Effect::Navigate(Route::EditForm(id))];
                }
            }
            KeyCode::Char('r') => {
                if let Some(id) = selected_id {
                    return vec![Effect::Navigate(Route::Responses(id))];
                }
            }
            KeyCode::Char('c') => {
                if let Some(id) = selected_id {
                    return vec![Effect::CopyToClipboard {
                        text: self.link(&id),
                        success: LINK_COPIED.to_string(),
                    }];
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if selected_id.is_some() {
                    self.confirm_delete = selected_id;
                } else {
                    return vec![Effect::ShowToast {
                        text: "No form selected".into(),
                        level: ToastLevel::Info,
                        seconds: 2,
                    }];
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
            "↑/↓ select  Enter view  n new  e edit  r responses  c copy link  d delete  g refresh  l logout  q quit"
        }
    }
}
