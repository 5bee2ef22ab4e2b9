use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::*;

use crate::app::Effect;
use crate::widgets::chrome::{centered_rect, error_line, input_line, panel_block};

pub const LOGIN_FAILED: &str = "Invalid ID or password. Please try again.";

#[derive(Default)]
pub struct LoginWidget {
    pub id: String,
    pub password: String,
    // 0 = id, 1 = password
    focus: usize,
    error: Option<String>,
}

impl LoginWidget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows the failure and clears the password for another attempt.
    pub fn reject(&mut self) {
        self.error = Some(LOGIN_FAILED.to_string());
        self.password.clear();
        self.focus = 1;
    }

    #[cfg(test)]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn current(&mut self) -> &mut String {
        if self.focus == 0 {
            &mut self.id
        } else {
            &mut self.password
        }
    }
}

impl crate::widgets::Widget for LoginWidget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64) {
        let rect = centered_rect(50, 50, area);
        let cursor_on = tick % 2 == 0;
        let masked: String = "*".repeat(self.password.chars().count());
        let mut lines = vec![
            Line::from(Span::styled("Admin Login", crate::theme::title_style())),
            Line::from(Span::styled(
                "Enter your credentials to access the form builder",
                crate::theme::text_muted(),
            )),
            Line::raw(""),
            input_line("ID", &self.id, self.focus == 0, focused && self.focus == 0, cursor_on),
            input_line(
                "Password",
                &masked,
                self.focus == 1,
                focused && self.focus == 1,
                cursor_on,
            ),
        ];
        if let Some(e) = &self.error {
            lines.push(Line::raw(""));
            lines.push(error_line(e));
        }
        f.render_widget(Clear, rect);
        f.render_widget(
            Paragraph::new(lines).block(panel_block(" Login ", focused)),
            rect,
        );
    }

    fn on_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        match key.code {
            KeyCode::Tab | KeyCode::Down | KeyCode::BackTab | KeyCode::Up => {
                self.focus = 1 - self.focus;
            }
            KeyCode::Enter => {
                if self.focus == 0 {
                    self.focus = 1;
                } else {
                    return vec![Effect::Login {
                        id: self.id.clone(),
                        password: self.password.clone(),
                    }];
                }
            }
            KeyCode::Backspace => {
                self.current().pop();
            }
            KeyCode::Char(c) => {
                self.error = None;
                self.current().push(c);
            }
            KeyCode::Esc => return vec![Effect::Quit],
            _ => {}
        }
        Vec::new()
    }

    fn help(&self) -> &'static str {
        "Tab switch field  Enter sign in  Esc quit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widgets::Widget;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(w: &mut LoginWidget, s: &str) {
        for c in s.chars() {
            w.on_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn enter_on_password_emits_login() {
        let mut w = LoginWidget::new();
        type_str(&mut w, "admin");
        assert!(w.on_key(key(KeyCode::Enter)).is_empty());
        type_str(&mut w, "1234");
        match w.on_key(key(KeyCode::Enter)).as_slice() {
            [Effect::Login { id, password }] => {
                assert_eq!(id, "admin");
                assert_eq!(password, "1234");
            }
            _ => panic!("expected login effect"),
        }
    }

    #[test]
    fn reject_clears_password_and_shows_message() {
        let mut w = LoginWidget::new();
        type_str(&mut w, "x");
        w.on_key(key(KeyCode::Tab));
        type_str(&mut w, "bad");
        w.reject();
        assert!(w.password.is_empty());
        assert_eq!(w.id, "x");
        assert_eq!(w.error(), Some(LOGIN_FAILED));
        type_str(&mut w, "1");
        assert!(w.error().is_none());
    }
}
