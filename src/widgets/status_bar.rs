use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::*;

use crate::ui::{AppState, ToastLevel};

/// Spinner while store calls are in flight, then the toast, then key hints.
pub fn draw_footer(f: &mut Frame, area: Rect, state: &AppState, help_text: &str) {
    let mut spans: Vec<Span> = Vec::new();
    if !state.loading.is_empty() {
        let spinner = ["⠋", "⠙", "⠸", "⠴", "⠦", "⠇"][state.tick as usize % 6];
        spans.push(Span::raw(format!(" {spinner} working")));
        spans.push(Span::raw("  |  "));
    }
    if let Some(t) = &state.toast {
        let color = state.theme.toast_color(t.level);
        let tag = match t.level {
            ToastLevel::Success => "[OK]",
            ToastLevel::Error => "[ERROR]",
            ToastLevel::Info => "[INFO]",
        };
        spans.push(Span::styled(
            format!("{tag} "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(
            format!("{}  |  ", t.text),
            Style::default().fg(color),
        ));
    }
    spans.push(Span::styled(
        help_text.to_string(),
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// One-line header: app name, current screen, signed-in marker.
pub fn draw_header(f: &mut Frame, area: Rect, state: &AppState) {
    let mut spans = vec![
        Span::styled(" formdeck ", state.theme.title_style()),
        Span::raw(" "),
        Span::styled(state.screen.title(), state.theme.text_active_bold()),
    ];
    if state.authenticated {
        spans.push(Span::styled(
            format!("   signed in as {}", state.config.auth.admin_id),
            state.theme.text_muted(),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
