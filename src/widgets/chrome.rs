use ratatui::crossterm::event as rt_event;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders};
use tui_textarea::TextArea;

pub fn panel_block<'a>(title: impl Into<Line<'a>>, focused: bool) -> Block<'a> {
    let b = Block::default().borders(Borders::ALL).title(title);
    if focused {
        b.border_style(crate::theme::border_focused())
    } else {
        b.border_style(crate::theme::border_unfocused())
    }
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// `label: value` with a blinking block cursor while `editing`.
pub fn input_line<'a>(label: &str, value: &str, active: bool, editing: bool, cursor_on: bool) -> Line<'a> {
    let label_style = if editing {
        crate::theme::text_editing_bold()
    } else if active {
        crate::theme::text_active_bold()
    } else {
        Style::default()
    };
    let marker = if active { "› " } else { "  " };
    let mut spans = vec![
        Span::styled(format!("{marker}{label}: "), label_style),
        Span::raw(value.to_string()),
    ];
    if editing && cursor_on {
        spans.push(Span::styled("█", crate::theme::text_editing_bold()));
    }
    Line::from(spans)
}

pub fn error_line<'a>(msg: &str) -> Line<'a> {
    Line::from(Span::styled(format!("    {msg}"), crate::theme::text_error()))
}

/// Converts a terminal key into the event type tui-textarea expects.
pub fn textarea_key(key: crossterm::event::KeyEvent) -> Option<rt_event::KeyEvent> {
    use crossterm::event::KeyCode;
    let code = match key.code {
        KeyCode::Char(c) => rt_event::KeyCode::Char(c),
        KeyCode::Enter => rt_event::KeyCode::Enter,
        KeyCode::Backspace => rt_event::KeyCode::Backspace,
        KeyCode::Delete => rt_event::KeyCode::Delete,
        KeyCode::Left => rt_event::KeyCode::Left,
        KeyCode::Right => rt_event::KeyCode::Right,
        KeyCode::Up => rt_event::KeyCode::Up,
        KeyCode::Down => rt_event::KeyCode::Down,
        KeyCode::Home => rt_event::KeyCode::Home,
        KeyCode::End => rt_event::KeyCode::End,
        KeyCode::Tab => rt_event::KeyCode::Tab,
        _ => return None,
    };
    let modifiers = rt_event::KeyModifiers::from_bits_truncate(key.modifiers.bits());
    Some(rt_event::KeyEvent::new(code, modifiers))
}

/// Empty textarea seeded with `text`, framed with `title`.
pub fn seeded_textarea(text: &str, title: String) -> TextArea<'static> {
    let mut ta = TextArea::default();
    if !text.is_empty() {
        ta.insert_str(text);
    }
    ta.set_block(Block::default().borders(Borders::ALL).title(title));
    ta
}
