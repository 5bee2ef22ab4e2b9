pub mod builder;
pub mod chrome;
pub mod dashboard;
pub mod fill;
pub mod login;
pub mod responses;
pub mod status_bar;

use crate::app::Effect;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

pub trait Widget {
    fn render(&mut self, f: &mut Frame, area: Rect, focused: bool, tick: u64);
    fn on_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        let _ = key;
        Vec::new()
    }
    /// Footer hint for the current mode.
    fn help(&self) -> &'static str {
        ""
    }
}
