//! Keybinding dispatcher.
//!
//! Translates crossterm `KeyEvent`s into `AppState` mutations and returns a
//! `KeyAction` for anything the event loop itself must do (quit, restart the
//! request, reload the diff). Branches on `state.mode` first so the help
//! overlay has its own isolated handler.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{AppState, Mode};

/// What the event loop does after a key was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Continue,
    Quit,
    /// Abort the running request and start a new one over the same diff.
    RestartAnalysis,
    /// Ask the git worker for the next diff mode.
    CycleDiffMode,
}

pub fn handle_key(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match state.mode {
        Mode::HelpOverlay => handle_help(key, state),
        Mode::Normal => handle_normal(key, state),
    }
}

fn handle_normal(key: KeyEvent, state: &mut AppState) -> KeyAction {
    if let Some(action) = handle_scroll_key(key, state) {
        return action;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Tab => state.focus = state.focus.toggle(),

        KeyCode::Char('[') => state.prev_hunk(),
        KeyCode::Char(']') => state.next_hunk(),
        KeyCode::Char('n') => state.next_annotation(),
        KeyCode::Char('N') => state.prev_annotation(),

        KeyCode::Char('<') => state.shrink_diff_panel(),
        KeyCode::Char('>') => state.grow_diff_panel(),

        // Only git-backed diffs have modes to cycle.
        KeyCode::Char('m') if state.diff_mode.is_some() => return KeyAction::CycleDiffMode,
        KeyCode::Char('r') => return KeyAction::RestartAnalysis,

        KeyCode::Char('?') => {
            state.help_scroll = 0;
            state.mode = Mode::HelpOverlay;
        }

        KeyCode::Char('q') | KeyCode::Esc => return KeyAction::Quit,
        KeyCode::Char('c') if ctrl => return KeyAction::Quit,

        _ => {}
    }
    KeyAction::Continue
}

/// j / k / g / G and Ctrl-d / Ctrl-u. `None` lets the key fall through.
fn handle_scroll_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => state.scroll_up(1),
        KeyCode::Char('g') => state.scroll_top(),
        KeyCode::Char('G') => state.scroll_bottom(),
        KeyCode::Char('d') if ctrl => state.half_page_down(),
        KeyCode::Char('u') if ctrl => state.half_page_up(),
        _ => return None,
    }
    Some(KeyAction::Continue)
}

fn handle_help(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') => state.help_scroll = state.help_scroll.saturating_add(1),
        KeyCode::Char('k') => state.help_scroll = state.help_scroll.saturating_sub(1),
        KeyCode::Char('g') => state.help_scroll = 0,
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => state.mode = Mode::Normal,
        _ => {}
    }
    KeyAction::Continue
}
