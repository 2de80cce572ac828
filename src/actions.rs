use std::collections::HashMap;

use crossterm::event::KeyCode;

/// Action tags the presentation layer dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    Trending,
    Search,
    Favorites,
    Uploads,
    Upload,
    Random,
    OpenDetails,
    Back,
    ToggleFavorite,
    DeleteUpload,
    OpenInBrowser,
    CopyUrl,
    Up,
    Down,
    Left,
    Right,
    PageDown,
    PageUp,
    Help,
    About,
}

impl Action {
    pub fn tag(&self) -> &'static str {
        match self {
            Action::Quit => "quit",
            Action::Trending => "trending",
            Action::Search => "search",
            Action::Favorites => "favorites",
            Action::Uploads => "uploads",
            Action::Upload => "upload",
            Action::Random => "random",
            Action::OpenDetails => "open-details",
            Action::Back => "back",
            Action::ToggleFavorite => "toggle-favorite",
            Action::DeleteUpload => "delete-upload",
            Action::OpenInBrowser => "open-browser",
            Action::CopyUrl => "copy-url",
            Action::Up => "up",
            Action::Down => "down",
            Action::Left => "left",
            Action::Right => "right",
            Action::PageDown => "page-down",
            Action::PageUp => "page-up",
            Action::Help => "help",
            Action::About => "about",
        }
    }
}

pub struct Keymap {
    bindings: HashMap<KeyCode, Action>,
}

impl Default for Keymap {
    fn default() -> Self {
        let bindings = [
            (KeyCode::Char('q'), Action::Quit),
            (KeyCode::Char('t'), Action::Trending),
            (KeyCode::Char('/'), Action::Search),
            (KeyCode::Char('F'), Action::Favorites),
            (KeyCode::Char('U'), Action::Uploads),
            (KeyCode::Char('u'), Action::Upload),
            (KeyCode::Char('R'), Action::Random),
            (KeyCode::Enter, Action::OpenDetails),
            (KeyCode::Esc, Action::Back),
            (KeyCode::Backspace, Action::Back),
            (KeyCode::Char('f'), Action::ToggleFavorite),
            (KeyCode::Char('d'), Action::DeleteUpload),
            (KeyCode::Char('o'), Action::OpenInBrowser),
            (KeyCode::Char('y'), Action::CopyUrl),
            (KeyCode::Char('k'), Action::Up),
            (KeyCode::Up, Action::Up),
            (KeyCode::Char('j'), Action::Down),
            (KeyCode::Down, Action::Down),
            (KeyCode::Char('h'), Action::Left),
            (KeyCode::Left, Action::Left),
            (KeyCode::Char('l'), Action::Right),
            (KeyCode::Right, Action::Right),
            (KeyCode::PageDown, Action::PageDown),
            (KeyCode::Char(' '), Action::PageDown),
            (KeyCode::PageUp, Action::PageUp),
            (KeyCode::Char('?'), Action::Help),
            (KeyCode::Char('a'), Action::About),
        ]
        .into_iter()
        .collect();
        Self { bindings }
    }
}

impl Keymap {
    pub fn resolve(&self, code: KeyCode) -> Option<Action> {
        self.bindings.get(&code).copied()
    }

    /// `(key, tag)` pairs for the help overlay, sorted by tag.
    pub fn describe(&self) -> Vec<(String, &'static str)> {
        let mut rows: Vec<(String, &'static str)> = self
            .bindings
            .iter()
            .map(|(code, action)| (key_label(*code), action.tag()))
            .collect();
        rows.sort_by(|a, b| a.1.cmp(b.1).then_with(|| a.0.cmp(&b.0)));
        rows
    }
}

fn key_label(code: KeyCode) -> String {
    match code {
        KeyCode::Char(' ') => "space".into(),
        KeyCode::Char(ch) => ch.to_string(),
        KeyCode::Enter => "enter".into(),
        KeyCode::Esc => "esc".into(),
        KeyCode::Backspace => "backspace".into(),
        KeyCode::Up => "↑".into(),
        KeyCode::Down => "↓".into(),
        KeyCode::Left => "←".into(),
        KeyCode::Right => "→".into(),
        KeyCode::PageDown => "pgdn".into(),
        KeyCode::PageUp => "pgup".into(),
        other => format!("{other:?}"),
    }
}
