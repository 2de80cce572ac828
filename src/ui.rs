use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseEvent,
    MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use textwrap::wrap;
use tracing::{info, warn};
use unicode_width::UnicodeWidthStr;

use crate::actions::{Action, Keymap};
use crate::controller::{
    Controller, Dispatcher, FetchError, FetchKind, FetchRequest, FetchResult, GridConfig,
    Settlement, Surface,
};
use crate::data::{FeedService, MediaItem, UploadService};
use crate::favorites::FavoriteStore;
use crate::feed::{Feed, FeedMode, SessionToken};
use crate::layout::Estimator;
use crate::scroll::Viewport;
use crate::storage;

/// Display units represented by one terminal row.
pub const UNITS_PER_ROW: f64 = 20.0;
const MIN_CARD_ROWS: u16 = 4;
const WHEEL_ROWS: usize = 3;

const FULL_HEART: &str = "❤";
const EMPTY_HEART: &str = "♡";
const NO_FAVORITES: &str = "You have no favorites yet.";
const NO_FAVORITES_RANDOM: &str = "You have no favorites yet. Here is a random one:";
const NO_UPLOADS: &str = "No uploaded GIFs yet.";
const ABOUT_TEXT: &str = "A lightweight GIF browser built on the GIPHY API. Browse trending GIFs, \
search by keyword, save favorites, and upload your own.";

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_HEART: Color = Color::Rgb(243, 139, 168);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub struct Options {
    pub status_message: String,
    pub grid: GridConfig,
    pub feed_service: Arc<dyn FeedService>,
    pub upload_service: Option<Arc<dyn UploadService>>,
    pub store: Arc<storage::Store>,
    pub config_path: String,
}

enum AsyncResponse {
    Feed {
        token: SessionToken,
        result: FetchResult,
    },
    Details {
        request_id: u64,
        result: Result<Option<MediaItem>, FetchError>,
    },
    Random {
        request_id: u64,
        result: Result<Option<MediaItem>, FetchError>,
    },
    Upload {
        path: PathBuf,
        result: Result<String>,
    },
}

/// Runs controller fetches on worker threads and reports back over the channel.
pub struct ThreadDispatcher {
    service: Arc<dyn FeedService>,
    tx: Sender<AsyncResponse>,
}

impl Dispatcher for ThreadDispatcher {
    fn dispatch(&mut self, request: FetchRequest) {
        let service = self.service.clone();
        let tx = self.tx.clone();
        thread::spawn(move || {
            let FetchRequest { token, kind } = request;
            let result = match kind {
                FetchKind::Trending { offset, limit } => service.trending(offset, limit),
                FetchKind::Search {
                    query,
                    offset,
                    limit,
                } => service.search(&query, offset, limit),
                FetchKind::ByIds { ids } => service.by_ids(&ids),
            }
            .map_err(FetchError::from);
            let _ = tx.send(AsyncResponse::Feed { token, result });
        });
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub item: MediaItem,
    pub is_favorite: bool,
    pub rows: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Empty(String),
    Failure(String),
}

/// Terminal rendering surface: N columns of cards plus an optional notice.
#[derive(Debug, Clone)]
pub struct GridView {
    estimator: Estimator,
    header: Option<String>,
    columns: Vec<Vec<Card>>,
    notice: Option<Notice>,
}

impl GridView {
    pub fn new(estimator: Estimator) -> Self {
        Self {
            estimator,
            header: None,
            columns: Vec::new(),
            notice: None,
        }
    }

    pub fn columns(&self) -> &[Vec<Card>] {
        &self.columns
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn card_count(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn card(&self, sel: Selection) -> Option<&Card> {
        self.columns.get(sel.column).and_then(|c| c.get(sel.index))
    }

    pub fn card_mut(&mut self, sel: Selection) -> Option<&mut Card> {
        self.columns.get_mut(sel.column).and_then(|c| c.get_mut(sel.index))
    }

    pub fn remove(&mut self, sel: Selection) -> Option<Card> {
        let column = self.columns.get_mut(sel.column)?;
        (sel.index < column.len()).then(|| column.remove(sel.index))
    }

    pub fn set_notice(&mut self, notice: Option<Notice>) {
        self.notice = notice;
    }

    /// Row at which card `index` of `column` starts.
    pub fn card_start(&self, column: usize, index: usize) -> usize {
        self.columns
            .get(column)
            .map(|c| c.iter().take(index).map(|card| card.rows as usize).sum())
            .unwrap_or(0)
    }

    pub fn content_rows(&self) -> usize {
        self.columns
            .iter()
            .map(|c| c.iter().map(|card| card.rows as usize).sum::<usize>())
            .max()
            .unwrap_or(0)
    }

    /// Card in `column` whose extent covers `row`, or the last one above it.
    pub fn index_at_row(&self, column: usize, row: usize) -> Option<usize> {
        let cards = self.columns.get(column)?;
        if cards.is_empty() {
            return None;
        }
        let mut start = 0usize;
        for (i, card) in cards.iter().enumerate() {
            let end = start + card.rows as usize;
            if row < end {
                return Some(i);
            }
            start = end;
        }
        Some(cards.len() - 1)
    }

    /// Replaces the favorite flag on every card showing `id`.
    pub fn set_favorite(&mut self, id: &str, is_favorite: bool) {
        self.columns
            .iter_mut()
            .flatten()
            .filter(|card| card.item.id == id)
            .for_each(|card| card.is_favorite = is_favorite);
    }
}

impl Surface for GridView {
    type Markup = Card;

    fn render_item(&self, item: &MediaItem, is_favorite: bool) -> Card {
        let estimate = self.estimator.estimate(item.dimensions);
        let rows = (estimate / UNITS_PER_ROW).round().clamp(MIN_CARD_ROWS as f64, 200.0) as u16;
        Card {
            item: item.clone(),
            is_favorite,
            rows,
        }
    }

    fn render_empty_layout(&mut self, columns: usize, header: Option<&str>) {
        self.columns = vec![Vec::new(); columns];
        self.header = header.map(str::to_string);
        self.notice = None;
    }

    fn append_to_column(&mut self, column: usize, markup: Card) {
        if let Some(col) = self.columns.get_mut(column) {
            col.push(markup);
        }
    }

    fn render_empty_state(&mut self, text: &str) {
        self.notice = Some(Notice::Empty(text.to_string()));
    }

    fn render_failure_state(&mut self, text: &str) {
        self.notice = Some(Notice::Failure(text.to_string()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub column: usize,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GridKind {
    Trending,
    Search,
    Favorites,
    Uploads,
}

impl GridKind {
    fn title(&self) -> &'static str {
        match self {
            GridKind::Trending => "Trending",
            GridKind::Search => "Search",
            GridKind::Favorites => "Favorites",
            GridKind::Uploads => "My Uploads",
        }
    }
}

enum View {
    Grid,
    Details(DetailState),
}

enum DetailState {
    Loading,
    Loaded(MediaItem),
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overlay {
    Help,
    About,
}

enum InputMode {
    Normal,
    Search(String),
    UploadPath(String),
}

#[derive(Clone, Copy)]
enum RandomTarget {
    Favorites(SessionToken),
    Details,
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

pub struct Model {
    controller: Controller<ThreadDispatcher, Arc<storage::Store>>,
    grid: GridView,
    store: Arc<storage::Store>,
    feed_service: Arc<dyn FeedService>,
    upload_service: Option<Arc<dyn UploadService>>,
    keymap: Keymap,
    view: View,
    input: InputMode,
    kind: GridKind,
    selected: Selection,
    scroll: usize,
    viewport_rows: usize,
    status_message: String,
    config_path: String,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
    next_request_id: u64,
    pending_details: Option<u64>,
    pending_random: Option<(u64, RandomTarget)>,
    upload_in_progress: bool,
    overlay: Option<Overlay>,
    spinner: Spinner,
    needs_redraw: bool,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        let dispatcher = ThreadDispatcher {
            service: opts.feed_service.clone(),
            tx: response_tx.clone(),
        };
        let estimator = opts.grid.balancer.estimator;
        let controller = Controller::new(opts.grid, dispatcher, opts.store.clone());

        let mut model = Self {
            controller,
            grid: GridView::new(estimator),
            store: opts.store,
            feed_service: opts.feed_service,
            upload_service: opts.upload_service,
            keymap: Keymap::default(),
            view: View::Grid,
            input: InputMode::Normal,
            kind: GridKind::Trending,
            selected: Selection::default(),
            scroll: 0,
            viewport_rows: 0,
            status_message: opts.status_message,
            config_path: opts.config_path,
            response_tx,
            response_rx,
            next_request_id: 1,
            pending_details: None,
            pending_random: None,
            upload_in_progress: false,
            overlay: None,
            spinner: Spinner::new(),
            needs_redraw: true,
        };
        model.enter_grid(GridKind::Trending, Feed::Trending);
        model
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        self.controller.exit();
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            if event::poll(tick_rate)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {err}");
                            }
                        }
                        self.mark_dirty();
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::Resize(..) => self.mark_dirty(),
                    _ => {}
                }
            }

            if self.is_loading() {
                if self.spinner.advance() {
                    self.mark_dirty();
                }
            } else {
                self.spinner.reset();
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        self.controller.session().in_flight
            || self.pending_details.is_some()
            || self.pending_random.is_some()
            || self.upload_in_progress
    }

    fn allocate_request_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        id
    }

    fn enter_grid(&mut self, kind: GridKind, feed: Feed) {
        self.view = View::Grid;
        self.kind = match feed.mode() {
            FeedMode::Trending if kind == GridKind::Search => GridKind::Trending,
            _ => kind,
        };
        self.selected = Selection::default();
        self.scroll = 0;
        self.pending_details = None;
        self.pending_random = None;
        self.status_message = format!("Loading {}…", self.kind.title());
        self.controller.enter(feed, &mut self.grid);
    }

    fn enter_favorites(&mut self) -> Result<()> {
        let ids = self.store.favorite_ids()?;
        self.enter_grid(GridKind::Favorites, Feed::by_ids(ids, NO_FAVORITES));
        Ok(())
    }

    fn enter_uploads(&mut self) -> Result<()> {
        let ids = self.store.uploaded_ids()?;
        self.enter_grid(GridKind::Uploads, Feed::by_ids(ids, NO_UPLOADS));
        Ok(())
    }

    fn viewport(&self) -> Viewport {
        Viewport {
            scroll_offset: self.scroll as f64 * UNITS_PER_ROW,
            viewport_height: self.viewport_rows as f64 * UNITS_PER_ROW,
            content_height: self.grid.content_rows() as f64 * UNITS_PER_ROW,
        }
    }

    fn notify_scroll(&mut self) {
        if self.controller.on_scroll(self.viewport()) {
            self.status_message = format!("Loading more {}…", self.kind.title());
        }
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Feed { token, result } => {
                match self.controller.settle(token, result, &mut self.grid) {
                    Settlement::Stale => {}
                    Settlement::Empty => {
                        self.status_message = format!("{}: nothing to show.", self.kind.title());
                        if self.kind == GridKind::Favorites {
                            self.request_random(RandomTarget::Favorites(token));
                        }
                    }
                    Settlement::Placed { count, exhausted } => {
                        let total = self.controller.session().offset;
                        self.status_message = if exhausted {
                            format!("{}: {total} GIFs, end of feed.", self.kind.title())
                        } else {
                            format!("{}: loaded {count} more ({total} total).", self.kind.title())
                        };
                    }
                    Settlement::Failed => {
                        self.status_message = format!(
                            "{}: loading failed. Press t to start over.",
                            self.kind.title()
                        );
                    }
                }
            }
            AsyncResponse::Details { request_id, result } => {
                if self.pending_details != Some(request_id) {
                    return;
                }
                self.pending_details = None;
                self.view = match result {
                    Ok(Some(item)) => {
                        self.status_message = item.title.clone();
                        View::Details(DetailState::Loaded(item))
                    }
                    Ok(None) => View::Details(DetailState::Missing),
                    Err(err) => {
                        self.status_message = format!("Failed to load GIF: {err}");
                        View::Details(DetailState::Missing)
                    }
                };
            }
            AsyncResponse::Random { request_id, result } => {
                let Some((pending, target)) = self.pending_random else {
                    return;
                };
                if pending != request_id {
                    return;
                }
                self.pending_random = None;
                let item = match result {
                    Ok(Some(item)) if !item.id.is_empty() => item,
                    Ok(_) => return,
                    Err(err) => {
                        warn!(error = %err, "random gif fetch failed");
                        if matches!(target, RandomTarget::Details) {
                            self.view = View::Details(DetailState::Missing);
                        }
                        return;
                    }
                };
                match target {
                    RandomTarget::Favorites(token) => {
                        let still_here = self.kind == GridKind::Favorites
                            && matches!(self.view, View::Grid)
                            && self.controller.session().token == token;
                        if still_here && self.grid.card_count() == 0 {
                            self.grid
                                .set_notice(Some(Notice::Empty(NO_FAVORITES_RANDOM.to_string())));
                            let is_favorite = self.store.contains(&item.id);
                            let card = self.grid.render_item(&item, is_favorite);
                            self.grid.append_to_column(0, card);
                        }
                    }
                    RandomTarget::Details => {
                        self.status_message = item.title.clone();
                        self.view = View::Details(DetailState::Loaded(item));
                    }
                }
            }
            AsyncResponse::Upload { path, result } => {
                self.upload_in_progress = false;
                match result.and_then(|id| self.store.add_upload(&id).map(|_| id)) {
                    Ok(id) => {
                        info!(id = %id, "gif uploaded");
                        self.status_message = format!("GIF uploaded successfully! ({id})");
                    }
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "upload failed");
                        self.status_message = format!("Upload failed: {err}");
                    }
                }
            }
        }
    }

    fn request_random(&mut self, target: RandomTarget) {
        let request_id = self.allocate_request_id();
        self.pending_random = Some((request_id, target));
        let service = self.feed_service.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.random().map_err(FetchError::from);
            let _ = tx.send(AsyncResponse::Random { request_id, result });
        });
    }

    fn open_details(&mut self, id: String) {
        self.controller.exit();
        let request_id = self.allocate_request_id();
        self.pending_details = Some(request_id);
        self.view = View::Details(DetailState::Loading);
        self.status_message = format!("Loading GIF {id}…");
        let service = self.feed_service.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.by_id(&id).map_err(FetchError::from);
            let _ = tx.send(AsyncResponse::Details { request_id, result });
        });
    }

    fn open_random(&mut self) {
        self.controller.exit();
        self.pending_details = None;
        self.view = View::Details(DetailState::Loading);
        self.status_message = "Fetching a random GIF…".to_string();
        self.request_random(RandomTarget::Details);
    }

    fn start_upload(&mut self, raw: &str) {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            self.status_message = "Please select a GIF file first.".to_string();
            return;
        }
        let Some(service) = self.upload_service.clone() else {
            self.status_message = "Uploads are unavailable in offline mode.".to_string();
            return;
        };
        let path = expand_home(trimmed);
        self.upload_in_progress = true;
        self.status_message = "Uploading...".to_string();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.upload(&path);
            let _ = tx.send(AsyncResponse::Upload { path, result });
        });
    }

    fn current_item(&self) -> Option<&MediaItem> {
        match &self.view {
            View::Grid => self.grid.card(self.selected).map(|card| &card.item),
            View::Details(DetailState::Loaded(item)) => Some(item),
            View::Details(_) => None,
        }
    }

    fn toggle_favorite(&mut self) -> Result<()> {
        let Some(id) = self.current_item().map(|item| item.id.clone()) else {
            return Ok(());
        };
        let now_favorite = self.store.toggle_favorite(&id)?;
        self.grid.set_favorite(&id, now_favorite);
        self.status_message = if now_favorite {
            "Added to favorites.".to_string()
        } else {
            "Removed from favorites.".to_string()
        };

        if !matches!(self.view, View::Grid) || self.kind != GridKind::Favorites {
            return Ok(());
        }
        if now_favorite {
            // favorited the random suggestion
            self.grid.set_notice(None);
            return Ok(());
        }
        self.grid.remove(self.selected);
        self.clamp_selection();
        if self.grid.card_count() == 0 {
            self.grid.set_notice(Some(Notice::Empty(NO_FAVORITES.to_string())));
            let token = self.controller.session().token;
            self.request_random(RandomTarget::Favorites(token));
        }
        Ok(())
    }

    fn delete_upload(&mut self) -> Result<()> {
        if self.kind != GridKind::Uploads || !matches!(self.view, View::Grid) {
            self.status_message = "Delete is only available on My Uploads.".to_string();
            return Ok(());
        }
        let Some(id) = self.grid.card(self.selected).map(|card| card.item.id.clone()) else {
            return Ok(());
        };
        self.store.remove_upload(&id)?;
        self.grid.remove(self.selected);
        self.clamp_selection();
        if self.grid.card_count() == 0 {
            self.grid.set_notice(Some(Notice::Empty(NO_UPLOADS.to_string())));
        }
        self.status_message = format!("Deleted upload {id}.");
        Ok(())
    }

    fn open_in_browser(&mut self) {
        let Some(url) = self.current_item().map(|item| item.page_url.clone()) else {
            return;
        };
        self.status_message = match webbrowser::open(&url) {
            Ok(_) => "Opened GIF in your browser.".to_string(),
            Err(err) => format!("Failed to open browser: {err} (URL: {url})"),
        };
    }

    fn copy_url(&mut self) {
        let Some(url) = self.current_item().map(|item| item.display_url.clone()) else {
            return;
        };
        let result = arboard::Clipboard::new().and_then(|mut clip| clip.set_text(url.clone()));
        self.status_message = match result {
            Ok(()) => format!("Copied {url}"),
            Err(err) => format!("Clipboard unavailable: {err}"),
        };
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        match &mut self.input {
            InputMode::Normal => {}
            InputMode::Search(buffer) | InputMode::UploadPath(buffer) => {
                match code {
                    KeyCode::Esc => self.input = InputMode::Normal,
                    KeyCode::Backspace => {
                        buffer.pop();
                    }
                    KeyCode::Char(ch) => buffer.push(ch),
                    KeyCode::Enter => {
                        let input = std::mem::replace(&mut self.input, InputMode::Normal);
                        match input {
                            InputMode::Search(query) => {
                                let feed = Feed::search(&query);
                                self.enter_grid(GridKind::Search, feed);
                            }
                            InputMode::UploadPath(path) => self.start_upload(&path),
                            InputMode::Normal => {}
                        }
                    }
                    _ => {}
                }
                return Ok(false);
            }
        }

        if self.overlay.take().is_some() {
            return Ok(false);
        }

        let Some(action) = self.keymap.resolve(code) else {
            return Ok(false);
        };
        self.dispatch(action)
    }

    fn dispatch(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::Quit => return Ok(true),
            Action::Trending => self.enter_grid(GridKind::Trending, Feed::Trending),
            Action::Search => self.input = InputMode::Search(String::new()),
            Action::Favorites => self.enter_favorites()?,
            Action::Uploads => self.enter_uploads()?,
            Action::Upload => self.input = InputMode::UploadPath(String::new()),
            Action::Random => self.open_random(),
            Action::OpenDetails if matches!(self.view, View::Grid) => {
                if let Some(id) = self.grid.card(self.selected).map(|c| c.item.id.clone()) {
                    self.open_details(id);
                }
            }
            Action::OpenDetails => {}
            Action::Back => {
                if matches!(self.view, View::Details(_)) {
                    self.enter_grid(GridKind::Trending, Feed::Trending);
                }
            }
            Action::ToggleFavorite => self.toggle_favorite()?,
            Action::DeleteUpload => self.delete_upload()?,
            Action::OpenInBrowser => self.open_in_browser(),
            Action::CopyUrl => self.copy_url(),
            Action::Up => self.move_vertical(-1),
            Action::Down => self.move_vertical(1),
            Action::Left => self.move_horizontal(-1),
            Action::Right => self.move_horizontal(1),
            Action::PageDown => self.scroll_by(self.viewport_rows.max(1) as isize),
            Action::PageUp => self.scroll_by(-(self.viewport_rows.max(1) as isize)),
            Action::Help => self.overlay = Some(Overlay::Help),
            Action::About => self.overlay = Some(Overlay::About),
        }
        Ok(false)
    }

    fn handle_mouse(&mut self, event: MouseEvent) {
        if !matches!(self.view, View::Grid) || !matches!(self.input, InputMode::Normal) {
            return;
        }
        match event.kind {
            MouseEventKind::ScrollDown => self.scroll_by(WHEEL_ROWS as isize),
            MouseEventKind::ScrollUp => self.scroll_by(-(WHEEL_ROWS as isize)),
            _ => return,
        }
        self.mark_dirty();
    }

    fn move_vertical(&mut self, delta: isize) {
        if !matches!(self.view, View::Grid) {
            return;
        }
        let Some(column) = self.grid.columns().get(self.selected.column) else {
            return;
        };
        if column.is_empty() {
            return;
        }
        let next = (self.selected.index as isize + delta).clamp(0, column.len() as isize - 1);
        self.selected.index = next as usize;
        self.ensure_selected_visible();
        self.notify_scroll();
    }

    fn move_horizontal(&mut self, delta: isize) {
        if !matches!(self.view, View::Grid) {
            return;
        }
        let count = self.grid.columns().len();
        if count == 0 {
            return;
        }
        let row = self
            .grid
            .card_start(self.selected.column, self.selected.index)
            .max(self.scroll);
        let mut column = self.selected.column as isize;
        loop {
            column += delta;
            if column < 0 || column >= count as isize {
                return;
            }
            if let Some(index) = self.grid.index_at_row(column as usize, row) {
                self.selected = Selection {
                    column: column as usize,
                    index,
                };
                break;
            }
        }
        self.ensure_selected_visible();
    }

    fn scroll_by(&mut self, rows: isize) {
        if !matches!(self.view, View::Grid) {
            return;
        }
        let max_scroll = self.grid.content_rows().saturating_sub(self.viewport_rows);
        let next = (self.scroll as isize + rows).clamp(0, max_scroll as isize);
        self.scroll = next as usize;
        if let Some(index) = self.grid.index_at_row(self.selected.column, self.scroll) {
            let start = self.grid.card_start(self.selected.column, self.selected.index);
            if start < self.scroll || start >= self.scroll + self.viewport_rows {
                self.selected.index = index;
            }
        }
        self.notify_scroll();
    }

    fn ensure_selected_visible(&mut self) {
        let Some(card) = self.grid.card(self.selected) else {
            return;
        };
        let start = self.grid.card_start(self.selected.column, self.selected.index);
        let end = start + card.rows as usize;
        if start < self.scroll {
            self.scroll = start;
        } else if end > self.scroll + self.viewport_rows {
            self.scroll = end.saturating_sub(self.viewport_rows).min(start);
        }
    }

    fn clamp_selection(&mut self) {
        let columns = self.grid.columns();
        if columns.is_empty() {
            self.selected = Selection::default();
            return;
        }
        let column = self.selected.column.min(columns.len() - 1);
        let len = columns[column].len();
        self.selected = Selection {
            column,
            index: self.selected.index.min(len.saturating_sub(1)),
        };
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        self.draw_title(frame, layout[0]);
        let viewport_rows = match &self.view {
            View::Grid => Some(self.draw_grid(frame, layout[1])),
            View::Details(state) => {
                self.draw_details(frame, layout[1], state);
                None
            }
        };
        if let Some(rows) = viewport_rows {
            self.viewport_rows = rows;
        }
        self.draw_status(frame, layout[2]);

        match self.overlay {
            Some(Overlay::Help) => self.draw_help(frame, full),
            Some(Overlay::About) => self.draw_about(frame, full),
            None => {}
        }
    }

    fn draw_title(&self, frame: &mut Frame<'_>, area: Rect) {
        let section = match &self.view {
            View::Grid => self.kind.title(),
            View::Details(_) => "Details",
        };
        let line = Line::from(vec![
            Span::styled(
                " GifGrid ",
                Style::default()
                    .fg(COLOR_BG)
                    .bg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" {section} "),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            ),
            Span::styled(
                format!(" config: {}  ? for keys", self.config_path),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ),
        ]);
        frame.render_widget(
            Paragraph::new(line).style(Style::default().bg(COLOR_PANEL_FOCUSED_BG)),
            area,
        );
    }

    fn draw_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let text = match &self.input {
            InputMode::Search(buffer) => format!("Search: {buffer}▏"),
            InputMode::UploadPath(buffer) => format!("Upload GIF path: {buffer}▏"),
            InputMode::Normal if self.is_loading() => {
                format!("{} {}", self.spinner.frame(), self.status_message)
            }
            InputMode::Normal => self.status_message.clone(),
        };
        let status = Paragraph::new(text).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status, area);
    }

    /// Draws the visible slice of the grid and returns the rows available to cards.
    fn draw_grid(&self, frame: &mut Frame<'_>, area: Rect) -> usize {
        let mut area = area;
        if let Some(header) = &self.grid.header {
            let header_area = Rect { height: 1, ..area };
            frame.render_widget(
                Paragraph::new(header.as_str())
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(COLOR_TEXT_SECONDARY)),
                header_area,
            );
            area.y += 1;
            area.height = area.height.saturating_sub(1);
        }

        let mut grid_area = area;
        if let Some(notice) = self.grid.notice() {
            let (text, color) = match notice {
                Notice::Empty(text) => (text.as_str(), COLOR_TEXT_SECONDARY),
                Notice::Failure(text) => (text.as_str(), COLOR_ERROR),
            };
            let notice_area = Rect { height: 2, ..area };
            frame.render_widget(
                Paragraph::new(text)
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(color)),
                notice_area,
            );
            grid_area.y += 2;
            grid_area.height = grid_area.height.saturating_sub(2);
        }

        let viewport_rows = grid_area.height as usize;
        let count = self.grid.columns().len().max(1);
        let constraints = vec![Constraint::Ratio(1, count as u32); count];
        let column_areas = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(grid_area);

        for (col_idx, col_area) in column_areas.iter().enumerate() {
            let Some(cards) = self.grid.columns().get(col_idx) else {
                continue;
            };
            let mut start = 0usize;
            for (idx, card) in cards.iter().enumerate() {
                let rows = card.rows as usize;
                let end = start + rows;
                let card_start = start;
                start = end;
                if end <= self.scroll {
                    continue;
                }
                if card_start >= self.scroll + viewport_rows {
                    break;
                }
                let clip_top = self.scroll.saturating_sub(card_start);
                let top = card_start.saturating_sub(self.scroll);
                let available = viewport_rows - top;
                let height = (rows - clip_top).min(available) as u16;
                let rect = Rect {
                    x: col_area.x,
                    y: col_area.y + top as u16,
                    width: col_area.width,
                    height,
                };
                let selected = self.selected
                    == Selection {
                        column: col_idx,
                        index: idx,
                    };
                draw_card(frame, rect, card, selected, clip_top as u16);
            }
        }
        viewport_rows
    }

    fn draw_details(&self, frame: &mut Frame<'_>, area: Rect, state: &DetailState) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_BORDER_FOCUSED))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let lines = match state {
            DetailState::Loading => vec![Line::from("Loading…")],
            DetailState::Missing => vec![Line::from("GIF not found.")],
            DetailState::Loaded(item) => {
                let heart = if self.store.contains(&item.id) {
                    FULL_HEART
                } else {
                    EMPTY_HEART
                };
                let dims = format_dimensions(item);
                let label = Style::default().fg(COLOR_TEXT_SECONDARY);
                let mut lines = vec![
                    Line::from(vec![
                        Span::styled(format!("{heart} "), Style::default().fg(COLOR_HEART)),
                        Span::styled(
                            item.title.clone(),
                            Style::default()
                                .fg(COLOR_TEXT_PRIMARY)
                                .add_modifier(Modifier::BOLD),
                        ),
                    ]),
                    Line::from(""),
                ];
                let fields = [
                    ("id", item.id.clone()),
                    ("size", dims),
                    ("user", item.username.clone()),
                    ("rating", item.rating.clone()),
                    ("imported", item.imported_at.clone()),
                    ("gif", item.display_url.clone()),
                    ("page", item.page_url.clone()),
                ];
                for (name, value) in fields {
                    if value.is_empty() {
                        continue;
                    }
                    lines.push(Line::from(vec![
                        Span::styled(format!("{name:>9}: "), label),
                        Span::styled(value, Style::default().fg(COLOR_TEXT_PRIMARY)),
                    ]));
                }
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "esc: back   f: favorite   o: open in browser   y: copy url",
                    label,
                )));
                lines
            }
        };
        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
            area,
        );
    }

    fn draw_help(&self, frame: &mut Frame<'_>, area: Rect) {
        let rows = self.keymap.describe();
        let popup = popup_rect(area, 36, rows.len() as u16 + 2);
        let lines: Vec<Line> = rows
            .into_iter()
            .map(|(key, tag)| {
                Line::from(vec![
                    Span::styled(format!("{key:>10}  "), Style::default().fg(COLOR_ACCENT)),
                    Span::styled(tag, Style::default().fg(COLOR_TEXT_PRIMARY)),
                ])
            })
            .collect();
        frame.render_widget(Clear, popup);
        frame.render_widget(Paragraph::new(lines).block(popup_block(" Keys ")), popup);
    }

    fn draw_about(&self, frame: &mut Frame<'_>, area: Rect) {
        let width: u16 = 52;
        let body = wrap(ABOUT_TEXT, width.saturating_sub(4) as usize);
        let popup = popup_rect(area, width, body.len() as u16 + 4);
        let mut lines = vec![Line::from(Span::styled(
            format!("GifGrid {}", crate::VERSION),
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        ))];
        lines.push(Line::from(""));
        lines.extend(body.into_iter().map(|piece| {
            Line::from(Span::styled(
                piece.into_owned(),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            ))
        }));
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines)
                .block(popup_block(" About "))
                .wrap(Wrap { trim: true }),
            popup,
        );
    }
}

fn popup_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn popup_block(title: &'static str) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(COLOR_BORDER_FOCUSED))
        .style(Style::default().bg(COLOR_PANEL_BG))
}

fn draw_card(frame: &mut Frame<'_>, rect: Rect, card: &Card, selected: bool, clip_top: u16) {
    if rect.height == 0 || rect.width < 4 {
        return;
    }
    let borders = if clip_top > 0 {
        Borders::LEFT | Borders::RIGHT | Borders::BOTTOM
    } else {
        Borders::ALL
    };
    let border_color = if selected {
        COLOR_BORDER_FOCUSED
    } else {
        COLOR_BORDER_IDLE
    };
    let bg = if selected {
        COLOR_PANEL_FOCUSED_BG
    } else {
        COLOR_PANEL_BG
    };
    let block = Block::default()
        .borders(borders)
        .border_style(Style::default().fg(border_color))
        .style(Style::default().bg(bg));
    let inner_width = rect.width.saturating_sub(2) as usize;
    let lines = card_lines(card, inner_width);
    let skip = clip_top.saturating_sub(1);
    frame.render_widget(
        Paragraph::new(lines).block(block).scroll((skip, 0)),
        rect,
    );
}

fn card_lines(card: &Card, width: usize) -> Vec<Line<'static>> {
    let width = width.max(1);
    let heart = if card.is_favorite {
        FULL_HEART
    } else {
        EMPTY_HEART
    };
    let mut lines = Vec::new();
    for (i, piece) in wrap(&card.item.title, width.saturating_sub(2).max(1))
        .into_iter()
        .enumerate()
    {
        let prefix = if i == 0 { format!("{heart} ") } else { "  ".to_string() };
        lines.push(Line::from(vec![
            Span::styled(prefix, Style::default().fg(COLOR_HEART)),
            Span::styled(
                piece.into_owned(),
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            ),
        ]));
    }
    let meta = Style::default().fg(COLOR_TEXT_SECONDARY);
    lines.push(Line::from(Span::styled(format_dimensions(&card.item), meta)));
    lines.push(Line::from(Span::styled(
        truncate(&card.item.display_url, width),
        meta,
    )));
    lines
}

fn format_dimensions(item: &MediaItem) -> String {
    match (item.dimensions.width, item.dimensions.height) {
        (Some(w), Some(h)) => format!("{w:.0}×{h:.0}"),
        _ => "size unknown".to_string(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Batch, MockFeedService};
    use crate::layout::Dimensions;

    fn item(id: &str, w: f64, h: f64) -> MediaItem {
        MediaItem {
            id: id.into(),
            title: format!("GIF {id}"),
            dimensions: Dimensions::new(w, h),
            ..Default::default()
        }
    }

    fn grid_with(items: &[MediaItem]) -> GridView {
        let mut grid = GridView::new(Estimator::default());
        grid.render_empty_layout(2, None);
        for (i, it) in items.iter().enumerate() {
            let card = grid.render_item(it, false);
            grid.append_to_column(i % 2, card);
        }
        grid
    }

    #[test]
    fn card_rows_follow_estimate() {
        let grid = GridView::new(Estimator::default());
        // 200x200 -> 208 units -> 10 rows
        assert_eq!(grid.render_item(&item("a", 200.0, 200.0), false).rows, 10);
        // very wide gifs still get a readable card
        assert_eq!(
            grid.render_item(&item("b", 2000.0, 10.0), false).rows,
            MIN_CARD_ROWS
        );
    }

    #[test]
    fn row_lookup_and_starts() {
        let grid = grid_with(&[
            item("a", 200.0, 200.0),
            item("b", 200.0, 200.0),
            item("c", 200.0, 400.0),
        ]);
        assert_eq!(grid.card_start(0, 1), 10);
        assert_eq!(grid.index_at_row(0, 0), Some(0));
        assert_eq!(grid.index_at_row(0, 12), Some(1));
        assert_eq!(grid.index_at_row(0, 500), Some(1));
        assert_eq!(grid.index_at_row(1, 3), Some(0));
        assert_eq!(grid.content_rows(), 30);
    }

    #[test]
    fn favorite_flag_updates_in_place() {
        let mut grid = grid_with(&[item("a", 200.0, 200.0), item("b", 200.0, 200.0)]);
        grid.set_favorite("b", true);
        assert!(grid.card(Selection { column: 1, index: 0 }).unwrap().is_favorite);
        assert!(!grid.card(Selection { column: 0, index: 0 }).unwrap().is_favorite);
    }

    #[test]
    fn remove_and_notice() {
        let mut grid = grid_with(&[item("a", 200.0, 200.0)]);
        assert!(grid.remove(Selection { column: 1, index: 0 }).is_none());
        assert!(grid.remove(Selection { column: 0, index: 0 }).is_some());
        assert_eq!(grid.card_count(), 0);
        grid.render_failure_state("boom");
        assert_eq!(grid.notice(), Some(&Notice::Failure("boom".into())));
        grid.render_empty_layout(4, Some("hdr"));
        assert!(grid.notice().is_none());
        assert_eq!(grid.columns().len(), 4);
    }

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate("short", 10), "short");
        let cut = truncate("https://media.giphy.com/media/abc/200.gif", 12);
        assert!(cut.ends_with('…'));
        assert!(cut.width() <= 12);
    }

    #[test]
    fn card_lines_show_heart() {
        let grid = GridView::new(Estimator::default());
        let card = grid.render_item(&item("a", 200.0, 100.0), true);
        let lines = card_lines(&card, 30);
        let first: String = lines[0].spans.iter().map(|s| s.content.to_string()).collect();
        assert!(first.starts_with(FULL_HEART));
        assert!(first.contains("GIF a"));
    }

    fn model_with(store: Arc<storage::Store>) -> Model {
        Model::new(Options {
            status_message: String::new(),
            grid: GridConfig::default(),
            feed_service: Arc::new(MockFeedService::with_size(8)),
            upload_service: None,
            store,
            config_path: String::new(),
        })
    }

    fn settle_current(model: &mut Model, items: Vec<MediaItem>) {
        let token = model.controller.session().token;
        model.handle_async_response(AsyncResponse::Feed {
            token,
            result: Ok(Batch { items }),
        });
    }

    fn pending_random_id(model: &Model) -> u64 {
        model.pending_random.map(|(id, _)| id).expect("random requested")
    }

    #[test]
    fn empty_favorites_show_message_then_random_suggestion() {
        let store = Arc::new(storage::Store::open_in_memory().unwrap());
        let mut model = model_with(store.clone());
        model.enter_favorites().unwrap();
        settle_current(&mut model, Vec::new());
        assert_eq!(
            model.grid.notice(),
            Some(&Notice::Empty(NO_FAVORITES.to_string()))
        );
        assert_eq!(model.grid.card_count(), 0);

        let request_id = pending_random_id(&model);
        model.handle_async_response(AsyncResponse::Random {
            request_id,
            result: Ok(Some(item("r1", 200.0, 200.0))),
        });
        assert_eq!(
            model.grid.notice(),
            Some(&Notice::Empty(NO_FAVORITES_RANDOM.to_string()))
        );
        assert_eq!(model.grid.columns()[0].len(), 1);
        assert_eq!(model.grid.card_count(), 1);

        model.toggle_favorite().unwrap();
        assert!(model.grid.notice().is_none());
        assert_eq!(store.favorite_ids().unwrap(), vec!["r1"]);
        assert!(model.grid.columns()[0][0].is_favorite);
    }

    #[test]
    fn random_suggestion_dropped_after_leaving_favorites() {
        let store = Arc::new(storage::Store::open_in_memory().unwrap());
        let mut model = model_with(store);
        model.enter_favorites().unwrap();
        settle_current(&mut model, Vec::new());
        let request_id = pending_random_id(&model);

        model.enter_grid(GridKind::Trending, Feed::Trending);
        assert!(model.pending_random.is_none());
        model.handle_async_response(AsyncResponse::Random {
            request_id,
            result: Ok(Some(item("late", 200.0, 200.0))),
        });
        assert_eq!(model.grid.card_count(), 0);
        assert!(model.grid.notice().is_none());
    }

    #[test]
    fn unfavoriting_last_card_restores_empty_state() {
        let store = Arc::new(storage::Store::open_in_memory().unwrap());
        store.add_favorite("f1").unwrap();
        let mut model = model_with(store.clone());
        model.enter_favorites().unwrap();
        settle_current(&mut model, vec![item("f1", 200.0, 150.0)]);
        assert_eq!(model.grid.card_count(), 1);
        assert!(model.grid.columns()[0][0].is_favorite);

        model.toggle_favorite().unwrap();
        assert_eq!(model.grid.card_count(), 0);
        assert_eq!(
            model.grid.notice(),
            Some(&Notice::Empty(NO_FAVORITES.to_string()))
        );
        assert!(store.favorite_ids().unwrap().is_empty());
        assert!(model.pending_random.is_some());
    }

    #[test]
    fn deleting_uploads_updates_store_and_grid() {
        let store = Arc::new(storage::Store::open_in_memory().unwrap());
        store.add_upload("u1").unwrap();
        store.add_upload("u2").unwrap();
        let mut model = model_with(store.clone());
        model.enter_uploads().unwrap();
        settle_current(
            &mut model,
            vec![item("u1", 200.0, 200.0), item("u2", 200.0, 200.0)],
        );
        assert_eq!(model.grid.card_count(), 2);

        model.delete_upload().unwrap();
        assert_eq!(store.uploaded_ids().unwrap(), vec!["u2"]);
        assert_eq!(model.grid.card_count(), 1);
        assert!(model.grid.notice().is_none());

        model.selected = Selection { column: 1, index: 0 };
        model.delete_upload().unwrap();
        assert!(store.uploaded_ids().unwrap().is_empty());
        assert_eq!(model.grid.card_count(), 0);
        assert_eq!(
            model.grid.notice(),
            Some(&Notice::Empty(NO_UPLOADS.to_string()))
        );
    }

    #[test]
    fn delete_outside_uploads_leaves_store_alone() {
        let store = Arc::new(storage::Store::open_in_memory().unwrap());
        store.add_upload("u1").unwrap();
        let mut model = model_with(store.clone());
        settle_current(&mut model, vec![item("u1", 200.0, 200.0)]);
        model.delete_upload().unwrap();
        assert_eq!(store.uploaded_ids().unwrap(), vec!["u1"]);
        assert_eq!(model.grid.card_count(), 1);
    }

    #[test]
    fn finished_upload_is_recorded() {
        let store = Arc::new(storage::Store::open_in_memory().unwrap());
        let mut model = model_with(store.clone());
        model.upload_in_progress = true;
        model.handle_async_response(AsyncResponse::Upload {
            path: PathBuf::from("cat.gif"),
            result: Ok("new1".to_string()),
        });
        assert!(!model.upload_in_progress);
        assert_eq!(store.uploaded_ids().unwrap(), vec!["new1"]);
    }

    #[test]
    fn about_overlay_closes_on_next_key() {
        let store = Arc::new(storage::Store::open_in_memory().unwrap());
        let mut model = model_with(store);
        model.dispatch(Action::About).unwrap();
        assert_eq!(model.overlay, Some(Overlay::About));
        assert!(!model.handle_key(KeyCode::Char('x')).unwrap());
        assert!(model.overlay.is_none());
    }
}
