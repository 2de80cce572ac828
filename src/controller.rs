//! Grid pagination and placement engine.
//!
//! The controller owns the live [`FeedSession`], the column accumulators and
//! the scroll trigger. Fetches leave through a [`Dispatcher`] and come back
//! through [`Controller::settle`], tagged with the session token they were
//! issued under; anything tagged with an older token is dropped.

use tracing::{debug, info, warn};

use crate::data::{Batch, MediaItem};
use crate::favorites::{self, FavoriteStore};
use crate::feed::{Feed, FeedSession, SessionToken};
use crate::giphy::GiphyError;
use crate::layout::{Balancer, Columns};
use crate::scroll::{ScrollTrigger, Viewport};

pub const DEFAULT_PAGE_SIZE: usize = 25;
pub const DEFAULT_COLUMNS: usize = 4;
pub const FAILURE_TEXT: &str = "Failed to load GIFs.";

#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<GiphyError> for FetchError {
    fn from(err: GiphyError) -> Self {
        FetchError::Transport(err.to_string())
    }
}

pub type FetchResult = Result<Batch, FetchError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchKind {
    Trending { offset: usize, limit: usize },
    Search { query: String, offset: usize, limit: usize },
    ByIds { ids: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub token: SessionToken,
    pub kind: FetchKind,
}

/// Issues a fetch and returns immediately. The result must eventually be
/// handed to [`Controller::settle`] with the same token.
pub trait Dispatcher {
    fn dispatch(&mut self, request: FetchRequest);
}

/// Rendering surface driven by the controller.
pub trait Surface {
    type Markup;

    fn render_item(&self, item: &MediaItem, is_favorite: bool) -> Self::Markup;
    fn render_empty_layout(&mut self, columns: usize, header: Option<&str>);
    fn append_to_column(&mut self, column: usize, markup: Self::Markup);
    fn render_empty_state(&mut self, text: &str);
    fn render_failure_state(&mut self, text: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// Originating session is gone; nothing was touched.
    Stale,
    Empty,
    Placed { count: usize, exhausted: bool },
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub struct GridConfig {
    pub page_size: usize,
    pub columns: usize,
    pub balancer: Balancer,
    pub scroll_threshold: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            columns: DEFAULT_COLUMNS,
            balancer: Balancer::default(),
            scroll_threshold: crate::scroll::DEFAULT_THRESHOLD,
        }
    }
}

pub struct Controller<D, F> {
    config: GridConfig,
    dispatcher: D,
    favorites: F,
    session: FeedSession,
    columns: Columns,
    trigger: ScrollTrigger,
    next_token: SessionToken,
}

impl<D, F> Controller<D, F>
where
    D: Dispatcher,
    F: FavoriteStore,
{
    pub fn new(config: GridConfig, dispatcher: D, favorites: F) -> Self {
        let config = GridConfig {
            page_size: config.page_size.max(1),
            columns: config.columns.max(1),
            ..config
        };
        Self {
            columns: Columns::new(config.columns),
            trigger: ScrollTrigger::new(config.scroll_threshold),
            config,
            dispatcher,
            favorites,
            session: FeedSession::idle(0),
            next_token: 1,
        }
    }

    pub fn session(&self) -> &FeedSession {
        &self.session
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    pub fn trigger(&self) -> &ScrollTrigger {
        &self.trigger
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn favorites(&self) -> &F {
        &self.favorites
    }

    /// Starts a fresh session for `feed`, ending any current one first.
    pub fn enter<S: Surface>(&mut self, feed: Feed, surface: &mut S) {
        self.exit();

        let token = self.allocate_token();
        let header = match &feed {
            Feed::Search { query } => Some(format!("Search results for: \"{query}\"")),
            _ => None,
        };
        let paginated = feed.is_paginated();
        info!(token, mode = %feed.mode(), "enter feed session");
        self.session = FeedSession::start(token, feed);
        self.columns.reset();

        surface.render_empty_layout(self.columns.count(), header.as_deref());
        self.request_next_page();
        if paginated {
            self.trigger.register(token);
        }
    }

    /// `enter(Search)`, or Trending for a blank query.
    pub fn enter_search<S: Surface>(&mut self, query: &str, surface: &mut S) {
        self.enter(Feed::search(query), surface);
    }

    /// Ends the current session. Repeated calls are no-ops.
    pub fn exit(&mut self) {
        self.trigger.unregister();
        if !self.session.is_active() {
            return;
        }
        debug!(token = self.session.token, "exit feed session");
        let token = self.allocate_token();
        self.session = FeedSession::idle(token);
        self.columns.reset();
    }

    /// Scroll notification from the viewport. Returns whether a fetch was issued.
    pub fn on_scroll(&mut self, viewport: Viewport) -> bool {
        if !self.trigger.fires(viewport) {
            return false;
        }
        self.request_next_page()
    }

    /// Issues the next fetch for the active feed unless idle, busy or exhausted.
    pub fn request_next_page(&mut self) -> bool {
        let Some(feed) = &self.session.feed else {
            return false;
        };
        if self.session.in_flight {
            return false;
        }
        if self.session.exhausted {
            return false;
        }

        let offset = self.session.offset;
        let limit = self.config.page_size;
        let kind = match feed {
            Feed::Trending => FetchKind::Trending { offset, limit },
            Feed::Search { query } => FetchKind::Search {
                query: query.clone(),
                offset,
                limit,
            },
            Feed::ByIds { ids, .. } => FetchKind::ByIds { ids: ids.clone() },
        };

        self.session.in_flight = true;
        let token = self.session.token;
        debug!(token, offset, "request next page");
        self.dispatcher.dispatch(FetchRequest { token, kind });
        true
    }

    /// Applies a fetch result issued under `token`.
    pub fn settle<S: Surface>(
        &mut self,
        token: SessionToken,
        result: FetchResult,
        surface: &mut S,
    ) -> Settlement {
        if token != self.session.token || !self.session.in_flight {
            debug!(
                token,
                current = self.session.token,
                "discarding stale fetch result"
            );
            return Settlement::Stale;
        }
        let Some(feed) = self.session.feed.as_ref() else {
            return Settlement::Stale;
        };

        let outcome = match result {
            Ok(batch) if batch.items.is_empty() => {
                if self.session.offset == 0 {
                    surface.render_empty_state(feed.empty_text());
                }
                self.session.exhausted = true;
                Settlement::Empty
            }
            Ok(batch) => {
                let count = batch.items.len();
                if !feed.is_paginated() || count < self.config.page_size {
                    self.session.exhausted = true;
                }
                let tagged = favorites::tag(&self.favorites, &batch.items);
                let assignment = self.config.balancer.place(
                    batch.items.iter().map(|item| item.dimensions),
                    &mut self.columns,
                );
                for (entry, column) in tagged.iter().zip(assignment) {
                    let markup = surface.render_item(entry.item, entry.is_favorite);
                    surface.append_to_column(column, markup);
                }
                self.session.offset += count;
                Settlement::Placed {
                    count,
                    exhausted: self.session.exhausted,
                }
            }
            Err(err) => {
                warn!(token, offset = self.session.offset, error = %err, "feed fetch failed");
                if self.session.offset == 0 {
                    surface.render_failure_state(FAILURE_TEXT);
                }
                self.session.exhausted = true;
                Settlement::Failed
            }
        };

        self.session.in_flight = false;
        outcome
    }

    fn allocate_token(&mut self) -> SessionToken {
        let token = self.next_token;
        self.next_token = self.next_token.wrapping_add(1);
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Dimensions, Placement};
    use std::collections::HashSet;

    #[derive(Default)]
    struct Recorder {
        issued: Vec<FetchRequest>,
    }

    impl Dispatcher for Recorder {
        fn dispatch(&mut self, request: FetchRequest) {
            self.issued.push(request);
        }
    }

    #[derive(Debug, Default)]
    struct Grid {
        layouts: Vec<(usize, Option<String>)>,
        columns: Vec<Vec<String>>,
        empty: Vec<String>,
        failures: Vec<String>,
    }

    impl Surface for Grid {
        type Markup = String;

        fn render_item(&self, item: &MediaItem, is_favorite: bool) -> String {
            format!("{}{}", item.id, if is_favorite { "*" } else { "" })
        }

        fn render_empty_layout(&mut self, columns: usize, header: Option<&str>) {
            self.layouts.push((columns, header.map(str::to_string)));
            self.columns = vec![Vec::new(); columns];
            self.empty.clear();
            self.failures.clear();
        }

        fn append_to_column(&mut self, column: usize, markup: String) {
            self.columns[column].push(markup);
        }

        fn render_empty_state(&mut self, text: &str) {
            self.empty.push(text.to_string());
        }

        fn render_failure_state(&mut self, text: &str) {
            self.failures.push(text.to_string());
        }
    }

    type TestController = Controller<Recorder, HashSet<String>>;

    fn controller() -> TestController {
        controller_with(HashSet::new())
    }

    fn controller_with(favorites: HashSet<String>) -> TestController {
        Controller::new(GridConfig::default(), Recorder::default(), favorites)
    }

    fn items(prefix: &str, count: usize) -> Batch {
        Batch {
            items: (0..count)
                .map(|i| MediaItem {
                    id: format!("{prefix}{i}"),
                    dimensions: Dimensions::new(200.0, 200.0),
                    ..Default::default()
                })
                .collect(),
        }
    }

    fn last_token(c: &TestController) -> SessionToken {
        c.dispatcher().issued.last().unwrap().token
    }

    fn near_bottom() -> Viewport {
        Viewport {
            scroll_offset: 1000.0,
            viewport_height: 600.0,
            content_height: 1700.0,
        }
    }

    #[test]
    fn enter_issues_first_page_and_arms_trigger() {
        let mut c = controller();
        let mut grid = Grid::default();
        c.enter(Feed::Trending, &mut grid);
        assert_eq!(grid.layouts, vec![(4, None)]);
        assert_eq!(
            c.dispatcher().issued[0].kind,
            FetchKind::Trending {
                offset: 0,
                limit: 25
            }
        );
        assert!(c.session().in_flight);
        assert_eq!(c.trigger().registrations(), 1);
    }

    #[test]
    fn switching_feeds_leaves_one_session() {
        let mut c = controller();
        let mut grid = Grid::default();
        c.enter(Feed::Trending, &mut grid);
        let trending = last_token(&c);
        c.enter(Feed::search("cats"), &mut grid);

        let session = c.session();
        assert_eq!(session.mode(), crate::feed::FeedMode::Search);
        assert_eq!(session.query(), "cats");
        assert_eq!(session.offset, 0);
        assert_eq!(c.trigger().registrations(), 1);
        assert_ne!(c.trigger().registered_for(), Some(trending));
        assert_eq!(
            grid.layouts.last().unwrap().1.as_deref(),
            Some("Search results for: \"cats\"")
        );
    }

    #[test]
    fn blank_search_behaves_like_trending() {
        let mut a = controller();
        let mut b = controller();
        let (mut ga, mut gb) = (Grid::default(), Grid::default());
        a.enter(Feed::Trending, &mut ga);
        b.enter_search("  ", &mut gb);
        assert_eq!(a.session().mode(), b.session().mode());
        assert_eq!(a.dispatcher().issued, b.dispatcher().issued);
        assert_eq!(ga.layouts, gb.layouts);
    }

    #[test]
    fn stale_result_is_discarded() {
        let mut c = controller();
        let mut grid = Grid::default();
        c.enter(Feed::Trending, &mut grid);
        let old = last_token(&c);
        c.exit();
        c.enter(Feed::search("dogs"), &mut grid);
        let before = c.session().clone();

        let outcome = c.settle(old, Ok(items("t", 25)), &mut grid);
        assert_eq!(outcome, Settlement::Stale);
        assert_eq!(c.session(), &before);
        assert!(grid.columns.iter().all(Vec::is_empty));
        assert_eq!(c.columns().total(), 0.0);
    }

    #[test]
    fn stale_after_plain_exit() {
        let mut c = controller();
        let mut grid = Grid::default();
        c.enter(Feed::Trending, &mut grid);
        let old = last_token(&c);
        c.exit();
        assert_eq!(c.settle(old, Err(FetchError::Transport("x".into())), &mut grid), Settlement::Stale);
        assert!(grid.failures.is_empty());
        assert_eq!(c.trigger().registrations(), 0);
    }

    #[test]
    fn in_flight_blocks_duplicate_requests() {
        let mut c = controller();
        let mut grid = Grid::default();
        c.enter(Feed::Trending, &mut grid);
        assert!(!c.on_scroll(near_bottom()));
        assert!(!c.request_next_page());
        assert_eq!(c.dispatcher().issued.len(), 1);
    }

    #[test]
    fn full_page_advances_offset() {
        let mut c = controller();
        let mut grid = Grid::default();
        c.enter(Feed::Trending, &mut grid);
        let token = last_token(&c);
        let outcome = c.settle(token, Ok(items("a", 25)), &mut grid);
        assert_eq!(
            outcome,
            Settlement::Placed {
                count: 25,
                exhausted: false
            }
        );
        assert_eq!(c.session().offset, 25);
        assert!(!c.session().in_flight);
        assert_eq!(grid.columns.iter().map(Vec::len).sum::<usize>(), 25);

        assert!(c.on_scroll(near_bottom()));
        assert_eq!(
            c.dispatcher().issued[1].kind,
            FetchKind::Trending {
                offset: 25,
                limit: 25
            }
        );
    }

    #[test]
    fn far_from_bottom_does_not_fetch() {
        let mut c = controller();
        let mut grid = Grid::default();
        c.enter(Feed::Trending, &mut grid);
        c.settle(last_token(&c), Ok(items("a", 25)), &mut grid);
        let far = Viewport {
            scroll_offset: 0.0,
            viewport_height: 600.0,
            content_height: 5000.0,
        };
        assert!(!c.on_scroll(far));
        assert_eq!(c.dispatcher().issued.len(), 1);
    }

    #[test]
    fn empty_first_page_marks_once() {
        let mut c = controller();
        let mut grid = Grid::default();
        c.enter(Feed::search("zzzz"), &mut grid);
        let token = last_token(&c);
        assert_eq!(c.settle(token, Ok(Batch::default()), &mut grid), Settlement::Empty);
        assert!(c.session().exhausted);
        for _ in 0..5 {
            assert!(!c.on_scroll(near_bottom()));
        }
        assert_eq!(c.settle(token, Ok(Batch::default()), &mut grid), Settlement::Stale);
        assert_eq!(grid.empty, vec!["No GIFs found.".to_string()]);
        assert_eq!(c.dispatcher().issued.len(), 1);
    }

    #[test]
    fn short_page_places_then_exhausts() {
        let mut c = controller();
        let mut grid = Grid::default();
        c.enter(Feed::Trending, &mut grid);
        c.settle(last_token(&c), Ok(items("a", 25)), &mut grid);
        c.on_scroll(near_bottom());
        let outcome = c.settle(last_token(&c), Ok(items("b", 7)), &mut grid);
        assert_eq!(
            outcome,
            Settlement::Placed {
                count: 7,
                exhausted: true
            }
        );
        assert_eq!(c.session().offset, 32);
        for _ in 0..3 {
            assert!(!c.on_scroll(near_bottom()));
        }
        assert!(c.session().exhausted);
        assert_eq!(c.dispatcher().issued.len(), 2);
        assert_eq!(grid.columns.iter().map(Vec::len).sum::<usize>(), 32);
    }

    #[test]
    fn first_page_failure_renders_marker() {
        let mut c = controller();
        let mut grid = Grid::default();
        c.enter(Feed::Trending, &mut grid);
        let outcome = c.settle(
            last_token(&c),
            Err(FetchError::Transport("503".into())),
            &mut grid,
        );
        assert_eq!(outcome, Settlement::Failed);
        assert_eq!(grid.failures, vec![FAILURE_TEXT.to_string()]);
        assert!(c.session().exhausted);
        assert!(!c.session().in_flight);
        assert_eq!(c.session().offset, 0);
    }

    #[test]
    fn later_failure_is_silent() {
        let mut c = controller();
        let mut grid = Grid::default();
        c.enter(Feed::Trending, &mut grid);
        c.settle(last_token(&c), Ok(items("a", 25)), &mut grid);
        c.on_scroll(near_bottom());
        c.settle(last_token(&c), Err(FetchError::Transport("reset".into())), &mut grid);
        assert!(grid.failures.is_empty());
        assert_eq!(c.session().offset, 25);
        assert!(!c.on_scroll(near_bottom()));
        assert_eq!(grid.columns.iter().map(Vec::len).sum::<usize>(), 25);
    }

    #[test]
    fn by_ids_is_one_shot() {
        let mut c = controller();
        let mut grid = Grid::default();
        let ids: Vec<String> = (0..30).map(|i| format!("f{i}")).collect();
        c.enter(Feed::by_ids(ids.clone(), "No favorites"), &mut grid);
        assert_eq!(c.trigger().registrations(), 0);
        assert_eq!(c.dispatcher().issued[0].kind, FetchKind::ByIds { ids });
        let outcome = c.settle(last_token(&c), Ok(items("f", 30)), &mut grid);
        assert_eq!(
            outcome,
            Settlement::Placed {
                count: 30,
                exhausted: true
            }
        );
        assert!(!c.request_next_page());
    }

    #[test]
    fn empty_id_set_uses_feed_text() {
        let mut c = controller();
        let mut grid = Grid::default();
        c.enter(Feed::by_ids(Vec::new(), "No uploaded GIFs yet."), &mut grid);
        c.settle(last_token(&c), Ok(Batch::default()), &mut grid);
        assert_eq!(grid.empty, vec!["No uploaded GIFs yet.".to_string()]);
    }

    #[test]
    fn favorites_are_tagged() {
        let favorites: HashSet<String> = ["a1".to_string(), "a3".to_string()].into_iter().collect();
        let mut c = controller_with(favorites);
        let mut grid = Grid::default();
        c.enter(Feed::Trending, &mut grid);
        c.settle(last_token(&c), Ok(items("a", 4)), &mut grid);
        let flat: Vec<String> = grid.columns.iter().flatten().cloned().collect();
        assert_eq!(flat, vec!["a0", "a1*", "a2", "a3*"]);
    }

    #[test]
    fn equal_items_spread_across_columns() {
        let mut c = controller();
        let mut grid = Grid::default();
        c.enter(Feed::Trending, &mut grid);
        c.settle(last_token(&c), Ok(items("a", 8)), &mut grid);
        assert!(grid.columns.iter().all(|col| col.len() == 2));
        assert_eq!(grid.columns[0], vec!["a0", "a4"]);
    }

    #[test]
    fn round_robin_strategy() {
        let config = GridConfig {
            balancer: Balancer::new(Default::default(), Placement::RoundRobin),
            ..GridConfig::default()
        };
        let mut c = Controller::new(config, Recorder::default(), HashSet::new());
        let mut grid = Grid::default();
        c.enter(Feed::Trending, &mut grid);
        let mut batch = items("a", 5);
        batch.items[0].dimensions = Dimensions::new(100.0, 900.0);
        c.settle(last_token(&c), Ok(batch), &mut grid);
        assert_eq!(grid.columns[0], vec!["a0", "a4"]);
    }

    #[test]
    fn exit_resets_and_is_idempotent() {
        let mut c = controller();
        let mut grid = Grid::default();
        c.enter(Feed::Trending, &mut grid);
        c.settle(last_token(&c), Ok(items("a", 25)), &mut grid);
        c.exit();
        let after_first = c.session().clone();
        c.exit();
        assert_eq!(c.session(), &after_first);
        assert_eq!(c.session().mode(), crate::feed::FeedMode::None);
        assert_eq!(c.session().offset, 0);
        assert_eq!(c.columns().total(), 0.0);
        assert!(!c.request_next_page());
        assert!(!c.on_scroll(near_bottom()));
    }

    #[test]
    fn column_totals_never_shrink_within_session() {
        let mut c = controller();
        let mut grid = Grid::default();
        c.enter(Feed::Trending, &mut grid);
        let mut last = 0.0;
        for round in 0..4 {
            c.settle(last_token(&c), Ok(items(&format!("r{round}"), 25)), &mut grid);
            assert!(c.columns().total() >= last);
            last = c.columns().total();
            c.on_scroll(near_bottom());
        }
    }
}
