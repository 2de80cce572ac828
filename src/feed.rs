use std::fmt;

/// What a session browses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    Trending,
    Search { query: String },
    /// Fixed list fetched once, e.g. favorites or uploads.
    ByIds { ids: Vec<String>, empty_text: String },
}

impl Feed {
    /// Search for `query`; blank queries mean Trending.
    pub fn search(query: &str) -> Self {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            Feed::Trending
        } else {
            Feed::Search {
                query: trimmed.to_string(),
            }
        }
    }

    pub fn by_ids(ids: Vec<String>, empty_text: impl Into<String>) -> Self {
        Feed::ByIds {
            ids,
            empty_text: empty_text.into(),
        }
    }

    pub fn mode(&self) -> FeedMode {
        match self {
            Feed::Trending => FeedMode::Trending,
            Feed::Search { .. } => FeedMode::Search,
            Feed::ByIds { .. } => FeedMode::ByIdSet,
        }
    }

    pub fn is_paginated(&self) -> bool {
        !matches!(self, Feed::ByIds { .. })
    }

    pub fn empty_text(&self) -> &str {
        match self {
            Feed::ByIds { empty_text, .. } => empty_text,
            _ => "No GIFs found.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FeedMode {
    #[default]
    None,
    Trending,
    Search,
    ByIdSet,
}

impl fmt::Display for FeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FeedMode::None => "none",
            FeedMode::Trending => "trending",
            FeedMode::Search => "search",
            FeedMode::ByIdSet => "by-id",
        };
        f.write_str(label)
    }
}

/// Identity of one enter..exit activation. Results carrying an old token are stale.
pub type SessionToken = u64;

/// The single live browsing session. Replaced wholesale on enter and exit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FeedSession {
    pub token: SessionToken,
    pub feed: Option<Feed>,
    pub offset: usize,
    pub in_flight: bool,
    pub exhausted: bool,
}

impl FeedSession {
    pub fn idle(token: SessionToken) -> Self {
        Self {
            token,
            ..Default::default()
        }
    }

    pub fn start(token: SessionToken, feed: Feed) -> Self {
        Self {
            token,
            feed: Some(feed),
            ..Default::default()
        }
    }

    pub fn mode(&self) -> FeedMode {
        self.feed.as_ref().map(Feed::mode).unwrap_or_default()
    }

    pub fn query(&self) -> &str {
        match &self.feed {
            Some(Feed::Search { query }) => query,
            _ => "",
        }
    }

    pub fn is_active(&self) -> bool {
        self.feed.is_some()
    }
}
