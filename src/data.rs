use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rand::seq::SliceRandom;

use crate::giphy::{self, GiphyError};
use crate::layout::Dimensions;

pub const UNTITLED: &str = "Untitled GIF";

/// A GIF as the grid sees it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    pub display_url: String,
    pub page_url: String,
    pub dimensions: Dimensions,
    pub username: String,
    pub rating: String,
    pub imported_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub items: Vec<MediaItem>,
}

/// Fetch collaborators consumed by the grid controller and the views.
pub trait FeedService: Send + Sync {
    fn trending(&self, offset: usize, limit: usize) -> Result<Batch, GiphyError>;
    fn search(&self, query: &str, offset: usize, limit: usize) -> Result<Batch, GiphyError>;
    fn by_ids(&self, ids: &[String]) -> Result<Batch, GiphyError>;
    fn by_id(&self, id: &str) -> Result<Option<MediaItem>, GiphyError>;
    fn random(&self) -> Result<Option<MediaItem>, GiphyError>;
}

pub trait UploadService: Send + Sync {
    fn upload(&self, path: &Path) -> Result<String>;
}

pub fn normalize(gif: giphy::Gif) -> MediaItem {
    let images = &gif.images;
    let display_url = images
        .fixed_height
        .as_ref()
        .and_then(|r| r.url.clone())
        .or_else(|| images.original.as_ref().and_then(|r| r.url.clone()))
        .or_else(|| gif.image_url.clone())
        .or_else(|| gif.image_original_url.clone())
        .or_else(|| gif.image_fixed_height_url.clone())
        .filter(|url| !url.is_empty())
        .unwrap_or_default();

    let sized = images
        .fixed_width
        .as_ref()
        .filter(|r| r.width.is_some() && r.height.is_some())
        .or(images.original.as_ref());
    let dimensions = sized
        .map(|r| Dimensions {
            width: r.width,
            height: r.height,
        })
        .unwrap_or_default();

    let title = gif
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTITLED)
        .to_string();

    MediaItem {
        page_url: gif
            .url
            .clone()
            .unwrap_or_else(|| format!("https://giphy.com/gifs/{}", gif.id)),
        id: gif.id,
        title,
        display_url,
        dimensions,
        username: gif.username.unwrap_or_default(),
        rating: gif.rating.unwrap_or_default(),
        imported_at: gif.import_datetime.unwrap_or_default(),
    }
}

fn batch_from_page(page: giphy::Page) -> Batch {
    Batch {
        items: page.gifs.into_iter().map(normalize).collect(),
    }
}

pub struct GiphyFeedService {
    client: Arc<giphy::Client>,
}

impl GiphyFeedService {
    pub fn new(client: Arc<giphy::Client>) -> Self {
        Self { client }
    }
}

impl FeedService for GiphyFeedService {
    fn trending(&self, offset: usize, limit: usize) -> Result<Batch, GiphyError> {
        self.client.trending(offset, limit).map(batch_from_page)
    }

    fn search(&self, query: &str, offset: usize, limit: usize) -> Result<Batch, GiphyError> {
        self.client.search(query, offset, limit).map(batch_from_page)
    }

    fn by_ids(&self, ids: &[String]) -> Result<Batch, GiphyError> {
        self.client.by_ids(ids).map(batch_from_page)
    }

    fn by_id(&self, id: &str) -> Result<Option<MediaItem>, GiphyError> {
        Ok(self.client.by_id(id)?.map(normalize))
    }

    fn random(&self) -> Result<Option<MediaItem>, GiphyError> {
        Ok(self.client.random()?.map(normalize))
    }
}

pub struct GiphyUploadService {
    client: Arc<giphy::Client>,
}

impl GiphyUploadService {
    pub fn new(client: Arc<giphy::Client>) -> Self {
        Self { client }
    }
}

impl UploadService for GiphyUploadService {
    fn upload(&self, path: &Path) -> Result<String> {
        anyhow::ensure!(path.is_file(), "upload: {} is not a file", path.display());
        let mime = tree_magic_mini::from_filepath(path).unwrap_or("application/octet-stream");
        anyhow::ensure!(
            mime == "image/gif",
            "upload: {} is {mime}, expected a GIF",
            path.display()
        );
        self.client
            .upload(path)
            .with_context(|| format!("upload {}", path.display()))
    }
}

/// Offline catalogue used by `--offline` and tests.
pub struct MockFeedService {
    catalogue: Vec<MediaItem>,
}

impl Default for MockFeedService {
    fn default() -> Self {
        Self::with_size(120)
    }
}

impl MockFeedService {
    pub fn with_size(count: usize) -> Self {
        let shapes = [(200.0, 200.0), (200.0, 112.0), (200.0, 356.0), (200.0, 150.0)];
        let catalogue = (0..count)
            .map(|i| {
                let (w, h) = shapes[i % shapes.len()];
                mock_item(&format!("mock{i}"), w, h)
            })
            .collect();
        Self { catalogue }
    }

    fn window(items: Vec<&MediaItem>, offset: usize, limit: usize) -> Batch {
        Batch {
            items: items.into_iter().skip(offset).take(limit).cloned().collect(),
        }
    }
}

impl FeedService for MockFeedService {
    fn trending(&self, offset: usize, limit: usize) -> Result<Batch, GiphyError> {
        Ok(Self::window(self.catalogue.iter().collect(), offset, limit))
    }

    fn search(&self, query: &str, offset: usize, limit: usize) -> Result<Batch, GiphyError> {
        let needle = query.to_lowercase();
        let hits = self
            .catalogue
            .iter()
            .filter(|item| item.title.to_lowercase().contains(&needle))
            .collect();
        Ok(Self::window(hits, offset, limit))
    }

    fn by_ids(&self, ids: &[String]) -> Result<Batch, GiphyError> {
        let items = ids
            .iter()
            .map(|id| {
                self.catalogue
                    .iter()
                    .find(|item| &item.id == id)
                    .cloned()
                    .unwrap_or_else(|| mock_item(id, 200.0, 200.0))
            })
            .collect();
        Ok(Batch { items })
    }

    fn by_id(&self, id: &str) -> Result<Option<MediaItem>, GiphyError> {
        Ok(self.catalogue.iter().find(|item| item.id == id).cloned())
    }

    fn random(&self) -> Result<Option<MediaItem>, GiphyError> {
        let mut rng = rand::thread_rng();
        Ok(self.catalogue.choose(&mut rng).cloned())
    }
}

fn mock_item(id: &str, width: f64, height: f64) -> MediaItem {
    MediaItem {
        id: id.to_string(),
        title: format!("Sample GIF {id}"),
        display_url: format!("https://media.giphy.com/media/{id}/200.gif"),
        page_url: format!("https://giphy.com/gifs/{id}"),
        dimensions: Dimensions::new(width, height),
        username: "gifgrid".into(),
        rating: "g".into(),
        imported_at: String::new(),
    }
}
