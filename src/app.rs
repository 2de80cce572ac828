use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config;
use crate::controller;
use crate::data::{self, FeedService, UploadService};
use crate::giphy;
use crate::layout::{Balancer, Estimator};
use crate::logging;
use crate::storage;
use crate::ui;

#[derive(Debug, Default, Clone)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
    pub offline: bool,
}

pub fn run() -> Result<()> {
    run_with(RunOptions::default())
}

pub fn run_with(opts: RunOptions) -> Result<()> {
    let cfg = config::load(config::LoadOptions {
        config_file: opts.config_file.clone(),
        env_prefix: None,
    })
    .context("load config")?;
    let config_path = opts.config_file.clone().or_else(config::default_path);
    let display_path = friendly_path(config_path.as_ref());

    let _log_guard = logging::init(&cfg.log).context("init logging")?;
    info!(version = crate::VERSION, offline = opts.offline, "starting gifgrid");

    let store = Arc::new(
        storage::Store::open(storage::Options {
            path: cfg.storage.path.clone(),
        })
        .context("open storage")?,
    );

    let (feed_service, upload_service, status) = build_services(&cfg.giphy, opts.offline);

    let options = ui::Options {
        status_message: status,
        grid: grid_config(&cfg.grid),
        feed_service,
        upload_service,
        store,
        config_path: display_path,
    };

    let mut model = ui::Model::new(options);
    model.run()?;

    info!("gifgrid exiting");
    Ok(())
}

fn build_services(
    cfg: &config::GiphyConfig,
    offline: bool,
) -> (
    Arc<dyn FeedService>,
    Option<Arc<dyn UploadService>>,
    String,
) {
    if offline {
        return (
            Arc::new(data::MockFeedService::default()),
            None,
            "Offline mode: browsing sample GIFs.".to_string(),
        );
    }

    let user_agent = if !cfg.user_agent.trim().is_empty() {
        cfg.user_agent.clone()
    } else {
        format!("gifgrid/{}", crate::VERSION)
    };

    match giphy::Client::new(giphy::ClientConfig {
        api_key: cfg.api_key.clone(),
        base_url: Some(cfg.base_url.clone()),
        upload_url: Some(cfg.upload_url.clone()),
        user_agent,
        rating: cfg.rating.clone(),
        timeout: Some(cfg.timeout),
        http_client: None,
    }) {
        Ok(client) => {
            let client = Arc::new(client);
            (
                Arc::new(data::GiphyFeedService::new(client.clone())),
                Some(Arc::new(data::GiphyUploadService::new(client))),
                "Browsing trending GIFs. Press / to search, ? for keys, q to quit.".to_string(),
            )
        }
        Err(err) => {
            warn!(error = %err, "giphy client unavailable, falling back to sample data");
            (
                Arc::new(data::MockFeedService::default()),
                None,
                format!("GIPHY unavailable ({err}). Showing sample GIFs."),
            )
        }
    }
}

fn grid_config(cfg: &config::GridConfig) -> controller::GridConfig {
    controller::GridConfig {
        page_size: cfg.page_size,
        columns: cfg.columns,
        balancer: Balancer::new(Estimator::new(cfg.column_width, cfg.gap), cfg.placement),
        scroll_threshold: cfg.scroll_threshold,
    }
}

fn friendly_path(path: Option<&PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/gifgrid/config.yaml".to_string()
    }
}
