//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the guide section: indexing the posts
//! ([`crate::indexer`]), paginating them ([`crate::paginate`]), aggregating
//! their tags ([`crate::tag`]), emitting routes and metadata artifacts
//! ([`crate::routes`]), and generating the feeds ([`crate::feed`]).

use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::feed::{self, write_feeds};
use crate::indexer::{self, Indexer};
use crate::paginate::{paginate, Page};
use crate::post::Post;
use crate::routes::{self, create_routes, ArtifactStore, FsArtifactStore, Route};
use crate::tag::{aggregate_tags, TagIndex};
use crate::url::normalize_url;

/// Everything derived from the guide sources in one build.
#[derive(Clone, Debug, PartialEq)]
pub struct Content {
    /// The posts, newest first, with neighbor links and resolved tags.
    pub posts: Vec<Post>,
    pub pages: Vec<Page>,
    pub tags: TagIndex,
}

/// A `<link rel="alternate">` advertising a feed in the page head.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct HeadTag {
    pub rel: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub href: String,
    pub title: String,
}

/// The route manifest written for the render stage.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Manifest<'a> {
    pub routes: &'a [Route],
    pub head_tags: &'a [HeadTag],
}

/// What a build produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Summary {
    pub posts: usize,
    pub routes: usize,
    pub feeds: Vec<PathBuf>,
}

/// Indexes the guides, paginates them, and aggregates their tags. Returns
/// `Ok(None)` when the content directory doesn't exist, in which case no
/// routes or feeds should be generated.
pub fn load_content(config: &Config) -> Result<Option<Content>> {
    let mut posts = match Indexer::new(config).index()? {
        Some(posts) => posts,
        None => return Ok(None),
    };

    let base_page_url = config.base_page_url();
    let pages = paginate(&posts, &base_page_url, config.options.posts_per_page);
    let tags = aggregate_tags(&mut posts, &normalize_url(&[base_page_url.as_str(), "tags"]));
    info!(
        posts = posts.len(),
        pages = pages.len(),
        tags = tags.tags.len(),
        "loaded guide content"
    );

    Ok(Some(Content { posts, pages, tags }))
}

/// Writes the configured feeds for the loaded posts. Does nothing when feeds
/// are disabled.
pub fn post_build(config: &Config, content: &Content) -> Result<Vec<PathBuf>> {
    if config.options.feed.is_none() {
        return Ok(Vec::new());
    }
    Ok(write_feeds(config, &content.posts)?)
}

/// The head tags advertising each enabled feed.
pub fn head_tags(config: &Config) -> Vec<HeadTag> {
    let feed = match &config.options.feed {
        Some(feed) => feed,
        None => return Vec::new(),
    };
    feed.kind
        .formats()
        .iter()
        .map(|format| HeadTag {
            rel: String::from("alternate"),
            mime_type: format.mime_type().to_owned(),
            href: normalize_url(&[
                config.site.base_url.as_str(),
                config.options.route_base_path.as_str(),
                format.file_name(),
            ]),
            title: format!("{} Guide {} Feed", config.site.title, format.label()),
        })
        .collect()
}

/// The glob patterns whose matches are guide sources, for file watchers.
pub fn watch_patterns(config: &Config) -> Vec<String> {
    config
        .options
        .include
        .iter()
        .map(|glob| format!("{}/{}", config.content_path.display(), glob))
        .collect()
}

/// Builds the guide section from a [`Config`]: loads the content, writes the
/// metadata artifacts and the `routes.json` manifest under
/// `{generated_directory}/guides`, and writes the feeds.
pub fn build_site(config: &Config) -> Result<Summary> {
    let content = match load_content(config)? {
        Some(content) => content,
        None => return Ok(Summary::default()),
    };

    let store = FsArtifactStore::new(&config.generated_directory.join("guides"))?;
    let routes = create_routes(config, &content, &store)?;
    let manifest = Manifest {
        routes: &routes,
        head_tags: &head_tags(config),
    };
    let manifest_path = store.directory().join("routes.json");
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?).map_err(|err| {
        Error::Manifest {
            path: manifest_path.clone(),
            err,
        }
    })?;

    let feeds = post_build(config, &content)?;
    Ok(Summary {
        posts: content.posts.len(),
        routes: routes.len(),
        feeds,
    })
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building the guide section.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned for errors during indexing.
    #[error(transparent)]
    Index(#[from] indexer::Error),

    /// Returned for errors creating routes or their artifacts.
    #[error(transparent)]
    Routes(#[from] routes::Error),

    /// Returned for errors writing the feeds.
    #[error(transparent)]
    Feed(#[from] feed::Error),

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    /// Returned when the route manifest can't be written.
    #[error("writing route manifest `{}`: {err}", .path.display())]
    Manifest { path: PathBuf, err: std::io::Error },
}
