//! Support for creating RSS and Atom feeds from a list of posts.

use atom_syndication::{Entry, Feed, Link, Text};
use chrono::{DateTime, FixedOffset};
use rss::validation::Validate;
use rss::{Channel, ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{Config, FeedFormat, FeedOptions};
use crate::post::Post;
use crate::url::normalize_url;

/// The `updated` timestamp of a feed with no posts.
pub const FALLBACK_UPDATED: &str = "2015-10-25T16:29:00-07:00";

/// Bundled, fully-defaulted settings for creating a feed.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedConfig {
    /// The feed id and its `alternate` link: `{site url}/{route_base_path}`.
    pub id: String,
    pub title: String,
    pub description: String,
    pub language: Option<String>,
    pub copyright: Option<String>,
    pub favicon: Option<String>,

    /// The site URL. Post permalinks are joined onto it.
    pub site_url: String,
}

impl FeedConfig {
    /// Derives a [`FeedConfig`] from the build [`Config`]. Fails if no feed
    /// options are configured.
    pub fn new(config: &Config) -> Result<FeedConfig> {
        let options: &FeedOptions = config.options.feed.as_ref().ok_or(Error::MissingOptions)?;
        let site = &config.site;
        let site_url = site.url.as_str();
        let default_title = format!("{} Guide", site.title);

        Ok(FeedConfig {
            id: normalize_url(&[site_url, config.options.route_base_path.as_str()]),
            title: options.title.clone().unwrap_or_else(|| default_title.clone()),
            description: options.description.clone().unwrap_or(default_title),
            language: options.language.clone(),
            copyright: options.copyright.clone(),
            favicon: site
                .favicon
                .as_deref()
                .map(|favicon| normalize_url(&[site_url, favicon])),
            site_url: site_url.to_owned(),
        })
    }

    fn post_link(&self, post: &Post) -> String {
        normalize_url(&[self.site_url.as_str(), post.permalink.as_str()])
    }
}

/// The feed's `updated` timestamp: the newest post's date, or
/// [`FALLBACK_UPDATED`] when there are no posts. `posts` must be sorted
/// newest first.
pub fn updated(posts: &[Post]) -> Result<DateTime<FixedOffset>> {
    match posts.first() {
        Some(post) => Ok(post.date.fixed_offset()),
        None => Ok(DateTime::parse_from_rfc3339(FALLBACK_UPDATED)?),
    }
}

/// Builds an Atom feed with one entry per post, in post order.
pub fn atom_feed(config: &FeedConfig, posts: &[Post]) -> Result<Feed> {
    let mut feed = Feed::default();
    feed.set_id(config.id.clone());
    feed.set_title(config.title.as_str());
    feed.set_updated(updated(posts)?);
    feed.set_subtitle(Some(Text::from(config.description.as_str())));
    feed.set_rights(config.copyright.as_deref().map(Text::from));
    feed.set_icon(config.favicon.clone());
    feed.set_links(vec![alternate(&config.id)]);
    feed.set_entries(
        posts
            .iter()
            .map(|post| {
                let date = post.date.fixed_offset();
                let mut entry = Entry::default();
                entry.set_id(post.id.clone());
                entry.set_title(post.title.as_str());
                entry.set_updated(date);
                entry.set_published(Some(date));
                entry.set_links(vec![alternate(&config.post_link(post))]);
                entry.set_summary(Some(Text::from(post.description.as_str())));
                entry
            })
            .collect::<Vec<Entry>>(),
    );
    Ok(feed)
}

fn alternate(href: &str) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel("alternate");
    link
}

/// Builds an RSS channel with one item per post, in post order.
pub fn rss_channel(config: &FeedConfig, posts: &[Post]) -> Result<Channel> {
    let items: Vec<Item> = posts
        .iter()
        .map(|post| {
            ItemBuilder::default()
                .title(Some(post.title.clone()))
                .link(Some(config.post_link(post)))
                .guid(Some(
                    GuidBuilder::default()
                        .value(post.id.clone())
                        .permalink(false)
                        .build(),
                ))
                .pub_date(Some(post.date.to_rfc2822()))
                .description(Some(post.description.clone()))
                .build()
        })
        .collect();

    let channel = ChannelBuilder::default()
        .title(config.title.clone())
        .link(config.id.clone())
        .description(config.description.clone())
        .language(config.language.clone())
        .copyright(config.copyright.clone())
        .last_build_date(Some(updated(posts)?.to_rfc2822()))
        .items(items)
        .build();

    channel
        .validate()
        .map_err(|err| Error::Validation(err.to_string()))?;
    Ok(channel)
}

/// Serializes the posts as a feed document of the given format into `w`.
pub fn write_feed<W: Write>(
    config: &FeedConfig,
    format: FeedFormat,
    posts: &[Post],
    w: W,
) -> Result<()> {
    match format {
        FeedFormat::Rss => {
            rss_channel(config, posts)?.write_to(w)?;
        }
        FeedFormat::Atom => {
            atom_feed(config, posts)?.write_to(w)?;
        }
    }
    Ok(())
}

/// Writes one document per format requested by the feed options into
/// `{output_directory}/{route_base_path}/`, returning the written paths.
/// Fails if no feed options are configured; a failure to write any document
/// is fatal.
pub fn write_feeds(config: &Config, posts: &[Post]) -> Result<Vec<PathBuf>> {
    let feed_config = FeedConfig::new(config)?;
    let kind = config
        .options
        .feed
        .as_ref()
        .map(|options| options.kind)
        .ok_or(Error::MissingOptions)?;

    let directory = config
        .output_directory
        .join(&config.options.route_base_path);
    fs::create_dir_all(&directory).map_err(|err| Error::CreateDirectory {
        path: directory.clone(),
        err,
    })?;

    let mut paths = Vec::with_capacity(kind.formats().len());
    for &format in kind.formats() {
        let path = directory.join(format.file_name());
        write_feed_file(&feed_config, format, posts, &path).map_err(|err| Error::Write {
            format,
            path: path.clone(),
            err: Box::new(err),
        })?;
        info!(%format, path = %path.display(), entries = posts.len(), "wrote feed");
        paths.push(path);
    }
    Ok(paths)
}

fn write_feed_file(config: &FeedConfig, format: FeedFormat, posts: &[Post], path: &Path) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_feed(config, format, posts, &mut w)?;
    w.flush()?;
    Ok(())
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed. Variants include configuration,
/// I/O, Atom, RSS, and date-time parsing issues.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when feeds are requested but no feed options are set.
    #[error("invalid options: feed options are not expected to be absent")]
    MissingOptions,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Atom(#[from] atom_syndication::Error),

    #[error(transparent)]
    Rss(#[from] rss::Error),

    #[error("RSS validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    DateTimeParse(#[from] chrono::ParseError),

    /// Returned when the feed directory can't be created.
    #[error("creating feed directory `{}` failed: {err}", .path.display())]
    CreateDirectory { path: PathBuf, err: io::Error },

    /// Returned when a feed document can't be written.
    #[error("generating {format} feed `{}` failed: {err}", .path.display())]
    Write {
        format: FeedFormat,
        path: PathBuf,
        err: Box<Error>,
    },
}
