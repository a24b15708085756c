//! Discovers guide source files on disk and turns them into a sorted list of
//! [`Post`]s.

use chrono::{DateTime, Utc};
use glob::MatchOptions;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::parser::{self, parse_guide};
use crate::post::{link_neighbors, Post};
use crate::url::{date_path, normalize_url};

/// Globs must match path separators literally, so `*.md` only selects files
/// at the top of the content directory, and wildcards skip dotfiles.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Indexes [`Post`] objects from the content directory named by a
/// [`Config`].
pub struct Indexer<'a> {
    config: &'a Config,
}

impl<'a> Indexer<'a> {
    /// Constructs a new indexer.
    pub fn new(config: &'a Config) -> Indexer<'a> {
        Indexer { config }
    }

    /// Finds every file under the content directory whose relative path
    /// matches one of the include globs, parses each one in parallel, and
    /// returns the posts sorted newest first. Posts sharing a date are
    /// ordered by source path. Neighbor links are filled in.
    ///
    /// Returns `Ok(None)` if the content directory doesn't exist.
    pub fn index(&self) -> Result<Option<Vec<Post>>> {
        let content_path = &self.config.content_path;
        if !content_path.is_dir() {
            info!(path = %content_path.display(), "no guide directory; skipping");
            return Ok(None);
        }

        let files = self.discover()?;
        debug!(count = files.len(), "discovered guide sources");

        let mut posts = files
            .par_iter()
            .map(|relative_path| self.parse_post(relative_path))
            .collect::<Result<Vec<Post>>>()?;

        posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.source.cmp(&b.source)));

        let mut seen = HashSet::with_capacity(posts.len());
        for post in &posts {
            if !seen.insert(post.id.as_str()) {
                return Err(Error::DuplicateId {
                    id: post.id.clone(),
                    path: post.source.clone(),
                });
            }
        }

        link_neighbors(&mut posts);
        info!(count = posts.len(), "indexed guides");
        Ok(Some(posts))
    }

    /// Walks the content directory and returns the paths, relative to it, of
    /// the files matching any include glob.
    fn discover(&self) -> Result<Vec<PathBuf>> {
        let content_path = &self.config.content_path;
        let mut files = Vec::new();
        for result in WalkDir::new(content_path).follow_links(true) {
            let entry = result?;
            if !entry.file_type().is_file() {
                continue;
            }
            // strip_prefix() should never fail; every entry is under
            // `content_path`.
            let relative_path = match entry.path().strip_prefix(content_path) {
                Ok(relative_path) => relative_path,
                Err(_) => continue,
            };
            if self
                .config
                .include
                .iter()
                .any(|glob| glob.matches_path_with(relative_path, MATCH_OPTIONS))
            {
                files.push(relative_path.to_owned());
            }
        }
        Ok(files)
    }

    /// Parses the post at `relative_path`, annotating any failure with the
    /// path.
    fn parse_post(&self, relative_path: &Path) -> Result<Post> {
        self.build_post(relative_path).map_err(|err| Error::Annotated {
            path: self.config.content_path.join(relative_path),
            err: Box::new(err),
        })
    }

    fn build_post(&self, relative_path: &Path) -> Result<Post> {
        let path = self.config.content_path.join(relative_path);
        debug!(path = %path.display(), "parsing guide");

        let file_name = relative_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| Error::InvalidFileName(relative_path.to_owned()))?;
        let contents = fs::read_to_string(&path)?;
        let guide = parse_guide(file_name, &contents, &self.config.truncate_marker)?;

        let date = match guide.date {
            Some(date) => date,
            None => file_time(&path)?,
        };

        let permalink_tail = match &guide.explicit_id {
            Some(id) => id.clone(),
            None => date_path(&date, &guide.slug),
        };
        let permalink = normalize_url(&[
            self.config.site.base_url.as_str(),
            self.config.options.route_base_path.as_str(),
            permalink_tail.as_str(),
        ]);

        Ok(Post {
            id: guide.id().to_owned(),
            title: guide.title,
            description: guide.description,
            date,
            permalink,
            source: self.aliased_source(&path),
            tags: guide.tags,
            summary: guide.summary,
            truncated: guide.truncated,
            prev: None,
            next: None,
        })
    }

    /// `@site/{path relative to the site directory}`, with forward slashes.
    fn aliased_source(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.config.site_dir).unwrap_or(path);
        let components: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        format!("@site/{}", components.join("/"))
    }
}

/// The file's creation time, or its modification time on platforms and
/// filesystems that don't record creation.
fn file_time(path: &Path) -> Result<DateTime<Utc>> {
    let metadata = fs::metadata(path)?;
    let time = match metadata.created() {
        Ok(time) => time,
        Err(err) => {
            warn!(path = %path.display(), %err, "creation time unavailable; using modification time");
            metadata.modified()?
        }
    };
    Ok(DateTime::<Utc>::from(time))
}

/// Represents the result of an indexing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error indexing the content directory. Any error aborts the
/// whole pass.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] parser::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),

    /// Returned when a source file name isn't valid UTF-8.
    #[error("invalid file name: {0:?}")]
    InvalidFileName(PathBuf),

    /// Returned when two posts resolve to the same identifier.
    #[error("duplicate guide id `{id}` (in `{path}`)")]
    DuplicateId { id: String, path: String },

    /// An error with the path of the file that caused it.
    #[error("parsing guide `{}`: {err}", .path.display())]
    Annotated { path: PathBuf, err: Box<Error> },
}
