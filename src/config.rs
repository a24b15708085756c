//! Loads and validates the project configuration. Options are read from a
//! `guides.yaml` project file; anything the file leaves out takes the default
//! value from [`Options::default`]. The resulting [`Config`] is constructed
//! once and handed to every build step by reference.

use glob::Pattern;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "guides.yaml";

const DEFAULT_POSTS_PER_PAGE: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(n) => n,
    None => panic!("zero posts per page"),
};

/// Site-wide settings shared with the rest of the host site.
#[derive(Deserialize, Clone, Debug)]
pub struct SiteConfig {
    /// The absolute URL of the deployed site, e.g. `https://vector.dev`.
    pub url: Url,

    /// The path prefix the site is served under.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// The site title. Used to derive default feed titles.
    pub title: String,

    /// Path to the favicon, relative to the site URL.
    #[serde(default)]
    pub favicon: Option<String>,
}

fn default_base_url() -> String {
    String::from("/")
}

/// The syndication formats a feed can be written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeedFormat {
    Rss,
    Atom,
}

impl FeedFormat {
    /// The output file name, e.g. `rss.xml`.
    pub fn file_name(self) -> &'static str {
        match self {
            FeedFormat::Rss => "rss.xml",
            FeedFormat::Atom => "atom.xml",
        }
    }

    /// The MIME type advertised for the feed.
    pub fn mime_type(self) -> &'static str {
        match self {
            FeedFormat::Rss => "application/rss+xml",
            FeedFormat::Atom => "application/atom+xml",
        }
    }

    /// The human-readable name of the format.
    pub fn label(self) -> &'static str {
        match self {
            FeedFormat::Rss => "RSS",
            FeedFormat::Atom => "Atom",
        }
    }
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FeedFormat::Rss => f.write_str("rss"),
            FeedFormat::Atom => f.write_str("atom"),
        }
    }
}

/// Which feeds to generate. `All` produces both an RSS and an Atom document.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(try_from = "String")]
pub enum FeedKind {
    Rss,
    Atom,
    All,
}

impl FeedKind {
    /// Expands the kind into the concrete formats to write.
    pub fn formats(self) -> &'static [FeedFormat] {
        match self {
            FeedKind::Rss => &[FeedFormat::Rss],
            FeedKind::Atom => &[FeedFormat::Atom],
            FeedKind::All => &[FeedFormat::Rss, FeedFormat::Atom],
        }
    }
}

impl FromStr for FeedKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<FeedKind> {
        match s {
            "rss" => Ok(FeedKind::Rss),
            "atom" => Ok(FeedKind::Atom),
            "all" => Ok(FeedKind::All),
            _ => Err(Error::InvalidFeedKind(s.to_owned())),
        }
    }
}

impl TryFrom<String> for FeedKind {
    type Error = Error;

    fn try_from(s: String) -> Result<FeedKind> {
        s.parse()
    }
}

/// Options for the syndication feeds.
#[derive(Deserialize, Clone, Debug)]
pub struct FeedOptions {
    /// Which feed documents to write.
    #[serde(rename = "type")]
    pub kind: FeedKind,

    /// Defaults to `"{site title} Guide"`.
    #[serde(default)]
    pub title: Option<String>,

    /// Defaults to `"{site title} Guide"`.
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub copyright: Option<String>,
}

/// Options for the guide section. Every field has a default, so a project
/// file only needs to name the ones it overrides.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Options {
    /// Location of the guide sources, relative to the site directory.
    pub path: PathBuf,

    /// URL route under which guides are served.
    pub route_base_path: String,

    /// Glob patterns, relative to [`Options::path`], selecting source files.
    pub include: Vec<String>,

    /// The number of posts per listing page.
    pub posts_per_page: NonZeroUsize,

    pub list_component: String,
    pub post_component: String,
    pub tags_list_component: String,
    pub tags_posts_component: String,

    /// Regex marking the end of a post's summary.
    pub truncate_marker: String,

    /// Feed generation is disabled when absent.
    pub feed: Option<FeedOptions>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            path: PathBuf::from("guides"),
            route_base_path: String::from("guides"),
            include: vec![String::from("*.md"), String::from("*.mdx")],
            posts_per_page: DEFAULT_POSTS_PER_PAGE,
            list_component: String::from("@theme/BlogListPage"),
            post_component: String::from("@theme/BlogPostPage"),
            tags_list_component: String::from("@theme/BlogTagsListPage"),
            tags_posts_component: String::from("@theme/BlogTagsPostsPage"),
            truncate_marker: String::from(r"<!--\s*(truncate)\s*-->"),
            feed: None,
        }
    }
}

/// The layout of the `guides.yaml` project file.
#[derive(Deserialize)]
struct Project {
    site: SiteConfig,

    #[serde(default)]
    guides: Options,
}

/// The validated, immutable build configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The root directory of the site. Source references are made relative
    /// to it.
    pub site_dir: PathBuf,

    /// The directory that receives the generated feeds.
    pub output_directory: PathBuf,

    /// `{site_dir}/.generated`. Metadata artifacts and the route manifest
    /// are written to its `guides` subdirectory.
    pub generated_directory: PathBuf,

    pub site: SiteConfig,
    pub options: Options,

    /// `{site_dir}/{options.path}`.
    pub content_path: PathBuf,

    /// The compiled [`Options::include`] globs.
    pub include: Vec<Pattern>,

    /// The compiled [`Options::truncate_marker`].
    pub truncate_marker: Regex,
}

impl Config {
    /// Builds a [`Config`], compiling and validating the options.
    pub fn new(
        site_dir: &Path,
        output_directory: &Path,
        site: SiteConfig,
        options: Options,
    ) -> Result<Config> {
        let include = options
            .include
            .iter()
            .map(|glob| {
                Pattern::new(glob).map_err(|err| Error::InvalidInclude {
                    glob: glob.clone(),
                    err,
                })
            })
            .collect::<Result<Vec<Pattern>>>()?;
        let truncate_marker =
            Regex::new(&options.truncate_marker).map_err(|err| Error::InvalidTruncateMarker {
                marker: options.truncate_marker.clone(),
                err,
            })?;

        Ok(Config {
            site_dir: site_dir.to_owned(),
            output_directory: output_directory.to_owned(),
            generated_directory: site_dir.join(".generated"),
            content_path: site_dir.join(&options.path),
            site,
            options,
            include,
            truncate_marker,
        })
    }

    /// Searches `dir` and then each of its ancestors for a `guides.yaml`
    /// project file and loads the first one found.
    pub fn from_directory(dir: &Path, output_directory: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path, output_directory)
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, output_directory),
                None => Err(Error::ProjectFileNotFound),
            }
        }
    }

    /// Loads a project file. The site directory is the directory containing
    /// the file.
    pub fn from_project_file(path: &Path, output_directory: &Path) -> Result<Config> {
        let file = std::fs::File::open(path).map_err(|err| Error::Open {
            path: path.to_owned(),
            err,
        })?;
        let project: Project = serde_yaml::from_reader(file).map_err(|err| Error::Parse {
            path: path.to_owned(),
            err,
        })?;
        let site_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Config::new(site_dir, output_directory, project.site, project.guides)
    }

    /// `{base_url}/{route_base_path}`, the permalink of the first listing
    /// page.
    pub fn base_page_url(&self) -> String {
        crate::url::normalize_url(&[&self.site.base_url, &self.options.route_base_path])
    }
}

/// The result of a fallible configuration operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading or validating the configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when no project file exists in the directory or any of its
    /// ancestors.
    #[error("could not find `guides.yaml` in any parent directory")]
    ProjectFileNotFound,

    #[error("opening project file `{}`: {err}", .path.display())]
    Open { path: PathBuf, err: std::io::Error },

    #[error("loading configuration `{}`: {err}", .path.display())]
    Parse {
        path: PathBuf,
        err: serde_yaml::Error,
    },

    #[error("invalid feed type: {0}. It must be either 'rss', 'atom', or 'all'")]
    InvalidFeedKind(String),

    #[error("invalid include pattern `{glob}`: {err}")]
    InvalidInclude {
        glob: String,
        err: glob::PatternError,
    },

    #[error("invalid truncate marker `{marker}`: {err}")]
    InvalidTruncateMarker { marker: String, err: regex::Error },
}

#[cfg(test)]
mod test {
    use super::*;

    fn site() -> SiteConfig {
        serde_yaml::from_str("url: https://example.org\ntitle: Example").unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_options() -> Result<()> {
        let options: Options = serde_yaml::from_str("posts_per_page: 3").unwrap();
        assert_eq!(3, options.posts_per_page.get());
        assert_eq!("guides", options.route_base_path);
        assert_eq!(vec!["*.md", "*.mdx"], options.include);
        assert!(options.feed.is_none());

        let config = Config::new(Path::new("/site"), Path::new("/out"), site(), options)?;
        assert_eq!(PathBuf::from("/site/guides"), config.content_path);
        assert_eq!("/guides", config.base_page_url());
        Ok(())
    }

    #[test]
    fn test_zero_posts_per_page_is_rejected() {
        assert!(serde_yaml::from_str::<Options>("posts_per_page: 0").is_err());
    }

    #[test]
    fn test_feed_kind() {
        assert_eq!(Ok(FeedKind::All), "all".parse::<FeedKind>().map_err(|e| e.to_string()));
        assert_eq!(
            &[FeedFormat::Rss, FeedFormat::Atom],
            FeedKind::All.formats()
        );

        let err = serde_yaml::from_str::<FeedOptions>("type: json")
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        assert!(err.contains("It must be either 'rss', 'atom', or 'all'"), "{}", err);
    }

    #[test]
    fn test_feed_kind_is_required() {
        assert!(serde_yaml::from_str::<FeedOptions>("title: Guides").is_err());
    }

    #[test]
    fn test_invalid_include_is_rejected() {
        let options = Options {
            include: vec![String::from("[*.md")],
            ..Options::default()
        };
        let result = Config::new(Path::new("/site"), Path::new("/out"), site(), options);
        assert!(matches!(result, Err(Error::InvalidInclude { .. })));
    }

    #[test]
    fn test_from_directory_searches_parents() -> Result<()> {
        let config = Config::from_directory(
            Path::new("./testdata/site/guides"),
            Path::new("./target/testdata-out"),
        )?;
        assert_eq!("Vector", config.site.title);
        assert_eq!(2, config.options.posts_per_page.get());
        assert_eq!(Some(FeedKind::All), config.options.feed.map(|f| f.kind));
        Ok(())
    }
}
