//! Turns indexed content into an explicit list of [`Route`]s for the render
//! stage, storing the metadata each route needs as JSON artifacts.
//!
//! Artifacts are addressed by [`doc_hash`] of their logical path. A route
//! refers to its metadata through the `~guide/` alias, which the render stage
//! resolves against the artifact directory.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::build::Content;
use crate::config::Config;
use crate::post::Post;

/// The alias under which route modules refer to artifacts.
pub const ARTIFACT_ALIAS: &str = "~guide";

/// A key-value store for JSON artifacts.
pub trait ArtifactStore {
    /// Stores `contents` under `name` and returns the path it can be loaded
    /// from.
    fn create(&self, name: &str, contents: &str) -> Result<PathBuf>;

    /// The directory artifact paths are relative to.
    fn directory(&self) -> &Path;
}

/// An [`ArtifactStore`] writing each artifact to a file in a directory.
pub struct FsArtifactStore {
    directory: PathBuf,
}

impl FsArtifactStore {
    /// Creates the store, creating `directory` if needed.
    pub fn new(directory: &Path) -> Result<FsArtifactStore> {
        fs::create_dir_all(directory).map_err(|err| Error::Write {
            path: directory.to_owned(),
            err,
        })?;
        Ok(FsArtifactStore {
            directory: directory.to_owned(),
        })
    }
}

impl ArtifactStore for FsArtifactStore {
    fn create(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.directory.join(name);
        fs::write(&path, contents).map_err(|err| Error::Write {
            path: path.clone(),
            err,
        })?;
        debug!(path = %path.display(), "wrote artifact");
        Ok(path)
    }

    fn directory(&self) -> &Path {
        &self.directory
    }
}

/// An [`ArtifactStore`] holding artifacts in memory.
#[derive(Default)]
pub struct MemoryArtifactStore {
    directory: PathBuf,
    artifacts: Mutex<BTreeMap<String, String>>,
}

impl MemoryArtifactStore {
    pub fn new(directory: &Path) -> MemoryArtifactStore {
        MemoryArtifactStore {
            directory: directory.to_owned(),
            artifacts: Mutex::default(),
        }
    }

    /// The artifact stored under `name`, if any.
    pub fn get(&self, name: &str) -> Option<String> {
        self.artifacts
            .lock()
            .ok()
            .and_then(|artifacts| artifacts.get(name).cloned())
    }

    /// The number of stored artifacts.
    pub fn len(&self) -> usize {
        self.artifacts.lock().map(|a| a.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn create(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let mut artifacts = self.artifacts.lock().map_err(|_| Error::Poisoned)?;
        artifacts.insert(name.to_owned(), contents.to_owned());
        Ok(self.directory.join(name))
    }

    fn directory(&self) -> &Path {
        &self.directory
    }
}

/// Derives a stable, filesystem-safe artifact name from a logical path:
/// `index` for `/`, otherwise the slugified path followed by the first three
/// hex digits of its hash.
pub fn doc_hash(path: &str) -> String {
    if path == "/" {
        return String::from("index");
    }
    let hash = blake3::hash(path.as_bytes()).to_hex();
    format!("{}-{}", slug::slugify(path), &hash.as_str()[..3])
}

/// A page the render stage must produce.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub component: String,
    pub exact: bool,
    pub modules: Modules,
}

/// What a [`Route`]'s component is given to render.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum Modules {
    /// A single post.
    Post { content: String },

    /// A listing of posts: a paginated page or a tag's page.
    Listing {
        items: Vec<ListingItem>,
        metadata: String,
    },

    /// The page listing every tag.
    TagsList { tags: String },
}

/// A post inside a listing, to be loaded in its truncated form.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ListingItem {
    pub content: ContentImport,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ContentImport {
    #[serde(rename = "__import")]
    pub import: bool,
    pub path: String,
    pub query: ImportQuery,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ImportQuery {
    pub truncated: bool,
}

/// The metadata stored for a tag's listing page.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TagMetadata {
    pub all_tags_path: String,
    pub slug: String,
    pub name: String,
    pub count: usize,
    pub permalink: String,
}

/// Stores the metadata for every post, page, and tag in `store` and returns
/// the routes for all of them: one per post, one per listing page, and,
/// when any post has a tag, one per tag plus the tag list.
pub fn create_routes(config: &Config, content: &Content, store: &dyn ArtifactStore) -> Result<Vec<Route>> {
    let options = &config.options;
    let mut routes = Vec::new();
    let posts_by_id: HashMap<&str, &Post> =
        content.posts.iter().map(|post| (post.id.as_str(), post)).collect();

    for post in &content.posts {
        store_json(store, &doc_hash(&post.source), post)?;
        routes.push(Route {
            path: post.permalink.clone(),
            component: options.post_component.clone(),
            exact: true,
            modules: Modules::Post {
                content: post.source.clone(),
            },
        });
    }

    for page in &content.pages {
        let metadata = store_json(store, &doc_hash(&page.permalink), page)?;
        routes.push(Route {
            path: page.permalink.clone(),
            component: options.list_component.clone(),
            exact: true,
            modules: Modules::Listing {
                items: listing_items(&posts_by_id, &page.items)?,
                metadata: aliased(store, &metadata),
            },
        });
    }

    let list_path = match &content.tags.list_path {
        Some(list_path) => list_path,
        None => {
            info!(routes = routes.len(), "created routes");
            return Ok(routes);
        }
    };

    let mut tags_module: BTreeMap<&str, TagMetadata> = BTreeMap::new();
    for (slug, tag) in &content.tags.tags {
        let metadata = TagMetadata {
            all_tags_path: list_path.clone(),
            slug: slug.clone(),
            name: tag.name.clone(),
            count: tag.items.len(),
            permalink: tag.permalink.clone(),
        };
        let metadata_path = store_json(store, &doc_hash(&tag.permalink), &metadata)?;
        tags_module.insert(slug, metadata);
        routes.push(Route {
            path: tag.permalink.clone(),
            component: options.tags_posts_component.clone(),
            exact: true,
            modules: Modules::Listing {
                items: listing_items(&posts_by_id, &tag.items)?,
                metadata: aliased(store, &metadata_path),
            },
        });
    }

    let tags_list = store_json(store, &doc_hash(&format!("{}-tags", list_path)), &tags_module)?;
    routes.push(Route {
        path: list_path.clone(),
        component: options.tags_list_component.clone(),
        exact: true,
        modules: Modules::TagsList {
            tags: aliased(store, &tags_list),
        },
    });

    info!(routes = routes.len(), "created routes");
    Ok(routes)
}

fn store_json<T: Serialize + ?Sized>(store: &dyn ArtifactStore, name: &str, value: &T) -> Result<PathBuf> {
    store.create(&format!("{}.json", name), &serde_json::to_string_pretty(value)?)
}

fn listing_items(posts_by_id: &HashMap<&str, &Post>, ids: &[String]) -> Result<Vec<ListingItem>> {
    ids.iter()
        .map(|id| {
            let post = posts_by_id
                .get(id.as_str())
                .ok_or_else(|| Error::UnknownPost(id.clone()))?;
            Ok(ListingItem {
                content: ContentImport {
                    import: true,
                    path: post.source.clone(),
                    query: ImportQuery { truncated: true },
                },
            })
        })
        .collect()
}

/// `~guide/{path relative to the store directory}`.
fn aliased(store: &dyn ArtifactStore, path: &Path) -> String {
    let relative = path.strip_prefix(store.directory()).unwrap_or(path);
    format!("{}/{}", ARTIFACT_ALIAS, relative.to_string_lossy())
}

/// Represents the result of a route-creation operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error creating routes or storing their artifacts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("writing artifact `{}`: {err}", .path.display())]
    Write { path: PathBuf, err: std::io::Error },

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    /// Returned when a listing refers to a post id that wasn't indexed.
    #[error("listing refers to unknown guide `{0}`")]
    UnknownPost(String),

    #[error("artifact store lock poisoned")]
    Poisoned,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{Options, SiteConfig};
    use crate::paginate::paginate;
    use crate::post::test::post;
    use crate::tag::{aggregate_tags, TagIndex};
    use pretty_assertions::assert_eq;

    fn config() -> Config {
        let site: SiteConfig =
            serde_yaml::from_str("url: https://example.org\ntitle: Example").unwrap();
        Config::new(Path::new("/site"), Path::new("/out"), site, Options::default()).unwrap()
    }

    fn content(tags: &[&str]) -> Content {
        let mut posts = vec![
            post("new", (2021, 5, 10), tags),
            post("old", (2021, 3, 1), &[]),
        ];
        let tags = aggregate_tags(&mut posts, "/guides/tags");
        let pages = paginate(&posts, "/guides", config().options.posts_per_page);
        Content { posts, pages, tags }
    }

    #[test]
    fn test_doc_hash() {
        assert_eq!("index", doc_hash("/"));
        let hash = doc_hash("/guides/page/2");
        assert!(hash.starts_with("guides-page-2-"), "{}", hash);
        assert_eq!("guides-page-2-".len() + 3, hash.len());
        assert_eq!(hash, doc_hash("/guides/page/2"));
    }

    #[test]
    fn test_routes_without_tags() -> Result<()> {
        let store = MemoryArtifactStore::new(Path::new("/gen"));
        let routes = create_routes(&config(), &content(&[]), &store)?;

        let paths: Vec<&str> = routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(vec!["/guides/new", "/guides/old", "/guides"], paths);
        assert_eq!(3, store.len());

        match &routes[2].modules {
            Modules::Listing { items, metadata } => {
                assert_eq!(2, items.len());
                assert_eq!("@site/guides/new.md", items[0].content.path);
                assert_eq!(format!("~guide/{}.json", doc_hash("/guides")), *metadata);
            }
            other => panic!("unexpected modules {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_routes_with_tags() -> Result<()> {
        let store = MemoryArtifactStore::new(Path::new("/gen"));
        let mut content = content(&["Rust"]);
        content.posts[0].summary = String::from("Intro before the fold");
        content.posts[0].truncated = true;
        let routes = create_routes(&config(), &content, &store)?;

        let paths: Vec<&str> = routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(
            vec![
                "/guides/new",
                "/guides/old",
                "/guides",
                "/guides/tags/rust",
                "/guides/tags"
            ],
            paths
        );
        assert_eq!("@theme/BlogTagsListPage", routes[4].component);

        let tag = store
            .get(&format!("{}.json", doc_hash("/guides/tags/rust")))
            .unwrap();
        let tag: serde_json::Value = serde_json::from_str(&tag)?;
        assert_eq!("/guides/tags", tag["allTagsPath"]);
        assert_eq!(1, tag["count"]);

        let post = store
            .get(&format!("{}.json", doc_hash("@site/guides/new.md")))
            .unwrap();
        let post: serde_json::Value = serde_json::from_str(&post)?;
        assert_eq!("/guides/tags/rust", post["tags"][0]["permalink"]);
        assert_eq!("Intro before the fold", post["summary"]);
        assert_eq!(Some(true), post["truncated"].as_bool());
        Ok(())
    }

    #[test]
    fn test_unknown_listing_item() {
        let mut content = content(&[]);
        content.tags = TagIndex::default();
        content.pages[0].items.push(String::from("missing"));
        let store = MemoryArtifactStore::new(Path::new("/gen"));
        assert!(matches!(
            create_routes(&config(), &content, &store),
            Err(Error::UnknownPost(id)) if id == "missing"
        ));
    }

    #[test]
    fn test_fs_store_writes_files() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(&dir.path().join("guides"))?;
        let path = store.create("index.json", "{}")?;
        assert_eq!(dir.path().join("guides").join("index.json"), path);
        assert_eq!("~guide/index.json", aliased(&store, &path));
        assert_eq!(Some(String::from("{}")), fs::read_to_string(path).ok());
        Ok(())
    }
}
