//! Groups posts by tag. Aggregation also resolves each post's
//! [`TagRef::Label`]s into [`TagRef::Resolved`] tags carrying their listing
//! permalink.

use std::collections::BTreeMap;

use crate::post::{Post, TagRef};
use crate::url::normalize_url;

/// A tag and the posts that carry it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    /// The normalized tag, e.g. `getting-started`. Labels that normalize to
    /// the same slug (`Getting Started`, `getting started`) share a tag.
    pub slug: String,

    /// The lowercased label of the first post seen with this tag.
    pub name: String,

    /// The URL of the tag's listing page, `{tags_path}/{slug}`.
    pub permalink: String,

    /// The ids of the posts with this tag, in post order.
    pub items: Vec<String>,
}

/// The result of tag aggregation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagIndex {
    /// Tags by slug.
    pub tags: BTreeMap<String, Tag>,

    /// The path of the page listing all tags, or `None` if no post has a
    /// tag, in which case no tag pages should be generated.
    pub list_path: Option<String>,
}

/// Normalizes a tag label into its slug: lowercase, hyphen-separated.
pub fn tag_slug(label: &str) -> String {
    slug::slugify(label)
}

/// Walks `posts` once, in order, registering every [`TagRef::Label`] under
/// its slug and rewriting it in place to a [`TagRef::Resolved`]. Already
/// resolved tags are left as they are and don't register a listing.
pub fn aggregate_tags(posts: &mut [Post], tags_path: &str) -> TagIndex {
    let mut tags: BTreeMap<String, Tag> = BTreeMap::new();

    for post in posts.iter_mut() {
        for tag in post.tags.iter_mut() {
            let label = match tag {
                TagRef::Label(label) => label.clone(),
                TagRef::Resolved { .. } => continue,
            };

            let slug = tag_slug(&label);
            let permalink = normalize_url(&[tags_path, slug.as_str()]);
            let entry = tags.entry(slug.clone()).or_insert_with(|| Tag {
                slug,
                name: label.to_lowercase(),
                permalink: permalink.clone(),
                items: Vec::new(),
            });
            if entry.items.last() != Some(&post.id) {
                entry.items.push(post.id.clone());
            }

            *tag = TagRef::Resolved { label, permalink };
        }
    }

    TagIndex {
        list_path: match tags.is_empty() {
            true => None,
            false => Some(tags_path.to_owned()),
        },
        tags,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::test::post;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_tags() {
        let mut posts = vec![post("a", (2021, 3, 1), &[])];
        let index = aggregate_tags(&mut posts, "/guides/tags");
        assert_eq!(TagIndex::default(), index);
        assert!(posts[0].tags.is_empty());
    }

    #[test]
    fn test_first_seen_name_and_order() {
        let mut posts = vec![
            post("new", (2021, 5, 10), &["Getting Started", "Ops"]),
            post("old", (2021, 3, 1), &["getting started"]),
        ];
        let index = aggregate_tags(&mut posts, "/guides/tags");

        assert_eq!(Some("/guides/tags"), index.list_path.as_deref());
        assert_eq!(2, index.tags.len());

        let tag = &index.tags["getting-started"];
        assert_eq!("getting started", tag.name);
        assert_eq!("/guides/tags/getting-started", tag.permalink);
        assert_eq!(vec!["new", "old"], tag.items);

        assert_eq!(
            TagRef::Resolved {
                label: String::from("getting started"),
                permalink: String::from("/guides/tags/getting-started"),
            },
            posts[1].tags[0]
        );
    }

    #[test]
    fn test_resolved_tags_pass_through() {
        let resolved = TagRef::Resolved {
            label: String::from("External"),
            permalink: String::from("https://example.org/external"),
        };
        let mut p = post("a", (2021, 3, 1), &[]);
        p.tags = vec![resolved.clone()];
        let mut posts = vec![p];

        let index = aggregate_tags(&mut posts, "/guides/tags");
        assert_eq!(None, index.list_path);
        assert_eq!(vec![resolved], posts[0].tags);
    }

    #[test]
    fn test_members_carry_their_tag() {
        let mut posts = vec![
            post("a", (2021, 5, 1), &["rust", "Ops"]),
            post("b", (2021, 4, 1), &["ops"]),
            post("c", (2021, 3, 1), &["RUST", "rust"]),
        ];
        let index = aggregate_tags(&mut posts, "/guides/tags");

        for tag in index.tags.values() {
            for id in &tag.items {
                let member = posts.iter().find(|p| &p.id == id).unwrap();
                assert!(member.tags.iter().any(|t| matches!(
                    t,
                    TagRef::Resolved { permalink, .. } if permalink == &tag.permalink
                )));
            }
        }
        assert_eq!(vec!["a", "c"], index.tags["rust"].items);
    }
}
