//! Defines the [`Post`] type and the types it refers to. A [`Post`] is built
//! once per source file by [`crate::indexer::Indexer`]; after indexing, only
//! the tag aggregator ([`crate::tag`]) touches it again, to resolve its tags.

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// A single guide, indexed from one source file.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// The front-matter `id`, or the title when there is none. Unique within
    /// a build.
    pub id: String,

    pub title: String,

    /// The front-matter `description`, or the excerpt when there is none.
    pub description: String,

    /// The publish date. See [`crate::parser::parse_guide`] for precedence.
    pub date: DateTime<Utc>,

    /// The public URL path of the post, e.g.
    /// `/guides/2021/03/01/hello-world`.
    pub permalink: String,

    /// The source file, relative to the site directory and prefixed with
    /// `@site/`.
    pub source: String,

    /// The post's tags. These are [`TagRef::Label`]s straight out of the
    /// front matter and [`TagRef::Resolved`] after tag aggregation.
    pub tags: Vec<TagRef>,

    /// The body text before the truncate marker. Listings render this in
    /// place of the full post.
    pub summary: String,

    /// Whether the body contained a truncate marker.
    pub truncated: bool,

    /// The next-newer post, if any.
    #[serde(rename = "prevItem", skip_serializing_if = "Option::is_none")]
    pub prev: Option<PostLink>,

    /// The next-older post, if any.
    #[serde(rename = "nextItem", skip_serializing_if = "Option::is_none")]
    pub next: Option<PostLink>,
}

impl Post {
    /// A reference to this post suitable for neighbor links.
    pub fn link(&self) -> PostLink {
        PostLink {
            id: self.id.clone(),
            title: self.title.clone(),
            permalink: self.permalink.clone(),
        }
    }
}

/// A reference from one post to another.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PostLink {
    pub id: String,
    pub title: String,
    pub permalink: String,
}

/// A tag as written in front matter. Scalars (strings, numbers, booleans)
/// are [`TagRef::Label`]s; maps carrying their own permalink are taken as
/// already resolved and are passed through tag aggregation unchanged.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum TagRef {
    Label(#[serde(deserialize_with = "scalar_label")] String),
    Resolved { label: String, permalink: String },
}

/// Reads a YAML scalar as a tag label, so `tags: [2021, rust]` yields the
/// labels `2021` and `rust`.
fn scalar_label<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::String(label) => Ok(label),
        serde_yaml::Value::Number(number) => Ok(number.to_string()),
        serde_yaml::Value::Bool(flag) => Ok(flag.to_string()),
        _ => Err(de::Error::custom("tag label must be a scalar")),
    }
}

impl TagRef {
    /// The display label of the tag.
    pub fn label(&self) -> &str {
        match self {
            TagRef::Label(label) => label,
            TagRef::Resolved { label, .. } => label,
        }
    }
}

/// Links every post to its neighbors in `posts`, which must already be in
/// their final order. `prev` points at the preceding (newer) post and `next`
/// at the following (older) one.
pub fn link_neighbors(posts: &mut [Post]) {
    let links: Vec<PostLink> = posts.iter().map(Post::link).collect();
    for (i, post) in posts.iter_mut().enumerate() {
        post.prev = match i {
            0 => None,
            _ => Some(links[i - 1].clone()),
        };
        post.next = links.get(i + 1).cloned();
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use chrono::TimeZone;

    /// Builds a bare post for tests elsewhere in the crate.
    pub(crate) fn post(id: &str, ymd: (i32, u32, u32), tags: &[&str]) -> Post {
        let (y, m, d) = ymd;
        Post {
            id: id.to_owned(),
            title: id.to_owned(),
            description: format!("about {}", id),
            date: Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap(),
            permalink: format!("/guides/{}", id),
            source: format!("@site/guides/{}.md", id),
            tags: tags.iter().map(|t| TagRef::Label(t.to_string())).collect(),
            summary: String::new(),
            truncated: false,
            prev: None,
            next: None,
        }
    }

    #[test]
    fn test_link_neighbors() {
        let mut posts = vec![
            post("c", (2021, 5, 10), &[]),
            post("b", (2021, 4, 1), &[]),
            post("a", (2021, 3, 1), &[]),
        ];
        link_neighbors(&mut posts);

        assert_eq!(None, posts[0].prev);
        assert_eq!(Some("b"), posts[0].next.as_ref().map(|l| l.id.as_str()));
        assert_eq!(Some("c"), posts[1].prev.as_ref().map(|l| l.id.as_str()));
        assert_eq!(Some("a"), posts[1].next.as_ref().map(|l| l.id.as_str()));
        assert_eq!(None, posts[2].next);
    }

    #[test]
    fn test_tag_ref_deserializes_both_shapes() {
        let tags: Vec<TagRef> =
            serde_yaml::from_str("- Rust\n- label: Ops\n  permalink: /ops\n").unwrap();
        assert_eq!(
            vec![
                TagRef::Label(String::from("Rust")),
                TagRef::Resolved {
                    label: String::from("Ops"),
                    permalink: String::from("/ops"),
                },
            ],
            tags
        );
    }

    #[test]
    fn test_tag_ref_accepts_scalar_labels() {
        let tags: Vec<TagRef> = serde_yaml::from_str("[2021, rust, 1.5, true]").unwrap();
        let labels: Vec<&str> = tags.iter().map(TagRef::label).collect();
        assert_eq!(vec!["2021", "rust", "1.5", "true"], labels);
        assert!(serde_yaml::from_str::<Vec<TagRef>>("[[nested]]").is_err());
    }

    #[test]
    fn test_serializes_metadata_keys() {
        let mut posts = vec![post("b", (2021, 5, 10), &[]), post("a", (2021, 3, 1), &[])];
        link_neighbors(&mut posts);
        let value = serde_json::to_value(&posts[0]).unwrap();
        assert_eq!("/guides/b", value["permalink"]);
        assert_eq!("a", value["nextItem"]["id"]);
        assert!(value.get("prevItem").is_none());
        assert_eq!("", value["summary"]);
    }
}
