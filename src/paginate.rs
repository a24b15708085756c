//! Partitions the sorted post list into listing pages.

use serde::Serialize;
use std::num::NonZeroUsize;

use crate::post::Post;
use crate::url::normalize_url;

/// One listing page. The first page lives at the section's base path; page
/// `n` (for `n > 1`) lives at `{base}/page/{n}`.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub permalink: String,

    /// The 1-based page number.
    pub page: usize,

    pub posts_per_page: usize,
    pub total_pages: usize,

    /// The number of posts across all pages.
    pub total_count: usize,

    pub previous_page: Option<String>,
    pub next_page: Option<String>,

    /// The ids of the posts on this page, in listing order.
    #[serde(skip)]
    pub items: Vec<String>,
}

/// The permalink of the page at the 0-based `index`.
fn page_permalink(base_path: &str, index: usize) -> String {
    match index {
        0 => base_path.to_owned(),
        _ => normalize_url(&[base_path, format!("page/{}", index + 1).as_str()]),
    }
}

/// Splits `posts` into `ceil(len / posts_per_page)` pages, preserving order.
/// No posts means no pages.
pub fn paginate(posts: &[Post], base_path: &str, posts_per_page: NonZeroUsize) -> Vec<Page> {
    let posts_per_page = posts_per_page.get();
    let total_count = posts.len();
    let total_pages = total_count.div_ceil(posts_per_page);

    posts
        .chunks(posts_per_page)
        .enumerate()
        .map(|(i, chunk)| Page {
            permalink: page_permalink(base_path, i),
            page: i + 1,
            posts_per_page,
            total_pages,
            total_count,
            previous_page: match i {
                0 => None,
                _ => Some(page_permalink(base_path, i - 1)),
            },
            next_page: match i + 1 < total_pages {
                false => None,
                true => Some(page_permalink(base_path, i + 1)),
            },
            items: chunk.iter().map(|post| post.id.clone()).collect(),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::test::post;
    use pretty_assertions::assert_eq;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn posts(n: usize) -> Vec<Post> {
        (0..n)
            .map(|i| post(&format!("p{}", i), (2021, 1, 1 + i as u32 % 28), &[]))
            .collect()
    }

    #[test]
    fn test_no_posts_no_pages() {
        assert!(paginate(&[], "/guides", size(10)).is_empty());
    }

    #[test]
    fn test_single_page() {
        let mut posts = vec![post("march", (2021, 3, 1), &[]), post("may", (2021, 5, 10), &[])];
        posts.reverse();
        let pages = paginate(&posts, "/guides", size(10));
        assert_eq!(
            vec![Page {
                permalink: String::from("/guides"),
                page: 1,
                posts_per_page: 10,
                total_pages: 1,
                total_count: 2,
                previous_page: None,
                next_page: None,
                items: vec![String::from("may"), String::from("march")],
            }],
            pages
        );
    }

    #[test]
    fn test_page_links() {
        let pages = paginate(&posts(7), "/guides", size(3));
        assert_eq!(3, pages.len());

        let permalinks: Vec<&str> = pages.iter().map(|p| p.permalink.as_str()).collect();
        assert_eq!(vec!["/guides", "/guides/page/2", "/guides/page/3"], permalinks);

        assert_eq!(None, pages[0].previous_page);
        assert_eq!(Some("/guides/page/2"), pages[0].next_page.as_deref());
        assert_eq!(Some("/guides"), pages[1].previous_page.as_deref());
        assert_eq!(Some("/guides/page/3"), pages[1].next_page.as_deref());
        assert_eq!(Some("/guides/page/2"), pages[2].previous_page.as_deref());
        assert_eq!(None, pages[2].next_page);
        assert_eq!(1, pages[2].items.len());
    }

    #[test]
    fn test_pages_reassemble_post_order() {
        for (count, per_page) in [(1, 1), (5, 5), (6, 5), (10, 3), (23, 4)] {
            let posts = posts(count);
            let pages = paginate(&posts, "/guides", size(per_page));
            assert_eq!((count + per_page - 1) / per_page, pages.len());

            let concatenated: Vec<String> = pages.into_iter().flat_map(|p| p.items).collect();
            let expected: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
            assert_eq!(expected, concatenated);
        }
    }
}
