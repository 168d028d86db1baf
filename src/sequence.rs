//! Post sequencing.
//!
//! Stage 3 of the build pipeline. Orders default-language posts newest first
//! and links every post to its neighbours: `next` points toward newer
//! content, `previous` toward older content.
//!
//! ```text
//! sorted:    [ newest, ..., oldest ]
//! post i:    next = sorted[i - 1]   previous = sorted[i + 1]
//! ```

use crate::types::Post;

/// Neighbours of a post in the date-descending ordering.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NavigationLink<'a> {
    /// Chronologically older neighbour.
    pub previous: Option<&'a Post>,
    /// Chronologically newer neighbour.
    pub next: Option<&'a Post>,
}

/// A post paired with its navigation links.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencedPost<'a> {
    pub post: &'a Post,
    pub nav: NavigationLink<'a>,
}

/// Sort by date descending and attach navigation links.
///
/// The sort is stable: posts with equal dates keep their input order.
pub fn sequence<'a>(posts: &[&'a Post]) -> Vec<SequencedPost<'a>> {
    let mut sorted: Vec<&'a Post> = posts.to_vec();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));

    sorted
        .iter()
        .copied()
        .enumerate()
        .map(|(i, post)| SequencedPost {
            post,
            nav: NavigationLink {
                next: i.checked_sub(1).map(|j| sorted[j]),
                previous: sorted.get(i + 1).copied(),
            },
        })
        .collect()
}

/// Navigation for `sequenced[index]` that steps over drafts, so a page never
/// links to a post left out of the listings.
pub fn published_navigation<'a>(sequenced: &[SequencedPost<'a>], index: usize) -> NavigationLink<'a> {
    let Some(item) = sequenced.get(index) else {
        return NavigationLink::default();
    };
    let published = |p: &&'a Post| !p.draft;
    NavigationLink {
        next: item.nav.next.filter(published).or_else(|| {
            sequenced[..index]
                .iter()
                .rev()
                .map(|s| s.post)
                .find(published)
        }),
        previous: item.nav.previous.filter(published).or_else(|| {
            sequenced[index + 1..]
                .iter()
                .map(|s| s.post)
                .find(published)
        }),
    }
}
