//! Related-post selection by shared tag.

use crate::config::RelatedConfig;
use crate::models::Post;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A post sharing `matched_tag` with the page being rendered
#[derive(Debug, Clone, Copy)]
pub struct RelatedPostCandidate<'a> {
    pub post: &'a Post,
    pub matched_tag: &'a str,
}

#[derive(Debug, Clone)]
pub struct RelatedCandidates<'a> {
    /// At most `max_candidates`, in corpus (date) order
    pub candidates: Vec<RelatedPostCandidate<'a>>,
    /// More candidates than the display limit
    pub has_more: bool,
}

/// Posts tagged `tag`, excluding `current_id`, capped at `max_candidates`
pub fn find_by_tag<'a>(
    corpus: &'a [Post],
    current_id: &str,
    tag: &'a str,
    limit: usize,
    max_candidates: usize,
) -> RelatedCandidates<'a> {
    let candidates: Vec<RelatedPostCandidate<'a>> = corpus
        .iter()
        .filter(|post| post.id != current_id && post.has_tag(tag))
        .take(max_candidates)
        .map(|post| RelatedPostCandidate {
            post,
            matched_tag: tag,
        })
        .collect();

    let has_more = candidates.len() > limit;
    RelatedCandidates {
        candidates,
        has_more,
    }
}

/// Final display selection.
///
/// With `limit` or fewer candidates, all of them are returned. Otherwise the
/// `latest` most recent ones are kept and the remaining slots are filled by
/// uniform random picks (without replacement) from the rest.
pub fn select_related<'a, R: Rng + ?Sized>(
    candidates: &[RelatedPostCandidate<'a>],
    limit: usize,
    latest: usize,
    rng: &mut R,
) -> Vec<RelatedPostCandidate<'a>> {
    if candidates.len() <= limit {
        return candidates.to_vec();
    }

    let keep = latest.min(limit);
    let mut selected: Vec<RelatedPostCandidate<'a>> = candidates[..keep].to_vec();
    let mut remainder: Vec<RelatedPostCandidate<'a>> = candidates[keep..].to_vec();

    while selected.len() < limit && !remainder.is_empty() {
        let idx = rng.gen_range(0..remainder.len());
        selected.push(remainder.remove(idx));
    }
    selected
}

/// Related posts for `post` driven by its first tag
pub fn related_for<'a, R: Rng + ?Sized>(
    corpus: &'a [Post],
    post: &'a Post,
    config: &RelatedConfig,
    rng: &mut R,
) -> Vec<&'a Post> {
    let Some(tag) = post.primary_tag() else {
        return Vec::new();
    };
    let found = find_by_tag(corpus, &post.id, tag, config.limit, config.max_candidates);
    select_related(&found.candidates, config.limit, config.latest, rng)
        .into_iter()
        .map(|c| c.post)
        .collect()
}

/// Random source for one post's selection.
///
/// With a seed, the stream depends only on the seed and the post id, so the
/// pick does not change with worker scheduling. Without one it is drawn from
/// OS entropy.
pub fn post_rng(seed: Option<u64>, post_id: &str) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ fnv1a(post_id)),
        None => StdRng::from_entropy(),
    }
}

// Stable across Rust releases, unlike DefaultHasher
fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn post(id: &str, day: u32, tags: &[&str]) -> Post {
        Post {
            id: id.into(),
            title: id.to_uppercase(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            description: None,
            raw_markdown: String::new(),
            body_markdown: String::new(),
            source_path: PathBuf::from(format!("{id}.md")),
        }
    }

    fn corpus(n: u32) -> Vec<Post> {
        // newest first, like the loader produces
        (1..=n)
            .rev()
            .map(|day| post(&format!("p{day}"), day, &["rust"]))
            .collect()
    }

    #[test]
    fn test_find_by_tag_excludes_current() {
        let posts = corpus(5);
        for current in &posts {
            let found = find_by_tag(&posts, &current.id, "rust", 3, 10);
            assert!(found.candidates.iter().all(|c| c.post.id != current.id));
            assert_eq!(found.candidates.len(), 4);
            assert!(found.has_more);
        }
    }

    #[test]
    fn test_find_by_tag_caps_and_keeps_order() {
        let posts = corpus(15);
        let found = find_by_tag(&posts, "p15", "rust", 3, 10);
        let ids: Vec<&str> = found.candidates.iter().map(|c| c.post.id.as_str()).collect();
        assert_eq!(ids.len(), 10);
        assert_eq!(ids[0], "p14");
        assert_eq!(ids[9], "p5");
        assert!(found.candidates.iter().all(|c| c.matched_tag == "rust"));
    }

    #[test]
    fn test_find_by_tag_other_tags_ignored() {
        let posts = vec![post("a", 3, &["rust"]), post("b", 2, &["go"]), post("c", 1, &["go", "rust"])];
        let found = find_by_tag(&posts, "a", "rust", 3, 10);
        let ids: Vec<&str> = found.candidates.iter().map(|c| c.post.id.as_str()).collect();
        assert_eq!(ids, vec!["c"]);
        assert!(!found.has_more);
    }

    #[test]
    fn test_select_returns_all_when_few() {
        let posts = corpus(3);
        let found = find_by_tag(&posts, "none", "rust", 3, 10);
        let mut rng = StdRng::seed_from_u64(7);
        let selected = select_related(&found.candidates, 3, 2, &mut rng);
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn test_select_keeps_latest_two_plus_one_from_rest() {
        let posts = corpus(8);
        let found = find_by_tag(&posts, "p8", "rust", 3, 10);
        let mut rng = StdRng::seed_from_u64(42);
        let selected = select_related(&found.candidates, 3, 2, &mut rng);

        let ids: Vec<&str> = selected.iter().map(|c| c.post.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(&ids[..2], &["p7", "p6"]);
        assert!(!["p7", "p6", "p8"].contains(&ids[2]));
    }

    #[test]
    fn test_select_is_reproducible_with_seed() {
        let posts = corpus(10);
        let found = find_by_tag(&posts, "p10", "rust", 3, 10);
        let pick = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            select_related(&found.candidates, 3, 2, &mut rng)
                .iter()
                .map(|c| c.post.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(pick(1), pick(1));
        assert_eq!(pick(99), pick(99));
    }

    #[test]
    fn test_post_rng_is_stable_per_seed_and_id() {
        let posts = corpus(10);
        let config = RelatedConfig {
            seed: Some(2024),
            ..RelatedConfig::default()
        };
        let pick = |id: &str| {
            let current = posts.iter().find(|p| p.id == id).unwrap();
            related_for(&posts, current, &config, &mut post_rng(config.seed, id))
                .iter()
                .map(|p| p.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(pick("p10"), pick("p10"));
        assert_eq!(pick("p3"), pick("p3"));
        assert_ne!(fnv1a("p10"), fnv1a("p3"));
    }

    #[test]
    fn test_related_for_uses_first_tag() {
        let posts = vec![
            post("a", 4, &["go", "rust"]),
            post("b", 3, &["rust"]),
            post("c", 2, &["go"]),
        ];
        let mut rng = StdRng::seed_from_u64(0);
        let related = related_for(&posts, &posts[0], &RelatedConfig::default(), &mut rng);
        let ids: Vec<&str> = related.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["c"]);
    }

    #[test]
    fn test_related_for_untagged_post() {
        let posts = vec![post("a", 1, &[])];
        let mut rng = StdRng::seed_from_u64(0);
        assert!(related_for(&posts, &posts[0], &RelatedConfig::default(), &mut rng).is_empty());
    }
}
