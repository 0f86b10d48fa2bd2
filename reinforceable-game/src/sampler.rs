//! Shuffle and sample helpers built on any `rand::Rng`.
use rand::Rng;

/// Fisher-Yates shuffle into a new vector; `items` is left untouched.
pub fn shuffle<T: Clone, R: Rng>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    for i in (1..out.len()).rev() {
        let j = rng.gen_range(0..=i);
        out.swap(i, j);
    }
    out
}

/// Up to `k` items without replacement, in shuffled order.
pub fn sample<T: Clone, R: Rng>(pool: &[T], k: usize, rng: &mut R) -> Vec<T> {
    let mut shuffled = shuffle(pool, rng);
    shuffled.truncate(k.min(pool.len()));
    shuffled
}

/// A single item, or `None` when the pool is empty.
pub fn pick<'a, T, R: Rng>(pool: &'a [T], rng: &mut R) -> Option<&'a T> {
    if pool.is_empty() {
        return None;
    }
    pool.get(rng.gen_range(0..pool.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prng::srandom;
    use std::collections::HashSet;

    #[test]
    fn shuffle_keeps_every_item_and_leaves_input_alone() {
        let input: Vec<u32> = (0..20).collect();
        let mut rng = srandom(7);
        let out = shuffle(&input, &mut rng);
        assert_eq!(input, (0..20).collect::<Vec<_>>());
        let mut sorted = out.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, input);
    }

    #[test]
    fn sample_returns_k_distinct_items() {
        let pool: Vec<u32> = (0..50).collect();
        for k in [0_usize, 1, 5, 49, 50] {
            let mut rng = srandom(2024);
            let picked = sample(&pool, k, &mut rng);
            assert_eq!(picked.len(), k);
            let unique: HashSet<u32> = picked.iter().copied().collect();
            assert_eq!(unique.len(), k);
            assert!(picked.iter().all(|item| pool.contains(item)));
        }
    }

    #[test]
    fn oversized_sample_returns_whole_pool() {
        let pool = vec!["a", "b", "c"];
        let mut rng = srandom(11);
        let picked = sample(&pool, 10, &mut rng);
        assert_eq!(picked.len(), 3);
        let unique: HashSet<&str> = picked.into_iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn same_seed_same_order() {
        let pool: Vec<u32> = (0..30).collect();
        let first = sample(&pool, 10, &mut srandom(99));
        let second = sample(&pool, 10, &mut srandom(99));
        assert_eq!(first, second);
    }

    #[test]
    fn empty_pool_is_harmless() {
        let pool: Vec<u8> = Vec::new();
        let mut rng = srandom(1);
        assert!(shuffle(&pool, &mut rng).is_empty());
        assert!(sample(&pool, 3, &mut rng).is_empty());
        assert!(pick(&pool, &mut rng).is_none());
    }

    #[test]
    fn pick_returns_member() {
        let pool = ["x", "y", "z"];
        let mut rng = srandom(5);
        let chosen = pick(&pool, &mut rng).copied().unwrap();
        assert!(pool.contains(&chosen));
    }
}
