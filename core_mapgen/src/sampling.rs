//! Weighted sampling without replacement.

use std::{collections::HashMap, hash::Hash};

use crate::rng::GenerationRng;

/// Draw up to `count` distinct items, each draw proportional to `weight`.
///
/// Items whose weight is not strictly positive are never returned. When fewer
/// than `count` items have positive weight, all of them are returned (in
/// draw order).
pub fn sample<T, F>(rng: &mut GenerationRng, candidates: &[T], count: usize, mut weight: F) -> Vec<T>
where
    T: Clone,
    F: FnMut(&T) -> f64,
{
    let mut pool: Vec<(T, f64)> = candidates
        .iter()
        .filter_map(|item| {
            let w = weight(item);
            (w > 0.0 && w.is_finite()).then(|| (item.clone(), w))
        })
        .collect();

    let mut picked = Vec::with_capacity(count.min(pool.len()));
    while picked.len() < count && !pool.is_empty() {
        let idx = draw_index(rng, pool.iter().map(|(_, w)| *w));
        let (item, _) = pool.swap_remove(idx);
        picked.push(item);
    }
    picked
}

/// Convenience wrapper for a single weighted draw.
pub fn sample_one<T, F>(rng: &mut GenerationRng, candidates: &[T], weight: F) -> Option<T>
where
    T: Clone,
    F: FnMut(&T) -> f64,
{
    sample(rng, candidates, 1, weight).into_iter().next()
}

/// Like [`sample`], but part of each candidate's weight depends on what has
/// already been picked.
///
/// The effective weight is `static_weight(c) + dynamic_weight(c, picked)`.
/// After each pick only the candidates returned by `expansion(picked_item)`
/// have their dynamic part recomputed, so `expansion` must list every
/// candidate whose weight the new pick can influence (typically its
/// neighbors).
pub fn sample_dynamic<T, S, D, E>(
    rng: &mut GenerationRng,
    candidates: &[T],
    count: usize,
    mut static_weight: S,
    mut dynamic_weight: D,
    mut expansion: E,
) -> Vec<T>
where
    T: Clone + Eq + Hash,
    S: FnMut(&T) -> f64,
    D: FnMut(&T, &[T]) -> f64,
    E: FnMut(&T) -> Vec<T>,
{
    let mut items: Vec<T> = Vec::with_capacity(candidates.len());
    let mut base: Vec<f64> = Vec::with_capacity(candidates.len());
    let mut extra: Vec<f64> = Vec::with_capacity(candidates.len());
    let mut position: HashMap<T, usize> = HashMap::with_capacity(candidates.len());
    let mut alive: Vec<bool> = Vec::with_capacity(candidates.len());

    for item in candidates {
        if position.contains_key(item) {
            continue;
        }
        let w = static_weight(item);
        if !w.is_finite() {
            continue;
        }
        position.insert(item.clone(), items.len());
        items.push(item.clone());
        base.push(w);
        extra.push(0.0);
        alive.push(true);
    }

    let effective = |base: &[f64], extra: &[f64], alive: &[bool], idx: usize| -> f64 {
        if !alive[idx] {
            return 0.0;
        }
        let w = base[idx] + extra[idx];
        if w > 0.0 && w.is_finite() {
            w
        } else {
            0.0
        }
    };

    let mut picked: Vec<T> = Vec::with_capacity(count.min(items.len()));
    while picked.len() < count {
        let total: f64 = (0..items.len())
            .map(|idx| effective(&base, &extra, &alive, idx))
            .sum();
        if total <= 0.0 {
            break;
        }
        let idx = draw_index(
            rng,
            (0..items.len()).map(|idx| effective(&base, &extra, &alive, idx)),
        );
        alive[idx] = false;
        let chosen = items[idx].clone();
        picked.push(chosen.clone());

        for affected in expansion(&chosen) {
            if let Some(&pos) = position.get(&affected) {
                if alive[pos] {
                    extra[pos] = dynamic_weight(&items[pos], &picked);
                }
            }
        }
    }
    picked
}

/// Roulette-wheel index over non-negative weights with a positive sum.
fn draw_index<I>(rng: &mut GenerationRng, weights: I) -> usize
where
    I: Iterator<Item = f64> + Clone,
{
    let total: f64 = weights.clone().sum();
    let mut target = rng.below_f64(total);
    let mut last_positive = 0;
    for (idx, w) in weights.enumerate() {
        if w <= 0.0 {
            continue;
        }
        last_positive = idx;
        if target < w {
            return idx;
        }
        target -= w;
    }
    // Floating point drift can leave a sliver past the final bucket.
    last_positive
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn never_returns_non_positive_weights() {
        let mut rng = GenerationRng::new(11);
        let items: Vec<i32> = (-5..10).collect();
        for _ in 0..200 {
            let picked = sample(&mut rng, &items, 20, |&i| i as f64);
            assert!(picked.iter().all(|&i| i > 0));
        }
    }

    #[test]
    fn returns_exactly_k_distinct_when_available() {
        let mut rng = GenerationRng::new(5);
        let items: Vec<u32> = (0..12).collect();
        for k in 0..=12 {
            let picked = sample(&mut rng, &items, k, |&i| 1.0 + i as f64);
            let unique: HashSet<_> = picked.iter().copied().collect();
            assert_eq!(picked.len(), k);
            assert_eq!(unique.len(), k);
        }
    }

    #[test]
    fn oversized_request_returns_all_positive_items() {
        let mut rng = GenerationRng::new(3);
        let items = vec!['a', 'b', 'c', 'd'];
        let picked = sample(&mut rng, &items, 10, |&c| if c == 'b' { 0.0 } else { 2.5 });
        let set: HashSet<_> = picked.into_iter().collect();
        assert_eq!(set, HashSet::from(['a', 'c', 'd']));
    }

    #[test]
    fn three_of_five_uniform_never_repeats() {
        let mut rng = GenerationRng::new(2024);
        let items = [10u8, 20, 30, 40, 50];
        for _ in 0..10_000 {
            let picked = sample(&mut rng, &items, 3, |_| 1.0);
            assert_eq!(picked.len(), 3);
            let unique: HashSet<_> = picked.iter().collect();
            assert_eq!(unique.len(), 3);
            assert!(picked.iter().all(|p| items.contains(p)));
        }
    }

    #[test]
    fn heavier_items_win_more_often() {
        let mut rng = GenerationRng::new(77);
        let items = [0usize, 1];
        let mut wins = [0u32; 2];
        for _ in 0..4_000 {
            let first = sample_one(&mut rng, &items, |&i| if i == 0 { 1.0 } else { 9.0 }).unwrap();
            wins[first] += 1;
        }
        assert!(wins[1] > wins[0] * 5);
    }

    #[test]
    fn dynamic_weight_can_unlock_candidates() {
        // Only item 0 starts with weight; every pick makes its successor
        // eligible, so the draw order must be 0, 1, 2, 3.
        let mut rng = GenerationRng::new(9);
        let items: Vec<u32> = (0..4).collect();
        let picked = sample_dynamic(
            &mut rng,
            &items,
            4,
            |&i| if i == 0 { 1.0 } else { 0.0 },
            |&i, picked| if picked.contains(&(i - 1)) { 1.0 } else { 0.0 },
            |&i| vec![i + 1],
        );
        assert_eq!(picked, vec![0, 1, 2, 3]);
    }

    #[test]
    fn dynamic_weight_can_suppress_candidates() {
        let mut rng = GenerationRng::new(4);
        let items: Vec<i32> = (0..10).collect();
        let picked = sample_dynamic(
            &mut rng,
            &items,
            10,
            |_| 1.0,
            |_, _| -1.0,
            |&i| vec![i - 1, i + 1],
        );
        let set: HashSet<_> = picked.iter().copied().collect();
        for &p in &picked {
            assert!(!set.contains(&(p + 1)));
        }
    }
}
