//! Partial ordering for paginated views
//!
//! Sorting a million-entry list to show its first page is wasteful. `sort_range`
//! only guarantees that the requested window holds the right items in sorted
//! order, and that everything left of it sorts before and everything right of
//! it sorts after.

use std::cmp::Ordering;

/// Sort `items[window_left..=window_right]` into place within the sub-slice
/// `items[left..=right]`.
///
/// After the call:
/// - every item in `left..window_left` compares `<=` every window item,
/// - every item in `window_right + 1..=right` compares `>=` every window item,
/// - the window itself is sorted.
///
/// Bounds are inclusive, matching how paginated providers track their sorted
/// prefix and suffix. Empty or out-of-range requests are ignored.
pub fn sort_range<T, F>(
    items: &mut [T],
    mut compare: F,
    left: usize,
    right: usize,
    window_left: usize,
    window_right: usize,
) where
    F: FnMut(&T, &T) -> Ordering,
{
    if items.is_empty() || left > right || right >= items.len() {
        return;
    }
    let window_left = window_left.max(left);
    let window_right = window_right.min(right);
    if window_left > window_right {
        return;
    }

    let slice = &mut items[left..=right];
    let from = window_left - left;
    let to = window_right - left;

    // 1. Pin the first window item; everything before it is now smaller.
    if from > 0 {
        slice.select_nth_unstable_by(from, &mut compare);
    }
    // 2. Pin the last window item within the remainder.
    let tail = &mut slice[from..];
    let last = to - from;
    if last + 1 < tail.len() {
        tail.select_nth_unstable_by(last, &mut compare);
    }
    // 3. Order the window itself.
    tail[..=last].sort_by(&mut compare);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_matches_full_sort() {
        let original = vec![9, 3, 7, 1, 8, 2, 6, 0, 5, 4];
        let mut expected = original.clone();
        expected.sort();

        let mut items = original.clone();
        sort_range(&mut items, |a, b| a.cmp(b), 0, 9, 3, 5);
        assert_eq!(&items[3..=5], &expected[3..=5]);
        assert!(items[..3].iter().all(|x| *x <= items[3]));
        assert!(items[6..].iter().all(|x| *x >= items[5]));
    }

    #[test]
    fn test_sub_slice_is_left_alone_outside_bounds() {
        let mut items = vec![5, 4, 3, 2, 1, 0];
        sort_range(&mut items, |a, b| a.cmp(b), 2, 5, 2, 3);
        assert_eq!(&items[..2], &[5, 4]);
        assert_eq!(&items[2..4], &[0, 1]);
    }

    #[test]
    fn test_descending_comparator() {
        let mut items = vec![1, 5, 2, 4, 3];
        sort_range(&mut items, |a, b| b.cmp(a), 0, 4, 0, 1);
        assert_eq!(&items[..2], &[5, 4]);
    }

    #[test]
    fn test_degenerate_requests() {
        let mut empty: Vec<i32> = Vec::new();
        sort_range(&mut empty, |a, b| a.cmp(b), 0, 0, 0, 0);

        let mut items = vec![3, 1, 2];
        sort_range(&mut items, |a, b| a.cmp(b), 0, 2, 2, 1);
        assert_eq!(items, vec![3, 1, 2]);

        sort_range(&mut items, |a, b| a.cmp(b), 0, 7, 0, 2);
        assert_eq!(items, vec![3, 1, 2]);
    }

    #[test]
    fn test_window_clamped_to_bounds() {
        let mut items = vec![4, 3, 2, 1];
        sort_range(&mut items, |a, b| a.cmp(b), 0, 3, 0, 10);
        assert_eq!(items, vec![1, 2, 3, 4]);
    }
}
