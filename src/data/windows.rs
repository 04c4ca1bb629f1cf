// ============================================================
// Layer 4 — Training Window Builder
// ============================================================
// Cuts every encoded document into fixed-length, overlapping
// training windows.
//
// Sliding window with a half-window stride:
//   - every window is exactly `max_length` ids long
//   - stride = max(1, max_length / 2), so adjacent windows
//     share half their ids
//   - a trailing slice shorter than `max_length` is dropped,
//     and a document shorter than `max_length` gives nothing
//
// Example with length 250, max_length=100 → stride 50:
//   offset   0 → [  0,100)
//   offset  50 → [ 50,150)
//   offset 100 → [100,200)
//   offset 150 → [150,250)
//   offset 200 → [200,300) exceeds 250 → not emitted
//
// Windows come out in source order, then by ascending offset.
//
// Reference: Rust Book §8 (Slices)

/// A fixed-length slice of a token sequence used as one training example.
pub type TrainingWindow = Vec<u32>;

/// Distance between the starts of adjacent windows.
pub fn stride_for(max_length: usize) -> usize {
    (max_length / 2).max(1)
}

/// Build every full window of `max_length` ids from `sequences`.
pub fn build_windows(sequences: &[Vec<u32>], max_length: usize) -> Vec<TrainingWindow> {
    // Zero-length windows carry nothing to learn from
    if max_length == 0 {
        return Vec::new();
    }

    let stride = stride_for(max_length);

    sequences
        .iter()
        .flat_map(|seq| {
            // Offsets whose window still ends inside the sequence
            let last_start = seq.len().checked_sub(max_length);
            last_start
                .into_iter()
                .flat_map(move |last| (0..=last).step_by(stride))
                .map(move |start| seq[start..start + max_length].to_vec())
        })
        .collect()
}

/// Returns how many windows a sequence of `len` ids would produce
pub fn num_windows(len: usize, max_length: usize) -> usize {
    if max_length == 0 || len < max_length {
        return 0;
    }
    (len - max_length) / stride_for(max_length) + 1
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn seq(len: u32) -> Vec<u32> {
        (0..len).collect()
    }

    #[test]
    fn test_length_250_window_100_gives_four() {
        let windows = build_windows(&[seq(250)], 100);
        assert_eq!(windows.len(), 4);
        let starts: Vec<u32> = windows.iter().map(|w| w[0]).collect();
        assert_eq!(starts, vec![0, 50, 100, 150]);
        assert_eq!(*windows[3].last().unwrap(), 249);
        assert_eq!(num_windows(250, 100), 4);
    }

    #[test]
    fn test_every_window_has_exact_length() {
        let windows = build_windows(&[seq(37), seq(12), seq(9)], 10);
        assert!(!windows.is_empty());
        assert!(windows.iter().all(|w| w.len() == 10));
    }

    #[test]
    fn test_short_sequences_contribute_nothing() {
        assert!(build_windows(&[seq(9)], 10).is_empty());
        assert!(build_windows(&[Vec::new()], 4).is_empty());
    }

    #[test]
    fn test_exact_length_gives_one_window() {
        assert_eq!(build_windows(&[seq(10)], 10), vec![seq(10)]);
    }

    #[test]
    fn test_window_of_one_uses_unit_stride() {
        let windows = build_windows(&[seq(3)], 1);
        assert_eq!(windows, vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_zero_length_gives_no_windows() {
        assert!(build_windows(&[seq(5)], 0).is_empty());
    }

    #[test]
    fn test_source_order_is_kept() {
        let a: Vec<u32> = vec![1, 1, 1, 1];
        let b: Vec<u32> = vec![2, 2, 2, 2];
        let windows = build_windows(&[a, b], 4);
        assert_eq!(windows, vec![vec![1, 1, 1, 1], vec![2, 2, 2, 2]]);
    }

    #[test]
    fn test_num_windows_matches_builder() {
        for len in 0..40 {
            for max_length in 1..12 {
                assert_eq!(
                    num_windows(len, max_length),
                    build_windows(&[seq(len as u32)], max_length).len(),
                    "len={len} max_length={max_length}"
                );
            }
        }
    }
}
