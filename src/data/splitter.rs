// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles samples and splits them into two sets.
//
// The study ships a separate validation directory, so this is
// only used as a fallback when that directory yields nothing:
// the training slices are then split so validation metrics
// still exist for every epoch.
//
// The shuffle is seeded so the same seed always puts the same
// slices on each side of the split.
//
// Reference: rand crate documentation (SliceRandom, SeedableRng)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation).
///
/// # Arguments
/// * `samples`        - All available samples (consumed by this function)
/// * `train_fraction` - Proportion for training, e.g. 0.9 = 90%
/// * `seed`           - Seed for the Fisher-Yates shuffle
pub fn split_train_val<T>(
    mut samples:    Vec<T>,
    train_fraction: f64,
    seed:           u64,
) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction).round() as usize;

    // Clamp to valid range to avoid panics on tiny datasets.
    // A fractional split of two or more samples keeps both sides non-empty.
    let split_at = if total >= 2 && train_fraction > 0.0 && train_fraction < 1.0 {
        split_at.clamp(1, total - 1)
    } else {
        split_at.min(total)
    };

    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation ({}% / {}%)",
        samples.len(),
        val.len(),
        (samples.len() * 100) / total.max(1),
        (val.len()     * 100) / total.max(1),
    );

    (samples, val)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_split_sizes() {
        let items: Vec<usize> = (0..100).collect();
        let (train, val)      = split_train_val(items, 0.9, 42);
        assert_eq!(train.len(), 90);
        assert_eq!(val.len(),   10);
    }

    #[test]
    fn test_all_items_preserved() {
        let items: Vec<usize> = (0..50).collect();
        let (train, val)      = split_train_val(items, 0.7, 1);
        let mut all: Vec<usize> = train.into_iter().chain(val).collect();
        all.sort();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let a = split_train_val((0..30).collect::<Vec<u32>>(), 0.8, 7);
        let b = split_train_val((0..30).collect::<Vec<u32>>(), 0.8, 7);
        assert_eq!(a, b);
    }

    #[test]
    fn test_small_split_keeps_both_sides() {
        let (train, val) = split_train_val(vec![1u8, 2], 0.9, 42);
        assert_eq!((train.len(), val.len()), (1, 1));

        let (train, val) = split_train_val(vec![1u8, 2, 3], 0.1, 42);
        assert_eq!((train.len(), val.len()), (1, 2));
    }

    #[test]
    fn test_empty_dataset() {
        let items: Vec<usize> = Vec::new();
        let (train, val)      = split_train_val(items, 0.8, 42);
        assert!(train.is_empty());
        assert!(val.is_empty());
    }
}
