//! Computes a (bucketCount, bucketCapacity, fingerprintLength) triple that
//! meets a target false positive rate under an empirical load model.

use crate::error::Error;

/// Empirical max load for each supported bucket capacity, from the cuckoo
/// filter literature: the load a randomly-filled table of that bucket
/// capacity can sustain before inserts start failing at a non-negligible
/// rate.
const LOAD_FACTORS: [(u32, f64); 7] = [
    (2, 0.85),
    (3, 0.91),
    (4, 0.95),
    (5, 0.96),
    (6, 0.97),
    (7, 0.98),
    (8, 0.98),
];

/// Picks (bucketCount, bucketCapacity, fingerprintLength) to hold `capacity`
/// items at a false positive rate no worse than `target_fpr`, minimizing
/// total bits among the candidates that satisfy the constraints.
///
/// Fails with [`Error::InvalidArgument`] if `target_fpr` isn't in `(0, 1)`,
/// `capacity` is 0, or no candidate bucket capacity yields a satisfiable
/// (bucketCount, fingerprintLength) pair.
pub fn compute_size(target_fpr: f64, capacity: u64) -> Result<(u32, u32, u32), Error> {
    if !(target_fpr > 0.0 && target_fpr < 1.0) {
        return Err(Error::InvalidArgument(
            "target false positive rate must be in (0, 1)".into(),
        ));
    }
    if capacity < 1 {
        return Err(Error::InvalidArgument("capacity must be >= 1".into()));
    }

    let mut best: Option<(u32, u32, u32, u128)> = None;

    for &(k, load) in &LOAD_FACTORS {
        let f = (-target_fpr.log2() + (k as f64).log2() + 1.0).ceil();
        if !(1.0..=64.0).contains(&f) {
            continue;
        }
        let f = f as u32;

        let b = (capacity as f64 / (k as f64 * load)).ceil();
        if !(b >= 1.0 && b < 2f64.powi(31)) {
            continue;
        }
        let b = b as u32;

        let total_bits = (b as u128) * (k as u128) * (f as u128);
        let better = match best {
            None => true,
            Some((_, _, _, best_bits)) => total_bits < best_bits,
        };
        if better {
            best = Some((b, k, f, total_bits));
        }
    }

    best.map(|(b, k, f, _)| (b, k, f)).ok_or_else(|| {
        Error::InvalidArgument(format!(
            "no (bucketCount, bucketCapacity, fingerprintLength) satisfies fpr={target_fpr} capacity={capacity}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_parameters() {
        assert!(compute_size(0.0, 100).is_err());
        assert!(compute_size(1.0, 100).is_err());
        assert!(compute_size(-0.1, 100).is_err());
        assert!(compute_size(0.01, 0).is_err());
    }

    #[test]
    fn produces_sane_capacity() {
        let (b, k, f) = compute_size(0.01, 10_000).unwrap();
        assert!(b >= 1);
        assert!((2..=8).contains(&k));
        assert!(f >= 1 && f <= 64);
        // the table must be able to hold at least `capacity` items at the
        // empirical max load for its chosen bucket capacity.
        assert!((b as u64) * (k as u64) >= 10_000);
    }

    #[test]
    fn tighter_fpr_uses_more_bits() {
        let (b1, k1, f1) = compute_size(0.05, 10_000).unwrap();
        let (b2, k2, f2) = compute_size(0.001, 10_000).unwrap();
        let bits1 = b1 as u128 * k1 as u128 * f1 as u128;
        let bits2 = b2 as u128 * k2 as u128 * f2 as u128;
        assert!(bits2 > bits1);
    }

    #[test]
    fn extreme_capacity_still_satisfiable_or_reported() {
        match compute_size(0.001, 1) {
            Ok((b, k, f)) => {
                assert!(b >= 1);
                assert!((2..=8).contains(&k));
                assert!(f >= 1);
            }
            Err(Error::InvalidArgument(_)) => {}
            Err(_) => panic!("unexpected error variant"),
        }
    }
}
