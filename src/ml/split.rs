use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use tracing::warn;

use super::error::TrainingError;

/// Row indices of a train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
    pub stratified: bool,
}

/// Seeded shuffle split with `ceil(test_fraction * n)` test rows.
///
/// Stratifies on the label when it has more than one class and every class
/// has at least two rows; otherwise falls back to a plain shuffle.
pub fn train_test_split(
    labels: &[usize],
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit, TrainingError> {
    let n = labels.len();
    if n < 2 {
        return Err(TrainingError::TooFewRows { needed: 2, actual: n });
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TrainingError::InvalidParams(format!(
            "test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }
    let n_test = ((test_fraction * n as f64).ceil() as usize).clamp(1, n - 1);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    let stratify = by_class.len() > 1 && by_class.values().all(|rows| rows.len() >= 2);
    if by_class.len() > 1 && !stratify {
        warn!("A class has fewer than 2 rows; falling back to an unstratified split");
    }

    let (mut train, mut test) = if stratify {
        stratified(&by_class, n, n_test, &mut rng)
    } else {
        let mut rows: Vec<usize> = (0..n).collect();
        rows.shuffle(&mut rng);
        let train = rows.split_off(n_test);
        (train, rows)
    };
    train.sort_unstable();
    test.sort_unstable();

    Ok(TrainTestSplit {
        train,
        test,
        stratified: stratify,
    })
}

/// Allocate test rows per class by largest remainder, keeping at least one
/// row of every class on each side.
fn stratified(
    by_class: &BTreeMap<usize, Vec<usize>>,
    n: usize,
    n_test: usize,
    rng: &mut StdRng,
) -> (Vec<usize>, Vec<usize>) {
    let mut quotas: Vec<(usize, f64)> = by_class
        .values()
        .map(|rows| {
            let exact = n_test as f64 * rows.len() as f64 / n as f64;
            (exact.floor() as usize, exact - exact.floor())
        })
        .collect();

    let mut assigned: usize = quotas.iter().map(|(q, _)| q).sum();
    let mut order: Vec<usize> = (0..quotas.len()).collect();
    order.sort_by(|&a, &b| quotas[b].1.total_cmp(&quotas[a].1));
    for &c in order.iter().cycle().take(quotas.len() * 2) {
        if assigned >= n_test {
            break;
        }
        quotas[c].0 += 1;
        assigned += 1;
    }

    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);
    for ((_, rows), (quota, _)) in by_class.iter().zip(&quotas) {
        let quota = (*quota).clamp(1, rows.len() - 1);
        let mut rows = rows.clone();
        rows.shuffle(rng);
        let rest = rows.split_off(quota);
        test.extend(rows);
        train.extend(rest);
    }
    (train, test)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pos: usize, neg: usize) -> Vec<usize> {
        let mut l = vec![1; pos];
        l.extend(vec![0; neg]);
        l
    }

    #[test]
    fn test_sizes_and_disjointness() {
        let y = labels(30, 70);
        let split = train_test_split(&y, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);
        assert!(split.stratified);

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_stratification_keeps_class_ratio() {
        let y = labels(30, 70);
        let split = train_test_split(&y, 0.2, 7).unwrap();
        let test_pos = split.test.iter().filter(|&&i| y[i] == 1).count();
        assert_eq!(test_pos, 6);
    }

    #[test]
    fn test_test_size_rounds_up() {
        let y = labels(5, 6);
        let split = train_test_split(&y, 0.2, 1).unwrap();
        assert_eq!(split.test.len(), 3);
    }

    #[test]
    fn test_single_class_is_unstratified() {
        let y = labels(0, 10);
        let split = train_test_split(&y, 0.2, 3).unwrap();
        assert!(!split.stratified);
        assert_eq!(split.test.len(), 2);
    }

    #[test]
    fn test_singleton_class_falls_back() {
        let y = labels(1, 9);
        let split = train_test_split(&y, 0.2, 3).unwrap();
        assert!(!split.stratified);
        assert_eq!(split.test.len() + split.train.len(), 10);
    }

    #[test]
    fn test_same_seed_same_split() {
        let y = labels(40, 60);
        assert_eq!(
            train_test_split(&y, 0.2, 42).unwrap(),
            train_test_split(&y, 0.2, 42).unwrap()
        );
    }

    #[test]
    fn test_rejects_tiny_or_bad_input() {
        assert!(matches!(
            train_test_split(&[1], 0.2, 0),
            Err(TrainingError::TooFewRows { actual: 1, .. })
        ));
        assert!(train_test_split(&[0, 1], 1.5, 0).is_err());
    }
}
