//! Sliding training windows over scaled features

use ndarray::{Array1, Array2, Array3, s};

/// Build `(X, y)` pairs where `X[k]` holds rows `k..k + seq_len` and `y[k]` is
/// `target_col` of the row right after the window
///
/// Fewer than `seq_len + 1` rows produce an empty set.
pub fn make_sequences(
    scaled: &Array2<f64>,
    seq_len: usize,
    target_col: usize,
) -> (Array3<f64>, Array1<f64>) {
    let (rows, features) = scaled.dim();
    let n = rows.saturating_sub(seq_len);

    let mut x = Array3::zeros((n, seq_len, features));
    let mut y = Array1::zeros(n);

    for k in 0..n {
        x.slice_mut(s![k, .., ..])
            .assign(&scaled.slice(s![k..k + seq_len, ..]));
        y[k] = scaled[[k + seq_len, target_col]];
    }

    (x, y)
}

/// Index separating training windows from validation windows
///
/// The split is chronological: windows before the index train, the rest validate.
pub fn train_val_split(n: usize, ratio: f64) -> usize {
    ((n as f64 * ratio).floor() as usize).min(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    #[test]
    fn test_make_sequences_alignment() {
        // 6 rows x 2 features, value = row * 10 + col
        let data = Array::from_shape_fn((6, 2), |(r, c)| (r * 10 + c) as f64);
        let (x, y) = make_sequences(&data, 3, 0);

        assert_eq!(x.dim(), (3, 3, 2));
        assert_eq!(y.to_vec(), vec![30.0, 40.0, 50.0]);
        assert!((x[[0, 0, 1]] - 1.0).abs() < f64::EPSILON);
        assert!((x[[2, 2, 0]] - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_too_short_is_empty() {
        let data = Array2::<f64>::zeros((3, 4));
        let (x, y) = make_sequences(&data, 3, 0);
        assert_eq!(x.dim(), (0, 3, 4));
        assert!(y.is_empty());
    }

    #[test]
    fn test_train_val_split() {
        assert_eq!(train_val_split(10, 0.8), 8);
        assert_eq!(train_val_split(7, 0.8), 5);
        assert_eq!(train_val_split(1, 0.8), 0);
        assert_eq!(train_val_split(0, 0.8), 0);
    }
}
