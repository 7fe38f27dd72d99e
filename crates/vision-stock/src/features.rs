//! Technical feature engineering on daily bars
//!
//! Every bar becomes one row of [`FEATURE_COLUMNS`]. Rolling means are computed
//! with `ta`'s simple moving average and masked to the values a fixed-window
//! rolling mean would produce.

use crate::api::Quote;
use crate::error::{Result, StockError};
use chrono::NaiveDate;
use ndarray::{Array2, ArrayViewMut1};
use ta::Next;
use ta::indicators::SimpleMovingAverage;

/// Model input columns, in order
pub const FEATURE_COLUMNS: [&str; 8] = ["Open", "High", "Low", "Close", "Volume", "MA5", "MA10", "RSI14"];

/// Index of the Close column, the forecasting target
pub const CLOSE_INDEX: usize = 3;

const RSI_PERIOD: usize = 14;
/// RSI reported before enough price changes exist
const RSI_NEUTRAL: f64 = 50.0;
/// Stand-in for a zero average loss
const RSI_ZERO_LOSS: f64 = 1e-9;

/// Engineered features aligned with their trading dates
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    pub dates: Vec<NaiveDate>,
    /// `[rows, FEATURE_COLUMNS.len()]`
    pub rows: Array2<f64>,
}

impl FeatureFrame {
    /// Build the feature matrix from bars in any order
    pub fn from_quotes(quotes: &[Quote]) -> Result<Self> {
        let mut bars: Vec<&Quote> = quotes.iter().collect();
        bars.sort_by_key(|q| q.timestamp);

        let closes: Vec<f64> = bars.iter().map(|q| q.close).collect();
        let ma5 = rolling_mean(&closes, 5)?;
        let ma10 = rolling_mean(&closes, 10)?;
        let rsi = rsi(&closes, RSI_PERIOD)?;

        let mut rows = Array2::zeros((bars.len(), FEATURE_COLUMNS.len()));
        for (i, q) in bars.iter().enumerate() {
            let values = [
                q.open,
                q.high,
                q.low,
                q.close,
                q.volume as f64,
                ma5[i],
                ma10[i],
                rsi[i],
            ];
            for (j, v) in values.into_iter().enumerate() {
                rows[[i, j]] = v;
            }
        }

        for column in rows.columns_mut() {
            fill_gaps(column);
        }

        Ok(Self {
            dates: bars.iter().map(|q| q.date).collect(),
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.nrows() == 0
    }

    pub fn n_features(&self) -> usize {
        self.rows.ncols()
    }
}

/// Fixed-window simple moving average, 0 until the window is full
pub fn rolling_mean(values: &[f64], period: usize) -> Result<Vec<f64>> {
    let mut sma = SimpleMovingAverage::new(period)
        .map_err(|e| StockError::IndicatorError(e.to_string()))?;

    Ok(values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let mean = sma.next(v);
            if i + 1 >= period { mean } else { 0.0 }
        })
        .collect())
}

/// RSI from simple rolling means of gains and losses
///
/// Row `i` uses the price changes ending at `i`, so the first value appears at
/// index `period`; earlier rows hold the neutral 50.
pub fn rsi(closes: &[f64], period: usize) -> Result<Vec<f64>> {
    let mut avg_gain = SimpleMovingAverage::new(period)
        .map_err(|e| StockError::IndicatorError(e.to_string()))?;
    let mut avg_loss = SimpleMovingAverage::new(period)
        .map_err(|e| StockError::IndicatorError(e.to_string()))?;

    let mut out = vec![RSI_NEUTRAL; closes.len()];
    for i in 1..closes.len() {
        let delta = closes[i] - closes[i - 1];
        let gain = avg_gain.next(delta.max(0.0));
        let loss = avg_loss.next((-delta).max(0.0));

        if i >= period {
            let loss = if loss.abs() < f64::EPSILON { RSI_ZERO_LOSS } else { loss };
            let rs = gain / loss;
            out[i] = 100.0 - 100.0 / (1.0 + rs);
        }
    }

    Ok(out)
}

/// Back-fill then forward-fill non-finite values in place
fn fill_gaps(mut column: ArrayViewMut1<'_, f64>) {
    let n = column.len();

    let mut next_valid = None;
    for i in (0..n).rev() {
        if column[i].is_finite() {
            next_valid = Some(column[i]);
        } else if let Some(v) = next_valid {
            column[i] = v;
        }
    }

    let mut prev_valid = None;
    for i in 0..n {
        if column[i].is_finite() {
            prev_valid = Some(column[i]);
        } else if let Some(v) = prev_valid {
            column[i] = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::provider::bar;
    use chrono::{Duration, TimeZone, Utc};
    use ndarray::Array1;

    fn quotes(closes: &[f64]) -> Vec<Quote> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 14, 30, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| bar("TEST", start + Duration::days(i as i64), c))
            .collect()
    }

    #[test]
    fn test_rolling_mean_masks_warmup() {
        let means = rolling_mean(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 5).unwrap();
        assert_eq!(means[..4], [0.0, 0.0, 0.0, 0.0]);
        assert!((means[4] - 3.0).abs() < 1e-12);
        assert!((means[5] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_rsi_warmup_and_all_gains() {
        let closes: Vec<f64> = (0..20).map(f64::from).collect();
        let values = rsi(&closes, 14).unwrap();

        assert!(values[..14].iter().all(|v| (*v - 50.0).abs() < f64::EPSILON));
        // no losses: the 1e-9 stand-in drives RSI to ~100
        assert!(values[14] > 99.99);
    }

    #[test]
    fn test_rsi_balanced_moves() {
        // alternating +1/-1 changes: equal average gain and loss
        let closes: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let values = rsi(&closes, 14).unwrap();
        assert!((values[29] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_all_losses() {
        let closes: Vec<f64> = (0..16).map(|i| 100.0 - f64::from(i)).collect();
        let values = rsi(&closes, 14).unwrap();
        assert!(values[15].abs() < 1e-9);
    }

    #[test]
    fn test_frame_layout_and_sorting() {
        let mut bars = quotes(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        bars.reverse();

        let frame = FeatureFrame::from_quotes(&bars).unwrap();
        assert_eq!(frame.len(), 6);
        assert_eq!(frame.n_features(), FEATURE_COLUMNS.len());
        assert_eq!(FEATURE_COLUMNS[CLOSE_INDEX], "Close");

        assert!(frame.dates.windows(2).all(|w| w[0] < w[1]));
        assert!((frame.rows[[0, CLOSE_INDEX]] - 10.0).abs() < f64::EPSILON);
        assert!((frame.rows[[5, 5]] - 13.0).abs() < 1e-12); // MA5 of 11..15
        assert!(frame.rows[[5, 6]].abs() < f64::EPSILON); // MA10 not ready
        assert!((frame.rows[[0, 4]] - 1_000_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fill_gaps() {
        let mut column = Array1::from(vec![f64::NAN, 2.0, f64::NAN, 4.0, f64::NAN]);
        fill_gaps(column.view_mut());
        assert_eq!(column.to_vec(), vec![2.0, 2.0, 4.0, 4.0, 4.0]);
    }
}
