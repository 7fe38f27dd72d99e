//! Per-column min-max scaling to `[0, 1]`

use crate::error::{Result, StockError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Min-max scaler fitted column by column
///
/// A constant column gets a scale of 1, so it transforms to 0 and inverts back
/// to its minimum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: Array1<f64>,
    range: Array1<f64>,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        !self.min.is_empty()
    }

    /// Learn per-column minimum and range
    pub fn fit(&mut self, data: &Array2<f64>) -> Result<()> {
        if data.nrows() == 0 {
            return Err(StockError::Other("Cannot fit scaler on empty data".to_string()));
        }

        let min = data.fold_axis(Axis(0), f64::INFINITY, |acc, &v| acc.min(v));
        let max = data.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, &v| acc.max(v));
        let range = (&max - &min).mapv(|r| if r == 0.0 { 1.0 } else { r });

        self.min = min;
        self.range = range;
        Ok(())
    }

    /// Scale data with the fitted parameters
    pub fn transform(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(data.ncols())?;
        Ok((data - &self.min) / &self.range)
    }

    pub fn fit_transform(&mut self, data: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(data)?;
        self.transform(data)
    }

    /// Map scaled values of one column back to original units
    pub fn inverse_transform_column(&self, column: usize, values: &Array1<f64>) -> Result<Array1<f64>> {
        if column >= self.min.len() {
            return Err(StockError::Other(format!(
                "Column {column} out of range for scaler with {} columns",
                self.min.len()
            )));
        }
        let (min, range) = (self.min[column], self.range[column]);
        Ok(values.mapv(|v| v * range + min))
    }

    /// Inverse of a single scaled value
    pub fn inverse_value(&self, column: usize, value: f64) -> Result<f64> {
        let out = self.inverse_transform_column(column, &Array1::from(vec![value]))?;
        Ok(out[0])
    }

    fn check_width(&self, ncols: usize) -> Result<()> {
        if !self.is_fitted() {
            return Err(StockError::Other("Scaler used before fit".to_string()));
        }
        if ncols != self.min.len() {
            return Err(StockError::Other(format!(
                "Scaler fitted on {} columns, got {ncols}",
                self.min.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_transform_bounds() {
        let data = array![[1.0, 10.0], [3.0, 20.0], [2.0, 30.0]];
        let mut scaler = MinMaxScaler::new();
        let scaled = scaler.fit_transform(&data).unwrap();

        assert_eq!(scaled, array![[0.0, 0.0], [1.0, 0.5], [0.5, 1.0]]);
    }

    #[test]
    fn test_constant_column() {
        let data = array![[5.0, 1.0], [5.0, 2.0]];
        let mut scaler = MinMaxScaler::new();
        let scaled = scaler.fit_transform(&data).unwrap();

        assert!(scaled.column(0).iter().all(|v| *v == 0.0));
        assert!((scaler.inverse_value(0, 0.0).unwrap() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_inverse_column() {
        let data = array![[0.0, 100.0], [1.0, 300.0]];
        let mut scaler = MinMaxScaler::new();
        scaler.fit(&data).unwrap();

        let restored = scaler
            .inverse_transform_column(1, &array![0.0, 0.25, 1.0, 1.5])
            .unwrap();
        assert_eq!(restored, array![100.0, 150.0, 300.0, 400.0]);
        assert!(scaler.inverse_transform_column(2, &array![0.0]).is_err());
    }

    #[test]
    fn test_unfitted_and_width_mismatch() {
        let scaler = MinMaxScaler::new();
        assert!(scaler.transform(&array![[1.0]]).is_err());

        let mut scaler = MinMaxScaler::new();
        scaler.fit(&array![[1.0, 2.0]]).unwrap();
        assert!(scaler.transform(&array![[1.0, 2.0, 3.0]]).is_err());
        assert!(scaler.fit(&Array2::zeros((0, 2))).is_err());
    }
}
