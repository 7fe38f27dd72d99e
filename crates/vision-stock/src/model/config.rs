//! Model shape and training options

use serde::{Deserialize, Serialize};

/// Shape of a [`StockLstm`](super::StockLstm)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmConfig {
    /// Number of input features per time step
    pub input_size: usize,
    /// Hidden state size
    pub hidden_size: usize,
    /// Number of stacked LSTM layers
    pub num_layers: usize,
    /// Number of outputs of the linear head
    pub output_size: usize,
    /// Dropout on the last hidden state while training
    pub dropout: f64,
}

impl LstmConfig {
    /// Single-layer model with one output
    pub fn new(input_size: usize, hidden_size: usize) -> Self {
        Self {
            input_size,
            hidden_size,
            num_layers: 1,
            output_size: 1,
            dropout: 0.2,
        }
    }

    pub fn with_layers(mut self, num_layers: usize) -> Self {
        self.num_layers = num_layers;
        self
    }

    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }
}

/// Options for a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainOptions {
    pub epochs: usize,
    pub learning_rate: f64,
    /// Samples per forward/backward chunk; gradients of all chunks are summed
    /// into one full-batch update per epoch
    pub chunk_size: usize,
    /// Seed for dropout masks, `None` draws from entropy
    pub seed: Option<u64>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 15,
            learning_rate: 0.01,
            chunk_size: 256,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LstmConfig::new(8, 64);
        assert_eq!(config.num_layers, 1);
        assert_eq!(config.output_size, 1);
        assert!((config.dropout - 0.2).abs() < f64::EPSILON);

        let config = config.with_layers(2).with_dropout(0.0);
        assert_eq!(config.num_layers, 2);
        assert!(config.dropout.abs() < f64::EPSILON);

        let options = TrainOptions::default();
        assert_eq!(options.epochs, 15);
        assert!((options.learning_rate - 0.01).abs() < f64::EPSILON);
    }
}
