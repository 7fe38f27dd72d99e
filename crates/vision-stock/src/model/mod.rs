//! Recurrent forecasting model
//!
//! - `config` - model shape and training options
//! - `lstm` - LSTM layers with a linear head, trained by backpropagation through time
//! - `optimizer` - Adam

mod config;
mod lstm;
mod optimizer;

pub use config::{LstmConfig, TrainOptions};
pub use lstm::StockLstm;
pub use optimizer::Adam;
