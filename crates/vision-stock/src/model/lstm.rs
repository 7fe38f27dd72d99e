//! LSTM regressor trained with backpropagation through time
//!
//! Gate weights are packed column-wise as `[input | forget | cell | output]`,
//! so one matrix product per time step yields all four gates for the batch.

use super::config::{LstmConfig, TrainOptions};
use super::optimizer::Adam;
use crate::error::{Result, StockError};
use ndarray::{Array1, Array2, Array3, ArrayView3, Axis, s};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Uniform;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Windows per forward pass at inference time
const PREDICT_CHUNK: usize = 512;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LstmLayer {
    /// `[input, 4 * hidden]`
    w_x: Array2<f64>,
    /// `[hidden, 4 * hidden]`
    w_h: Array2<f64>,
    bias: Array1<f64>,
}

/// Activations of one time step, kept for the backward pass
struct StepCache {
    x: Array2<f64>,
    h_prev: Array2<f64>,
    c_prev: Array2<f64>,
    i: Array2<f64>,
    f: Array2<f64>,
    g: Array2<f64>,
    o: Array2<f64>,
    tanh_c: Array2<f64>,
}

struct LayerGrads {
    w_x: Array2<f64>,
    w_h: Array2<f64>,
    bias: Array1<f64>,
}

struct Gradients {
    layers: Vec<LayerGrads>,
    w_out: Array2<f64>,
    b_out: Array1<f64>,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl LstmLayer {
    fn new(input_size: usize, hidden_size: usize, rng: &mut StdRng) -> Self {
        let bound = 1.0 / (hidden_size as f64).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        Self {
            w_x: Array2::from_shape_fn((input_size, 4 * hidden_size), |_| rng.sample(&dist)),
            w_h: Array2::from_shape_fn((hidden_size, 4 * hidden_size), |_| rng.sample(&dist)),
            bias: Array1::from_shape_fn(4 * hidden_size, |_| rng.sample(&dist)),
        }
    }

    fn hidden_size(&self) -> usize {
        self.w_h.nrows()
    }

    /// Run the layer over a sequence of `[batch, input]` steps
    fn forward(&self, inputs: &[Array2<f64>], keep_cache: bool) -> (Vec<Array2<f64>>, Vec<StepCache>) {
        let hidden = self.hidden_size();
        let batch = inputs.first().map_or(0, Array2::nrows);

        let mut h = Array2::<f64>::zeros((batch, hidden));
        let mut c = Array2::<f64>::zeros((batch, hidden));
        let mut outputs = Vec::with_capacity(inputs.len());
        let mut caches = Vec::with_capacity(if keep_cache { inputs.len() } else { 0 });

        for x in inputs {
            let z = x.dot(&self.w_x) + h.dot(&self.w_h) + &self.bias;
            let i = z.slice(s![.., ..hidden]).mapv(sigmoid);
            let f = z.slice(s![.., hidden..2 * hidden]).mapv(sigmoid);
            let g = z.slice(s![.., 2 * hidden..3 * hidden]).mapv(f64::tanh);
            let o = z.slice(s![.., 3 * hidden..]).mapv(sigmoid);

            let c_next = &f * &c + &i * &g;
            let tanh_c = c_next.mapv(f64::tanh);
            let h_next = &o * &tanh_c;

            outputs.push(h_next.clone());
            if keep_cache {
                caches.push(StepCache {
                    x: x.clone(),
                    h_prev: h,
                    c_prev: c,
                    i,
                    f,
                    g,
                    o,
                    tanh_c,
                });
            }
            h = h_next;
            c = c_next;
        }

        (outputs, caches)
    }

    /// Backpropagate through time given the loss gradient w.r.t. every output
    /// step; returns parameter gradients and gradients w.r.t. every input step
    fn backward(&self, caches: &[StepCache], d_outputs: &[Array2<f64>]) -> (LayerGrads, Vec<Array2<f64>>) {
        let hidden = self.hidden_size();
        let mut grads = LayerGrads::zeros(self);
        let Some(first) = caches.first() else {
            return (grads, Vec::new());
        };
        let batch = first.x.nrows();

        let mut dh_next = Array2::<f64>::zeros((batch, hidden));
        let mut dc_next = Array2::<f64>::zeros((batch, hidden));
        let mut dz = Array2::<f64>::zeros((batch, 4 * hidden));
        let mut d_inputs = Vec::with_capacity(caches.len());

        for (cache, d_out) in caches.iter().zip(d_outputs).rev() {
            let dh = d_out + &dh_next;
            let d_o = &dh * &cache.tanh_c;
            let dc = &dh * &cache.o * &cache.tanh_c.mapv(|v| 1.0 - v * v) + &dc_next;

            dz.slice_mut(s![.., ..hidden])
                .assign(&(&dc * &cache.g * &cache.i.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![.., hidden..2 * hidden])
                .assign(&(&dc * &cache.c_prev * &cache.f.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![.., 2 * hidden..3 * hidden])
                .assign(&(&dc * &cache.i * &cache.g.mapv(|v| 1.0 - v * v)));
            dz.slice_mut(s![.., 3 * hidden..])
                .assign(&(d_o * &cache.o.mapv(|v| v * (1.0 - v))));

            dc_next = &dc * &cache.f;

            grads.w_x += &cache.x.t().dot(&dz);
            grads.w_h += &cache.h_prev.t().dot(&dz);
            grads.bias += &dz.sum_axis(Axis(0));

            d_inputs.push(dz.dot(&self.w_x.t()));
            dh_next = dz.dot(&self.w_h.t());
        }

        d_inputs.reverse();
        (grads, d_inputs)
    }
}

impl LayerGrads {
    fn zeros(layer: &LstmLayer) -> Self {
        Self {
            w_x: Array2::zeros(layer.w_x.raw_dim()),
            w_h: Array2::zeros(layer.w_h.raw_dim()),
            bias: Array1::zeros(layer.bias.raw_dim()),
        }
    }

    fn add(&mut self, other: &Self) {
        self.w_x += &other.w_x;
        self.w_h += &other.w_h;
        self.bias += &other.bias;
    }
}

/// LSTM over a window of feature rows followed by a linear head on the last
/// hidden state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockLstm {
    config: LstmConfig,
    layers: Vec<LstmLayer>,
    /// `[hidden, output]`
    w_out: Array2<f64>,
    b_out: Array1<f64>,
}

impl StockLstm {
    /// Randomly initialised model
    pub fn new(config: LstmConfig) -> Result<Self> {
        Self::build(config, &mut StdRng::from_entropy())
    }

    /// Deterministically initialised model
    pub fn with_seed(config: LstmConfig, seed: u64) -> Result<Self> {
        Self::build(config, &mut StdRng::seed_from_u64(seed))
    }

    fn build(config: LstmConfig, rng: &mut StdRng) -> Result<Self> {
        validate_config(&config)?;

        let layers = (0..config.num_layers)
            .map(|l| {
                let input = if l == 0 { config.input_size } else { config.hidden_size };
                LstmLayer::new(input, config.hidden_size, rng)
            })
            .collect();

        let bound = 1.0 / (config.hidden_size as f64).sqrt();
        let dist = Uniform::new_inclusive(-bound, bound);
        let w_out = Array2::from_shape_fn((config.hidden_size, config.output_size), |_| rng.sample(&dist));
        let b_out = Array1::from_shape_fn(config.output_size, |_| rng.sample(&dist));

        Ok(Self {
            config,
            layers,
            w_out,
            b_out,
        })
    }

    /// Total number of trainable weights
    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.w_x.len() + l.w_h.len() + l.bias.len())
            .sum::<usize>()
            + self.w_out.len()
            + self.b_out.len()
    }

    /// Fit on `x: [n, seq_len, input]` against `y: [n]` with full-batch Adam on
    /// MSE, one optimiser step per epoch. Returns the loss of every epoch.
    pub fn train(&mut self, x: &Array3<f64>, y: &Array1<f64>, options: &TrainOptions) -> Result<Vec<f64>> {
        self.check_input(x)?;
        if self.config.output_size != 1 {
            return Err(StockError::ModelError(format!(
                "Training expects a single output, model has {}",
                self.config.output_size
            )));
        }
        if x.len_of(Axis(0)) != y.len() {
            return Err(StockError::ModelError(format!(
                "Got {} windows but {} targets",
                x.len_of(Axis(0)),
                y.len()
            )));
        }
        if y.is_empty() {
            return Err(StockError::ModelError("No training samples".to_string()));
        }

        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut adam = Adam::new(options.learning_rate);
        let mut history = Vec::with_capacity(options.epochs);

        for _ in 0..options.epochs {
            let (grads, loss) = self.gradients(x, y, options.chunk_size, &mut rng);
            self.apply_gradients(&grads, &mut adam);
            tracing::debug!(epoch = adam.steps(), loss, "training epoch");
            history.push(loss);
        }

        Ok(history)
    }

    /// Predict the first output for every window, dropout disabled
    pub fn predict(&self, x: &Array3<f64>) -> Result<Array1<f64>> {
        self.check_input(x)?;
        let n = x.len_of(Axis(0));
        let mut out = Array1::zeros(n);

        for start in (0..n).step_by(PREDICT_CHUNK) {
            let end = (start + PREDICT_CHUNK).min(n);
            let (h_last, _) = self.forward(x.slice(s![start..end, .., ..]), false);
            let y = h_last.dot(&self.w_out) + &self.b_out;
            out.slice_mut(s![start..end]).assign(&y.column(0));
        }

        Ok(out)
    }

    /// Write the model as bincode, creating parent directories
    ///
    /// The file is written beside `path` and renamed over it, so readers never
    /// see a partial model.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let encoded = bincode::serialize(self)?;

        let file_name = path
            .file_name()
            .ok_or_else(|| StockError::ModelError(format!("Invalid model path {}", path.display())))?;
        let mut tmp_name = std::ffi::OsString::from(".");
        tmp_name.push(file_name);
        tmp_name.push(format!(".{}-{:08x}.tmp", std::process::id(), rand::random::<u32>()));
        let tmp = path.with_file_name(tmp_name);

        std::fs::write(&tmp, encoded)?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Read a model saved by [`save`](Self::save), rejecting one whose shape
    /// differs from `expected`
    pub fn load(path: impl AsRef<Path>, expected: &LstmConfig) -> Result<Self> {
        let data = std::fs::read(path)?;
        let model: Self = bincode::deserialize(&data)?;

        let shape = |c: &LstmConfig| (c.input_size, c.hidden_size, c.num_layers, c.output_size);
        if shape(&model.config) != shape(expected) {
            return Err(StockError::ModelError(format!(
                "Saved model has input {} / hidden {} / layers {}, expected {} / {} / {}",
                model.config.input_size,
                model.config.hidden_size,
                model.config.num_layers,
                expected.input_size,
                expected.hidden_size,
                expected.num_layers,
            )));
        }
        model.check_weights()?;

        Ok(model)
    }

    fn check_input(&self, x: &Array3<f64>) -> Result<()> {
        let features = x.len_of(Axis(2));
        if features != self.config.input_size {
            return Err(StockError::ModelError(format!(
                "Model expects {} features per step, got {features}",
                self.config.input_size
            )));
        }
        Ok(())
    }

    fn check_weights(&self) -> Result<()> {
        let hidden = self.config.hidden_size;
        let layers_ok = self.layers.len() == self.config.num_layers
            && self.layers.iter().enumerate().all(|(l, layer)| {
                let input = if l == 0 { self.config.input_size } else { hidden };
                layer.w_x.dim() == (input, 4 * hidden)
                    && layer.w_h.dim() == (hidden, 4 * hidden)
                    && layer.bias.len() == 4 * hidden
            });
        let head_ok = self.w_out.dim() == (hidden, self.config.output_size)
            && self.b_out.len() == self.config.output_size;

        if layers_ok && head_ok {
            Ok(())
        } else {
            Err(StockError::ModelError("Saved weights do not match their config".to_string()))
        }
    }

    /// Last hidden state of the top layer plus per-layer caches
    fn forward(&self, x: ArrayView3<'_, f64>, keep_cache: bool) -> (Array2<f64>, Vec<Vec<StepCache>>) {
        let (batch, steps, _) = x.dim();
        let mut inputs: Vec<Array2<f64>> = (0..steps).map(|t| x.slice(s![.., t, ..]).to_owned()).collect();
        let mut caches = Vec::with_capacity(self.layers.len());

        for layer in &self.layers {
            let (outputs, layer_caches) = layer.forward(&inputs, keep_cache);
            inputs = outputs;
            caches.push(layer_caches);
        }

        let last = inputs
            .pop()
            .unwrap_or_else(|| Array2::zeros((batch, self.config.hidden_size)));
        (last, caches)
    }

    fn dropout_mask(&self, rows: usize, rng: &mut StdRng) -> Array2<f64> {
        let hidden = self.config.hidden_size;
        let keep = 1.0 - self.config.dropout;
        if self.config.dropout <= 0.0 {
            return Array2::ones((rows, hidden));
        }
        let scale = 1.0 / keep;
        Array2::from_shape_fn((rows, hidden), |_| if rng.gen_bool(keep) { scale } else { 0.0 })
    }

    /// Full-batch MSE gradients, accumulated chunk by chunk
    fn gradients(&self, x: &Array3<f64>, y: &Array1<f64>, chunk_size: usize, rng: &mut StdRng) -> (Gradients, f64) {
        let n = y.len();
        let mut grads = Gradients {
            layers: self.layers.iter().map(LayerGrads::zeros).collect(),
            w_out: Array2::zeros(self.w_out.raw_dim()),
            b_out: Array1::zeros(self.b_out.raw_dim()),
        };
        let mut squared_error = 0.0;

        for start in (0..n).step_by(chunk_size.max(1)) {
            let end = (start + chunk_size.max(1)).min(n);
            let (h_last, caches) = self.forward(x.slice(s![start..end, .., ..]), true);

            let mask = self.dropout_mask(end - start, rng);
            let h_drop = &h_last * &mask;
            let pred = h_drop.dot(&self.w_out) + &self.b_out;

            let err = &pred.column(0) - &y.slice(s![start..end]);
            squared_error += err.mapv(|e| e * e).sum();

            let d_pred = (err * (2.0 / n as f64)).insert_axis(Axis(1));
            grads.w_out += &h_drop.t().dot(&d_pred);
            grads.b_out += &d_pred.sum_axis(Axis(0));

            let d_last = d_pred.dot(&self.w_out.t()) * &mask;
            let steps = caches.first().map_or(0, Vec::len);
            if steps == 0 {
                continue;
            }
            let mut d_outputs: Vec<Array2<f64>> = (0..steps).map(|_| Array2::zeros(d_last.raw_dim())).collect();
            d_outputs[steps - 1] = d_last;

            for (l, layer_caches) in caches.iter().enumerate().rev() {
                let (layer_grads, d_inputs) = self.layers[l].backward(layer_caches, &d_outputs);
                grads.layers[l].add(&layer_grads);
                d_outputs = d_inputs;
            }
        }

        (grads, squared_error / n as f64)
    }

    fn apply_gradients(&mut self, grads: &Gradients, adam: &mut Adam) {
        adam.begin_step();
        let mut slot = 0;
        for (layer, g) in self.layers.iter_mut().zip(&grads.layers) {
            adam.update(slot, &mut layer.w_x, &g.w_x);
            adam.update(slot + 1, &mut layer.w_h, &g.w_h);
            adam.update(slot + 2, &mut layer.bias, &g.bias);
            slot += 3;
        }
        adam.update(slot, &mut self.w_out, &grads.w_out);
        adam.update(slot + 1, &mut self.b_out, &grads.b_out);
    }
}

fn validate_config(config: &LstmConfig) -> Result<()> {
    if config.input_size == 0 || config.hidden_size == 0 || config.num_layers == 0 || config.output_size == 0 {
        return Err(StockError::ConfigError(format!("Invalid LSTM shape: {config:?}")));
    }
    if !(0.0..1.0).contains(&config.dropout) {
        return Err(StockError::ConfigError(format!(
            "Dropout must be in [0, 1), got {}",
            config.dropout
        )));
    }
    Ok(())
}
