//! Adam optimizer over arbitrary ndarray parameters

use ndarray::{Array, Dimension};

/// Adam with bias correction
///
/// Moment buffers are keyed by a slot index; callers must use the same slot
/// for the same parameter on every step.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    step: i32,
    first_moments: Vec<Vec<f64>>,
    second_moments: Vec<Vec<f64>>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            step: 0,
            first_moments: Vec::new(),
            second_moments: Vec::new(),
        }
    }

    /// Start a new optimisation step; call once before updating the parameters
    pub fn begin_step(&mut self) {
        self.step += 1;
    }

    /// Steps started so far
    pub fn steps(&self) -> i32 {
        self.step
    }

    /// Update one parameter tensor in place
    pub fn update<D: Dimension>(&mut self, slot: usize, param: &mut Array<f64, D>, grad: &Array<f64, D>) {
        while self.first_moments.len() <= slot {
            self.first_moments.push(Vec::new());
            self.second_moments.push(Vec::new());
        }
        let m = &mut self.first_moments[slot];
        let v = &mut self.second_moments[slot];
        if m.len() != param.len() {
            *m = vec![0.0; param.len()];
            *v = vec![0.0; param.len()];
        }

        let step = self.step.max(1);
        let bias1 = 1.0 - self.beta1.powi(step);
        let bias2 = 1.0 - self.beta2.powi(step);

        for (((p, g), m), v) in param.iter_mut().zip(grad.iter()).zip(m.iter_mut()).zip(v.iter_mut()) {
            *m = self.beta1 * *m + (1.0 - self.beta1) * g;
            *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
            let m_hat = *m / bias1;
            let v_hat = *v / bias2;
            *p -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }
}
