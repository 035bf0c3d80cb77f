//! LMS and NLMS adaptive filters for noise cancellation, echo cancellation,
//! and system identification.
//!
//! Adaptive filters adjust their coefficients over time to minimize an error signal,
//! making them suitable for applications where the target filter is unknown or
//! time-varying.
//!
//! # Algorithm
//!
//! ## LMS (Least Mean Squares)
//!
//! The LMS algorithm updates filter weights using a stochastic gradient descent step:
//!
//! ```text
//! y[n]   = w^T x[n]          (filter output)
//! e[n]   = d[n] - y[n]       (error: desired minus output)
//! w[k]  += μ * e[n] * x[n-k]  (weight update for tap k)
//! ```
//!
//! Stability requires: `0 < μ < 2 / (order * P_x)` where `P_x` is the input power.
//! A safe range in practice is `0.001 ≤ μ ≤ 0.1`.
//!
//! ## NLMS (Normalized LMS)
//!
//! NLMS normalizes the step size by the instantaneous input power, giving faster
//! convergence and better numerical stability across varying signal levels:
//!
//! ```text
//! μ_eff  = μ / (x^T x + δ)
//! w[k]  += μ_eff * e[n] * x[n-k]
//! ```
//!
//! The regularization term `δ` prevents division by zero when the input is silent.
//! Stability is guaranteed for `0 < μ < 2` (independent of signal power).
//!
//! # References
//!
//! - Haykin, "Adaptive Filter Theory" (5th ed.), chapters 5 (LMS) and 6 (NLMS).
//! - Widrow & Stearns, "Adaptive Signal Processing" (1985), chapter 6.

use std::f32;

/// Least Mean Squares adaptive filter.
///
/// Minimizes the mean square error between the filter output and a desired signal
/// by performing a stochastic gradient descent step on each input sample.
///
/// ## Parameters
/// - `order`: filter length (number of taps)
/// - `step_size`: μ (learning rate), typically 0.001 to 0.1
///
/// ## Algorithm
///
/// ```text
/// y[n]   = Σ w[k] * x[n-k]    (output)
/// e[n]   = d[n] - y[n]         (error)
/// w[k]  += μ * e[n] * x[n-k]  (weight update)
/// ```
///
/// Reference: Haykin, "Adaptive Filter Theory" (5th ed.), chapter 5.
pub struct LmsFilter {
    weights: Vec<f32>,
    buffer: Vec<f32>,
    pos: usize,
    step_size: f32,
    order: usize,
}

impl LmsFilter {
    /// Create a new LMS filter.
    ///
    /// Weights and buffer are initialized to zero.
    ///
    /// # Arguments
    ///
    /// * `order` — number of filter taps. Larger orders model more complex filters
    ///   but converge more slowly.
    /// * `step_size` — μ learning rate. Typical range: 0.001 to 0.1. Higher values
    ///   converge faster but may become unstable.
    pub fn new(order: usize, step_size: f32) -> Self {
        Self {
            weights: vec![0.0; order],
            buffer: vec![0.0; order],
            pos: 0,
            step_size,
            order,
        }
    }

    /// Process a single sample.
    ///
    /// Computes the filter output, calculates the error, then updates weights.
    ///
    /// # Arguments
    ///
    /// * `input` — current input sample x\[n\]
    /// * `desired` — desired output d\[n\] (the target signal)
    ///
    /// # Returns
    ///
    /// `(output, error)` — the filter output y\[n\] and the error e\[n\] = d\[n\] - y\[n\].
    pub fn process_sample(&mut self, input: f32, desired: f32) -> (f32, f32) {
        // Write new sample into the circular buffer
        self.buffer[self.pos] = input;

        // Compute filter output: y[n] = w^T x[n]
        let mut output = 0.0f32;
        for k in 0..self.order {
            let buf_idx = (self.pos + self.order - k) % self.order;
            output += self.weights[k] * self.buffer[buf_idx];
        }

        // Error signal
        let error = desired - output;

        // LMS weight update: w[k] += μ * e[n] * x[n-k]
        let mu_e = self.step_size * error;
        for k in 0..self.order {
            let buf_idx = (self.pos + self.order - k) % self.order;
            self.weights[k] += mu_e * self.buffer[buf_idx];
        }

        // Advance circular buffer position
        self.pos = (self.pos + 1) % self.order;

        (output, error)
    }

    /// Process a block of samples.
    ///
    /// Equivalent to calling `process_sample` for each sample in order.
    /// All slices must have the same length.
    ///
    /// # Arguments
    ///
    /// * `input` — input samples x\[n\]
    /// * `desired` — desired output samples d\[n\]
    /// * `output` — filter output samples y\[n\] (written in-place)
    /// * `error` — error samples e\[n\] = d\[n\] - y\[n\] (written in-place)
    pub fn process_block(
        &mut self,
        input: &[f32],
        desired: &[f32],
        output: &mut [f32],
        error: &mut [f32],
    ) {
        for i in 0..input.len() {
            let (y, e) = self.process_sample(input[i], desired[i]);
            output[i] = y;
            error[i] = e;
        }
    }

    /// Return a reference to the current filter weight vector.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Reset the filter to its initial state.
    ///
    /// Zeroes all weights and the input buffer. The step size is preserved.
    pub fn reset(&mut self) {
        self.weights.fill(0.0);
        self.buffer.fill(0.0);
        self.pos = 0;
    }

    /// Set the learning rate μ.
    ///
    /// Range: typically 0.001 to 0.1. Values outside 0 < μ < 2/(order * P_x) are unstable.
    pub fn set_step_size(&mut self, step_size: f32) {
        self.step_size = step_size;
    }
}

/// Normalized Least Mean Squares adaptive filter.
///
/// Extends LMS by normalizing the effective step size by the instantaneous input power.
/// This gives faster convergence and better robustness across varying signal levels.
///
/// ## Parameters
/// - `order`: filter length (number of taps)
/// - `step_size`: μ_normalized (0.0 to 2.0 for guaranteed stability)
/// - `regularization`: δ — prevents division by zero when input is silent (default: 1e-6)
///
/// ## Algorithm
///
/// ```text
/// μ_eff  = μ / (x^T x + δ)
/// y[n]   = Σ w[k] * x[n-k]
/// e[n]   = d[n] - y[n]
/// w[k]  += μ_eff * e[n] * x[n-k]
/// ```
///
/// Reference: Haykin, "Adaptive Filter Theory" (5th ed.), chapter 6.
pub struct NlmsFilter {
    weights: Vec<f32>,
    buffer: Vec<f32>,
    pos: usize,
    step_size: f32,
    order: usize,
    regularization: f32,
}

impl NlmsFilter {
    /// Create a new NLMS filter with default regularization (δ = 1e-6).
    ///
    /// # Arguments
    ///
    /// * `order` — number of filter taps
    /// * `step_size` — μ in range (0.0, 2.0); 0.5 is a good default
    pub fn new(order: usize, step_size: f32) -> Self {
        Self::with_regularization(order, step_size, 1e-6)
    }

    /// Create a new NLMS filter with explicit regularization.
    ///
    /// # Arguments
    ///
    /// * `order` — number of filter taps
    /// * `step_size` — μ in range (0.0, 2.0)
    /// * `regularization` — δ added to denominator to prevent divide-by-zero.
    ///   Typical: 1e-8 (tight) to 1e-4 (more stable with low-power input).
    pub fn with_regularization(order: usize, step_size: f32, regularization: f32) -> Self {
        Self {
            weights: vec![0.0; order],
            buffer: vec![0.0; order],
            pos: 0,
            step_size,
            order,
            regularization,
        }
    }

    /// Process a single sample.
    ///
    /// # Arguments
    ///
    /// * `input` — current input sample x\[n\]
    /// * `desired` — desired output d\[n\]
    ///
    /// # Returns
    ///
    /// `(output, error)` — filter output y\[n\] and error e\[n\] = d\[n\] - y\[n\].
    pub fn process_sample(&mut self, input: f32, desired: f32) -> (f32, f32) {
        // Write new sample into the circular buffer
        self.buffer[self.pos] = input;

        // Compute input power: x^T x = Σ x[n-k]^2
        let power: f32 = self.buffer.iter().map(|&x| x * x).sum();

        // Effective step size normalized by input power
        let mu_eff = self.step_size / (power + self.regularization);

        // Filter output: y[n] = w^T x[n]
        let mut output = 0.0f32;
        for k in 0..self.order {
            let buf_idx = (self.pos + self.order - k) % self.order;
            output += self.weights[k] * self.buffer[buf_idx];
        }

        // Error signal
        let error = desired - output;

        // NLMS weight update: w[k] += μ_eff * e[n] * x[n-k]
        let mu_e = mu_eff * error;
        for k in 0..self.order {
            let buf_idx = (self.pos + self.order - k) % self.order;
            self.weights[k] += mu_e * self.buffer[buf_idx];
        }

        self.pos = (self.pos + 1) % self.order;

        (output, error)
    }

    /// Process a block of samples.
    ///
    /// Equivalent to calling `process_sample` for each sample in order.
    /// All slices must have the same length.
    ///
    /// # Arguments
    ///
    /// * `input` — input samples x\[n\]
    /// * `desired` — desired output samples d\[n\]
    /// * `output` — filter output samples (written in-place)
    /// * `error` — error samples (written in-place)
    pub fn process_block(
        &mut self,
        input: &[f32],
        desired: &[f32],
        output: &mut [f32],
        error: &mut [f32],
    ) {
        for i in 0..input.len() {
            let (y, e) = self.process_sample(input[i], desired[i]);
            output[i] = y;
            error[i] = e;
        }
    }

    /// Return a reference to the current filter weight vector.
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Reset the filter to its initial state.
    ///
    /// Zeroes all weights and the input buffer. Step size and regularization are preserved.
    pub fn reset(&mut self) {
        self.weights.fill(0.0);
        self.buffer.fill(0.0);
        self.pos = 0;
    }

    /// Set the normalized learning rate μ.
    ///
    /// Range: (0.0, 2.0) for stability. Typical: 0.5 for fast convergence.
    pub fn set_step_size(&mut self, step_size: f32) {
        self.step_size = step_size;
    }
}
