use super::Nonlinearity;
use anyhow::Result;
use gradvar_core::error::GradVarError;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Multilayer perceptron whose parameters live in a flat vector.
///
/// The layout of the flat vector is, for each layer in order, the weight
/// matrix (`in x out`, row-major) followed by the bias (`out`).
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Mlp {
    /// Input dimension, hidden sizes and output dimension.
    sizes: Vec<usize>,

    hidden_nonlinearity: Option<Nonlinearity>,

    output_nonlinearity: Option<Nonlinearity>,
}

/// Inputs and pre-activations of each layer, kept for the backward pass.
pub(super) struct Cache {
    inputs: Vec<Array2<f64>>,
    pres: Vec<Array2<f64>>,
    posts: Vec<Array2<f64>>,
}

impl Mlp {
    /// Constructs an MLP.
    pub fn new(
        in_dim: usize,
        hidden_sizes: &[usize],
        out_dim: usize,
        hidden_nonlinearity: Option<Nonlinearity>,
        output_nonlinearity: Option<Nonlinearity>,
    ) -> Self {
        let mut sizes = vec![in_dim];
        sizes.extend(hidden_sizes.iter());
        sizes.push(out_dim);
        Self {
            sizes,
            hidden_nonlinearity,
            output_nonlinearity,
        }
    }

    /// Number of layers.
    pub fn n_layers(&self) -> usize {
        self.sizes.len() - 1
    }

    /// Input dimension.
    pub fn in_dim(&self) -> usize {
        self.sizes[0]
    }

    /// Output dimension.
    pub fn out_dim(&self) -> usize {
        self.sizes[self.sizes.len() - 1]
    }

    /// Number of scalar parameters.
    pub fn num_params(&self) -> usize {
        self.sizes.windows(2).map(|w| w[0] * w[1] + w[1]).sum()
    }

    /// Glorot-uniform weights and zero biases.
    pub fn init<R: Rng>(&self, rng: &mut R) -> Array1<f64> {
        let mut params = Vec::with_capacity(self.num_params());
        for w in self.sizes.windows(2) {
            let limit = (6.0 / (w[0] + w[1]) as f64).sqrt();
            params.extend((0..w[0] * w[1]).map(|_| rng.gen_range(-limit..limit)));
            params.extend(std::iter::repeat(0.0).take(w[1]));
        }
        Array1::from(params)
    }

    fn layer<'a>(
        &self,
        params: ArrayView1<'a, f64>,
        l: usize,
    ) -> Result<(ArrayView2<'a, f64>, ArrayView1<'a, f64>)> {
        let offset: usize = self.sizes[..l + 1]
            .windows(2)
            .map(|w| w[0] * w[1] + w[1])
            .sum();
        let (n_in, n_out) = (self.sizes[l], self.sizes[l + 1]);
        let w = params
            .slice_move(s![offset..offset + n_in * n_out])
            .into_shape((n_in, n_out))?;
        let b = params.slice_move(s![offset + n_in * n_out..offset + n_in * n_out + n_out]);
        Ok((w, b))
    }

    fn activation(&self, l: usize) -> Option<Nonlinearity> {
        if l + 1 == self.n_layers() {
            self.output_nonlinearity
        } else {
            self.hidden_nonlinearity
        }
    }

    fn check(&self, params: &ArrayView1<f64>, x: &Array2<f64>) -> Result<()> {
        if params.len() < self.num_params() {
            return Err(GradVarError::ShapeMismatch {
                context: "Mlp parameters".to_string(),
                expected: vec![self.num_params()],
                actual: vec![params.len()],
            }
            .into());
        }
        if x.ncols() != self.in_dim() {
            return Err(GradVarError::ShapeMismatch {
                context: "Mlp input".to_string(),
                expected: vec![x.nrows(), self.in_dim()],
                actual: x.shape().to_vec(),
            }
            .into());
        }
        Ok(())
    }

    /// Forward pass. Only the first [`Mlp::num_params`] entries of `params`
    /// are used.
    pub fn forward(&self, params: ArrayView1<f64>, x: &Array2<f64>) -> Result<Array2<f64>> {
        Ok(self.forward_cached(params, x)?.0)
    }

    pub(super) fn forward_cached(
        &self,
        params: ArrayView1<f64>,
        x: &Array2<f64>,
    ) -> Result<(Array2<f64>, Cache)> {
        self.check(&params, x)?;
        let mut cache = Cache {
            inputs: vec![],
            pres: vec![],
            posts: vec![],
        };
        let mut h = x.clone();
        for l in 0..self.n_layers() {
            let (w, b) = self.layer(params, l)?;
            let pre = h.dot(&w) + &b;
            let post = match self.activation(l) {
                Some(f) => pre.mapv(|v| f.apply(v)),
                None => pre.clone(),
            };
            cache.inputs.push(h);
            cache.pres.push(pre);
            cache.posts.push(post.clone());
            h = post;
        }
        Ok((h, cache))
    }

    /// Gradient of `Σ d_out ⊙ output` with respect to the flat parameters.
    pub(super) fn backward(
        &self,
        params: ArrayView1<f64>,
        cache: &Cache,
        d_out: Array2<f64>,
    ) -> Result<Array1<f64>> {
        let mut grads: Vec<Array1<f64>> = vec![Array1::zeros(0); self.n_layers()];
        let mut d_post = d_out;
        for l in (0..self.n_layers()).rev() {
            let d_pre = match self.activation(l) {
                Some(f) => {
                    let mut d = d_post.clone();
                    ndarray::Zip::from(&mut d)
                        .and(&cache.pres[l])
                        .and(&cache.posts[l])
                        .for_each(|d, &x, &y| *d *= f.derivative(x, y));
                    d
                }
                None => d_post.clone(),
            };
            let d_w = cache.inputs[l].t().dot(&d_pre);
            let d_b = d_pre.sum_axis(Axis(0));
            let (w, _) = self.layer(params, l)?;
            d_post = d_pre.dot(&w.t());

            let mut g = Vec::with_capacity(d_w.len() + d_b.len());
            g.extend(d_w.iter());
            g.extend(d_b.iter());
            grads[l] = Array1::from(g);
        }
        let views: Vec<ArrayView1<f64>> = grads.iter().map(|g| g.view()).collect();
        Ok(ndarray::concatenate(Axis(0), &views)?)
    }
}
