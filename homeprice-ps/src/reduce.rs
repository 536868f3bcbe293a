//! Dimensionality reduction and feature scaling
//!
//! The PCA here is a seeded power-iteration implementation. It is
//! deterministic for a given input, which is what the fit/replay
//! contract needs; component signs may differ from other PCA
//! implementations, which is harmless to a downstream model fit on the
//! same projection.

use homeprice_common::{Error, Result};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const POWER_ITERATIONS: usize = 300;
const CONVERGENCE_EPS: f64 = 1e-10;
const RNG_SEED: u64 = 42;

/// Fraction of the city-description block kept after projection
pub const PCA_SHRINK_RATE_1: f64 = 0.75;
/// Fraction of the population block kept after projection
pub const PCA_SHRINK_RATE_2: f64 = 0.90;

/// Fitted principal-component projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pca {
    means: Vec<f64>,
    components: Vec<Vec<f64>>,
}

impl Pca {
    /// Fit `n_components` principal directions of `rows` by power
    /// iteration with deflation, seeded for reproducibility.
    pub fn fit(rows: &[Vec<f64>], n_components: usize) -> Result<Self> {
        let n_rows = rows.len();
        let n_dims = rows.first().map_or(0, Vec::len);
        if n_rows == 0 || n_dims == 0 {
            return Err(Error::InvalidInput(
                "cannot fit projection on an empty matrix".into(),
            ));
        }
        if n_components == 0 || n_components > n_dims {
            return Err(Error::Internal(format!(
                "projection wants {} components from {} dimensions",
                n_components, n_dims
            )));
        }

        let mut means = vec![0.0; n_dims];
        for row in rows {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut means {
            *m /= n_rows as f64;
        }

        let mut centered: Vec<Vec<f64>> = rows
            .iter()
            .map(|row| row.iter().zip(&means).map(|(v, m)| v - m).collect())
            .collect();

        let mut rng = SmallRng::seed_from_u64(RNG_SEED);
        let mut components = Vec::with_capacity(n_components);

        for _ in 0..n_components {
            let component = dominant_direction(&centered, &mut rng);

            // Deflate: remove the found direction from every row
            for row in &mut centered {
                let projection: f64 = row.iter().zip(&component).map(|(r, c)| r * c).sum();
                for (r, c) in row.iter_mut().zip(&component) {
                    *r -= projection * c;
                }
            }

            components.push(component);
        }

        Ok(Self { means, components })
    }

    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    pub fn n_dims(&self) -> usize {
        self.means.len()
    }

    /// Project one row onto the fitted components
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.means.len() {
            return Err(Error::Internal(format!(
                "projection expects {} values, got {}",
                self.means.len(),
                row.len()
            )));
        }
        let centered: Vec<f64> = row.iter().zip(&self.means).map(|(v, m)| v - m).collect();
        Ok(self
            .components
            .iter()
            .map(|c| c.iter().zip(&centered).map(|(ci, vi)| ci * vi).sum())
            .collect())
    }
}

/// Leading eigenvector of the (implicit) covariance of `rows`
fn dominant_direction(rows: &[Vec<f64>], rng: &mut SmallRng) -> Vec<f64> {
    let n_dims = rows.first().map_or(0, Vec::len);
    let mut v: Vec<f64> = (0..n_dims).map(|_| rng.gen_range(-1.0..1.0)).collect();
    normalize(&mut v);

    for _ in 0..POWER_ITERATIONS {
        // w = Xt * (X * v), avoiding the explicit covariance matrix
        let mut w = vec![0.0; n_dims];
        for row in rows {
            let dot: f64 = row.iter().zip(&v).map(|(r, vi)| r * vi).sum();
            for (wi, r) in w.iter_mut().zip(row) {
                *wi += dot * r;
            }
        }
        normalize(&mut w);

        let delta: f64 = w.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
        v = w;
        if delta < CONVERGENCE_EPS {
            break;
        }
    }

    v
}

fn normalize(v: &mut [f64]) {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Rounded component count for a block of `n_features` columns
pub fn shrunk_components(n_features: usize, rate: f64) -> usize {
    (n_features as f64 * rate).round() as usize
}

/// Fitted per-column standardization (zero mean, unit variance)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit column means and population standard deviations. Constant
    /// columns keep a divisor of 1 so they scale to zero instead of
    /// infinity.
    pub fn fit(columns: &[Vec<f64>]) -> Result<Self> {
        let mut means = Vec::with_capacity(columns.len());
        let mut stds = Vec::with_capacity(columns.len());

        for column in columns {
            if column.is_empty() {
                return Err(Error::InvalidInput(
                    "cannot fit scaler on an empty column".into(),
                ));
            }
            let n = column.len() as f64;
            let mean = column.iter().sum::<f64>() / n;
            let var = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            means.push(mean);
            stds.push(if std == 0.0 { 1.0 } else { std });
        }

        Ok(Self { means, stds })
    }

    pub fn n_columns(&self) -> usize {
        self.means.len()
    }

    /// Scale one column's values in place
    pub fn transform_column(&self, index: usize, values: &mut [f64]) -> Result<()> {
        let (mean, std) = self
            .means
            .get(index)
            .zip(self.stds.get(index))
            .ok_or_else(|| Error::Internal(format!("scaler has no column {}", index)))?;
        for v in values.iter_mut() {
            *v = (*v - mean) / std;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pca_is_deterministic() {
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| {
                let x = i as f64;
                vec![x, 2.0 * x + 1.0, 0.5 * x - 3.0, (i % 7) as f64]
            })
            .collect();

        let a = Pca::fit(&rows, 3).unwrap();
        let b = Pca::fit(&rows, 3).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.transform_row(&rows[5]).unwrap(), b.transform_row(&rows[5]).unwrap());
    }

    #[test]
    fn pca_first_component_captures_dominant_axis() {
        // Variance lives almost entirely on the first coordinate
        let rows: Vec<Vec<f64>> = (0..50)
            .map(|i| vec![i as f64 * 10.0, (i % 2) as f64 * 0.01])
            .collect();
        let pca = Pca::fit(&rows, 1).unwrap();

        let lo = pca.transform_row(&[0.0, 0.0]).unwrap()[0];
        let hi = pca.transform_row(&[490.0, 0.0]).unwrap()[0];
        assert!((hi - lo).abs() > 400.0);
    }

    #[test]
    fn pca_rejects_bad_shapes() {
        assert!(Pca::fit(&[], 2).is_err());
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert!(Pca::fit(&rows, 3).is_err());
        let pca = Pca::fit(&rows, 1).unwrap();
        assert!(pca.transform_row(&[1.0]).is_err());
    }

    #[test]
    fn shrunk_component_counts() {
        assert_eq!(shrunk_components(28, PCA_SHRINK_RATE_1), 21);
        assert_eq!(shrunk_components(8, PCA_SHRINK_RATE_2), 7);
    }

    #[test]
    fn scaler_standardizes_population() {
        let cols = vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 5.0, 5.0, 5.0]];
        let scaler = StandardScaler::fit(&cols).unwrap();

        let mut values = cols[0].clone();
        scaler.transform_column(0, &mut values).unwrap();
        let mean: f64 = values.iter().sum::<f64>() / values.len() as f64;
        assert!(mean.abs() < 1e-12);
        let var: f64 = values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64;
        assert!((var - 1.0).abs() < 1e-12);

        // Constant column scales to zero, not infinity
        let mut constant = cols[1].clone();
        scaler.transform_column(1, &mut constant).unwrap();
        assert!(constant.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn scaler_survives_json_round_trip() {
        let scaler = StandardScaler::fit(&[vec![1.0, 3.0]]).unwrap();
        let json = serde_json::to_string(&scaler).unwrap();
        let back: StandardScaler = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scaler);
    }
}
