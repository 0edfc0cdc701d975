use crate::engine::error::EngineError;
use nalgebra::{DMatrix, DVector, SymmetricEigen};

/// A fitted principal-component projection of the feature space.
///
/// Frames are mean-centered and projected onto the leading eigenvectors of the
/// feature covariance matrix. This serves as the pipeline's self-contained
/// slow-coordinate projection ahead of clustering.
#[derive(Debug, Clone)]
pub struct Projection {
    mean: DVector<f64>,
    /// Column j is the j-th principal axis (dim x output_dims).
    components: DMatrix<f64>,
    /// Eigenvalue (variance) captured by each retained component, descending.
    explained_variance: Vec<f64>,
}

impl Projection {
    /// Fits a projection onto the top `dims` principal components of `data`
    /// (rows are frames, columns are features). `dims` is clamped to the
    /// feature dimensionality.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTrajectory`] if `data` has no rows or no
    /// columns.
    pub fn fit(data: &DMatrix<f64>, dims: usize) -> Result<Self, EngineError> {
        let (n_frames, n_features) = data.shape();
        if n_frames == 0 || n_features == 0 {
            return Err(EngineError::invalid_trajectory(
                "cannot fit a projection on an empty trajectory",
            ));
        }
        let dims = dims.min(n_features);

        let mean = column_means(data);
        let centered = center(data, &mean);
        let normalizer = if n_frames > 1 { n_frames - 1 } else { 1 } as f64;
        let covariance = centered.transpose() * &centered / normalizer;

        let eigen = SymmetricEigen::new(covariance);
        let mut order: Vec<usize> = (0..n_features).collect();
        order.sort_by(|&a, &b| {
            eigen.eigenvalues[b]
                .partial_cmp(&eigen.eigenvalues[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut components = DMatrix::zeros(n_features, dims);
        let mut explained_variance = Vec::with_capacity(dims);
        for (target, &source) in order.iter().take(dims).enumerate() {
            components.set_column(target, &eigen.eigenvectors.column(source));
            explained_variance.push(eigen.eigenvalues[source].max(0.0));
        }

        Ok(Self {
            mean,
            components,
            explained_variance,
        })
    }

    /// Projects `data` (rows are frames) into the retained component space.
    pub fn transform(&self, data: &DMatrix<f64>) -> DMatrix<f64> {
        let centered = center(data, &self.mean);
        centered * &self.components
    }

    pub fn output_dims(&self) -> usize {
        self.components.ncols()
    }

    pub fn explained_variance(&self) -> &[f64] {
        &self.explained_variance
    }
}

fn column_means(data: &DMatrix<f64>) -> DVector<f64> {
    let n = data.nrows().max(1) as f64;
    DVector::from_iterator(data.ncols(), data.column_iter().map(|col| col.sum() / n))
}

fn center(data: &DMatrix<f64>, mean: &DVector<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(data.nrows(), data.ncols(), |row, col| {
        data[(row, col)] - mean[col]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_rejects_empty_data() {
        let data = DMatrix::<f64>::zeros(0, 0);
        assert!(matches!(
            Projection::fit(&data, 1),
            Err(EngineError::InvalidTrajectory { .. })
        ));
    }

    #[test]
    fn transform_produces_requested_dimensionality() {
        let data = DMatrix::from_row_slice(4, 3, &[
            0.0, 0.1, 1.0, //
            1.0, 0.0, 0.9, //
            2.0, 0.1, 1.1, //
            3.0, 0.0, 1.0,
        ]);
        let projection = Projection::fit(&data, 2).unwrap();
        let projected = projection.transform(&data);
        assert_eq!(projected.nrows(), 4);
        assert_eq!(projected.ncols(), 2);
    }

    #[test]
    fn dims_are_clamped_to_feature_count() {
        let data = DMatrix::from_row_slice(3, 2, &[0.0, 1.0, 1.0, 0.0, 0.5, 0.5]);
        let projection = Projection::fit(&data, 10).unwrap();
        assert_eq!(projection.output_dims(), 2);
    }

    #[test]
    fn first_component_captures_the_dominant_axis() {
        // Variance is overwhelmingly along the first feature.
        let data = DMatrix::from_row_slice(4, 2, &[
            -3.0, 0.01, //
            -1.0, -0.01, //
            1.0, 0.01, //
            3.0, -0.01,
        ]);
        let projection = Projection::fit(&data, 2).unwrap();
        let explained = projection.explained_variance();
        assert!(explained[0] > explained[1]);

        let projected = projection.transform(&data);
        // Projection is centered, so the first component preserves the spread.
        let spread: f64 = projected.column(0).iter().map(|v| v * v).sum();
        assert!(spread > 10.0);
    }
}
