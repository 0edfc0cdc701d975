use crate::engine::error::EngineError;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Outcome of a converged k-means run.
#[derive(Debug, Clone)]
pub struct KMeansResult {
    /// Cluster label for each input frame, in `0..k`.
    pub labels: Vec<usize>,
    /// Final centroids, one row per cluster (k x dim).
    pub centroids: DMatrix<f64>,
    /// Sum of squared distances of frames to their assigned centroid.
    pub inertia: f64,
    /// Lloyd iterations performed before convergence.
    pub iterations: usize,
}

/// K-means clustering with k-means++ seeding and a seedable RNG.
///
/// Convergence is declared when the largest squared centroid drift in one
/// Lloyd iteration drops below the tolerance; exhausting the iteration budget
/// first is an estimation failure.
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    max_iterations: usize,
    tolerance: f64,
    seed: u64,
}

impl KMeans {
    pub fn new(k: usize, max_iterations: usize, tolerance: f64, seed: u64) -> Self {
        Self {
            k,
            max_iterations,
            tolerance,
            seed,
        }
    }

    /// Clusters `data` (rows are frames) into `k` states.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidTrajectory`] if `data` is empty or holds fewer
    ///   frames than clusters.
    /// - [`EngineError::FitConvergence`] if the centroid drift never drops
    ///   below the tolerance within the iteration budget.
    pub fn fit(&self, data: &DMatrix<f64>) -> Result<KMeansResult, EngineError> {
        let n_frames = data.nrows();
        if n_frames == 0 {
            return Err(EngineError::invalid_trajectory(
                "cannot cluster an empty trajectory",
            ));
        }
        if n_frames < self.k {
            return Err(EngineError::invalid_trajectory(format!(
                "trajectory has {} frames but {} clusters were requested",
                n_frames, self.k
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = seed_plus_plus(data, self.k, &mut rng);

        for iteration in 0..self.max_iterations {
            let (labels, _inertia) = assign(data, &centroids);
            let updated = update_centroids(data, &labels, &centroids);

            let drift = (0..self.k)
                .map(|c| (updated.row(c) - centroids.row(c)).norm_squared())
                .fold(0.0_f64, f64::max);
            centroids = updated;

            if drift <= self.tolerance {
                let (labels, inertia) = assign(data, &centroids);
                debug!(
                    iterations = iteration + 1,
                    inertia, "k-means converged"
                );
                return Ok(KMeansResult {
                    labels,
                    centroids,
                    inertia,
                    iterations: iteration + 1,
                });
            }
        }

        Err(EngineError::FitConvergence {
            iterations: self.max_iterations,
        })
    }
}

/// Inertia of a k-means fit for each candidate cluster count in
/// `1..=max_clusters`, for elbow-style selection of the state count.
pub fn elbow_scan(
    data: &DMatrix<f64>,
    max_clusters: usize,
    max_iterations: usize,
    tolerance: f64,
    seed: u64,
) -> Result<Vec<f64>, EngineError> {
    if data.nrows() == 0 {
        return Err(EngineError::invalid_trajectory(
            "cannot scan cluster counts on an empty trajectory",
        ));
    }
    let limit = max_clusters.min(data.nrows());
    let mut inertias = Vec::with_capacity(limit);
    for k in 1..=limit {
        let result = KMeans::new(k, max_iterations, tolerance, seed).fit(data)?;
        inertias.push(result.inertia);
    }
    Ok(inertias)
}

/// K-means++ seeding: the first centroid is uniform, each subsequent one is
/// drawn with probability proportional to its squared distance from the
/// nearest already-chosen centroid.
fn seed_plus_plus(data: &DMatrix<f64>, k: usize, rng: &mut StdRng) -> DMatrix<f64> {
    let n_frames = data.nrows();
    let mut centroids = DMatrix::zeros(k, data.ncols());

    let first = rng.random_range(0..n_frames);
    centroids.row_mut(0).copy_from(&data.row(first));

    let mut nearest_sq = vec![f64::INFINITY; n_frames];
    for chosen in 1..k {
        for frame in 0..n_frames {
            let d = (data.row(frame) - centroids.row(chosen - 1)).norm_squared();
            if d < nearest_sq[frame] {
                nearest_sq[frame] = d;
            }
        }

        let total: f64 = nearest_sq.iter().sum();
        let pick = if total > 0.0 {
            let mut threshold = rng.random::<f64>() * total;
            let mut pick = n_frames - 1;
            for (frame, &d) in nearest_sq.iter().enumerate() {
                threshold -= d;
                if threshold <= 0.0 {
                    pick = frame;
                    break;
                }
            }
            pick
        } else {
            // All remaining frames coincide with a centroid.
            rng.random_range(0..n_frames)
        };
        centroids.row_mut(chosen).copy_from(&data.row(pick));
    }
    centroids
}

fn assign(data: &DMatrix<f64>, centroids: &DMatrix<f64>) -> (Vec<usize>, f64) {
    let mut labels = Vec::with_capacity(data.nrows());
    let mut inertia = 0.0;
    for frame in 0..data.nrows() {
        let mut best = 0;
        let mut best_sq = f64::INFINITY;
        for cluster in 0..centroids.nrows() {
            let d = (data.row(frame) - centroids.row(cluster)).norm_squared();
            if d < best_sq {
                best_sq = d;
                best = cluster;
            }
        }
        labels.push(best);
        inertia += best_sq;
    }
    (labels, inertia)
}

fn update_centroids(
    data: &DMatrix<f64>,
    labels: &[usize],
    previous: &DMatrix<f64>,
) -> DMatrix<f64> {
    let k = previous.nrows();
    let dim = data.ncols();
    let mut sums = DMatrix::<f64>::zeros(k, dim);
    let mut counts = vec![0usize; k];

    for (frame, &label) in labels.iter().enumerate() {
        counts[label] += 1;
        for col in 0..dim {
            sums[(label, col)] += data[(frame, col)];
        }
    }

    let mut updated = DMatrix::zeros(k, dim);
    let mut reseed_pool: Vec<usize> = Vec::new();
    for cluster in 0..k {
        if counts[cluster] == 0 {
            reseed_pool.push(cluster);
            continue;
        }
        for col in 0..dim {
            updated[(cluster, col)] = sums[(cluster, col)] / counts[cluster] as f64;
        }
    }

    // Re-seed each empty cluster from the frame farthest from its centroid.
    let mut taken = vec![false; data.nrows()];
    for cluster in reseed_pool {
        let mut farthest = 0;
        let mut farthest_sq = -1.0;
        for (frame, &label) in labels.iter().enumerate() {
            if taken[frame] {
                continue;
            }
            let d = (data.row(frame) - previous.row(label)).norm_squared();
            if d > farthest_sq {
                farthest_sq = d;
                farthest = frame;
            }
        }
        taken[farthest] = true;
        updated.row_mut(cluster).copy_from(&data.row(farthest));
    }
    updated
}
