/// A single simulation timestep of a dynophore trajectory.
///
/// Holds the timestep index and the interaction-pattern feature vector observed
/// at that timestep (one real-valued descriptor per superfeature).
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    index: usize,        // Timestep index within the parent trajectory
    features: Vec<f64>,  // Interaction descriptors, fixed dimensionality per run
}

impl Frame {
    pub fn new(index: usize, features: Vec<f64>) -> Self {
        Self { index, features }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn features(&self) -> &[f64] {
        &self.features
    }

    /// The feature dimensionality of this frame.
    pub fn dim(&self) -> usize {
        self.features.len()
    }
}
