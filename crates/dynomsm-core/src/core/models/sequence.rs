/// The discrete state labels produced by discretizing a [`super::Trajectory`].
///
/// Holds one label per frame, in frame order, together with the total number of
/// states the labels were drawn from. The sequence length always equals the
/// length of the trajectory it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSequence {
    labels: Vec<usize>,
    n_states: usize,
}

impl StateSequence {
    /// Wraps labels drawn from a known state space of size `n_states`.
    ///
    /// `n_states` may exceed the largest observed label (a fitted model can own
    /// states the decoded sequence never visits), but never undercuts it.
    pub fn new(labels: Vec<usize>, n_states: usize) -> Self {
        let observed = labels.iter().max().map_or(0, |&max| max + 1);
        Self {
            labels,
            n_states: n_states.max(observed),
        }
    }

    /// Wraps labels, inferring the state count from the largest label.
    pub fn from_labels(labels: Vec<usize>) -> Self {
        Self::new(labels, 0)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// Number of frames assigned to each state.
    pub fn state_populations(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_states];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n_states_never_undercuts_observed_labels() {
        let seq = StateSequence::new(vec![0, 2, 1], 2);
        assert_eq!(seq.n_states(), 3);
    }

    #[test]
    fn from_labels_infers_state_count() {
        let seq = StateSequence::from_labels(vec![0, 1, 1, 3]);
        assert_eq!(seq.n_states(), 4);
        assert_eq!(seq.len(), 4);
    }

    #[test]
    fn state_populations_counts_every_frame() {
        let seq = StateSequence::new(vec![0, 1, 1, 2, 1], 4);
        assert_eq!(seq.state_populations(), vec![1, 3, 1, 0]);
    }
}
