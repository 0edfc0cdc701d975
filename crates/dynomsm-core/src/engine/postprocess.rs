//! Postprocessing of fitted Markov models.
//!
//! The main operation is the metastability sort: states are relabeled by
//! descending self-transition probability so that state 0 is always the most
//! metastable one, which makes models from different runs comparable.

use super::markov::MarkovModel;
use crate::core::models::StateSequence;
use nalgebra::{DMatrix, DVector};

/// Returns the state order by descending self-transition probability.
///
/// `order[new_label] = old_label`. Ties keep the original relative order.
pub fn metastability_order(transition: &DMatrix<f64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..transition.nrows()).collect();
    order.sort_by(|&a, &b| {
        transition[(b, b)]
            .partial_cmp(&transition[(a, a)])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    order
}

/// Permutes the rows and columns of a square matrix by `order`.
pub fn permute_matrix(matrix: &DMatrix<f64>, order: &[usize]) -> DMatrix<f64> {
    let n = matrix.nrows();
    DMatrix::from_fn(n, n, |row, col| matrix[(order[row], order[col])])
}

/// Rewrites a state sequence under the same permutation.
pub fn relabel_sequence(sequence: &StateSequence, order: &[usize]) -> StateSequence {
    let mut new_label_of = vec![0usize; order.len()];
    for (new_label, &old_label) in order.iter().enumerate() {
        new_label_of[old_label] = new_label;
    }
    let labels = sequence
        .labels()
        .iter()
        .map(|&label| new_label_of[label])
        .collect();
    StateSequence::new(labels, sequence.n_states())
}

/// Applies the metastability sort to a fitted model and its state sequence,
/// permuting every per-state artifact consistently.
pub fn sort_by_metastability(
    model: &MarkovModel,
    sequence: &StateSequence,
) -> (MarkovModel, StateSequence) {
    let order = metastability_order(&model.transition);
    let n = model.transition.nrows();

    let sorted = MarkovModel {
        transition: permute_matrix(&model.transition, &order),
        stationary: DVector::from_iterator(n, order.iter().map(|&old| model.stationary[old])),
        counts: permute_matrix(&model.counts, &order),
        lag: model.lag,
        reversible: model.reversible,
        observations: model
            .observations
            .as_ref()
            .map(|states| order.iter().map(|&old| states[old].clone()).collect()),
    };
    (sorted, relabel_sequence(sequence, &order))
}

/// Checks that every row of a transition matrix sums to 1.0 within `tolerance`.
pub fn is_row_stochastic(matrix: &DMatrix<f64>, tolerance: f64) -> bool {
    matrix
        .row_iter()
        .all(|row| (row.sum() - 1.0).abs() <= tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_rows_and_columns_by_descending_diagonal() {
        let matrix = DMatrix::from_row_slice(4, 4, &[
            0.8, 0.1, 0.05, 0.05, //
            0.005, 0.9, 0.03, 0.015, //
            0.1, 0.2, 0.4, 0.3, //
            0.01, 0.02, 0.03, 0.94,
        ]);
        let order = metastability_order(&matrix);
        let sorted = permute_matrix(&matrix, &order);

        assert_eq!(sorted.row(0).iter().copied().collect::<Vec<_>>(), vec![
            0.94, 0.02, 0.01, 0.03
        ]);
        assert_eq!(sorted.row(1).iter().copied().collect::<Vec<_>>(), vec![
            0.015, 0.9, 0.005, 0.03
        ]);
        assert_eq!(sorted.row(2).iter().copied().collect::<Vec<_>>(), vec![
            0.05, 0.1, 0.8, 0.05
        ]);
        assert_eq!(sorted.row(3).iter().copied().collect::<Vec<_>>(), vec![
            0.3, 0.2, 0.1, 0.4
        ]);
    }

    #[test]
    fn relabeling_follows_the_permutation() {
        let matrix = DMatrix::from_row_slice(3, 3, &[
            0.2, 0.4, 0.4, //
            0.1, 0.8, 0.1, //
            0.3, 0.2, 0.5,
        ]);
        let order = metastability_order(&matrix);
        assert_eq!(order, vec![1, 2, 0]);

        let sequence = StateSequence::new(vec![0, 1, 2, 1], 3);
        let relabeled = relabel_sequence(&sequence, &order);
        assert_eq!(relabeled.labels(), &[2, 0, 1, 0]);
        assert_eq!(relabeled.len(), sequence.len());
    }

    #[test]
    fn permutation_preserves_row_stochasticity() {
        let matrix = DMatrix::from_row_slice(3, 3, &[
            0.2, 0.4, 0.4, //
            0.1, 0.8, 0.1, //
            0.3, 0.2, 0.5,
        ]);
        let order = metastability_order(&matrix);
        let sorted = permute_matrix(&matrix, &order);
        assert!(is_row_stochastic(&sorted, 1e-12));
    }
}
