//! Grouping of all hand hypotheses generated from one sampled point.

use nalgebra::Point3;

use super::hand::Hand;

/// All hand hypotheses derived from one sampled point across the tested
/// hand axes and orientations.
///
/// The validity sequence is indexed identically to the hand sequence;
/// `hands.len() == is_valid().len()` always holds. A set with zero valid
/// entries is legal: the sample was ungraspable.
#[derive(Debug, Clone, Default)]
pub struct HandSet {
    /// The sampled point the hypotheses were generated from.
    pub sample: Point3<f64>,

    /// Index of the sample in the source cloud, when applicable.
    pub sample_index: Option<usize>,

    hands: Vec<Hand>,
    is_valid: Vec<bool>,
}

impl HandSet {
    /// Creates an empty set for the given sample.
    #[must_use]
    pub fn new(sample: Point3<f64>, sample_index: Option<usize>) -> Self {
        Self {
            sample,
            sample_index,
            hands: Vec::new(),
            is_valid: Vec::new(),
        }
    }

    /// Adds a hypothesis, recording its validity in the parallel sequence.
    pub fn push(&mut self, hand: Hand) {
        self.is_valid.push(hand.is_valid);
        self.hands.push(hand);
    }

    /// The hypotheses in this set.
    #[must_use]
    pub fn hands(&self) -> &[Hand] {
        &self.hands
    }

    /// Per-hypothesis validity, indexed identically to [`hands`](Self::hands).
    #[must_use]
    pub fn is_valid(&self) -> &[bool] {
        &self.is_valid
    }

    /// Number of valid hypotheses.
    #[must_use]
    pub fn num_valid(&self) -> usize {
        self.is_valid.iter().filter(|&&v| v).count()
    }

    /// Moves the valid hypotheses out of this set, preserving their order
    /// and leaving the set empty.
    ///
    /// # Example
    ///
    /// ```
    /// use grasp_candidates::{Hand, HandSet};
    /// use nalgebra::{Point3, UnitQuaternion};
    ///
    /// let mut set = HandSet::new(Point3::origin(), Some(0));
    /// let mut hand = Hand::new(
    ///     Point3::origin(),
    ///     UnitQuaternion::identity(),
    ///     0.05,
    ///     0.01,
    ///     Point3::origin(),
    /// );
    /// hand.is_valid = true;
    /// set.push(hand);
    ///
    /// let valid = set.take_valid_hands();
    /// assert_eq!(valid.len(), 1);
    /// assert!(set.hands().is_empty());
    /// ```
    pub fn take_valid_hands(&mut self) -> Vec<Hand> {
        let hands = std::mem::take(&mut self.hands);
        let is_valid = std::mem::take(&mut self.is_valid);
        hands
            .into_iter()
            .zip(is_valid)
            .filter_map(|(hand, valid)| valid.then_some(hand))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use nalgebra::UnitQuaternion;

    fn make_hand(valid: bool, width: f64) -> Hand {
        let mut hand = Hand::new(
            Point3::origin(),
            UnitQuaternion::identity(),
            width,
            0.01,
            Point3::origin(),
        );
        hand.is_valid = valid;
        hand
    }

    #[test]
    fn test_parallel_sequences_stay_in_sync() {
        let mut set = HandSet::new(Point3::origin(), None);
        set.push(make_hand(true, 0.04));
        set.push(make_hand(false, 0.0));
        set.push(make_hand(true, 0.05));

        assert_eq!(set.hands().len(), set.is_valid().len());
        assert_eq!(set.is_valid(), &[true, false, true]);
        assert_eq!(set.num_valid(), 2);
    }

    #[test]
    fn test_take_valid_hands_moves_and_empties() {
        let mut set = HandSet::new(Point3::origin(), Some(3));
        set.push(make_hand(false, 0.0));
        set.push(make_hand(true, 0.03));

        let valid = set.take_valid_hands();
        assert_eq!(valid.len(), 1);
        assert!((valid[0].grasp_width - 0.03).abs() < 1e-12);
        assert!(set.hands().is_empty());
        assert!(set.is_valid().is_empty());
    }

    #[test]
    fn test_empty_set_is_legal() {
        let mut set = HandSet::new(Point3::origin(), None);
        assert_eq!(set.num_valid(), 0);
        assert!(set.take_valid_hands().is_empty());
    }
}
