//! Shared utility functions and traits

/// Extension trait for tracking minimum and maximum values in `Option<T>`.
///
/// # Example
///
/// ```
/// use counterstrafe_trainer::utils::MinMaxExt;
///
/// let mut best: Option<u64> = None;
/// let mut worst: Option<u64> = None;
///
/// for switch_ms in [60, 35, 90] {
///     best.update_min(switch_ms);
///     worst.update_max(switch_ms);
/// }
/// assert_eq!(best, Some(35));
/// assert_eq!(worst, Some(90));
/// ```
pub trait MinMaxExt<T: Ord + Copy> {
    /// Store `value` if it is smaller than the current minimum or none is set
    fn update_min(&mut self, value: T);

    /// Store `value` if it is larger than the current maximum or none is set
    fn update_max(&mut self, value: T);
}

impl<T: Ord + Copy> MinMaxExt<T> for Option<T> {
    fn update_min(&mut self, value: T) {
        *self = Some(self.map(|m| m.min(value)).unwrap_or(value));
    }

    fn update_max(&mut self, value: T) {
        *self = Some(self.map(|m| m.max(value)).unwrap_or(value));
    }
}

/// Arithmetic mean, `None` for an empty input
pub fn mean(values: impl IntoIterator<Item = u64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0u128, 0u64), |(sum, count), v| (sum + v as u128, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum as f64 / count as f64)
    }
}
