/// Specifies the direction for sorting documents.
///
/// Used in [`crate::options::FindOptions`] to control result ordering. The
/// options normalizer derives the direction from the numeric indicator of a
/// sort directive: negative means `Descending`, anything else `Ascending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Sort in ascending order (smallest to largest, A-Z, oldest to newest)
    Ascending,
    /// Sort in descending order (largest to smallest, Z-A, newest to oldest)
    Descending,
}

impl SortOrder {
    /// Maps a numeric sort indicator to a sort order. Negative values sort
    /// descending, everything else ascending.
    pub fn from_indicator(indicator: i64) -> SortOrder {
        if indicator < 0 {
            SortOrder::Descending
        } else {
            SortOrder::Ascending
        }
    }
}
