/// Represents the result of attempting to generate a new ID without waiting.
///
/// This type models the outcome of [`SnowflakeGenerator::poll_id`]:
///
/// - [`Poll::Ready`] indicates a new ID was successfully generated.
/// - [`Poll::Pending`] means the sequence space of the current millisecond is
///   exhausted and no ID can be produced until the clock reaches
///   `yield_until`.
///
/// [`SnowflakeGenerator::poll_id`]: crate::generator::SnowflakeGenerator::poll_id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Poll<T> {
    /// A unique ID was generated and is ready to use.
    Ready {
        /// The generated ID.
        id: T,
    },
    /// No ID could be generated because the sequence has been exhausted for the
    /// current millisecond.
    Pending {
        /// The earliest Unix millisecond (inclusive) at which generation can
        /// resume.
        yield_until: u64,
    },
}
