//! Mutable-reduction strategies consumed by [`Stream::collect`](crate::Stream::collect).
//!
//! A collector is a supplier/accumulator/finisher triple: the supplier
//! produces a fresh accumulator, the accumulator folds one item into it, and
//! the finisher turns the accumulator into the result. `collect` calls the
//! supplier exactly once, the accumulator once per item on its own task, and
//! the finisher exactly once — the accumulator is never shared between
//! tasks, so collectors need no internal locking at any stream parallelism.
//!
//! ```rust
//! use sluice::{collector, Stream};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let total: i64 = Stream::range(1, 11).collect(collector::sum(|x| x)).await;
//! assert_eq!(total, 55);
//! # });
//! ```

mod joining;
mod map;
mod numeric;
mod vec;

pub use joining::joining;
pub use map::{group_by, group_by_with, to_map, to_map_keep_last, to_map_with};
pub use numeric::{average, count, max, min, sum};
pub use vec::to_vec;

/// A mutable reduction: a fresh accumulator, a per-item fold, and a final
/// transformation.
pub trait Collector<T> {
    /// The mutable accumulator type.
    type Acc;
    /// The result of the reduction.
    type Out;

    /// Returns a new, empty accumulator.
    fn supply(&self) -> Self::Acc;
    /// Folds one item into the accumulator.
    fn accumulate(&self, acc: &mut Self::Acc, item: T);
    /// Transforms the final accumulator into the result.
    fn finish(&self, acc: Self::Acc) -> Self::Out;
}

/// A collector assembled from three closures. Built with [`of`].
pub struct FnCollector<S, A, F> {
    supplier: S,
    accumulator: A,
    finisher: F,
}

/// Builds a custom collector from a supplier, an accumulator, and a
/// finisher.
///
/// ```rust
/// use sluice::{collector, Stream};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let bits = collector::of(
///     || 0u32,
///     |acc: &mut u32, bit: bool| *acc = (*acc << 1) | bit as u32,
///     |acc| acc,
/// );
///
/// let word = Stream::just(vec![true, false, true, true]).collect(bits).await;
/// assert_eq!(word, 0b1011);
/// # });
/// ```
pub fn of<T, Acc, Out, S, A, F>(supplier: S, accumulator: A, finisher: F) -> FnCollector<S, A, F>
where
    S: Fn() -> Acc,
    A: Fn(&mut Acc, T),
    F: Fn(Acc) -> Out,
{
    FnCollector {
        supplier,
        accumulator,
        finisher,
    }
}

impl<T, Acc, Out, S, A, F> Collector<T> for FnCollector<S, A, F>
where
    S: Fn() -> Acc,
    A: Fn(&mut Acc, T),
    F: Fn(Acc) -> Out,
{
    type Acc = Acc;
    type Out = Out;

    fn supply(&self) -> Acc {
        (self.supplier)()
    }

    fn accumulate(&self, acc: &mut Acc, item: T) {
        (self.accumulator)(acc, item)
    }

    fn finish(&self, acc: Acc) -> Out {
        (self.finisher)(acc)
    }
}
