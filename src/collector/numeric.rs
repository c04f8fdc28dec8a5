use std::ops::Add;

use super::{of, Collector};

/// Sums the values extracted by `mapper`; an empty stream sums to the zero
/// value of `N`.
///
/// ```rust
/// use sluice::{collector, Stream};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let total: i64 = Stream::range(1, 5).collect(collector::sum(|x| x)).await;
/// assert_eq!(total, 10);
/// # });
/// ```
pub fn sum<T, N, F>(mapper: F) -> impl Collector<T, Acc = N, Out = N>
where
    N: Add<Output = N> + Default + Copy,
    F: Fn(T) -> N,
{
    of(
        N::default,
        move |acc: &mut N, item: T| *acc = *acc + mapper(item),
        |acc| acc,
    )
}

/// Averages the values extracted by `mapper`; `None` on an empty stream.
pub fn average<T, F>(mapper: F) -> impl Collector<T, Acc = (f64, u64), Out = Option<f64>>
where
    F: Fn(T) -> f64,
{
    of(
        || (0.0f64, 0u64),
        move |acc: &mut (f64, u64), item: T| {
            acc.0 += mapper(item);
            acc.1 += 1;
        },
        |(total, observed)| {
            if observed == 0 {
                None
            } else {
                Some(total / observed as f64)
            }
        },
    )
}

/// Keeps the smallest value extracted by `mapper`; `None` on an empty
/// stream.
pub fn min<T, R, F>(mapper: F) -> impl Collector<T, Acc = Option<R>, Out = Option<R>>
where
    R: PartialOrd,
    F: Fn(T) -> R,
{
    of(
        || None,
        move |best: &mut Option<R>, item: T| {
            let value = mapper(item);
            if best.as_ref().map_or(true, |current| value < *current) {
                *best = Some(value);
            }
        },
        |best| best,
    )
}

/// Keeps the largest value extracted by `mapper`; `None` on an empty stream.
pub fn max<T, R, F>(mapper: F) -> impl Collector<T, Acc = Option<R>, Out = Option<R>>
where
    R: PartialOrd,
    F: Fn(T) -> R,
{
    of(
        || None,
        move |best: &mut Option<R>, item: T| {
            let value = mapper(item);
            if best.as_ref().map_or(true, |current| value > *current) {
                *best = Some(value);
            }
        },
        |best| best,
    )
}

/// Counts items, saturating at `u64::MAX`.
pub fn count<T>() -> impl Collector<T, Acc = u64, Out = u64> {
    of(
        || 0u64,
        |acc: &mut u64, _item: T| *acc = acc.saturating_add(1),
        |acc| acc,
    )
}

#[cfg(test)]
mod tests {
    use crate::{collector, Stream};

    #[tokio::test]
    async fn sum_of_empty_stream_is_zero() {
        let total: i64 = Stream::just(Vec::new())
            .collect(collector::sum(|x| x))
            .await;
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn sum_adds_mapped_values() {
        let total = Stream::just(vec!["a", "bb", "ccc"])
            .collect(collector::sum(|s: &str| s.len()))
            .await;
        assert_eq!(total, 6);
    }

    #[tokio::test]
    async fn average_divides_by_observed_count() {
        let avg = Stream::just(vec![1, 2, 3, 4])
            .collect(collector::average(|x: i32| x as f64))
            .await;
        assert_eq!(avg, Some(2.5));
    }

    #[tokio::test]
    async fn average_of_empty_stream_is_none() {
        let avg = Stream::just(Vec::<i32>::new())
            .collect(collector::average(|x| x as f64))
            .await;
        assert_eq!(avg, None);
    }

    #[tokio::test]
    async fn min_and_max_track_extremes() {
        let smallest = Stream::just(vec![3, 1, 2])
            .collect(collector::min(|x: i32| x))
            .await;
        let largest = Stream::just(vec![3, 1, 2])
            .collect(collector::max(|x: i32| x))
            .await;

        assert_eq!(smallest, Some(1));
        assert_eq!(largest, Some(3));
    }

    #[tokio::test]
    async fn min_and_max_of_empty_stream_are_none() {
        let smallest = Stream::just(Vec::<i32>::new())
            .collect(collector::min(|x| x))
            .await;
        let largest = Stream::just(Vec::<i32>::new())
            .collect(collector::max(|x| x))
            .await;

        assert_eq!(smallest, None);
        assert_eq!(largest, None);
    }

    #[tokio::test]
    async fn count_counts_items() {
        let counted = Stream::range(0, 42).collect(collector::count()).await;
        assert_eq!(counted, 42);
    }
}
