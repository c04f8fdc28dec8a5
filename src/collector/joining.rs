use std::fmt::{Display, Write};

use super::{of, Collector};

/// Concatenates the items' `Display` output, separated by `separator`, in
/// arrival order. An empty stream joins to the empty string.
///
/// ```rust
/// use sluice::{collector, Stream};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let csv = Stream::just(vec![1, 2, 3])
///     .collect(collector::joining(","))
///     .await;
/// assert_eq!(csv, "1,2,3");
/// # });
/// ```
pub fn joining<T>(separator: impl Into<String>) -> impl Collector<T, Acc = String, Out = String>
where
    T: Display,
{
    let separator = separator.into();

    of(
        String::new,
        move |acc: &mut String, item: T| {
            if !acc.is_empty() {
                acc.push_str(&separator);
            }
            let _ = write!(acc, "{item}");
        },
        |acc| acc,
    )
}

#[cfg(test)]
mod tests {
    use crate::{collector, Stream};

    #[tokio::test]
    async fn joins_with_separator() {
        let joined = Stream::just(vec!["a", "b", "c"])
            .collect(collector::joining(" - "))
            .await;
        assert_eq!(joined, "a - b - c");
    }

    #[tokio::test]
    async fn empty_stream_joins_to_empty_string() {
        let joined = Stream::just(Vec::<i32>::new())
            .collect(collector::joining(","))
            .await;
        assert_eq!(joined, "");
    }

    #[tokio::test]
    async fn single_item_has_no_separator() {
        let joined = Stream::just(vec![7]).collect(collector::joining(",")).await;
        assert_eq!(joined, "7");
    }
}
