use super::{of, Collector};

/// Collects items into a `Vec`, in arrival order.
pub fn to_vec<T>() -> impl Collector<T, Acc = Vec<T>, Out = Vec<T>> {
    of(
        Vec::new,
        |acc: &mut Vec<T>, item: T| acc.push(item),
        |acc| acc,
    )
}

#[cfg(test)]
mod tests {
    use crate::{collector, Stream};

    #[tokio::test]
    async fn collects_in_arrival_order() {
        let out = Stream::just(vec![3, 1, 2])
            .collect(collector::to_vec())
            .await;
        assert_eq!(out, vec![3, 1, 2]);
    }
}
