use std::{collections::HashMap, fmt::Debug, hash::Hash};

use super::{of, Collector};

/// Collects items into a map keyed by `key`, with the items themselves as
/// values.
///
/// # Panics
///
/// Panics when two items map to the same key, naming the key and both
/// values. Use [`to_map_keep_last`] or [`to_map_with`] when duplicates are
/// expected.
///
/// ```rust
/// use sluice::{collector, Stream};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let by_value = Stream::just(vec![1, 2, 3, 4])
///     .collect(collector::to_map(|x| *x))
///     .await;
///
/// assert_eq!(by_value[&3], 3);
/// assert_eq!(by_value.len(), 4);
/// # });
/// ```
pub fn to_map<T, K, F>(key: F) -> impl Collector<T, Acc = HashMap<K, T>, Out = HashMap<K, T>>
where
    K: Eq + Hash + Debug,
    T: Debug,
    F: Fn(&T) -> K,
{
    to_map_with(key, |item| item, |key, existing, new| {
        panic!("duplicate key {key:?}: existing value {existing:?}, new value {new:?}")
    })
}

/// Collects items into a map keyed by `key`; on a duplicate key the last
/// arrival wins.
pub fn to_map_keep_last<T, K, F>(
    key: F,
) -> impl Collector<T, Acc = HashMap<K, T>, Out = HashMap<K, T>>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    to_map_with(key, |item| item, |_key, _existing, new| new)
}

/// Collects items into a map with caller-supplied key and value mappings;
/// `on_duplicate` resolves key collisions from the existing and new values.
pub fn to_map_with<T, K, V, KF, VF, DF>(
    key: KF,
    value: VF,
    on_duplicate: DF,
) -> impl Collector<T, Acc = HashMap<K, V>, Out = HashMap<K, V>>
where
    K: Eq + Hash,
    KF: Fn(&T) -> K,
    VF: Fn(T) -> V,
    DF: Fn(&K, V, V) -> V,
{
    of(
        HashMap::new,
        move |map: &mut HashMap<K, V>, item: T| {
            let k = key(&item);
            let v = value(item);
            match map.remove(&k) {
                Some(existing) => {
                    let resolved = on_duplicate(&k, existing, v);
                    map.insert(k, resolved);
                }
                None => {
                    map.insert(k, v);
                }
            }
        },
        |map| map,
    )
}

/// Groups items into a map of `key -> Vec<item>`, preserving arrival order
/// within each group.
///
/// ```rust
/// use sluice::{collector, Stream};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let by_parity = Stream::range(0, 6)
///     .collect(collector::group_by(|x| x % 2))
///     .await;
///
/// assert_eq!(by_parity[&0], vec![0, 2, 4]);
/// assert_eq!(by_parity[&1], vec![1, 3, 5]);
/// # });
/// ```
pub fn group_by<T, K, F>(
    key: F,
) -> impl Collector<T, Acc = HashMap<K, Vec<T>>, Out = HashMap<K, Vec<T>>>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    group_by_with(key, |item| item)
}

/// Groups the values extracted by `value` under the keys extracted by `key`.
pub fn group_by_with<T, K, V, KF, VF>(
    key: KF,
    value: VF,
) -> impl Collector<T, Acc = HashMap<K, Vec<V>>, Out = HashMap<K, Vec<V>>>
where
    K: Eq + Hash,
    KF: Fn(&T) -> K,
    VF: Fn(T) -> V,
{
    of(
        HashMap::new,
        move |map: &mut HashMap<K, Vec<V>>, item: T| {
            let k = key(&item);
            map.entry(k).or_default().push(value(item));
        },
        |map| map,
    )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::{collector, Stream};

    #[tokio::test]
    async fn to_map_with_identity_key() {
        let out = Stream::just(vec![1, 2, 3, 4])
            .collect(collector::to_map(|x| *x))
            .await;

        let expected: HashMap<i32, i32> = (1..=4).map(|x| (x, x)).collect();
        assert_eq!(out, expected);
    }

    #[tokio::test]
    #[should_panic(expected = "duplicate key")]
    async fn to_map_panics_on_duplicate_key() {
        Stream::just(vec![("a", 1), ("a", 2)])
            .collect(collector::to_map(|(name, _)| *name))
            .await;
    }

    #[tokio::test]
    async fn to_map_keep_last_overwrites() {
        let out = Stream::just(vec![("a", 1), ("b", 2), ("a", 3)])
            .collect(collector::to_map_keep_last(|(name, _)| *name))
            .await;

        assert_eq!(out[&"a"], ("a", 3));
        assert_eq!(out[&"b"], ("b", 2));
    }

    #[tokio::test]
    async fn to_map_with_resolver_merges_values() {
        let out = Stream::just(vec![("a", 1), ("b", 2), ("a", 3)])
            .collect(collector::to_map_with(
                |(name, _): &(&str, i32)| *name,
                |(_, n)| n,
                |_key, existing, new| existing + new,
            ))
            .await;

        assert_eq!(out[&"a"], 4);
        assert_eq!(out[&"b"], 2);
    }

    #[tokio::test]
    async fn group_by_preserves_arrival_order_within_groups() {
        let out = Stream::just(vec!["apple", "avocado", "banana", "cherry"])
            .collect(collector::group_by(|word: &&str| word.as_bytes()[0]))
            .await;

        assert_eq!(out[&b'a'], vec!["apple", "avocado"]);
        assert_eq!(out[&b'b'], vec!["banana"]);
        assert_eq!(out[&b'c'], vec!["cherry"]);
    }

    #[tokio::test]
    async fn group_by_with_maps_values() {
        let out = Stream::just(vec!["apple", "banana", "blueberry"])
            .collect(collector::group_by_with(
                |word: &&str| word.as_bytes()[0],
                |word| word.len(),
            ))
            .await;

        assert_eq!(out[&b'a'], vec![5]);
        assert_eq!(out[&b'b'], vec![6, 9]);
    }
}
