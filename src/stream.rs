use std::{
    cmp::Ordering,
    future::Future,
    hash::Hash,
    sync::{
        atomic::{AtomicBool, Ordering as AtomicOrdering},
        Arc,
    },
};

use dashmap::DashSet;
use futures::StreamExt;

use crate::{
    collector::Collector,
    options::Opts,
    stage::{self, Handles},
};

/// A channel-backed stream of items with a configurable degree of
/// parallelism.
///
/// A `Stream<T>` wraps the receiving end of a bounded channel fed by one or
/// more spawned tasks. Every intermediate operator consumes the stream and
/// returns a new one wired to a fresh channel, fed by the workers of that
/// operator. Terminal operators drain the final channel and resolve once the
/// whole pipeline has shut down.
///
/// ## Parallelism
///
/// A stream starts out sequential. Passing [`with_parallelism(n)`](crate::with_parallelism)
/// to an operator makes that operator run `n` workers, and the setting is
/// inherited by the stages built on top of it until overridden again.
/// With a single worker the output order equals the input order; with more,
/// items come out in completion order and only multiset equality holds.
///
/// ```rust
/// use sluice::{with_parallelism, with_sync, Opts, Stream};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let out = Stream::range(0, 100)
///     .map(|x| async move { x * x }, with_parallelism(8))
///     .filter(|x| x % 2 == 0, Opts::default())
///     .sort(|a, b| a.cmp(b), with_sync())
///     .await
///     .to_vec()
///     .await;
///
/// assert_eq!(out.first(), Some(&0));
/// assert_eq!(out.last(), Some(&9604));
/// # });
/// ```
///
/// ## Cancellation
///
/// Operators that stop early (`limit`, `take_while`, the short-circuiting
/// match family) drop their input receiver. Upstream workers observe the
/// failed send and stop producing, so an early exit over an unbounded source
/// returns promptly instead of leaving a producer blocked or spinning.
///
/// ## Panic handling
///
/// User callbacks run inside spawned tasks. The stream keeps the join handle
/// of every task it spawns; a terminal operator awaits them after the data
/// is drained and re-raises the first captured panic at its own call site.
pub struct Stream<T> {
    source: flume::Receiver<T>,
    parallelism: usize,
    handles: Handles,
}

impl<T> Stream<T>
where
    T: Send + 'static,
{
    /// Builds a stream from a generator task.
    ///
    /// The generator receives the sending side of the stream's channel and
    /// runs on a spawned task; the channel closes when it returns. A failed
    /// send means the consumer is gone — generators should stop on error.
    ///
    /// ```rust
    /// use sluice::Stream;
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let fibs = Stream::from_generator(|tx| async move {
    ///     let (mut a, mut b) = (0u64, 1u64);
    ///     for _ in 0..10 {
    ///         if tx.send_async(a).await.is_err() {
    ///             break;
    ///         }
    ///         (a, b) = (b, a + b);
    ///     }
    /// });
    ///
    /// assert_eq!(fibs.to_vec().await, vec![0, 1, 1, 2, 3, 5, 8, 13, 21, 34]);
    /// # });
    /// ```
    pub fn from_generator<F, Fut>(generator: F) -> Self
    where
        F: FnOnce(flume::Sender<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let (sender, receiver) = flume::bounded(1);
        let handles = Handles::new();

        handles.push(tokio::spawn(async move {
            generator(sender).await;
        }));

        Stream {
            source: receiver,
            parallelism: 1,
            handles,
        }
    }

    /// Builds a stream emitting the given items in order.
    ///
    /// ```rust
    /// use sluice::Stream;
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// assert_eq!(Stream::just(vec![1, 2, 3]).to_vec().await, vec![1, 2, 3]);
    /// # });
    /// ```
    pub fn just<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T> + Send + 'static,
        I::IntoIter: Send,
    {
        Self::from_generator(|sender| async move {
            for item in items {
                if sender.send_async(item).await.is_err() {
                    break;
                }
            }
        })
    }

    /// Concatenates multiple streams into one.
    ///
    /// Equivalent to calling [`concat`](Stream::concat) on the first stream
    /// with the rest; an empty input yields an empty stream.
    pub fn concat_all<I>(streams: I, opts: Opts) -> Stream<T>
    where
        I: IntoIterator<Item = Stream<T>>,
    {
        let mut streams = streams.into_iter();

        match streams.next() {
            Some(first) => first.concat(streams, opts),
            None => Stream::just(Vec::new()),
        }
    }

    /// Attaches a mapping stage; `mapper` runs once per item.
    ///
    /// ```rust
    /// use sluice::{Opts, Stream};
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let out = Stream::just(vec![1, 2, 3])
    ///     .map(|x| async move { x * 2 }, Opts::default())
    ///     .to_vec()
    ///     .await;
    ///
    /// assert_eq!(out, vec![2, 4, 6]);
    /// # });
    /// ```
    pub fn map<R, F, Fut>(self, mapper: F, opts: Opts) -> Stream<R>
    where
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        self.run_stage(opts, move |item, out: flume::Sender<R>| {
            let fut = mapper(item);
            async move { out.send_async(fut.await).await.is_ok() }
        })
    }

    /// Attaches a stage that replaces each item with the contents of the
    /// stream `mapper` builds for it.
    ///
    /// ```rust
    /// use sluice::{Opts, Stream};
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let out = Stream::just(vec![1, 2, 3])
    ///     .flat_map(|x| Stream::range(0, x), Opts::default())
    ///     .to_vec()
    ///     .await;
    ///
    /// assert_eq!(out, vec![0, 0, 1, 0, 1, 2]);
    /// # });
    /// ```
    pub fn flat_map<R, F>(self, mapper: F, opts: Opts) -> Stream<R>
    where
        R: Send + 'static,
        F: Fn(T) -> Stream<R> + Send + Sync + 'static,
    {
        self.run_stage(opts, move |item, out: flume::Sender<R>| {
            let sub = mapper(item);
            async move { sub.pipe_into(&out).await }
        })
    }

    /// Attaches a filtering stage keeping only items the predicate accepts.
    ///
    /// ```rust
    /// use sluice::{Opts, Stream};
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let even = Stream::range(0, 10)
    ///     .filter(|x| x % 2 == 0, Opts::default())
    ///     .to_vec()
    ///     .await;
    ///
    /// assert_eq!(even, vec![0, 2, 4, 6, 8]);
    /// # });
    /// ```
    pub fn filter<F>(self, predicate: F, opts: Opts) -> Stream<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.run_stage(opts, move |item, out: flume::Sender<T>| {
            let keep = predicate(&item);
            async move {
                if keep {
                    out.send_async(item).await.is_ok()
                } else {
                    true
                }
            }
        })
    }

    /// Attaches an observation stage; `observer` sees every item, items flow
    /// through unchanged.
    pub fn peek<F>(self, observer: F, opts: Opts) -> Stream<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.run_stage(opts, move |item, out: flume::Sender<T>| {
            observer(&item);
            async move { out.send_async(item).await.is_ok() }
        })
    }

    /// Fully materializes the stream, sorts it with a stable sort, and
    /// re-emits it as a new finite stream.
    ///
    /// This operator blocks until the source is exhausted and must not be
    /// used on an unbounded stream.
    ///
    /// ```rust
    /// use sluice::{Opts, Stream};
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let out = Stream::just(vec![3, 1, 2])
    ///     .sort(|a, b| a.cmp(b), Opts::default())
    ///     .await
    ///     .to_vec()
    ///     .await;
    ///
    /// assert_eq!(out, vec![1, 2, 3]);
    /// # });
    /// ```
    pub async fn sort<F>(self, mut compare: F, opts: Opts) -> Stream<T>
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let Stream {
            source,
            parallelism,
            handles,
        } = self;
        let parallelism = opts.apply(parallelism);

        let mut items = Vec::new();
        while let Ok(item) = source.recv_async().await {
            items.push(item);
        }
        drop(source);
        stage::finish(handles).await;

        items.sort_by(|a, b| compare(a, b));

        let (sender, receiver) = flume::bounded(parallelism);
        let handles = Handles::new();
        handles.push(tokio::spawn(async move {
            for item in items {
                if sender.send_async(item).await.is_err() {
                    break;
                }
            }
        }));

        Stream {
            source: receiver,
            parallelism,
            handles,
        }
    }

    /// Attaches a deduplicating stage keyed by `key`; the first arrival of
    /// each key wins. Membership is tracked in a shared concurrent set, so
    /// the stage is safe at any parallelism.
    ///
    /// ```rust
    /// use sluice::{Opts, Stream};
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let out = Stream::just(vec![1, 2, 1, 3, 2])
    ///     .distinct(|x| *x, Opts::default())
    ///     .to_vec()
    ///     .await;
    ///
    /// assert_eq!(out, vec![1, 2, 3]);
    /// # });
    /// ```
    pub fn distinct<K, F>(self, key: F, opts: Opts) -> Stream<T>
    where
        K: Eq + Hash + Send + Sync + 'static,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        let seen = Arc::new(DashSet::new());

        self.run_stage(opts, move |item, out: flume::Sender<T>| {
            let fresh = seen.insert(key(&item));
            async move {
                if fresh {
                    out.send_async(item).await.is_ok()
                } else {
                    true
                }
            }
        })
    }

    /// Drops the first `n` items by arrival order and emits the rest.
    pub fn skip(self, n: usize, opts: Opts) -> Stream<T> {
        let Stream {
            source,
            parallelism,
            handles,
        } = self;
        let parallelism = opts.apply(parallelism);
        let (sender, receiver) = flume::bounded(parallelism);

        handles.push(tokio::spawn(async move {
            let mut remaining = n;
            while let Ok(item) = source.recv_async().await {
                if remaining > 0 {
                    remaining -= 1;
                    continue;
                }
                if sender.send_async(item).await.is_err() {
                    break;
                }
            }
        }));

        Stream {
            source: receiver,
            parallelism,
            handles,
        }
    }

    /// Emits at most `n` items, then cancels the upstream producer.
    ///
    /// ```rust
    /// use sluice::{Opts, Stream};
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// // the producer is cancelled, not drained; this returns promptly
    /// let out = Stream::range(0, 1_000_000_000)
    ///     .limit(3, Opts::default())
    ///     .to_vec()
    ///     .await;
    ///
    /// assert_eq!(out, vec![0, 1, 2]);
    /// # });
    /// ```
    pub fn limit(self, n: usize, opts: Opts) -> Stream<T> {
        let Stream {
            source,
            parallelism,
            handles,
        } = self;
        let parallelism = opts.apply(parallelism);
        let (sender, receiver) = flume::bounded(parallelism);

        handles.push(tokio::spawn(async move {
            let mut remaining = n;
            while remaining > 0 {
                match source.recv_async().await {
                    Ok(item) => {
                        if sender.send_async(item).await.is_err() {
                            break;
                        }
                        remaining -= 1;
                    }
                    Err(_) => break,
                }
            }
            // dropping the input receiver here cancels the upstream producer
        }));

        Stream {
            source: receiver,
            parallelism,
            handles,
        }
    }

    /// Emits items while the predicate holds; the first rejected item stops
    /// the stream and cancels the upstream producer. The boundary item is
    /// not emitted.
    pub fn take_while<F>(self, predicate: F, opts: Opts) -> Stream<T>
    where
        F: Fn(&T) -> bool + Send + 'static,
    {
        let Stream {
            source,
            parallelism,
            handles,
        } = self;
        let parallelism = opts.apply(parallelism);
        let (sender, receiver) = flume::bounded(parallelism);

        handles.push(tokio::spawn(async move {
            while let Ok(item) = source.recv_async().await {
                if !predicate(&item) {
                    break;
                }
                if sender.send_async(item).await.is_err() {
                    break;
                }
            }
        }));

        Stream {
            source: receiver,
            parallelism,
            handles,
        }
    }

    /// Suppresses items while the predicate holds; from the first rejected
    /// item on, everything is emitted — including later items the predicate
    /// would accept.
    pub fn drop_while<F>(self, predicate: F, opts: Opts) -> Stream<T>
    where
        F: Fn(&T) -> bool + Send + 'static,
    {
        let Stream {
            source,
            parallelism,
            handles,
        } = self;
        let parallelism = opts.apply(parallelism);
        let (sender, receiver) = flume::bounded(parallelism);

        handles.push(tokio::spawn(async move {
            let mut dropping = true;
            while let Ok(item) = source.recv_async().await {
                if dropping && predicate(&item) {
                    continue;
                }
                dropping = false;
                if sender.send_async(item).await.is_err() {
                    break;
                }
            }
        }));

        Stream {
            source: receiver,
            parallelism,
            handles,
        }
    }

    /// Concatenates `others` after this stream.
    ///
    /// With parallelism 1 each source is fully drained before the next one
    /// starts, preserving source order. With parallelism `n`, up to `n`
    /// sources are drained concurrently and interleaving is unspecified;
    /// the result ends only when every source is exhausted.
    ///
    /// ```rust
    /// use sluice::{Opts, Stream};
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let out = Stream::range(0, 3)
    ///     .concat(vec![Stream::range(3, 6)], Opts::default())
    ///     .to_vec()
    ///     .await;
    ///
    /// assert_eq!(out, vec![0, 1, 2, 3, 4, 5]);
    /// # });
    /// ```
    pub fn concat<I>(self, others: I, opts: Opts) -> Stream<T>
    where
        I: IntoIterator<Item = Stream<T>>,
    {
        let Stream {
            source,
            parallelism,
            handles,
        } = self;
        let parallelism = opts.apply(parallelism);

        let first = Stream {
            source,
            parallelism: 1,
            handles: Handles::new(),
        };
        let mut streams = vec![first];
        streams.extend(others);

        let (sender, receiver) = flume::bounded(parallelism);

        handles.push(tokio::spawn(async move {
            futures::stream::iter(streams)
                .map(|sub| {
                    let sender = sender.clone();
                    async move {
                        sub.pipe_into(&sender).await;
                    }
                })
                .buffer_unordered(parallelism)
                .for_each(|_| async {})
                .await;
        }));

        Stream {
            source: receiver,
            parallelism,
            handles,
        }
    }

    /// Invokes `consumer` once per item and resolves when the stream is
    /// exhausted. Under parallelism the invocations run concurrently;
    /// shared side effects need their own synchronization.
    pub async fn for_each<F, Fut>(self, consumer: F, opts: Opts)
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Stream {
            source,
            parallelism,
            handles,
        } = self;
        let parallelism = opts.apply(parallelism);
        let consumer = Arc::new(consumer);

        for _ in 0..parallelism {
            let source = source.clone();
            let consumer = Arc::clone(&consumer);
            handles.push(tokio::spawn(async move {
                while let Ok(item) = source.recv_async().await {
                    consumer(item).await;
                }
            }));
        }
        drop(source);

        stage::finish(handles).await;
    }

    /// Folds the stream into a single value. The accumulator always runs on
    /// the calling task, one item at a time in arrival order, so it needs no
    /// synchronization regardless of upstream parallelism.
    ///
    /// ```rust
    /// use sluice::Stream;
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let total = Stream::range(1, 5).reduce(0, |acc, x| acc + x).await;
    /// assert_eq!(total, 10);
    /// # });
    /// ```
    pub async fn reduce<A, F>(self, identity: A, mut accumulator: F) -> A
    where
        F: FnMut(A, T) -> A,
    {
        let Stream {
            source, handles, ..
        } = self;

        let mut acc = identity;
        while let Ok(item) = source.recv_async().await {
            acc = accumulator(acc, item);
        }
        drop(source);
        stage::finish(handles).await;

        acc
    }

    /// Counts the items in the stream, saturating at `u64::MAX`.
    pub async fn count(self) -> u64 {
        self.reduce(0u64, |n, _| n.saturating_add(1)).await
    }

    /// Returns whether any item matches the predicate; `false` on an empty
    /// stream. Short-circuits: the first match cancels the rest of the
    /// pipeline.
    ///
    /// ```rust
    /// use sluice::{Opts, Stream};
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// // returns as soon as 42 is seen, the remaining range is cancelled
    /// let hit = Stream::range(0, 1_000_000_000)
    ///     .any_match(|x| *x == 42, Opts::default())
    ///     .await;
    ///
    /// assert!(hit);
    /// # });
    /// ```
    pub async fn any_match<F>(self, predicate: F, opts: Opts) -> bool
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.exists(predicate, opts).await
    }

    /// Returns whether every item matches the predicate; `true` on an empty
    /// stream. Short-circuits on the first non-match.
    pub async fn all_match<F>(self, predicate: F, opts: Opts) -> bool
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        !self.exists(move |item| !predicate(item), opts).await
    }

    /// Returns whether no item matches the predicate; `true` on an empty
    /// stream. Short-circuits on the first match.
    pub async fn none_match<F>(self, predicate: F, opts: Opts) -> bool
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        !self.exists(predicate, opts).await
    }

    /// Returns the first item to arrive, or `None` if the stream is empty,
    /// cancelling the rest of the pipeline. With a sequential pipeline this
    /// is the first logical item; under parallelism it is whichever item
    /// arrives first.
    pub async fn find_first(self) -> Option<T> {
        let Stream {
            source, handles, ..
        } = self;

        let first = source.recv_async().await.ok();
        drop(source);
        stage::finish(handles).await;

        first
    }

    /// Runs a mutable reduction described by `collector`: its supplier runs
    /// once, its accumulator once per item on the calling task, its finisher
    /// once at the end.
    ///
    /// ```rust
    /// use sluice::{collector, Stream};
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let avg = Stream::just(vec![1, 2, 3, 4])
    ///     .collect(collector::average(|x: i32| x as f64))
    ///     .await;
    ///
    /// assert_eq!(avg, Some(2.5));
    /// # });
    /// ```
    pub async fn collect<C>(self, collector: C) -> C::Out
    where
        C: Collector<T>,
    {
        let Stream {
            source, handles, ..
        } = self;

        let mut acc = collector.supply();
        while let Ok(item) = source.recv_async().await {
            collector.accumulate(&mut acc, item);
        }
        drop(source);
        stage::finish(handles).await;

        collector.finish(acc)
    }

    /// Collects the stream into a `Vec`, in arrival order.
    pub async fn to_vec(self) -> Vec<T> {
        self.collect(crate::collector::to_vec()).await
    }

    /// Releases the pipeline without consuming it: cancels the upstream
    /// producer and waits for every task to shut down.
    pub async fn close(self) {
        let Stream {
            source, handles, ..
        } = self;

        drop(source);
        stage::finish(handles).await;
    }

    fn run_stage<R, F, Fut>(self, opts: Opts, op: F) -> Stream<R>
    where
        R: Send + 'static,
        F: Fn(T, flume::Sender<R>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let Stream {
            source,
            parallelism,
            handles,
        } = self;
        let parallelism = opts.apply(parallelism);
        let source = stage::spawn_workers(source, parallelism, &handles, op);

        Stream {
            source,
            parallelism,
            handles,
        }
    }

    /// Forwards every item into `out`, then joins this stream's tasks.
    /// Returns `false` when `out` is disconnected; the remainder of this
    /// stream is cancelled in that case.
    pub(crate) async fn pipe_into(self, out: &flume::Sender<T>) -> bool {
        let Stream {
            source, handles, ..
        } = self;

        while let Ok(item) = source.recv_async().await {
            if out.send_async(item).await.is_err() {
                return false;
            }
        }
        drop(source);
        stage::finish(handles).await;

        true
    }

    async fn exists<F>(self, predicate: F, opts: Opts) -> bool
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let Stream {
            source,
            parallelism,
            handles,
        } = self;
        let parallelism = opts.apply(parallelism);

        if parallelism == 1 {
            let mut found = false;
            while let Ok(item) = source.recv_async().await {
                if predicate(&item) {
                    found = true;
                    break;
                }
            }
            drop(source);
            stage::finish(handles).await;
            return found;
        }

        let found = Arc::new(AtomicBool::new(false));
        let predicate = Arc::new(predicate);

        for _ in 0..parallelism {
            let source = source.clone();
            let found = Arc::clone(&found);
            let predicate = Arc::clone(&predicate);

            handles.push(tokio::spawn(async move {
                while !found.load(AtomicOrdering::Relaxed) {
                    match source.recv_async().await {
                        Ok(item) => {
                            if predicate(&item) {
                                found.store(true, AtomicOrdering::Relaxed);
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
            }));
        }
        drop(source);

        stage::finish(handles).await;
        found.load(AtomicOrdering::Relaxed)
    }
}

impl Stream<i64> {
    /// Builds a stream of the integers `[start, end)` in ascending order;
    /// empty when `start >= end`.
    pub fn range(start: i64, end: i64) -> Stream<i64> {
        Stream::from_generator(move |sender| async move {
            for i in start..end {
                if sender.send_async(i).await.is_err() {
                    break;
                }
            }
        })
    }
}
