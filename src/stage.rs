use std::{future::Future, sync::Arc};

use futures::{stream::FuturesUnordered, StreamExt};
use tokio::task::JoinHandle;

/// Join handles of every task spawned on behalf of a stream, across all of
/// its stages. Terminal operators drain this after the data is consumed.
pub(crate) type Handles = FuturesUnordered<JoinHandle<()>>;

/// Spawns `parallelism` workers that compete over `input` and run `op` once
/// per item, writing into a fresh bounded output channel.
///
/// `op` receives the item and a sender for the stage's output; it returns
/// `false` when the output side is gone, which stops the worker. The output
/// channel closes once every worker has finished, either because the input
/// is exhausted or because the downstream receiver was dropped. Workers drop
/// their input receiver clones on exit, so cancellation propagates upstream.
pub(crate) fn spawn_workers<In, Out, F, Fut>(
    input: flume::Receiver<In>,
    parallelism: usize,
    handles: &Handles,
    op: F,
) -> flume::Receiver<Out>
where
    In: Send + 'static,
    Out: Send + 'static,
    F: Fn(In, flume::Sender<Out>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    let (output_sender, output_receiver) = flume::bounded(parallelism);
    let op = Arc::new(op);

    for _ in 0..parallelism {
        let input = input.clone();
        let output_sender = output_sender.clone();
        let op = Arc::clone(&op);

        handles.push(tokio::spawn(async move {
            while let Ok(item) = input.recv_async().await {
                if !op(item, output_sender.clone()).await {
                    break;
                }
            }
        }));
    }

    output_receiver
}

/// Waits for every spawned task of the pipeline to finish and re-raises the
/// first panic captured by any of them at the caller.
pub(crate) async fn finish(mut handles: Handles) {
    while let Some(res) = handles.next().await {
        if let Err(err) = res {
            if err.is_panic() {
                std::panic::resume_unwind(err.into_panic());
            }
        }
    }
}
