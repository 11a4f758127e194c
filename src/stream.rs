use anyhow::Result;
use log::{debug, trace};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Default hand-off buffer between producer and consumer.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Runs `items` as a producer task feeding a bounded channel, paced by the consumer.
///
/// The producer only computes the next item once a slot in the channel is reserved. It returns
/// (and drops the iterator with all of its state) when the iterator is exhausted, when `stop`
/// is cancelled, or when the receiver is dropped. The channel closes in all three cases.
pub fn spawn_producer<I>(
    items: I,
    capacity: usize,
    stop: CancellationToken,
) -> (Receiver<I::Item>, JoinHandle<Result<()>>)
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let handle = tokio::spawn(produce(items.into_iter(), tx, stop));
    (rx, handle)
}

async fn produce<I: Iterator>(mut items: I, tx: Sender<I::Item>, stop: CancellationToken) -> Result<()> {
    let mut produced = 0u64;
    loop {
        let permit = tokio::select! {
            biased; // Stop should take prio
            _ = stop.cancelled() => {
                debug!("Producer cancelled after {} items", produced);
                return Ok(());
            }
            permit = tx.reserve() => match permit {
                Ok(permit) => permit,
                Err(_) => {
                    debug!("Consumer went away after {} items, stopping producer", produced);
                    return Ok(());
                }
            }
        };
        match items.next() {
            Some(item) => {
                permit.send(item);
                produced += 1;
            }
            None => {
                trace!("Producer exhausted after {} items", produced);
                return Ok(());
            }
        }
    }
}
