use std::fmt::Display;

use anyhow::Result;
use cidr_crab::helpers::stop::{self, flatten};
use cidr_crab::loop_with_stop;
use cidr_crab::stream;
use clap::Args;
use futures::executor;
use log::info;
use tokio::sync::mpsc::Receiver;
use tokio::try_join;
use tokio_util::sync::CancellationToken;

use crate::output::OutputWriter;

#[derive(Args, Clone, Debug)]
#[group(id = "pipe")]
pub struct Params {
    /// Number of results buffered between generation and output
    #[arg(long, default_value_t = stream::DEFAULT_CAPACITY, env = "CIDR_BUDDY_CHANNEL_CAPACITY")]
    pub channel_capacity: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            channel_capacity: stream::DEFAULT_CAPACITY,
        }
    }
}

/// Streams `items` into `output` through a bounded channel. SIGINT/SIGTERM stop the producer,
/// and whatever was produced until then is still flushed.
pub fn to_output<I>(items: I, params: &Params, output: OutputWriter) -> Result<u64>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Display + Send + 'static,
{
    let sig_handler = stop::new();
    let stop_rx = sig_handler.subscribe_stop();
    tokio::spawn(sig_handler.wait_for_signal());

    let (items_rx, producer_handle) = stream::spawn_producer(items, params.channel_capacity, stop_rx.clone());
    let writer_handle = tokio::spawn(write(output, items_rx, stop_rx.clone()));

    let result: Result<u64> = executor::block_on(async {
        let (_, count) = try_join!(flatten(producer_handle), async { writer_handle.await? })?;
        Ok(count)
    });
    // releases the signal listener
    stop_rx.cancel();
    result
}

async fn write<T: Display + Send + 'static>(mut output: OutputWriter, items_rx: Receiver<T>, stop_rx: CancellationToken) -> Result<u64> {
    let drained = drain(&mut output, items_rx, stop_rx.clone()).await;
    if stop_rx.is_cancelled() {
        info!("Stopped early after {} results", output.count());
    }
    let count = output.finish()?;
    drained.map(|_| count)
}

async fn drain<T: Display + Send + 'static>(output: &mut OutputWriter, mut items_rx: Receiver<T>, stop_rx: CancellationToken) -> Result<()> {
    loop_with_stop!("output writer", stop_rx, items_rx => output.push(it))
}
