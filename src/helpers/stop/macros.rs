/// Drains `$work_rx` into `$self.$work(item)` until the sender closes the channel or `$stop_rx`
/// is cancelled. Must be used in a function returning `anyhow::Result<()>`.
///
/// ```ignore
/// loop_with_stop!("writer", stop_rx, items_rx => output.write_item(it));
/// ```
#[macro_export]
macro_rules! loop_with_stop {
    ($task_name:expr, $stop_rx:ident, $work_rx:ident => $self:ident.$work:ident(it)) => {
        loop {
            let work_fut = $work_rx.recv();
            let stop_fut = $stop_rx.cancelled();

            tokio::select! {
                biased; // Stop should take prio
                _ = stop_fut => {
                    log::trace!("Cancellation signal received by {}.", $task_name);
                    return anyhow::Result::Ok(());
                }
                work_opt = work_fut => {
                    if let Some(work) = work_opt {
                        $self.$work(work)?;
                    } else {
                        log::debug!("Sender closed channel for {}", $task_name);
                        return anyhow::Result::Ok(());
                    }
                }
            }
        }
    };
}
