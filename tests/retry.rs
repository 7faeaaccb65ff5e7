use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bonding_router::bonding::retry::{cancel_pair, PollOutcome, RetryPolicy};

#[tokio::test(start_paused = true)]
async fn deadline_cuts_long_schedules() {
    let policy = RetryPolicy::fixed(100, Duration::from_secs(1)).with_deadline(Some(Duration::from_millis(3_500)));
    let reads = AtomicU32::new(0);
    let out: PollOutcome<()> = policy
        .poll(None, |_| {
            reads.fetch_add(1, Ordering::SeqCst);
            async { None }
        })
        .await;
    // esperas em 1s, 2s, 3s; a quarta passaria de 3.5s
    assert_eq!(out, PollOutcome::DeadlineElapsed { attempts: 4 });
    assert_eq!(reads.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn cancel_interrupts_sleep() {
    let policy = RetryPolicy::fixed(10, Duration::from_secs(60));
    let (handle, signal) = cancel_pair();

    let poller = async { policy.poll(Some(&signal), |_| async { None::<u64> }).await };
    let canceller = async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        handle.cancel();
    };
    let started = tokio::time::Instant::now();
    let (out, ()) = tokio::join!(poller, canceller);

    assert_eq!(out, PollOutcome::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn zero_retries_reads_once() {
    let policy = RetryPolicy::fixed(0, Duration::from_millis(500));
    let out: PollOutcome<u8> = policy.poll(None, |_| async { None }).await;
    assert_eq!(out, PollOutcome::Exhausted { attempts: 1 });
    let out = policy.poll(None, |_| async { Some(7u8) }).await;
    assert_eq!(out.ready(), Some(7));
}

#[test]
fn dropped_handle_is_not_cancellation() {
    let (handle, signal) = cancel_pair();
    drop(handle);
    assert!(!signal.is_cancelled());
}
