//! Basic usage example for the timer registry

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use timer_registry::{CancellationToken, Duration, TimerMode, TimerRegistry};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let cancel_token = CancellationToken::new();
    let registry = TimerRegistry::new("example_registry".to_string(), cancel_token.clone());

    // A repeating timer that stops on its own after three firings
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = ticks.clone();
    registry.create(
        Some("countdown"),
        Duration::from_secs(1),
        TimerMode::Repeating(3),
        move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            println!("Countdown tick {}", n);
        },
    )?;

    // A one-shot timer that is paused and resumed
    registry.create(
        Some("reminder"),
        Duration::from_secs(5),
        TimerMode::OneShot,
        || println!("Reminder fired!"),
    )?;

    // An untracked fire-and-forget timer
    registry.simple(Duration::from_millis(500), || println!("Simple timer fired!"))?;

    println!("Timers set! 'reminder' has {}s left", registry.time_left("reminder"));

    tokio::time::sleep(Duration::from_secs(2)).await;
    registry.pause("reminder");
    println!("Reminder paused");

    tokio::time::sleep(Duration::from_secs(1)).await;
    registry.resume("reminder")?;
    println!("Reminder resumed, fires again in about 2s");

    while registry.exists("countdown") || registry.exists("reminder") {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    println!("Countdown fired {} times", ticks.load(Ordering::SeqCst));

    // Demonstrate cancellation
    registry.create(
        Some("cancelled_timer"),
        Duration::from_secs(10),
        TimerMode::Repeating(0),
        || println!("This should never print"),
    )?;
    println!("Set a timer that will be cancelled...");

    tokio::time::sleep(Duration::from_millis(100)).await;
    registry.remove("cancelled_timer");
    println!("Timer cancelled!");

    // Shutdown gracefully
    registry.shutdown();
    println!("Timer registry shut down successfully!");
    Ok(())
}
