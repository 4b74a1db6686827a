use signal_hook::consts::{SIGHUP, SIGINT, SIGPIPE, SIGTERM};
use signal_hook::iterator::Signals;

/// What a delivered signal should make the main loop do (spec §4.1
/// "Signals: `SIGHUP` triggers a configuration refresh (§4.5); `SIGINT`/
/// `SIGTERM` exits the loop cleanly; `SIGPIPE` ignored.").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalEvent {
    Reload,
    Shutdown,
}

/// Spawns the background thread `signal-hook`'s iterator-based API
/// requires (it blocks on `sigwait`-style delivery) and forwards every
/// signal of interest onto an `smol::channel`, so the async executor
/// never has to poll anything but normal futures. `SIGPIPE` is
/// registered only so the default "terminate the process" disposition
/// never fires; its delivery is otherwise dropped on the floor.
pub fn spawn(events: smol::channel::Sender<SignalEvent>) -> anyhow::Result<()> {
    let mut signals = Signals::new(&[SIGHUP, SIGINT, SIGTERM, SIGPIPE])
        .map_err(|e| anyhow::anyhow!("registering signal handlers: {}", e))?;
    std::thread::spawn(move || {
        for signal in signals.forever() {
            let event = match signal {
                SIGHUP => Some(SignalEvent::Reload),
                SIGINT | SIGTERM => Some(SignalEvent::Shutdown),
                _ => None,
            };
            if let Some(event) = event {
                if smol::block_on(events.send(event)).is_err() {
                    // Receiver dropped: the main loop is already shutting down.
                    return;
                }
            }
        }
    });
    Ok(())
}
