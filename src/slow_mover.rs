//! Throttled cursor movement
//!
//! Some applications ignore a cursor that teleports. When slow movement is
//! enabled, targets are queued on a background thread that steps the cursor
//! toward each one by at most `max_step` pixels per axis per tick, and
//! performs queued clicks once the preceding moves have arrived.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::host::Pointer;
use crate::types::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Move(Point),
    Click,
    /// Wait, then release the button (end of a drag)
    Release(Duration),
}

#[derive(Debug, Clone, Copy)]
pub struct MoverSettings {
    /// Maximum distance per axis per tick
    pub max_step: u32,
    pub tick: Duration,
    pub click_hold: Duration,
}

pub struct SlowMover {
    sender: Option<Sender<Target>>,
    handle: Option<JoinHandle<()>>,
}

impl SlowMover {
    /// Spawn the movement thread
    pub fn spawn(pointer: Arc<dyn Pointer>, settings: MoverSettings) -> Self {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::spawn(move || {
            info!(max_step = settings.max_step, tick_ms = settings.tick.as_millis() as u64, "Slow mover started");
            run(pointer.as_ref(), receiver, settings);
            debug!("Slow mover stopped");
        });
        Self {
            sender: Some(sender),
            handle: Some(handle),
        }
    }

    pub fn move_to(&self, point: Point) {
        self.submit(Target::Move(point));
    }

    pub fn click(&self) {
        self.submit(Target::Click);
    }

    pub fn release_after(&self, delay: Duration) {
        self.submit(Target::Release(delay));
    }

    fn submit(&self, target: Target) {
        if let Some(sender) = &self.sender
            && sender.send(target).is_err()
        {
            error!(target = ?target, "Slow mover thread is gone, dropping target");
        }
    }

    /// Let queued targets drain, then stop the thread
    pub fn finish(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            error!("Slow mover thread panicked");
        }
    }
}

impl Drop for SlowMover {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Clamp `distance` to `[-max, max]`
fn clamp_step(distance: i32, max: u32) -> i32 {
    let max = i32::try_from(max).unwrap_or(i32::MAX);
    distance.clamp(-max, max)
}

/// Next cursor position on the way from `current` to `target`, or `None` once
/// there
pub fn next_step(current: Point, target: Point, max_step: u32) -> Option<Point> {
    let dx = clamp_step(target.x - current.x, max_step);
    let dy = clamp_step(target.y - current.y, max_step);
    if dx == 0 && dy == 0 {
        None
    } else {
        Some(Point::new(current.x + dx, current.y + dy))
    }
}

/// Queue loop: block while idle, tick while busy, exit once the sender is
/// dropped and the queue is empty
fn run(pointer: &dyn Pointer, receiver: Receiver<Target>, settings: MoverSettings) {
    let mut queue: VecDeque<Target> = VecDeque::new();
    let mut last_position: Option<Point> = None;
    let mut connected = true;

    loop {
        if queue.is_empty() {
            if !connected {
                return;
            }
            match receiver.recv() {
                Ok(target) => queue.push_back(target),
                Err(_) => return,
            }
        }

        // Pick up everything submitted since the last tick
        while connected {
            match receiver.recv_timeout(Duration::ZERO) {
                Ok(target) => queue.push_back(target),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => connected = false,
            }
        }

        let Some(&target) = queue.front() else {
            continue;
        };

        match target {
            Target::Click => {
                if let Err(err) = pointer.click(settings.click_hold) {
                    error!(error = ?err, "Slow click failed");
                }
                queue.pop_front();
                last_position = None;
            }
            Target::Release(delay) => {
                thread::sleep(delay);
                if let Err(err) = pointer.release() {
                    error!(error = ?err, "Slow release failed");
                }
                queue.pop_front();
                last_position = None;
            }
            Target::Move(point) => {
                let current = match pointer.position() {
                    Ok(current) => current,
                    Err(err) => {
                        error!(error = ?err, "Cannot read cursor position, dropping target");
                        queue.pop_front();
                        continue;
                    }
                };
                match next_step(current, point, settings.max_step) {
                    None => {
                        queue.pop_front();
                        last_position = None;
                    }
                    // The cursor did not move since the last step (clamped at a
                    // screen edge, or grabbed): give up on this target
                    Some(_) if last_position == Some(current) => {
                        warn!(x = point.x, y = point.y, "Cursor stuck, abandoning target");
                        queue.pop_front();
                        last_position = None;
                    }
                    Some(step) => {
                        if let Err(err) = pointer.move_to(step) {
                            error!(error = ?err, "Slow move failed, dropping target");
                            queue.pop_front();
                            last_position = None;
                            continue;
                        }
                        last_position = Some(current);
                        thread::sleep(settings.tick);
                    }
                }
            }
        }
    }
}
