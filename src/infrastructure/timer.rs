use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashSet},
    io,
    sync::atomic::{AtomicU64, Ordering},
    thread::{self, JoinHandle},
    time::Duration,
};

use coarsetime::Instant;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, trace};

use crate::packet::SequenceNumber;

/// Identifies one arming of a retransmission timer.
///
/// Every call to `arm` hands out a new generation, so an expiry can always be matched against
/// the timer that is currently stored in a slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId {
    sequence: SequenceNumber,
    generation: u64,
}

impl TimerId {
    /// Creates a timer id.
    pub fn new(sequence: SequenceNumber, generation: u64) -> Self {
        TimerId {
            sequence,
            generation,
        }
    }

    /// Returns the sequence number the timer protects.
    pub fn sequence(&self) -> SequenceNumber {
        self.sequence
    }
}

/// Arms and disarms retransmission timers.
pub trait RetransmitScheduler {
    /// Arms a timer that expires `after` from now.
    fn arm(&self, sequence: SequenceNumber, after: Duration) -> TimerId;

    /// Disarms a timer. Its expiry will not be delivered.
    fn cancel(&self, id: TimerId);
}

#[derive(Debug)]
enum TimerCommand {
    Arm { id: TimerId, deadline: Instant },
    Cancel(TimerId),
}

/// Handle used to arm and cancel timers on a `TimerWorker`.
///
/// Both operations only enqueue a command and never block, so they are safe to call while a
/// window lock is held. Dropping the handle stops the worker.
#[derive(Debug)]
pub struct RetransmitTimers {
    commands: Sender<TimerCommand>,
    generation: AtomicU64,
}

impl RetransmitTimers {
    /// Creates a handle together with the worker that delivers the expiries.
    pub fn new() -> (RetransmitTimers, TimerWorker) {
        let (commands, receiver) = unbounded();
        (
            RetransmitTimers {
                commands,
                generation: AtomicU64::new(0),
            },
            TimerWorker {
                commands: receiver,
                pending: BinaryHeap::new(),
                armed: HashSet::new(),
            },
        )
    }
}

impl RetransmitScheduler for RetransmitTimers {
    fn arm(&self, sequence: SequenceNumber, after: Duration) -> TimerId {
        let id = TimerId::new(sequence, self.generation.fetch_add(1, Ordering::Relaxed));
        let deadline = Instant::now() + coarsetime::Duration::from(after);
        if self.commands.send(TimerCommand::Arm { id, deadline }).is_err() {
            debug!("Timer worker is gone, timer for packet {} not armed", sequence);
        }
        id
    }

    fn cancel(&self, id: TimerId) {
        // a worker that is gone has nothing left to cancel
        let _ = self.commands.send(TimerCommand::Cancel(id));
    }
}

/// Background side of `RetransmitTimers`: keeps the deadlines and reports expiries.
#[derive(Debug)]
pub struct TimerWorker {
    commands: Receiver<TimerCommand>,
    // cancelled timers stay in here until their deadline passes, `armed` decides if they fire
    pending: BinaryHeap<Reverse<(Instant, TimerId)>>,
    armed: HashSet<TimerId>,
}

impl TimerWorker {
    /// Runs the worker on its own thread, calling `on_expire` for every timer that runs out.
    ///
    /// The thread exits once the `RetransmitTimers` handle is dropped.
    pub fn spawn<F>(self, on_expire: F) -> io::Result<JoinHandle<()>>
    where
        F: FnMut(TimerId) + Send + 'static,
    {
        thread::Builder::new()
            .name("rdt-retransmit".into())
            .spawn(move || self.run(on_expire))
    }

    fn run<F: FnMut(TimerId)>(mut self, mut on_expire: F) {
        loop {
            self.fire_expired(Instant::now(), &mut on_expire);

            let command = match self.next_deadline() {
                Some(deadline) => {
                    let now = Instant::now();
                    let wait = if deadline > now {
                        deadline.duration_since(now).into()
                    } else {
                        Duration::ZERO
                    };
                    match self.commands.recv_timeout(wait) {
                        Ok(command) => command,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match self.commands.recv() {
                    Ok(command) => command,
                    Err(_) => break,
                },
            };
            self.apply(command);
        }
        trace!("Retransmit timer worker stopped");
    }

    fn apply(&mut self, command: TimerCommand) {
        match command {
            TimerCommand::Arm { id, deadline } => {
                self.armed.insert(id);
                self.pending.push(Reverse((deadline, id)));
            }
            TimerCommand::Cancel(id) => {
                self.armed.remove(&id);
            }
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.pending.peek().map(|Reverse((deadline, _))| *deadline)
    }

    fn fire_expired<F: FnMut(TimerId)>(&mut self, now: Instant, on_expire: &mut F) {
        while let Some(Reverse((deadline, id))) = self.pending.peek().copied() {
            if deadline > now {
                break;
            }
            self.pending.pop();
            if self.armed.remove(&id) {
                on_expire(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crossbeam_channel::unbounded;

    use super::{RetransmitScheduler, RetransmitTimers};

    #[test]
    fn armed_timer_fires() {
        let (timers, worker) = RetransmitTimers::new();
        let (tx, rx) = unbounded();
        worker
            .spawn(move |id| {
                let _ = tx.send(id);
            })
            .unwrap();

        let id = timers.arm(4, Duration::from_millis(20));

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(id));
        assert_eq!(id.sequence(), 4);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let (timers, worker) = RetransmitTimers::new();
        let (tx, rx) = unbounded();
        worker
            .spawn(move |id| {
                let _ = tx.send(id);
            })
            .unwrap();

        let cancelled = timers.arm(1, Duration::from_millis(30));
        timers.cancel(cancelled);
        let kept = timers.arm(2, Duration::from_millis(60));

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(kept));
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn timers_fire_in_deadline_order() {
        let (timers, worker) = RetransmitTimers::new();
        let (tx, rx) = unbounded();
        worker
            .spawn(move |id| {
                let _ = tx.send(id);
            })
            .unwrap();

        let late = timers.arm(1, Duration::from_millis(120));
        let early = timers.arm(2, Duration::from_millis(20));

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(early));
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)), Ok(late));
    }

    #[test]
    fn every_arm_gets_a_new_generation() {
        let (timers, _worker) = RetransmitTimers::new();
        let first = timers.arm(1, Duration::from_secs(1));
        let second = timers.arm(1, Duration::from_secs(1));

        assert_ne!(first, second);
        assert_eq!(first.sequence(), second.sequence());
    }

    #[test]
    fn worker_stops_when_handle_is_dropped() {
        let (timers, worker) = RetransmitTimers::new();
        let handle = worker.spawn(|_| {}).unwrap();

        timers.arm(1, Duration::from_secs(60));
        drop(timers);

        assert!(handle.join().is_ok());
    }
}
