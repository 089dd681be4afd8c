//! In-process multi-rank communicator backed by crossbeam channels.

use conduction_core::{CommError, Communicator};
use crossbeam_channel::{Receiver, Sender};

/// One rank of a threaded group.
///
/// Created in batches by [`ThreadComm::group`]. Each ordered pair of ranks
/// `(src, dst)` owns a dedicated unbounded channel, so sends never block
/// and messages between a pair arrive in send order, which is the ordering
/// contract [`Communicator`] requires.
pub struct ThreadComm {
    rank: usize,
    size: usize,
    /// `outbox[dst]` sends to rank `dst`.
    outbox: Vec<Sender<Vec<f64>>>,
    /// `inbox[src]` receives from rank `src`.
    inbox: Vec<Receiver<Vec<f64>>>,
}

impl ThreadComm {
    /// Build a fully connected group of `size` ranks.
    ///
    /// The returned vector is indexed by rank. Each element is meant to be
    /// moved onto its own thread.
    pub fn group(size: usize) -> Vec<ThreadComm> {
        let mut outboxes: Vec<Vec<Sender<Vec<f64>>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut inboxes: Vec<Vec<Receiver<Vec<f64>>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();

        for outbox in outboxes.iter_mut() {
            for inbox in inboxes.iter_mut() {
                let (tx, rx) = crossbeam_channel::unbounded();
                outbox.push(tx);
                inbox.push(rx);
            }
        }

        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(rank, (outbox, inbox))| ThreadComm {
                rank,
                size,
                outbox,
                inbox,
            })
            .collect()
    }

    fn check_rank(&self, rank: usize) -> Result<(), CommError> {
        if rank < self.size {
            Ok(())
        } else {
            Err(CommError::InvalidRank {
                rank,
                size: self.size,
            })
        }
    }
}

impl std::fmt::Debug for ThreadComm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadComm")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn send(&self, dest: usize, payload: Vec<f64>) -> Result<(), CommError> {
        self.check_rank(dest)?;
        self.outbox[dest]
            .send(payload)
            .map_err(|_| CommError::Disconnected { peer: dest })
    }

    fn recv(&self, source: usize) -> Result<Vec<f64>, CommError> {
        self.check_rank(source)?;
        self.inbox[source]
            .recv()
            .map_err(|_| CommError::Disconnected { peer: source })
    }
}

/// Run `f` on every rank of a fresh `size`-rank group, one scoped thread
/// per rank, and return the results indexed by rank.
///
/// A panic on any rank is resumed on the calling thread after all ranks
/// have been joined.
pub fn run_threaded<F, R>(size: usize, f: F) -> Vec<R>
where
    F: Fn(ThreadComm) -> R + Sync,
    R: Send,
{
    log::debug!("spawning threaded communicator group of {size} ranks");
    let f = &f;
    std::thread::scope(|scope| {
        let handles: Vec<_> = ThreadComm::group(size)
            .into_iter()
            .map(|comm| scope.spawn(move || f(comm)))
            .collect();

        let mut results = Vec::with_capacity(size);
        let mut panic = None;
        for handle in handles {
            match handle.join() {
                Ok(r) => results.push(r),
                Err(payload) => {
                    panic.get_or_insert(payload);
                }
            }
        }
        if let Some(payload) = panic {
            std::panic::resume_unwind(payload);
        }
        results
    })
}
