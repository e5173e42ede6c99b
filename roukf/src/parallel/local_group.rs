use crossbeam::channel::{unbounded, Receiver, Sender};

use super::Communicator;
use crate::error::{FilterError, Result};
use crate::operators::PointOutcome;

type Batch<T> = Vec<PointOutcome<T>>;

/// One rank of an in-process communicator group.
///
/// Each ordered pair of ranks shares its own channel, so the i-th gather
/// on one rank always pairs with the i-th gather on every other rank.
/// Ranks are usually moved onto their own threads, one filter each.
pub struct LocalRank<T> {
    rank: usize,
    size: usize,
    outgoing: Vec<Option<Sender<Batch<T>>>>,
    incoming: Vec<Option<Receiver<Batch<T>>>>,
}

impl<T: Clone + Send> LocalRank<T> {
    /// Create a fully connected group of `size` ranks, ordered by rank.
    pub fn group(size: usize) -> Vec<LocalRank<T>> {
        let size = size.max(1);
        let mut outgoing: Vec<Vec<Option<Sender<Batch<T>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut incoming: Vec<Vec<Option<Receiver<Batch<T>>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();

        for from in 0..size {
            for to in 0..size {
                if from != to {
                    let (tx, rx) = unbounded();
                    outgoing[from][to] = Some(tx);
                    incoming[to][from] = Some(rx);
                }
            }
        }

        outgoing
            .into_iter()
            .zip(incoming)
            .enumerate()
            .map(|(rank, (outgoing, incoming))| LocalRank {
                rank,
                size,
                outgoing,
                incoming,
            })
            .collect()
    }
}

impl<T: Clone + Send> Communicator<T> for LocalRank<T> {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn all_gather(&self, local: Batch<T>) -> Result<Batch<T>> {
        for (peer, tx) in self.outgoing.iter().enumerate() {
            if let Some(tx) = tx {
                tx.send(local.clone()).map_err(|_| {
                    FilterError::Communication(format!("rank {peer} has left the group"))
                })?;
            }
        }

        let mut gathered = local;
        for (peer, rx) in self.incoming.iter().enumerate() {
            if let Some(rx) = rx {
                let batch = rx.recv().map_err(|_| {
                    FilterError::Communication(format!("rank {peer} has left the group"))
                })?;
                gathered.extend(batch);
            }
        }
        Ok(gathered)
    }
}
