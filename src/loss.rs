//! Simulated message loss in front of a [BatchTransport].
//!
//! This is a testing aid: it drops frames of selected frame types with a configured probability,
//!  so that NAK handling, re-sending and the other recovery mechanisms of the messaging layer can
//!  be exercised on a reliable network. The drop decisions come from a seeded generator, so a
//!  given configuration drops exactly the same frames in every run.
//!
//! Loss is applied per direction:
//! * receive: the delegate receives a batch, loss candidates are dropped from the received
//!    slots, and the survivors are moved to the front of the batch
//! * send: loss candidates are dropped *before* the delegate sees them, and the delegate sends
//!    only the survivors. Dropped frames are reported as sent.

use anyhow::bail;
use tracing::{debug, info, trace};
use crate::config::LossParams;
use crate::message_slot::MessageSlot;
use crate::random::DropGenerator;
use crate::transport::BatchTransport;
use crate::type_filter::{loss_candidate_type, LossDirection};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LossCounters {
    /// number of frames that went through loss injection, candidates or not
    pub frames_seen: u64,
    pub frames_dropped: u64,
    pub bytes_dropped: u64,
}

pub struct LossyTransport<T: BatchTransport> {
    delegate: T,
    params: LossParams,
    generator: DropGenerator,
    recv_counters: LossCounters,
    send_counters: LossCounters,
}

impl <T: BatchTransport> LossyTransport<T> {
    pub fn new(delegate: T, params: LossParams) -> anyhow::Result<LossyTransport<T>> {
        params.validate()?;
        Self::log_params("installing", &params);

        Ok(LossyTransport {
            delegate,
            generator: DropGenerator::new(params.rate, params.seed),
            params,
            recv_counters: LossCounters::default(),
            send_counters: LossCounters::default(),
        })
    }

    /// Replaces the parameters and starts a fresh drop sequence from the new seed. Counters are
    ///  reset. Invalid parameters leave the previous configuration in place.
    pub fn reinit(&mut self, params: LossParams) -> anyhow::Result<()> {
        params.validate()?;
        Self::log_params("re-initializing", &params);

        self.generator = DropGenerator::new(params.rate, params.seed);
        self.params = params;
        self.recv_counters = LossCounters::default();
        self.send_counters = LossCounters::default();
        Ok(())
    }

    fn log_params(what: &str, params: &LossParams) {
        info!("{} loss injection: rate={}, recv mask={:#x}, send mask={:#x}, seed={}",
            what, params.rate, params.recv_msg_type_mask, params.send_msg_type_mask, params.seed);
    }

    pub fn params(&self) -> &LossParams {
        &self.params
    }

    pub fn recv_counters(&self) -> &LossCounters {
        &self.recv_counters
    }

    pub fn send_counters(&self) -> &LossCounters {
        &self.send_counters
    }

    pub fn generator(&self) -> &DropGenerator {
        &self.generator
    }

    pub fn delegate(&self) -> &T {
        &self.delegate
    }

    pub fn delegate_mut(&mut self) -> &mut T {
        &mut self.delegate
    }

    /// removes loss injection, returning the wrapped transport
    pub fn into_inner(self) -> T {
        self.delegate
    }
}

impl <T: BatchTransport> BatchTransport for LossyTransport<T> {
    fn recv_batch(&mut self, batch: &mut [MessageSlot], bytes_received: &mut u64) -> anyhow::Result<usize> {
        let num_received = self.delegate.recv_batch(batch, bytes_received)?;
        if num_received > batch.len() {
            bail!("delegate reported {} received datagrams for a batch of {}", num_received, batch.len());
        }

        let (num_survivors, bytes_dropped) = apply_loss(
            &mut batch[..num_received],
            LossDirection::Receive.mask(&self.params),
            &mut self.generator,
            &mut self.recv_counters,
        );
        *bytes_received = bytes_received.saturating_sub(bytes_dropped);

        if num_survivors < num_received {
            debug!("dropped {} of {} received frames", num_received - num_survivors, num_received);
        }
        Ok(num_survivors)
    }

    /// Dropped frames count as sent: to the caller, simulated loss is indistinguishable from
    ///  loss on the network. They are moved to the front of the batch, and the delegate sends the
    ///  survivors behind them, so the returned count covers a prefix of the batch as usual.
    fn send_batch(&mut self, batch: &mut [MessageSlot], bytes_sent: &mut u64) -> anyhow::Result<usize> {
        let generator_before = self.generator.clone();
        let counters_before = self.send_counters.clone();

        let (num_survivors, bytes_dropped) = apply_loss(
            batch,
            LossDirection::Send.mask(&self.params),
            &mut self.generator,
            &mut self.send_counters,
        );
        let num_dropped = batch.len() - num_survivors;
        batch.rotate_left(num_survivors);

        if num_dropped > 0 {
            debug!("dropped {} of {} frames to be sent", num_dropped, batch.len());
        }
        if num_survivors == 0 {
            *bytes_sent += bytes_dropped;
            return Ok(batch.len());
        }

        match self.delegate.send_batch(&mut batch[num_dropped..], bytes_sent) {
            Ok(num_sent) => {
                *bytes_sent += bytes_dropped;
                Ok(num_dropped + num_sent.min(num_survivors))
            }
            Err(e) => {
                // a failed send leaves the drop sequence and the counters untouched
                self.generator = generator_before;
                self.send_counters = counters_before;
                Err(e)
            }
        }
    }
}

/// Makes a drop decision for every slot of `batch` and moves the survivors to the front, keeping
///  their relative order. Slots are swapped, never copied or modified, so dropped slots end up
///  behind the survivors in no particular order.
///
/// Only loss candidates consume a random draw. Returns the number of survivors and the number of
///  dropped bytes.
pub fn apply_loss(batch: &mut [MessageSlot], mask: u64, generator: &mut DropGenerator, counters: &mut LossCounters) -> (usize, u64) {
    let mut num_survivors = 0;
    let mut bytes_dropped = 0;

    for i in 0..batch.len() {
        let drop = match loss_candidate_type(batch[i].as_ref(), mask) {
            Some(frame_type) => {
                let drop = generator.should_drop();
                if drop {
                    trace!("dropping frame #{} of type {:#x} ({} bytes)", i, frame_type, batch[i].len());
                }
                drop
            }
            None => false,
        };

        if drop {
            bytes_dropped += batch[i].len() as u64;
        }
        else {
            if i != num_survivors {
                batch.swap(num_survivors, i);
            }
            num_survivors += 1;
        }
    }

    counters.frames_seen += batch.len() as u64;
    counters.frames_dropped += (batch.len() - num_survivors) as u64;
    counters.bytes_dropped += bytes_dropped;

    (num_survivors, bytes_dropped)
}
