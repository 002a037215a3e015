use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use anyhow::bail;
#[cfg(test)] use mockall::automock;
use tracing::{trace, warn};
use crate::message_slot::MessageSlot;

/// This is the abstraction for batched datagram I/O, i.e. the equivalent of `recvmmsg` and
///  `sendmmsg`. It is the seam where loss injection is plugged in: [crate::loss::LossyTransport]
///  wraps any other implementation.
///
/// Both operations take a caller-owned batch and return the number of slots that were
///  processed. These are always the first slots of the batch. A failed call returns an error
///  and leaves the byte count untouched.
#[cfg_attr(test, automock)]
pub trait BatchTransport: Send {
    /// Fill up to `batch.len()` slots with received datagrams, setting each slot's length and
    ///  source address. The number of received bytes is *added* to `bytes_received`.
    fn recv_batch(&mut self, batch: &mut [MessageSlot], bytes_received: &mut u64) -> anyhow::Result<usize>;

    /// Send the slots of `batch` to their respective addresses, returning the number of slots
    ///  that were sent. The number of sent bytes is *added* to `bytes_sent`.
    fn send_batch(&mut self, batch: &mut [MessageSlot], bytes_sent: &mut u64) -> anyhow::Result<usize>;
}

impl <T: BatchTransport + ?Sized> BatchTransport for Box<T> {
    fn recv_batch(&mut self, batch: &mut [MessageSlot], bytes_received: &mut u64) -> anyhow::Result<usize> {
        self.as_mut().recv_batch(batch, bytes_received)
    }

    fn send_batch(&mut self, batch: &mut [MessageSlot], bytes_sent: &mut u64) -> anyhow::Result<usize> {
        self.as_mut().send_batch(batch, bytes_sent)
    }
}


/// Direct transport on a non-blocking UDP socket. A batch ends when it is full or when the
///  socket would block.
pub struct UdpBatchTransport {
    socket: UdpSocket,
}

impl UdpBatchTransport {
    pub fn new(socket: UdpSocket) -> anyhow::Result<UdpBatchTransport> {
        socket.set_nonblocking(true)?;
        Ok(UdpBatchTransport { socket })
    }

    pub fn bind(addr: SocketAddr) -> anyhow::Result<UdpBatchTransport> {
        Self::new(UdpSocket::bind(addr)?)
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// An error on the first slot fails the batch, a later error ends it with the slots
    ///  processed so far.
    fn end_of_batch(op: &str, num_done: usize, e: std::io::Error) -> anyhow::Result<usize> {
        if e.kind() == ErrorKind::WouldBlock {
            return Ok(num_done);
        }
        if num_done == 0 {
            return Err(e.into());
        }
        warn!("UDP socket: {} failed after {} datagrams, ending batch: {}", op, num_done, e);
        Ok(num_done)
    }
}

impl BatchTransport for UdpBatchTransport {
    fn recv_batch(&mut self, batch: &mut [MessageSlot], bytes_received: &mut u64) -> anyhow::Result<usize> {
        let mut num_received = 0;
        let mut num_bytes = 0;

        for slot in batch.iter_mut() {
            slot.maximize_len();
            match self.socket.recv_from(slot.as_mut()) {
                Ok((len, from)) => {
                    slot.truncate(len);
                    slot.set_addr(Some(from));
                    trace!("UDP socket: received {} bytes from {:?}", len, from);
                    num_received += 1;
                    num_bytes += len as u64;
                }
                Err(e) => {
                    slot.clear();
                    let result = Self::end_of_batch("receive", num_received, e);
                    if result.is_ok() {
                        *bytes_received += num_bytes;
                    }
                    return result;
                }
            }
        }

        *bytes_received += num_bytes;
        Ok(num_received)
    }

    fn send_batch(&mut self, batch: &mut [MessageSlot], bytes_sent: &mut u64) -> anyhow::Result<usize> {
        let mut num_sent = 0;
        let mut num_bytes = 0;

        for slot in batch.iter() {
            let Some(to) = slot.addr() else {
                if num_sent == 0 {
                    bail!("slot has no destination address");
                }
                warn!("UDP socket: slot #{} has no destination address, ending batch", num_sent);
                break;
            };

            match self.socket.send_to(slot.as_ref(), to) {
                Ok(len) => {
                    trace!("UDP socket: sent {} bytes to {:?}", len, to);
                    num_sent += 1;
                    num_bytes += len as u64;
                }
                Err(e) => {
                    let result = Self::end_of_batch("send", num_sent, e);
                    if result.is_ok() {
                        *bytes_sent += num_bytes;
                    }
                    return result;
                }
            }
        }

        *bytes_sent += num_bytes;
        Ok(num_sent)
    }
}
