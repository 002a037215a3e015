//! A batch of datagrams is represented as a caller-owned slice of `MessageSlot`s, one per
//!  datagram. Their salient points are:
//!
//! * backed by a fixed-capacity, pre-allocated buffer that is reused across batches
//! * a length marking the part of the buffer that holds the datagram
//! * the peer address: the source after receiving, the destination for sending
//! * implement `BufMut` to fit into the `bytes` ecosystem
//!
//! Loss injection relocates slots inside their batch but never touches a slot's content.

use std::fmt::{Debug, Formatter};
use std::net::SocketAddr;
use bytes::buf::UninitSlice;

#[derive(Eq)]
pub struct MessageSlot {
    buf: Vec<u8>,
    len: usize,
    addr: Option<SocketAddr>,
}
impl MessageSlot {
    /// create a new, empty slot with the given buffer capacity
    pub fn new(capacity: usize) -> MessageSlot {
        MessageSlot {
            // slots are reused for every batch, so there is nothing to be gained from lazy
            //  initialization
            buf: vec![0; capacity],
            len: 0,
            addr: None,
        }
    }

    /// create a slot holding a copy of `data` that is addressed to `to`
    pub fn for_datagram(capacity: usize, data: &[u8], to: SocketAddr) -> MessageSlot {
        let mut result = MessageSlot::new(capacity);
        bytes::BufMut::put_slice(&mut result, data);
        result.addr = Some(to);
        result
    }

    /// create a batch of `vlen` empty slots
    pub fn batch(vlen: usize, capacity: usize) -> Vec<MessageSlot> {
        (0..vlen)
            .map(|_| MessageSlot::new(capacity))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// make the entire underlying buffer available through as_mut(), e.g. for receiving
    pub fn maximize_len(&mut self) {
        self.len = self.capacity();
    }

    pub fn truncate(&mut self, len: usize) {
        assert!(len <= self.capacity());
        self.len = len;
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.addr = None;
    }

    pub fn addr(&self) -> Option<SocketAddr> {
        self.addr
    }

    pub fn set_addr(&mut self, addr: Option<SocketAddr>) {
        self.addr = addr;
    }
}

impl PartialEq for MessageSlot {
    fn eq(&self, other: &Self) -> bool {
        self.as_ref().eq(other.as_ref()) && self.addr == other.addr
    }
}

impl Debug for MessageSlot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageSlot")
            .field("addr", &self.addr)
            .field("data", &self.as_ref())
            .finish()
    }
}

impl AsRef<[u8]> for MessageSlot {
    fn as_ref(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}
impl AsMut<[u8]> for MessageSlot {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.buf[..self.len]
    }
}

unsafe impl bytes::BufMut for MessageSlot {
    fn remaining_mut(&self) -> usize {
        self.capacity() - self.len
    }

    unsafe fn advance_mut(&mut self, cnt: usize) {
        assert!(self.len + cnt <= self.capacity(), "advancing beyond slot capacity");
        self.len += cnt;
    }

    fn chunk_mut(&mut self) -> &mut UninitSlice {
        UninitSlice::new(&mut self.buf[self.len..])
    }
}
