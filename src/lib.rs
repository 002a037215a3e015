//! Simulated message loss for batched UDP transports.
//!
//! Recovery mechanisms of a messaging protocol (NAKs, re-sending, gap filling) are hard to test
//!  on a network that does not lose packets. This crate puts a loss-injecting decorator in front
//!  of a batched datagram transport that drops frames of selected types with a configured
//!  probability - deterministically, so that a test run can be reproduced exactly.
//!
//! ## Overview
//!
//! * [transport::BatchTransport] is the abstraction for batched datagram I/O in the style of
//!    `recvmmsg` / `sendmmsg`, with [transport::UdpBatchTransport] doing the actual socket I/O
//! * [loss::LossyTransport] wraps any `BatchTransport`, dropping frames on receive and / or send
//! * [config::LossParams] holds the configuration: drop rate, a frame type mask per direction
//!    and the random seed
//! * [bindings] chooses between the direct and the lossy transport when a transport is set up
//!
//! ## Frames
//!
//! Every datagram holds a frame starting with a common header - all numbers little endian:
//!
//! ```ascii
//! 0: frame length (i32)
//! 4: version (u8)
//! 5: flags (u8)
//! 6: frame type (u16)
//! ```
//!
//! Loss injection reads only the frame type. A frame of type `t` is a *loss candidate* if bit
//!  `t` is set in the mask for the direction it travels; everything else passes untouched.
//!
//! ## Determinism
//!
//! Each loss candidate consumes exactly one value from a 48-bit linear congruential generator
//!  (see [random::Drand48]) seeded from the configuration. The sequence of drop decisions depends
//!  only on the seed and on the number of candidates seen before - not on how frames are
//!  distributed across batches, and not on frames that are not candidates. Rates of exactly 0
//!  and 1 do not consume random values at all.
//!
//! ## Example
//!
//! ```no_run
//! use std::net::SocketAddr;
//! use udp_transport_loss::bindings;
//! use udp_transport_loss::message_slot::MessageSlot;
//! use udp_transport_loss::transport::{BatchTransport, UdpBatchTransport};
//!
//! # fn example() -> anyhow::Result<()> {
//! let socket = UdpBatchTransport::bind(SocketAddr::from(([127,0,0,1], 0)))?;
//!
//! // drop roughly half of all received DATA frames
//! let mut transport = bindings::from_loss_args(socket, Some("rate=0.5|recv-msg-mask=0x2|seed=23764"))?;
//!
//! let mut batch = MessageSlot::batch(16, 1472);
//! let mut bytes_received = 0;
//! let num_received = transport.recv_batch(&mut batch, &mut bytes_received)?;
//! for slot in &batch[..num_received] {
//!     println!("received {} bytes from {:?}", slot.len(), slot.addr());
//! }
//! # Ok(())
//! # }
//! ```

pub mod bindings;
pub mod config;
pub mod frame_header;
pub mod loss;
pub mod message_slot;
pub mod random;
pub mod transport;
pub mod type_filter;
