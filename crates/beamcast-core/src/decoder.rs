//! Belief-propagation decoder and session controller.
//!
//! The decoder consumes packets in whatever order the camera delivers them
//! and maintains one invariant above all others: its state depends only on
//! the *set* of distinct packets received, never on their order. Three
//! properties combine to guarantee that: the pending-constraint list has set
//! semantics, every symbol's neighbour set is re-derived from its id alone,
//! and XOR is associative and commutative.
//!
//! Decoding interleaves two mechanisms. Belief propagation reduces each
//! pending XOR constraint against the blocks already known, peeling any
//! constraint that drops to a single unknown; each peel can cascade through
//! the rest of the list. When peeling stalls, the parity pre-code takes
//! over: any parity group with exactly one unknown member is a solved
//! equation, and each block it recovers re-energises propagation.
//!
//! # State machine
//!
//! ```text
//!  Empty ──first packet──▶ SessionBound(K′, B)
//!  SessionBound ──metadata packet──▶ Metadated(K, parity map)
//!  Metadated ──data packets──▶ Metadated (blocks fill in)
//!  Metadated ──solvedSource == K──▶ Complete
//!  any state ──foreign sessionId──▶ (NewSession returned, caller resets)
//! ```

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use tracing::{debug, trace, warn};

use beamcast_proto::{Packet, TransferMetadata};

use crate::{
    block,
    error::DecoderError,
    precode,
    symbol::{self, METADATA_SYMBOL_ID},
};

/// Outcome of feeding one captured frame to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receive {
    /// Packet consumed (it may or may not have advanced decoding)
    Accepted,
    /// Symbol id already seen; no state change
    Duplicate,
    /// Packet belongs to a different session; caller must `reset()` and
    /// re-feed this packet
    NewSession,
    /// Packet failed to parse and was dropped
    Rejected,
}

/// Running counters exposed to the host UI.
///
/// Survives [`Decoder::reset`], so a display can keep totals across session
/// restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Frames handed to `receive`, including rejected ones
    pub packets: u64,
    /// Frames dropped by the framer (truncation, bad version)
    pub parse_failures: u64,
    /// Frames whose symbol id was already seen
    pub duplicates: u64,
    /// Metadata payloads that failed to parse
    pub metadata_rejects: u64,
    /// Constraints that reduced to nothing new
    pub redundant_constraints: u64,
}

/// Upper bound on the intermediate-block count the decoder will allocate.
///
/// At the default 200-byte blocks this is a 200 MB transfer, an order of
/// magnitude beyond what a screen-to-camera link can move in reasonable
/// time. Packets advertising more are treated as garbage: without a bound,
/// one corrupt header could make the receiver allocate gigabytes.
pub const MAX_INTERMEDIATE_BLOCKS: u32 = 1 << 20;

/// One pending XOR equation: `payload = ⊕ blocks[indices]`.
///
/// Constraints shrink in place as blocks become known; an empty index set
/// means the constraint carried no new information.
struct Constraint {
    indices: Vec<u32>,
    payload: Vec<u8>,
}

/// Rateless decoder for a single transfer session.
///
/// Constructed empty; the first parsed packet binds the session (id, K′,
/// block size) and the first accepted metadata packet names the file and
/// enables parity recovery.
///
/// # Invariants
///
/// - Block slots are write-once: a decoded block is never rewritten.
/// - `solved_source`/`solved_total` always equal the number of `Some`
///   entries in the source prefix / whole block array.
/// - Output state is a function of the set of distinct packets received.
#[derive(Default)]
pub struct Decoder {
    session_id: Option<u32>,
    block_size: u16,
    k: Option<u32>,
    k_prime: u32,
    parity_map: Option<Vec<Vec<u32>>>,
    metadata: Option<TransferMetadata>,
    blocks: Vec<Option<Vec<u8>>>,
    solved_source: u32,
    solved_total: u32,
    seen: HashSet<u32>,
    pending: Vec<Constraint>,
    stats: DecoderStats,
}

impl Decoder {
    /// Create an empty decoder, bound to no session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one captured frame.
    ///
    /// All parse and integrity problems are absorbed and counted; the only
    /// outcome demanding host action is [`Receive::NewSession`], after which
    /// the host calls [`Decoder::reset`] and feeds the same bytes again.
    pub fn receive(&mut self, bytes: &[u8]) -> Receive {
        self.stats.packets += 1;

        let packet = match Packet::decode(bytes) {
            Ok(packet) => packet,
            Err(err) => {
                self.stats.parse_failures += 1;
                warn!(%err, "dropping unparseable frame");
                return Receive::Rejected;
            },
        };

        if let Some(bound) = self.session_id {
            if bound != packet.header.session_id() {
                debug!(
                    bound = format_args!("{bound:#010x}"),
                    incoming = format_args!("{:#010x}", packet.header.session_id()),
                    "foreign session id; handing control back to the host"
                );
                return Receive::NewSession;
            }
            if packet.header.block_size() != self.block_size {
                // Same session id, different block size: nothing sane can
                // be XORed out of it.
                self.stats.parse_failures += 1;
                return Receive::Rejected;
            }
        } else {
            if packet.header.k_prime() > MAX_INTERMEDIATE_BLOCKS {
                self.stats.parse_failures += 1;
                warn!(k_prime = packet.header.k_prime(), "implausible block count; dropping");
                return Receive::Rejected;
            }
            self.bind_session(&packet);
        }

        if packet.header.is_metadata() {
            return self.receive_metadata(&packet);
        }

        let id = packet.header.symbol_id();
        if id == METADATA_SYMBOL_ID {
            // Data flag with the reserved metadata id: not a decodable
            // constraint, and not worth poisoning the seen-set over.
            self.stats.parse_failures += 1;
            return Receive::Rejected;
        }

        if !self.seen.insert(id) {
            self.stats.duplicates += 1;
            return Receive::Duplicate;
        }

        let indices = symbol::neighbours(packet.header.session_id(), id, self.k_prime);
        self.pending.push(Constraint { indices, payload: packet.payload.to_vec() });

        self.propagate();
        Receive::Accepted
    }

    /// Bind session parameters from the first parsed packet.
    fn bind_session(&mut self, packet: &Packet) {
        let header = &packet.header;
        self.session_id = Some(header.session_id());
        self.k_prime = header.k_prime().max(1);
        self.block_size = header.block_size();
        self.blocks = vec![None; self.k_prime as usize];

        debug!(
            session_id = format_args!("{:#010x}", header.session_id()),
            k_prime = self.k_prime,
            block_size = self.block_size,
            "session bound"
        );
    }

    /// Handle a metadata packet: parse, adopt, reconcile K′.
    fn receive_metadata(&mut self, packet: &Packet) -> Receive {
        let id = packet.header.symbol_id();

        if self.seen.contains(&id) {
            self.stats.duplicates += 1;
            return Receive::Duplicate;
        }

        if self.metadata.is_some() {
            // Already have it (under another symbol id); nothing to do.
            return Receive::Accepted;
        }

        let metadata = match TransferMetadata::decode(&packet.payload) {
            Ok(metadata)
                if metadata.source_blocks > 0
                    && metadata.source_blocks <= MAX_INTERMEDIATE_BLOCKS =>
            {
                metadata
            },
            Ok(_) | Err(_) => {
                // Leave the id unseen: metadata is retransmitted
                // periodically and the next copy may survive the channel.
                self.stats.metadata_rejects += 1;
                warn!("dropping malformed metadata payload");
                return Receive::Accepted;
            },
        };

        self.seen.insert(id);
        self.adopt_metadata(metadata);
        self.propagate();
        Receive::Accepted
    }

    /// Adopt parsed metadata: fix K, rebuild the parity map, and reconcile
    /// the block store with the canonical K′.
    fn adopt_metadata(&mut self, metadata: TransferMetadata) {
        let k = metadata.source_blocks;
        let map = precode::parity_map(k);
        let canonical_k_prime = k + map.len() as u32;

        if canonical_k_prime != self.k_prime {
            debug!(
                advertised = self.k_prime,
                canonical = canonical_k_prime,
                "reallocating block store to the canonical intermediate count"
            );
            self.blocks.resize(canonical_k_prime as usize, None);
            self.k_prime = canonical_k_prime;

            // Constraints minted against the stale K′ reference equations
            // that no longer exist; they cannot be reconciled.
            let before = self.pending.len();
            self.pending.retain(|c| c.indices.iter().all(|&i| i < canonical_k_prime));
            self.stats.redundant_constraints += (before - self.pending.len()) as u64;
        }

        debug!(
            k,
            parity = map.len(),
            file_size = metadata.file_size,
            filename = %metadata.filename,
            "metadata accepted"
        );

        self.k = Some(k);
        self.parity_map = Some(map);
        self.metadata = Some(metadata);
        self.recount();
    }

    /// Recompute the solved counters from the block store.
    fn recount(&mut self) {
        let k = self.k.unwrap_or(0) as usize;
        self.solved_source = self.blocks.iter().take(k).filter(|b| b.is_some()).count() as u32;
        self.solved_total = self.blocks.iter().filter(|b| b.is_some()).count() as u32;
    }

    /// Drive reduction and parity recovery to a joint fixpoint.
    fn propagate(&mut self) {
        let was_complete = self.is_complete();

        loop {
            self.reduce();
            if !self.recover_parity() {
                break;
            }
        }

        if !was_complete && self.is_complete() {
            debug!(
                solved = self.solved_source,
                unique = self.seen.len(),
                "all source blocks decoded"
            );
        }
    }

    /// Belief-propagation inner loop: reduce every pending constraint
    /// against the known blocks, peel degree-1 remainders, and repeat until
    /// a full pass assigns nothing.
    fn reduce(&mut self) {
        loop {
            let mut assigned = false;
            let mut i = 0;

            while i < self.pending.len() {
                {
                    let constraint = &mut self.pending[i];
                    let blocks = &self.blocks;
                    let payload = &mut constraint.payload;
                    constraint.indices.retain(|&index| {
                        if let Some(known) = blocks[index as usize].as_deref() {
                            block::xor_into(payload, known);
                            false
                        } else {
                            true
                        }
                    });
                }

                match self.pending[i].indices.len() {
                    0 => {
                        // Everything in it was already known: redundant.
                        self.pending.swap_remove(i);
                        self.stats.redundant_constraints += 1;
                    },
                    1 => {
                        let constraint = self.pending.swap_remove(i);
                        self.assign(constraint.indices[0], constraint.payload);
                        assigned = true;
                    },
                    _ => i += 1,
                }
            }

            if !assigned {
                break;
            }
        }
    }

    /// Solve every parity row with exactly one unknown member, repeating
    /// until a full pass over the map recovers nothing.
    ///
    /// Returns whether any block was recovered (the caller re-enters
    /// reduction if so).
    fn recover_parity(&mut self) -> bool {
        let Some(k) = self.k else { return false };
        let Some(map) = self.parity_map.take() else { return false };

        let mut recovered_any = false;
        loop {
            let mut recovered = false;

            for (row, group) in map.iter().enumerate() {
                let parity_index = k as usize + row;
                let Some(parity) = self.blocks.get(parity_index).and_then(Option::as_ref) else {
                    continue;
                };

                let mut unknown = None;
                let mut ambiguous = false;
                for &index in group {
                    if self.blocks[index as usize].is_none() {
                        if unknown.is_some() {
                            ambiguous = true;
                            break;
                        }
                        unknown = Some(index);
                    }
                }
                let Some(target) = unknown else { continue };
                if ambiguous {
                    continue;
                }

                let mut acc = parity.clone();
                for &index in group {
                    if index == target {
                        continue;
                    }
                    if let Some(known) = self.blocks[index as usize].as_deref() {
                        block::xor_into(&mut acc, known);
                    }
                }

                trace!(row, target, "parity row solved a source block");
                self.assign(target, acc);
                recovered = true;
                recovered_any = true;
            }

            if !recovered {
                break;
            }
        }

        self.parity_map = Some(map);
        recovered_any
    }

    /// Record a newly decoded block. Write-once by construction: callers
    /// only assign indices that reduced to unknown.
    fn assign(&mut self, index: u32, payload: Vec<u8>) {
        debug_assert!(self.blocks[index as usize].is_none(), "block {index} decoded twice");

        self.blocks[index as usize] = Some(payload);
        self.solved_total += 1;
        if self.k.is_some_and(|k| index < k) {
            self.solved_source += 1;
        }
        trace!(index, solved_total = self.solved_total, "block decoded");
    }

    /// Whether every source block has been decoded.
    ///
    /// Only the first K slots matter: parity blocks are a means, not an end.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.k.is_some_and(|k| self.solved_source == k)
    }

    /// Fraction of source blocks decoded, 0 until metadata arrives.
    #[must_use]
    pub fn progress(&self) -> f64 {
        match self.k {
            Some(k) if k > 0 => f64::from(self.solved_source) / f64::from(k),
            _ => 0.0,
        }
    }

    /// Session metadata, if a metadata packet has been accepted.
    #[must_use]
    pub fn metadata(&self) -> Option<&TransferMetadata> {
        self.metadata.as_ref()
    }

    /// Session id bound from the first parsed packet.
    #[must_use]
    pub fn session_id(&self) -> Option<u32> {
        self.session_id
    }

    /// Intermediate-block count, once a session is bound.
    #[must_use]
    pub fn k_prime(&self) -> Option<u32> {
        self.session_id.map(|_| self.k_prime)
    }

    /// Number of distinct symbol ids accepted so far.
    #[must_use]
    pub fn unique_symbol_count(&self) -> usize {
        self.seen.len()
    }

    /// A decoded intermediate block, if that slot has been solved.
    #[must_use]
    pub fn block(&self, index: u32) -> Option<&[u8]> {
        self.blocks.get(index as usize).and_then(|b| b.as_deref())
    }

    /// Running counters for the host UI.
    #[must_use]
    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// Concatenate the decoded source blocks and truncate to the original
    /// file size.
    ///
    /// # Errors
    ///
    /// - `DecoderError::MetadataMissing` before a metadata packet arrives
    /// - `DecoderError::Incomplete` while source blocks are still unknown
    pub fn reconstruct(&self) -> Result<Vec<u8>, DecoderError> {
        let metadata = self.metadata.as_ref().ok_or(DecoderError::MetadataMissing)?;
        let k = self.k.ok_or(DecoderError::MetadataMissing)?;

        let mut out = Vec::with_capacity(k as usize * self.block_size as usize);
        for slot in self.blocks.iter().take(k as usize) {
            match slot {
                Some(block) => out.extend_from_slice(block),
                None => {
                    return Err(DecoderError::Incomplete {
                        solved: self.solved_source,
                        total: k,
                    });
                },
            }
        }

        out.truncate(metadata.file_size as usize);
        Ok(out)
    }

    /// Whether the reconstruction matches the sender's SHA-256 digest.
    ///
    /// Returns `false` while incomplete. A `false` on a complete transfer
    /// is fatal for the session: the host discards the bytes and waits for
    /// a fresh session.
    #[must_use]
    pub fn verify(&self) -> bool {
        let Ok(bytes) = self.reconstruct() else { return false };
        let Some(metadata) = self.metadata.as_ref() else { return false };

        let digest: [u8; 32] = Sha256::digest(&bytes).into();
        let matches = digest == metadata.digest;
        if !matches {
            warn!("digest mismatch on reconstructed file");
        }
        matches
    }

    /// Clear all session state. The running statistics survive; everything
    /// else returns to the empty state.
    pub fn reset(&mut self) {
        debug!("decoder reset");
        let stats = std::mem::take(&mut self.stats);
        *self = Self::default();
        self.stats = stats;
    }
}
