//! Block slicing and XOR primitives.
//!
//! Everything in the codec is an XOR of fixed-length blocks. These helpers
//! keep the byte handling in one place; the interesting structure lives in
//! [`crate::precode`] and [`crate::symbol`].

/// Slice a file into fixed-size blocks, zero-padding the tail.
///
/// An empty file still yields one all-zero block: the protocol has no
/// representation for K = 0, and the metadata's `file_size` field truncates
/// the reconstruction back to zero bytes on the far side.
#[must_use]
pub fn split(file: &[u8], block_size: usize) -> Vec<Vec<u8>> {
    debug_assert!(block_size > 0);

    if file.is_empty() {
        return vec![vec![0u8; block_size]];
    }

    file.chunks(block_size)
        .map(|chunk| {
            let mut block = chunk.to_vec();
            block.resize(block_size, 0);
            block
        })
        .collect()
}

/// XOR `src` into `dst` element-wise.
///
/// The two slices are the same length everywhere this is called (all blocks
/// in a session share one block size); the zip silently stops at the shorter
/// one rather than panicking on a malformed packet.
pub fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}
