use sha3::{Digest, Keccak256};
use std::cell::RefCell;

pub type Hash32 = [u8; 32];

thread_local! {
    /// A per-thread, reusable Keccak-256 digest object. Pooling rather than
    /// sharing is what keeps this safe across threads without a lock: each
    /// thread gets its own hasher, reset after every call instead of being
    /// reallocated.
    static HASHER: RefCell<Keccak256> = RefCell::new(Keccak256::new());
}

/// Hash `data` with Keccak-256, reusing this thread's pooled digest object.
pub fn keccak256(data: &[u8]) -> Hash32 {
    HASHER.with(|cell| {
        let mut hasher = cell.borrow_mut();
        Digest::update(&mut *hasher, data);
        let result = hasher.finalize_reset();
        let mut out = [0u8; 32];
        out.copy_from_slice(&result);
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak256_is_deterministic_and_32_bytes() {
        let h1 = keccak256(b"sigilaris");
        let h2 = keccak256(b"sigilaris");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 32);
        assert_ne!(h1, keccak256(b"sigilaris "));
    }

    #[test]
    fn pooled_hasher_is_reset_between_calls() {
        let a = keccak256(b"hello");
        let b = keccak256(b"world");
        let a_again = keccak256(b"hello");
        assert_eq!(a, a_again);
        assert_ne!(a, b);
    }
}
