//! Locked key storage
//!
//! A `LockedBuffer` owns a heap allocation that is wiped on drop. On unix
//! the pages are additionally `mlock`ed so key material cannot be swapped
//! to disk; a failing `mlock` (e.g. RLIMIT_MEMLOCK exhausted) degrades to a
//! warning rather than refusing to operate.

use rand::{rngs::OsRng, RngCore};
use tracing::warn;
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Scoped byte buffer: create-from-bytes wipes the source, `as_bytes`
/// borrows read-only, drop zeroizes (and unlocks) the memory.
pub struct LockedBuffer {
    bytes: Box<[u8]>,
}

impl LockedBuffer {
    /// Take ownership of `src`'s contents, wiping `src` afterwards.
    pub fn from_bytes(src: &mut [u8]) -> Self {
        let buf = Self::new(src.to_vec().into_boxed_slice());
        src.zeroize();
        buf
    }

    /// Take ownership of a `Vec`'s contents, wiping the vector (including
    /// its spare capacity) afterwards.
    pub fn from_vec(mut src: Vec<u8>) -> Self {
        let buf = Self::new(src.as_slice().to_vec().into_boxed_slice());
        src.zeroize();
        buf
    }

    /// Fill a fresh buffer from the OS RNG.
    pub fn random(len: usize) -> Result<Self, CryptoError> {
        let mut bytes = vec![0u8; len];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::Entropy(e.to_string()))?;
        Ok(Self::new(bytes.into_boxed_slice()))
    }

    fn new(bytes: Box<[u8]>) -> Self {
        let buf = Self { bytes };
        buf.lock_pages();
        buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[cfg(unix)]
    fn lock_pages(&self) {
        if self.bytes.is_empty() {
            return;
        }
        let ret = unsafe {
            libc::mlock(self.bytes.as_ptr() as *const libc::c_void, self.bytes.len())
        };
        if ret != 0 {
            warn!("mlock failed: {}", std::io::Error::last_os_error());
        }
    }

    #[cfg(not(unix))]
    fn lock_pages(&self) {}

    #[cfg(unix)]
    fn unlock_pages(&self) {
        if self.bytes.is_empty() {
            return;
        }
        let ret = unsafe {
            libc::munlock(self.bytes.as_ptr() as *const libc::c_void, self.bytes.len())
        };
        if ret != 0 {
            warn!("munlock failed: {}", std::io::Error::last_os_error());
        }
    }

    #[cfg(not(unix))]
    fn unlock_pages(&self) {}
}

impl Drop for LockedBuffer {
    fn drop(&mut self) {
        self.unlock_pages();
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for LockedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockedBuffer")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
