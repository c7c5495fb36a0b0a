//! Rabin fingerprint content-defined chunking
//!
//! Boundaries are chosen by a polynomial rolling hash over a 64-byte window,
//! so an insertion or deletion only moves the boundaries near the edit and
//! the rest of the stream re-chunks identically. The chunker is a lazy
//! single-consumer sequence: each `next_chunk` call reads just far enough to
//! produce one chunk.
//!
//! Boundary rule: once a chunk has reached its minimum size, a cut happens
//! where `digest & SPLITMASK == 0`, or unconditionally at the maximum size.
//! The mask targets a 1 MiB average; the polynomial below is tuned for that
//! average and is biased at substantially different configured sizes.

use std::io::{self, Read};
use std::sync::OnceLock;

/// Irreducible polynomial over GF(2), degree 53. Chunk boundaries are
/// consumer-visible, so changing this constant invalidates every existing
/// manifest's chunk layout.
pub const POLYNOMIAL: u64 = 0x3DA3358B4DC173;

/// Rolling window length in bytes.
pub const WINDOW_SIZE: usize = 64;

/// Boundary mask: cut where the low 20 digest bits are zero (1 MiB average).
const SPLITMASK: u64 = (1 << 20) - 1;

/// Bits above this shift are the digest's top byte, used to index the
/// reduction table.
const POL_SHIFT: u32 = 45; // deg(POLYNOMIAL) - 8

const READ_BUF_SIZE: usize = 64 * 1024;

/// One content-defined segment of the input stream.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Zero-based position in the stream's chunk sequence.
    pub index: usize,
    /// The chunk's bytes. Concatenating all chunks in index order
    /// reproduces the input exactly.
    pub data: Vec<u8>,
}

struct Tables {
    /// `out[b]` is the hash contribution of byte `b` once it has been
    /// followed by `WINDOW_SIZE - 1` more bytes; XORing it removes the byte
    /// leaving the window.
    out: [u64; 256],
    /// `mod_[b] = (b·x^53 mod P) | b·x^53`: one XOR both cancels the top
    /// byte and folds in its reduction.
    mod_: [u64; 256],
}

static TABLES: OnceLock<Tables> = OnceLock::new();

fn tables() -> &'static Tables {
    TABLES.get_or_init(build_tables)
}

/// Degree of `x` as a GF(2) polynomial; -1 for the zero polynomial.
fn pol_deg(x: u64) -> i32 {
    63 - x.leading_zeros() as i32
}

fn pol_mod(mut x: u64, p: u64) -> u64 {
    let dp = pol_deg(p);
    while pol_deg(x) >= dp {
        x ^= p << (pol_deg(x) - dp) as u32;
    }
    x
}

fn append_byte(h: u64, b: u8) -> u64 {
    pol_mod((h << 8) | u64::from(b), POLYNOMIAL)
}

fn build_tables() -> Tables {
    let mut out = [0u64; 256];
    for b in 0..256usize {
        let mut h = append_byte(0, b as u8);
        for _ in 0..WINDOW_SIZE - 1 {
            h = append_byte(h, 0);
        }
        out[b] = h;
    }

    let deg = pol_deg(POLYNOMIAL) as u32;
    let mut mod_ = [0u64; 256];
    for b in 0..256u64 {
        mod_[b as usize] = pol_mod(b << deg, POLYNOMIAL) | (b << deg);
    }

    Tables { out, mod_ }
}

/// Streaming chunker over any `Read` source.
///
/// `chunk_size_kb` is the configured average size A; chunks fall within
/// `[A·1024/2, A·1024·2]` except the final chunk, which may be shorter.
pub struct Chunker<R> {
    rd: R,
    min_size: usize,
    max_size: usize,

    buf: Vec<u8>,
    bpos: usize,
    blen: usize,
    eof: bool,

    index: usize,
    pending: Vec<u8>,
    window: [u8; WINDOW_SIZE],
    wpos: usize,
    digest: u64,
}

impl<R: Read> Chunker<R> {
    pub fn new(rd: R, chunk_size_kb: u32) -> Self {
        let avg = chunk_size_kb as usize * 1024;
        Self {
            rd,
            min_size: avg / 2,
            max_size: avg * 2,
            buf: vec![0u8; READ_BUF_SIZE],
            bpos: 0,
            blen: 0,
            eof: false,
            index: 0,
            pending: Vec::new(),
            window: [0u8; WINDOW_SIZE],
            wpos: 0,
            digest: 0,
        }
    }

    /// Produce the next chunk, or `None` at end of stream.
    pub fn next_chunk(&mut self) -> io::Result<Option<Chunk>> {
        let tables = tables();

        loop {
            if self.bpos == self.blen {
                if self.eof {
                    break;
                }
                self.fill()?;
                if self.blen == 0 {
                    self.eof = true;
                    break;
                }
            }

            while self.bpos < self.blen {
                let b = self.buf[self.bpos];
                self.bpos += 1;
                self.pending.push(b);

                // Slide the oldest byte out of the window.
                let leaving = self.window[self.wpos] as usize;
                self.window[self.wpos] = b;
                self.wpos = (self.wpos + 1) % WINDOW_SIZE;
                self.digest ^= tables.out[leaving];

                // Append the new byte, reducing mod POLYNOMIAL.
                let top = (self.digest >> POL_SHIFT) as usize;
                self.digest = ((self.digest << 8) | u64::from(b)) ^ tables.mod_[top];

                let len = self.pending.len();
                if len >= self.min_size
                    && (self.digest & SPLITMASK == 0 || len >= self.max_size)
                {
                    return Ok(Some(self.emit()));
                }
            }
        }

        if self.pending.is_empty() {
            Ok(None)
        } else {
            // Tail chunk, allowed to be shorter than min_size.
            Ok(Some(self.emit()))
        }
    }

    fn emit(&mut self) -> Chunk {
        let data = std::mem::take(&mut self.pending);
        self.window = [0u8; WINDOW_SIZE];
        self.wpos = 0;
        self.digest = 0;

        let chunk = Chunk {
            index: self.index,
            data,
        };
        self.index += 1;
        chunk
    }

    fn fill(&mut self) -> io::Result<()> {
        self.bpos = 0;
        self.blen = 0;
        loop {
            match self.rd.read(&mut self.buf) {
                Ok(n) => {
                    self.blen = n;
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl<R: Read> Iterator for Chunker<R> {
    type Item = io::Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}
