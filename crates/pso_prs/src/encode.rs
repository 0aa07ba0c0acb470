//! PRS compression
//!
//! Greedy encoder: at every position the longest match inside the window is taken, ties going to
//! the nearest occurrence. Matches of 2 to 5 bytes at most 256 bytes back use the short form,
//! matches of 3 bytes or more use the long form, anything else is a literal.

use tracing::{instrument, trace};

use crate::{LONG_WINDOW, MAX_LONG_DISTANCE, MAX_MATCH, MAX_SHORT_DISTANCE, MAX_SHORT_MATCH};

/// Candidates examined per position
const MAX_CHAIN: usize = 256;

const NO_POSITION: usize = usize::MAX;

/// Output stream interleaving command bytes with data bytes
struct BitWriter {
    output: Vec<u8>,
    command: usize,
    used: u8,
}

impl BitWriter {
    fn new(capacity: usize) -> Self {
        let mut output = Vec::with_capacity(capacity);
        output.push(0);
        BitWriter {
            output,
            command: 0,
            used: 0,
        }
    }

    /// Command bits have to be pushed before the data bytes of their token, a new command byte is
    /// started where the decoder will look for it
    fn bit(&mut self, set: bool) {
        if self.used == 8 {
            self.command = self.output.len();
            self.output.push(0);
            self.used = 0;
        }
        if set {
            self.output[self.command] |= 1 << self.used;
        }
        self.used += 1;
    }

    fn byte(&mut self, byte: u8) {
        self.output.push(byte);
    }

    fn literal(&mut self, byte: u8) {
        self.bit(true);
        self.byte(byte);
    }

    fn short_reference(&mut self, distance: usize, length: usize) {
        let code = length - 2;
        self.bit(false);
        self.bit(false);
        self.bit(code & 0b10 != 0);
        self.bit(code & 0b01 != 0);
        self.byte((MAX_SHORT_DISTANCE - distance) as u8);
    }

    fn long_reference(&mut self, distance: usize, length: usize) {
        let field = ((LONG_WINDOW - distance) as u16) << 3;
        self.bit(false);
        self.bit(true);
        if length <= 9 {
            self.output
                .extend_from_slice(&(field | (length - 2) as u16).to_le_bytes());
        } else {
            self.output.extend_from_slice(&field.to_le_bytes());
            self.byte((length - 1) as u8);
        }
    }

    fn finish(mut self) -> Vec<u8> {
        self.bit(false);
        self.bit(true);
        self.output.extend_from_slice(&[0, 0]);
        self.output
    }
}

/// Hash chains over 2 byte prefixes
struct MatchFinder<'a> {
    input: &'a [u8],
    head: Vec<usize>,
    previous: Vec<usize>,
}

impl<'a> MatchFinder<'a> {
    fn new(input: &'a [u8]) -> Self {
        MatchFinder {
            input,
            head: vec![NO_POSITION; 1 << 16],
            previous: vec![NO_POSITION; input.len()],
        }
    }

    fn prefix(&self, position: usize) -> Option<usize> {
        let pair = self.input.get(position..position + 2)?;
        Some(((pair[0] as usize) << 8) | pair[1] as usize)
    }

    fn insert(&mut self, position: usize) {
        if let Some(prefix) = self.prefix(position) {
            self.previous[position] = self.head[prefix];
            self.head[prefix] = position;
        }
    }

    /// Longest match for `position` as `(distance, length)`
    fn longest(&self, position: usize) -> Option<(usize, usize)> {
        let prefix = self.prefix(position)?;
        let limit = (self.input.len() - position).min(MAX_MATCH);
        let mut best: Option<(usize, usize)> = None;
        let mut candidate = self.head[prefix];

        for _ in 0..MAX_CHAIN {
            if candidate == NO_POSITION || position - candidate > MAX_LONG_DISTANCE {
                break;
            }
            let length = self.input[candidate..]
                .iter()
                .zip(&self.input[position..position + limit])
                .take_while(|(a, b)| a == b)
                .count();
            if best.map_or(true, |(_, best_length)| length > best_length) {
                best = Some((position - candidate, length));
                if length == limit {
                    break;
                }
            }
            candidate = self.previous[candidate];
        }
        best
    }
}

/// Compress data into a PRS stream terminated by an empty long reference.
///
/// ```
/// let compressed = pso_prs::compress(b"ABABABAB");
/// assert_eq!(pso_prs::decompress(&compressed)?, b"ABABABAB");
/// # Ok::<(), pso_prs::error::Error>(())
/// ```
#[instrument(level = "debug", skip_all, fields(len = input.len()))]
pub fn compress(input: &[u8]) -> Vec<u8> {
    let mut writer = BitWriter::new(input.len() + input.len() / 8 + 3);
    let mut finder = MatchFinder::new(input);
    let mut position = 0;

    while position < input.len() {
        let consumed = match finder.longest(position) {
            Some((distance, length))
                if (2..=MAX_SHORT_MATCH).contains(&length) && distance <= MAX_SHORT_DISTANCE =>
            {
                writer.short_reference(distance, length);
                length
            }
            Some((distance, length)) if length >= 3 => {
                writer.long_reference(distance, length);
                length
            }
            _ => {
                writer.literal(input[position]);
                1
            }
        };

        for p in position..position + consumed {
            finder.insert(p);
        }
        position += consumed;
    }

    let output = writer.finish();
    trace!(compressed = output.len(), "compressed");
    output
}
