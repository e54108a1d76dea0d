//! Code-length alphabet decoding for dynamic blocks
//!
//! A dynamic block transmits its literal/length and distance code lengths
//! run-length compressed with a 19-symbol meta-alphabet.

use super::bits::BitReader;
use super::huffman::CanonicalCodeTable;
use crate::{CabError, Result};

/// Repeat the previous length 3-6 times
const REPEAT_PREVIOUS: u16 = 16;
/// Repeat zero 3-10 times
const REPEAT_ZERO_SHORT: u16 = 17;
/// Repeat zero 11-138 times
const REPEAT_ZERO_LONG: u16 = 18;

/// Decoder for run-length compressed code-length arrays
#[derive(Debug, Clone, Copy, Default)]
pub struct CodeLengthAlphabetDecoder;

impl CodeLengthAlphabetDecoder {
    /// Decode exactly `symbol_count` code lengths using the meta-alphabet `table`
    pub fn decode(
        reader: &mut BitReader<'_>,
        symbol_count: usize,
        table: &CanonicalCodeTable,
    ) -> Result<Vec<u8>> {
        let mut lengths = Vec::with_capacity(symbol_count);

        while lengths.len() < symbol_count {
            let position = lengths.len();
            let symbol = table.decode(reader)?;

            let (value, repeat) = match symbol {
                0..=15 => {
                    lengths.push(symbol as u8);
                    continue;
                }
                REPEAT_PREVIOUS => {
                    let previous = *lengths
                        .last()
                        .ok_or(CabError::InvalidRepeatSymbol { symbol, position })?;
                    (previous, 3 + reader.read_bits(2)? as usize)
                }
                REPEAT_ZERO_SHORT => (0, 3 + reader.read_bits(3)? as usize),
                REPEAT_ZERO_LONG => (0, 11 + reader.read_bits(7)? as usize),
                _ => return Err(CabError::InvalidHuffmanCode),
            };

            if position + repeat > symbol_count {
                return Err(CabError::InvalidRepeatSymbol { symbol, position });
            }
            lengths.resize(position + repeat, value);
        }

        Ok(lengths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Meta-alphabet where every symbol has a 5-bit code (symbols 0..=18)
    fn flat_table() -> CanonicalCodeTable {
        let mut lengths = [0u8; 19];
        lengths.iter_mut().for_each(|l| *l = 5);
        CanonicalCodeTable::build(&lengths).unwrap()
    }

    /// Write fields LSB-first; Huffman codes are written MSB-first
    struct Packer {
        out: Vec<u8>,
        acc: u32,
        n: u32,
    }

    impl Packer {
        fn new() -> Self {
            Self {
                out: Vec::new(),
                acc: 0,
                n: 0,
            }
        }

        fn bits(&mut self, value: u32, len: u32) -> &mut Self {
            for i in 0..len {
                self.acc |= ((value >> i) & 1) << self.n;
                self.n += 1;
                if self.n == 8 {
                    self.out.push(self.acc as u8);
                    self.acc = 0;
                    self.n = 0;
                }
            }
            self
        }

        fn symbol(&mut self, table: &CanonicalCodeTable, symbol: usize) -> &mut Self {
            let code = table.code(symbol).unwrap();
            for i in (0..code.length).rev() {
                self.bits(((code.code >> i) & 1) as u32, 1);
            }
            self
        }

        fn finish(&mut self) -> Vec<u8> {
            let mut out = std::mem::take(&mut self.out);
            if self.n > 0 {
                out.push(self.acc as u8);
            }
            out
        }
    }

    #[test]
    fn test_literal_lengths_and_repeats() {
        let table = flat_table();
        let data = Packer::new()
            .symbol(&table, 8)
            .symbol(&table, 16)
            .bits(1, 2) // repeat 8 four times
            .symbol(&table, 17)
            .bits(0, 3) // three zeros
            .symbol(&table, 18)
            .bits(1, 7) // twelve zeros
            .symbol(&table, 5)
            .finish();

        let mut reader = BitReader::new(&data);
        let lengths = CodeLengthAlphabetDecoder::decode(&mut reader, 21, &table).unwrap();

        let mut expected = vec![8u8; 5];
        expected.extend_from_slice(&[0; 15]);
        expected.push(5);
        assert_eq!(lengths, expected);
    }

    #[test]
    fn test_repeat_before_any_length() {
        let table = flat_table();
        let data = Packer::new().symbol(&table, 16).bits(0, 2).finish();
        let mut reader = BitReader::new(&data);
        assert!(matches!(
            CodeLengthAlphabetDecoder::decode(&mut reader, 10, &table),
            Err(CabError::InvalidRepeatSymbol {
                symbol: 16,
                position: 0
            })
        ));
    }

    #[test]
    fn test_repeat_overflow() {
        let table = flat_table();
        // 11 zeros requested for a 10-entry array
        let data = Packer::new().symbol(&table, 18).bits(0, 7).finish();
        let mut reader = BitReader::new(&data);
        assert!(matches!(
            CodeLengthAlphabetDecoder::decode(&mut reader, 10, &table),
            Err(CabError::InvalidRepeatSymbol { symbol: 18, .. })
        ));
    }

    #[test]
    fn test_exact_fill_with_long_run() {
        let table = flat_table();
        let data = Packer::new()
            .symbol(&table, 1)
            .symbol(&table, 18)
            .bits(127, 7) // 138 zeros
            .finish();
        let mut reader = BitReader::new(&data);
        let lengths = CodeLengthAlphabetDecoder::decode(&mut reader, 139, &table).unwrap();
        assert_eq!(lengths.len(), 139);
        assert_eq!(lengths[0], 1);
        assert!(lengths[1..].iter().all(|&l| l == 0));
    }

    #[test]
    fn test_truncated_input() {
        let table = flat_table();
        let data = Packer::new().symbol(&table, 4).finish();
        let mut reader = BitReader::new(&data);
        assert!(matches!(
            CodeLengthAlphabetDecoder::decode(&mut reader, 4, &table),
            Err(CabError::UnexpectedEof)
        ));
    }
}
