//! TX20 frame layout: the 41-bit capture and its fixed sub-fields
//!
//! A frame is stored as the sequence of physical line levels, first captured
//! bit in bit 0. Fields are extracted from fixed bit ranges; each field
//! carries its own inversion flag and bit order:
//!
//! ```text
//! bit   0..=4    start marker   inverted, MSB first   (expected 4)
//! bit   5..=8    direction A    inverted, LSB first
//! bit   9..=20   speed A        inverted, LSB first   (tenths of m/s)
//! bit  21..=24   checksum       inverted, LSB first
//! bit  25..=28   direction B    plain,    LSB first
//! bit  29..=40   speed B        plain,    LSB first
//! ```

use bitfield::bitfield;

use crate::core::{Direction, Speed};
use crate::error::{Result, WindError};
use crate::tx20;

bitfield! {
    /// Raw (non-inverted) view of the field ranges of a captured frame
    struct FrameBits(u64);
    u8;
    start_marker, _: 4, 0;
    direction_a, _: 8, 5;
    checksum, _: 24, 21;
    direction_b, _: 28, 25;
    u16;
    speed_a, _: 20, 9;
    speed_b, _: 40, 29;
}

/// Order in which a field's bits arrive on the line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    /// Earliest bit is the most significant
    MsbFirst,
    /// Earliest bit is the least significant
    LsbFirst,
}

/// The six sub-fields of a TX20 frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    StartMarker,
    DirectionA,
    SpeedA,
    Checksum,
    DirectionB,
    SpeedB,
}

impl Field {
    /// All fields in transmission order
    pub const ALL: [Field; 6] = [
        Field::StartMarker,
        Field::DirectionA,
        Field::SpeedA,
        Field::Checksum,
        Field::DirectionB,
        Field::SpeedB,
    ];

    /// Position of the field's first bit within the frame
    pub fn offset(self) -> usize {
        match self {
            Field::StartMarker => 0,
            Field::DirectionA => 5,
            Field::SpeedA => 9,
            Field::Checksum => 21,
            Field::DirectionB => 25,
            Field::SpeedB => 29,
        }
    }

    /// Width of the field in bits
    pub fn width(self) -> usize {
        match self {
            Field::StartMarker => 5,
            Field::DirectionA | Field::Checksum | Field::DirectionB => 4,
            Field::SpeedA | Field::SpeedB => 12,
        }
    }

    /// Whether the line level is the complement of the field value
    pub fn inverted(self) -> bool {
        !matches!(self, Field::DirectionB | Field::SpeedB)
    }

    pub fn bit_order(self) -> BitOrder {
        match self {
            Field::StartMarker => BitOrder::MsbFirst,
            _ => BitOrder::LsbFirst,
        }
    }

    fn mask(self) -> u16 {
        (1u16 << self.width()) - 1
    }

    /// Convert between line order and value order (its own inverse)
    fn reorder(self, value: u16) -> u16 {
        match self.bit_order() {
            BitOrder::LsbFirst => value,
            BitOrder::MsbFirst => value.reverse_bits() >> (16 - self.width()),
        }
    }

    /// Extract the field value from a frame
    pub fn extract(self, frame: &RawFrame) -> u16 {
        let view = FrameBits(frame.levels);
        let raw = match self {
            Field::StartMarker => u16::from(view.start_marker()),
            Field::DirectionA => u16::from(view.direction_a()),
            Field::SpeedA => view.speed_a(),
            Field::Checksum => u16::from(view.checksum()),
            Field::DirectionB => u16::from(view.direction_b()),
            Field::SpeedB => view.speed_b(),
        };
        let raw = if self.inverted() {
            !raw & self.mask()
        } else {
            raw
        };
        self.reorder(raw)
    }

    /// Write the line levels carrying `value` into `levels`
    fn place(self, value: u16, levels: &mut u64) {
        let value = self.reorder(value & self.mask());
        let line = if self.inverted() {
            !value & self.mask()
        } else {
            value
        };
        let mask = u64::from(self.mask()) << self.offset();
        *levels = (*levels & !mask) | (u64::from(line) << self.offset());
    }
}

/// Checksum over direction and the three speed nibbles, modulo 16
pub fn checksum(direction: Direction, speed: Speed) -> u8 {
    let sum = speed
        .nibbles()
        .iter()
        .fold(direction.code(), |acc, nibble| acc.wrapping_add(*nibble));
    sum & 0x0F
}

/// One captured 41-bit frame, stored as physical line levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawFrame {
    /// Line levels, first captured bit in bit 0 (`true` = line high)
    levels: u64,
}

impl RawFrame {
    /// Mask covering the 41 frame bits
    pub const MASK: u64 = (1u64 << tx20::FRAME_BITS) - 1;

    /// Build a frame from a packed bit pattern; bits above 40 are ignored
    pub fn from_bits(levels: u64) -> Self {
        RawFrame {
            levels: levels & Self::MASK,
        }
    }

    /// Build a frame from line levels in capture order
    pub fn from_levels(levels: &[bool]) -> Result<Self> {
        if levels.len() != tx20::FRAME_BITS {
            return Err(WindError::frame_invalid(format!(
                "Expected {} bits, got {}",
                tx20::FRAME_BITS,
                levels.len()
            )));
        }

        let packed = levels
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &high)| acc | (u64::from(high) << i));
        Ok(RawFrame { levels: packed })
    }

    /// Packed line levels, first captured bit in bit 0
    pub fn bits(&self) -> u64 {
        self.levels
    }

    /// Line level of the bit captured at `index`
    pub fn level(&self, index: usize) -> bool {
        index < tx20::FRAME_BITS && (self.levels >> index) & 1 != 0
    }

    /// Line levels in capture order
    pub fn levels(&self) -> impl Iterator<Item = bool> + '_ {
        (0..tx20::FRAME_BITS).map(move |i| self.level(i))
    }

    /// Extract all six fields
    pub fn fields(&self) -> FrameFields {
        FrameFields {
            start_marker: Field::StartMarker.extract(self) as u8,
            direction_a: Field::DirectionA.extract(self) as u8,
            speed_a: Field::SpeedA.extract(self),
            checksum: Field::Checksum.extract(self) as u8,
            direction_b: Field::DirectionB.extract(self) as u8,
            speed_b: Field::SpeedB.extract(self),
        }
    }
}

/// Renders the inverted line levels, grouped by field
impl std::fmt::Display for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, high) in self.levels().enumerate() {
            if i > 0 && Field::ALL.iter().any(|field| field.offset() == i) {
                write!(f, " ")?;
            }
            write!(f, "{}", if high { '0' } else { '1' })?;
        }
        Ok(())
    }
}

/// Decoded field values of a frame, before any consistency check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameFields {
    pub start_marker: u8,
    pub direction_a: u8,
    pub speed_a: u16,
    pub checksum: u8,
    pub direction_b: u8,
    pub speed_b: u16,
}

impl FrameFields {
    /// Fields of a well-formed transmission
    pub fn consistent(direction: Direction, speed: Speed) -> Self {
        FrameFields {
            start_marker: tx20::START_MARKER,
            direction_a: direction.code(),
            speed_a: speed.tenths(),
            checksum: checksum(direction, speed),
            direction_b: direction.code(),
            speed_b: speed.tenths(),
        }
    }

    /// Lay the fields out as line levels; values wider than a field are truncated
    pub fn to_frame(&self) -> RawFrame {
        let mut levels = 0u64;
        Field::StartMarker.place(u16::from(self.start_marker), &mut levels);
        Field::DirectionA.place(u16::from(self.direction_a), &mut levels);
        Field::SpeedA.place(self.speed_a, &mut levels);
        Field::Checksum.place(u16::from(self.checksum), &mut levels);
        Field::DirectionB.place(u16::from(self.direction_b), &mut levels);
        Field::SpeedB.place(self.speed_b, &mut levels);
        RawFrame::from_bits(levels)
    }
}

/// Produces the line levels a TX20 sensor transmits for a reading
pub struct FrameEncoder;

impl FrameEncoder {
    /// Encode a reading into a valid frame
    pub fn encode(direction: Direction, speed: Speed) -> RawFrame {
        FrameFields::consistent(direction, speed).to_frame()
    }

    /// Encode a reading into line levels in transmission order
    pub fn encode_levels(direction: Direction, speed: Speed) -> Vec<bool> {
        Self::encode(direction, speed).levels().collect()
    }
}
