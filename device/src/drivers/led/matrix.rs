//! Frame types for the 5x5 LED matrix used to present pairing information.

use crate::domain::identity::{FlashCode, HISTOGRAM_HEIGHT, HISTOGRAM_WIDTH};

// Using u8 for each row, so at most 8 columns
const BITMAP_WORD_SIZE: usize = 8;

/// A single matrix row. Bit 0 is the leftmost column.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Bitmap {
    data: u8,
    nbits: usize,
}

impl core::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for i in 0..self.nbits {
            if self.is_set(i) {
                write!(f, "1")?;
            } else {
                write!(f, "0")?;
            }
        }
        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Bitmap {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "{=u8:b}", self.data);
    }
}

impl Bitmap {
    /// Create a row from the `nbits` least significant bits of `input`, most
    /// significant bit leftmost, matching how glyphs are written in source.
    pub const fn new(input: u8, nbits: usize) -> Self {
        assert!(nbits <= BITMAP_WORD_SIZE);
        Self {
            data: input << (BITMAP_WORD_SIZE - nbits),
            nbits,
        }
    }

    pub const fn empty(nbits: usize) -> Self {
        Self::new(0, nbits)
    }

    const fn mask(bit: usize) -> u8 {
        1 << ((BITMAP_WORD_SIZE - 1) - bit)
    }

    pub fn set(&mut self, bit: usize) {
        assert!(bit < self.nbits);
        self.data |= Self::mask(bit);
    }

    pub fn clear(&mut self, bit: usize) {
        assert!(bit < self.nbits);
        self.data &= !Self::mask(bit);
    }

    pub fn is_set(&self, bit: usize) -> bool {
        assert!(bit < self.nbits);
        self.data & Self::mask(bit) != 0
    }

    pub fn count(&self) -> usize {
        self.data.count_ones() as usize
    }
}

/// A `XSIZE` by `YSIZE` image. Row 0 is the top of the display.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Frame<const XSIZE: usize, const YSIZE: usize> {
    bitmap: [Bitmap; YSIZE],
}

impl<const XSIZE: usize, const YSIZE: usize> core::fmt::Debug for Frame<XSIZE, YSIZE> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for row in self.bitmap.iter() {
            writeln!(f, "{:?}", row)?;
        }
        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl<const XSIZE: usize, const YSIZE: usize> defmt::Format for Frame<XSIZE, YSIZE> {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "{}", &self.bitmap[..]);
    }
}

impl<const XSIZE: usize, const YSIZE: usize> Frame<XSIZE, YSIZE> {
    pub const fn empty() -> Self {
        Self {
            bitmap: [Bitmap::empty(XSIZE); YSIZE],
        }
    }

    pub const fn new(bitmap: [Bitmap; YSIZE]) -> Self {
        Self { bitmap }
    }

    pub fn set(&mut self, x: usize, y: usize) {
        self.bitmap[y].set(x);
    }

    pub fn is_set(&self, x: usize, y: usize) -> bool {
        self.bitmap[y].is_set(x)
    }

    /// Number of lit pixels in column `x`.
    pub fn column_height(&self, x: usize) -> usize {
        self.bitmap.iter().filter(|row| row.is_set(x)).count()
    }

    /// Number of lit pixels in the whole frame.
    pub fn lit(&self) -> usize {
        self.bitmap.iter().map(Bitmap::count).sum()
    }
}

impl<const XSIZE: usize, const YSIZE: usize> Default for Frame<XSIZE, YSIZE> {
    fn default() -> Self {
        Frame::empty()
    }
}

pub trait ToFrame<const XSIZE: usize, const YSIZE: usize> {
    fn to_frame(&self) -> Frame<XSIZE, YSIZE>;
}

/// Frame sized for the pairing histogram.
pub type PairingFrame = Frame<HISTOGRAM_WIDTH, HISTOGRAM_HEIGHT>;

/// Render a flash code as a bar chart: each base-5 digit `d` lights `d + 1`
/// pixels from the bottom of its column, least significant digit rightmost.
impl ToFrame<HISTOGRAM_WIDTH, HISTOGRAM_HEIGHT> for FlashCode {
    fn to_frame(&self) -> PairingFrame {
        let mut frame = Frame::empty();
        for (i, digit) in self.digits().iter().enumerate() {
            let x = HISTOGRAM_WIDTH - 1 - i;
            for j in 0..=*digit as usize {
                frame.set(x, HISTOGRAM_HEIGHT - 1 - j);
            }
        }
        frame
    }
}

impl ToFrame<5, 5> for &[u8; 5] {
    fn to_frame(&self) -> Frame<5, 5> {
        glyphs::frame_5x5(self)
    }
}

pub mod glyphs {
    use super::*;

    #[rustfmt::skip]
    pub const CHECK_MARK: &[u8; 5] = &[
        0b00000,
        0b00001,
        0b00010,
        0b10100,
        0b01000,
    ];

    pub const fn frame_5x5(input: &[u8; 5]) -> Frame<5, 5> {
        Frame::new([
            Bitmap::new(input[0], 5),
            Bitmap::new(input[1], 5),
            Bitmap::new(input[2], 5),
            Bitmap::new(input[3], 5),
            Bitmap::new(input[4], 5),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::DeviceId;

    #[test]
    fn test_bitmap() {
        let mut b: Bitmap = Bitmap::empty(5);
        b.set(0);
        b.set(2);
        b.set(4);
        assert!(b.is_set(0));
        assert!(!b.is_set(1));
        assert!(b.is_set(2));
        assert!(!b.is_set(3));
        assert!(b.is_set(4));
        assert_eq!(3, b.count());

        b.clear(2);
        assert!(!b.is_set(2));

        let b: Bitmap = Bitmap::new(0b01000, 5);
        assert!(!b.is_set(0));
        assert!(b.is_set(1));
        assert!(!b.is_set(4));
    }

    #[test]
    fn histogram_columns_follow_digits() {
        // digits least significant first: 0, 1, 2, 3, 4
        let frame = DeviceId(2930).flash_code().to_frame();
        assert_eq!(5, frame.column_height(0));
        assert_eq!(4, frame.column_height(1));
        assert_eq!(3, frame.column_height(2));
        assert_eq!(2, frame.column_height(3));
        assert_eq!(1, frame.column_height(4));
        assert_eq!(15, frame.lit());

        // bars grow from the bottom row
        assert!(frame.is_set(4, 4));
        assert!(!frame.is_set(4, 3));
        assert!(frame.is_set(1, 1));
        assert!(!frame.is_set(1, 0));
    }

    #[test]
    fn histogram_always_fits() {
        for id in [0u64, 1, 624, 3124, 0xffff_ffff, u64::MAX] {
            let frame = DeviceId(id).flash_code().to_frame();
            for x in 0..HISTOGRAM_WIDTH {
                let h = frame.column_height(x);
                assert!((1..=HISTOGRAM_HEIGHT).contains(&h));
            }
        }
    }

    #[test]
    fn check_mark_glyph() {
        let frame = glyphs::CHECK_MARK.to_frame();
        assert!(frame.is_set(4, 1));
        assert!(frame.is_set(3, 2));
        assert!(frame.is_set(0, 3));
        assert!(frame.is_set(2, 3));
        assert!(frame.is_set(1, 4));
        assert_eq!(5, frame.lit());
    }
}
