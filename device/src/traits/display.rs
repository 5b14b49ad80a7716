use crate::domain::identity::FlashCode;
use crate::drivers::led::matrix::{glyphs, PairingFrame, ToFrame};
use embassy_time::Duration;

/// LED matrix presentation used by the pairing flow.
pub trait PairingDisplay {
    type Error;

    /// Scroll `text` across the display, one column step every `delay`.
    ///
    /// Completes once the text has left the display.
    async fn scroll(&mut self, text: &str, delay: Duration) -> Result<(), Self::Error>;

    /// Show `frame` and leave it on the display.
    fn show_frame(&mut self, frame: PairingFrame) -> Result<(), Self::Error>;

    /// Show `code` as a histogram and leave it on the display.
    ///
    /// Defaults to showing `code.to_frame()`.
    fn show_histogram(&mut self, code: FlashCode) -> Result<(), Self::Error> {
        self.show_frame(code.to_frame())
    }

    /// Show the acknowledgement glyph and leave it on the display.
    ///
    /// Defaults to showing [`glyphs::CHECK_MARK`].
    fn show_acknowledgement(&mut self) -> Result<(), Self::Error> {
        self.show_frame(glyphs::CHECK_MARK.to_frame())
    }

    fn clear(&mut self) -> Result<(), Self::Error>;
}
