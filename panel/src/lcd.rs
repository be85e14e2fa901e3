//! Two line marquee text buffer for the 16x2 character LCD.

use core::fmt;

use crate::{LCD_WIDTH, MAX_KEYS, NAME_LENGTH};

/// Spaces between the end of a scrolling line and its wrapped start.
pub const SCROLL_GAP: usize = 3;
/// Characters a scrolling line advances per scroll step.
pub const SCROLL_SPEED: usize = 3;
/// Scroll steps a freshly printed line stands still.
pub const SCROLL_DELAY: u8 = 2;

const TOP_CAPACITY: usize = (MAX_KEYS as usize + 1) * (NAME_LENGTH + 2) - 1;
const BOTTOM_CAPACITY: usize = LCD_WIDTH;

/// Contents of both LCD rows.
pub type Frame = [[u8; LCD_WIDTH]; 2];

/// Low level character display.
pub trait CharDisplay {
    fn set_cursor(&mut self, col: u8, row: u8);

    fn write_char(&mut self, c: u8);
}

/// One LCD row.
///
/// `N` is the buffer size. It holds up to [`TextLine::CAPACITY`] characters of text, plus the
/// scroll gap and a wrapped copy of the first [`LCD_WIDTH`] characters so that any scroll
/// position can be displayed as one contiguous window.
#[derive(Debug)]
pub struct TextLine<const N: usize> {
    text: [u8; N],
    len: usize,
    pos: usize,
    delay: u8,
}

impl<const N: usize> TextLine<N> {
    pub const CAPACITY: usize = N - SCROLL_GAP - LCD_WIDTH;

    #[must_use]
    pub const fn new() -> Self {
        Self {
            text: [b' '; N],
            len: 0,
            pos: 0,
            delay: 0,
        }
    }

    /// Text length, including the scroll gap once finished.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub fn is_scrolling(&self) -> bool {
        self.len > LCD_WIDTH
    }

    /// The text written so far, or the full marquee text once finished.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.text[..self.len]
    }

    /// Visible part of the line.
    #[must_use]
    pub fn window(&self) -> &[u8] {
        &self.text[self.pos..self.pos + LCD_WIDTH]
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Appends text; whatever does not fit is dropped.
    pub fn push_str(&mut self, s: &str) {
        for c in s.chars() {
            if self.len >= Self::CAPACITY {
                return;
            }
            self.text[self.len] = if c.is_ascii() { c as u8 } else { b'?' };
            self.len += 1;
        }
    }

    /// Pads a short line to the display width, or prepares a long one for scrolling.
    pub fn finish(&mut self) {
        self.pos = 0;
        self.delay = SCROLL_DELAY;

        if self.len > LCD_WIDTH {
            let gap_end = self.len + SCROLL_GAP;
            self.text[self.len..gap_end].fill(b' ');
            self.text.copy_within(..LCD_WIDTH, gap_end);
            self.len = gap_end;
        } else {
            self.text[self.len..LCD_WIDTH].fill(b' ');
            self.len = LCD_WIDTH;
        }
    }

    /// One scroll step, returning whether the window moved.
    pub fn scroll(&mut self) -> bool {
        if !self.is_scrolling() {
            return false;
        }
        if self.delay > 0 {
            self.delay -= 1;
            return false;
        }

        self.pos += SCROLL_SPEED;
        if self.pos >= self.len {
            self.pos -= self.len;
        }
        true
    }
}

impl<const N: usize> Default for TextLine<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Write for TextLine<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

/// Both LCD rows plus the bookkeeping of what needs to be redrawn.
#[derive(Debug)]
pub struct LcdText {
    top: TextLine<{ TOP_CAPACITY + SCROLL_GAP + LCD_WIDTH }>,
    bottom: TextLine<{ BOTTOM_CAPACITY + SCROLL_GAP + LCD_WIDTH }>,
    composing: bool,
    needs_update: bool,
}

impl LcdText {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            top: TextLine::new(),
            bottom: TextLine::new(),
            composing: false,
            needs_update: true,
        }
    }

    /// Starts composing a row. Scrolling is suspended until [`LcdText::finish`].
    pub fn start(&mut self, row: usize) {
        self.composing = true;
        self.line_mut(row).clear();
    }

    pub fn append(&mut self, row: usize, args: fmt::Arguments<'_>) {
        // Overflow truncates silently, so formatting cannot fail.
        fmt::Write::write_fmt(self.line_mut(row), args).ok();
    }

    pub fn finish(&mut self, row: usize) {
        self.line_mut(row).finish();
        self.composing = false;
        self.needs_update = true;
    }

    /// Replaces a whole row.
    pub fn print(&mut self, row: usize, args: fmt::Arguments<'_>) {
        self.start(row);
        self.append(row, args);
        self.finish(row);
    }

    #[inline]
    #[must_use]
    pub fn is_composing(&self) -> bool {
        self.composing
    }

    /// Scroll step for both rows, skipped while a row is being composed.
    pub fn scroll(&mut self) {
        if self.composing {
            return;
        }
        let top = self.top.scroll();
        let bottom = self.bottom.scroll();
        self.needs_update |= top || bottom;
    }

    /// Full text of a row.
    #[must_use]
    pub fn row(&self, row: usize) -> &[u8] {
        if row == 0 {
            self.top.as_bytes()
        } else {
            self.bottom.as_bytes()
        }
    }

    /// Takes the visible frame if anything changed since the last call.
    pub fn frame(&mut self) -> Option<Frame> {
        if !self.needs_update || self.composing {
            return None;
        }
        self.needs_update = false;

        let mut frame = [[b' '; LCD_WIDTH]; 2];
        frame[0].copy_from_slice(self.top.window());
        frame[1].copy_from_slice(self.bottom.window());
        Some(frame)
    }

    /// Draws the frame if anything changed, returns whether it did.
    pub fn render<D: CharDisplay>(&mut self, display: &mut D) -> bool {
        let Some(frame) = self.frame() else {
            return false;
        };
        draw(&frame, display);
        true
    }

    fn line_mut(&mut self, row: usize) -> &mut dyn Line {
        if row == 0 { &mut self.top } else { &mut self.bottom }
    }
}

impl Default for LcdText {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes a frame row by row.
pub fn draw<D: CharDisplay>(frame: &Frame, display: &mut D) {
    for (row, chars) in (0..).zip(frame) {
        display.set_cursor(0, row);
        for &c in chars {
            display.write_char(c);
        }
    }
}

/// Row operations needed by [`LcdText`] regardless of buffer size.
trait Line: fmt::Write {
    fn clear(&mut self);

    fn finish(&mut self);
}

impl<const N: usize> Line for TextLine<N> {
    fn clear(&mut self) {
        TextLine::clear(self);
    }

    fn finish(&mut self) {
        TextLine::finish(self);
    }
}

#[cfg(test)]
mod tests {
    use super::{CharDisplay, LcdText, SCROLL_DELAY, SCROLL_GAP, SCROLL_SPEED, TextLine};
    use crate::LCD_WIDTH;

    #[derive(Default)]
    struct Screen {
        rows: [Vec<u8>; 2],
        row: usize,
    }

    impl CharDisplay for Screen {
        fn set_cursor(&mut self, col: u8, row: u8) {
            assert_eq!(col, 0);
            self.row = row.into();
            self.rows[self.row].clear();
        }

        fn write_char(&mut self, c: u8) {
            self.rows[self.row].push(c);
        }
    }

    const MESSAGE: &str = "Key Workshop missing";

    #[test]
    fn test_short_line_is_padded() {
        let mut line = TextLine::<35>::new();
        line.push_str("Hello");
        line.finish();
        assert_eq!(line.len(), LCD_WIDTH);
        assert_eq!(line.window(), b"Hello           ");
        assert!(!line.scroll());
    }

    #[test]
    fn test_exact_width_does_not_scroll() {
        let mut line = TextLine::<35>::new();
        line.push_str("0123456789abcdef");
        line.finish();
        assert!(!line.is_scrolling());
        assert_eq!(line.window(), b"0123456789abcdef");
    }

    #[test]
    fn test_long_line_layout() {
        let mut line = TextLine::<64>::new();
        line.push_str(MESSAGE);
        line.finish();

        assert_eq!(MESSAGE.len(), 20);
        assert_eq!(line.len(), 20 + SCROLL_GAP);
        assert_eq!(line.len() + LCD_WIDTH, 20 + 3 + 16);
        assert_eq!(&line.text[..line.len() + LCD_WIDTH], b"Key Workshop missing   Key Workshop mis");
    }

    #[test]
    fn test_scroll_round_trip() {
        let mut line = TextLine::<64>::new();
        line.push_str(MESSAGE);
        line.finish();
        let start = line.window().to_vec();

        for _ in 0..SCROLL_DELAY {
            assert!(!line.scroll());
        }

        let marquee: Vec<u8> = line.as_bytes().iter().copied().cycle().take(200).collect();
        for step in 1..=line.len() {
            assert!(line.scroll());
            let pos = step * SCROLL_SPEED % line.len();
            assert_eq!(line.window(), &marquee[pos..pos + LCD_WIDTH]);
            if step < line.len() {
                assert_ne!(line.pos, 0);
            }
        }
        assert_eq!(line.window(), start);
    }

    #[test]
    fn test_append_truncates() {
        let mut line = TextLine::<35>::new();
        for _ in 0..10 {
            line.push_str("abc");
        }
        assert_eq!(line.len(), TextLine::<35>::CAPACITY);
        line.finish();
        assert_eq!(line.window(), b"abcabcabcabcabca");
    }

    #[test]
    fn test_top_row_holds_a_full_key_list() {
        let mut lcd = LcdText::new();
        lcd.start(0);
        for _ in 0..100 {
            lcd.append(0, format_args!("{MESSAGE}"));
        }
        assert_eq!(lcd.row(0).len(), 161);
        lcd.finish(0);
        assert_eq!(lcd.row(0).len(), 164);
    }

    #[test]
    fn test_no_scroll_or_frame_while_composing() {
        let mut lcd = LcdText::new();
        lcd.print(0, format_args!("{MESSAGE}"));
        lcd.print(1, format_args!("{}", 42));
        assert!(lcd.frame().is_some());

        lcd.start(1);
        for _ in 0..10 {
            lcd.scroll();
        }
        assert!(lcd.frame().is_none());
        lcd.append(1, format_args!("done"));
        lcd.finish(1);

        let frame = lcd.frame().expect("finished rows are drawn");
        assert_eq!(&frame[0], b"Key Workshop mis");
        assert_eq!(&frame[1], b"done            ");
    }

    #[test]
    fn test_render_only_on_change() {
        let mut lcd = LcdText::new();
        let mut screen = Screen::default();

        lcd.print(0, format_args!("Locate key"));
        lcd.print(1, format_args!("No key plugged"));
        assert!(lcd.render(&mut screen));
        assert_eq!(screen.rows[0], b"Locate key      ");
        assert_eq!(screen.rows[1], b"No key plugged  ");

        assert!(!lcd.render(&mut screen));
        lcd.scroll();
        assert!(!lcd.render(&mut screen));

        lcd.print(0, format_args!("{MESSAGE}"));
        assert!(lcd.render(&mut screen));
        for _ in 0..SCROLL_DELAY {
            lcd.scroll();
            assert!(!lcd.render(&mut screen));
        }
        lcd.scroll();
        assert!(lcd.render(&mut screen));
        assert_eq!(screen.rows[0], b" Workshop missin");
    }
}
