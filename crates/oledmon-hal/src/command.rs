//! SSD1306 command table
//!
//! Control bytes, opcodes and the two fixed byte sequences the driver sends:
//! the power-on initialization and the full-frame addressing prefix.
//! Page numbers refer to the SSD1306 datasheet rev 1.1.

/// Panel width in pixels
pub const WIDTH: usize = 128;
/// Panel height in pixels
pub const HEIGHT: usize = 64;
/// Number of 8-row pages
pub const PAGES: usize = HEIGHT / 8;
/// Size of one full frame in horizontal addressing mode
pub const FRAME_BYTES: usize = WIDTH * PAGES;
/// Largest data payload sent in a single bus transfer
pub const CHUNK_SIZE: usize = 64;

/// Control bytes, always the first byte of a bus transfer
pub mod control {
    /// One command byte follows
    pub const CMD_SINGLE: u8 = 0x80;
    /// The rest of the transfer is commands
    pub const CMD_STREAM: u8 = 0x00;
    /// The rest of the transfer is GDDRAM data
    pub const DATA_STREAM: u8 = 0x40;
}

/// Controller opcodes
pub mod opcode {
    // Fundamental commands (page 28)
    pub const SET_CONTRAST: u8 = 0x81;
    pub const DISPLAY_RAM: u8 = 0xA4;
    pub const DISPLAY_ALL_ON: u8 = 0xA5;
    pub const DISPLAY_NORMAL: u8 = 0xA6;
    pub const DISPLAY_INVERTED: u8 = 0xA7;
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;

    // Addressing (page 30)
    pub const SET_MEMORY_ADDR_MODE: u8 = 0x20;
    pub const SET_COLUMN_RANGE: u8 = 0x21;
    pub const SET_PAGE_RANGE: u8 = 0x22;

    // Hardware configuration (page 31)
    pub const SET_DISPLAY_START_LINE: u8 = 0x40;
    pub const SET_SEGMENT_REMAP: u8 = 0xA1;
    pub const SET_MUX_RATIO: u8 = 0xA8;
    pub const SET_COM_SCAN_MODE: u8 = 0xC8;
    pub const SET_DISPLAY_OFFSET: u8 = 0xD3;
    pub const SET_COM_PIN_MAP: u8 = 0xDA;
    pub const NOP: u8 = 0xE3;

    // Timing and driving scheme (page 32)
    pub const SET_DISPLAY_CLK_DIV: u8 = 0xD5;
    pub const SET_PRECHARGE: u8 = 0xD9;
    pub const SET_VCOMH_DESELECT: u8 = 0xDB;

    // Charge pump (page 62)
    pub const SET_CHARGE_PUMP: u8 = 0x8D;
}

/// Power-on initialization, sent as one command-stream transfer
pub const INIT_SEQUENCE: [u8; 26] = [
    control::CMD_STREAM,
    opcode::DISPLAY_OFF,
    opcode::SET_MUX_RATIO,
    0x3F,
    opcode::SET_DISPLAY_OFFSET,
    0x00,
    opcode::SET_DISPLAY_START_LINE,
    // Pins to the north: mirror both axes (0xA0 / 0xC0 for pins south)
    opcode::SET_SEGMENT_REMAP,
    opcode::SET_COM_SCAN_MODE,
    // Alternate COM pin map
    opcode::SET_COM_PIN_MAP,
    0x12,
    // Overwritten right after init with the stored contrast
    opcode::SET_CONTRAST,
    0x1F,
    opcode::DISPLAY_RAM,
    opcode::DISPLAY_NORMAL,
    opcode::SET_DISPLAY_CLK_DIV,
    0x80,
    opcode::SET_CHARGE_PUMP,
    0x14,
    // High cap precharge
    opcode::SET_PRECHARGE,
    0x22,
    opcode::SET_VCOMH_DESELECT,
    0x30,
    // Horizontal addressing; the frame packing depends on this
    opcode::SET_MEMORY_ADDR_MODE,
    0x00,
    opcode::DISPLAY_ON,
];

/// Selects columns 0..=127 and pages 0..=7 before a full frame
pub const FULL_FRAME_PREFIX: [u8; 7] = [
    control::CMD_STREAM,
    opcode::SET_COLUMN_RANGE,
    0x00,
    (WIDTH - 1) as u8,
    opcode::SET_PAGE_RANGE,
    0x00,
    (PAGES - 1) as u8,
];

/// How a transfer is interpreted, decided by its first byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Commands; resets the addressing cursor
    Command,
    /// Pixel data appended at the cursor
    Data,
    /// Any other control byte, passed through untouched
    Other(u8),
}

impl FrameKind {
    /// Classify a transfer by its control byte
    pub fn of(frame: &[u8]) -> Option<Self> {
        frame.first().map(|&b| match b {
            control::CMD_STREAM => FrameKind::Command,
            control::DATA_STREAM => FrameKind::Data,
            other => FrameKind::Other(other),
        })
    }
}

/// Command-stream frame setting the contrast register
pub fn contrast_frame(level: u8) -> [u8; 3] {
    [control::CMD_STREAM, opcode::SET_CONTRAST, level]
}

/// Command-stream frame selecting normal or inverted polarity
pub fn invert_frame(inverted: bool) -> [u8; 2] {
    let op = if inverted {
        opcode::DISPLAY_INVERTED
    } else {
        opcode::DISPLAY_NORMAL
    };
    [control::CMD_STREAM, op]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry() {
        assert_eq!(PAGES, 8);
        assert_eq!(FRAME_BYTES, 1024);
        assert_eq!(FRAME_BYTES % CHUNK_SIZE, 0);
    }

    #[test]
    fn test_init_sequence_bytes() {
        assert_eq!(
            INIT_SEQUENCE,
            [
                0x00, 0xAE, 0xA8, 0x3F, 0xD3, 0x00, 0x40, 0xA1, 0xC8, 0xDA, 0x12, 0x81, 0x1F,
                0xA4, 0xA6, 0xD5, 0x80, 0x8D, 0x14, 0xD9, 0x22, 0xDB, 0x30, 0x20, 0x00, 0xAF,
            ]
        );
    }

    #[test]
    fn test_full_frame_prefix() {
        assert_eq!(FULL_FRAME_PREFIX, [0x00, 0x21, 0x00, 0x7F, 0x22, 0x00, 0x07]);
    }

    #[test]
    fn test_frame_kind() {
        assert_eq!(FrameKind::of(&[0x00, 0xAF]), Some(FrameKind::Command));
        assert_eq!(FrameKind::of(&[0x40, 0xFF]), Some(FrameKind::Data));
        assert_eq!(FrameKind::of(&[0x80, 0xAF]), Some(FrameKind::Other(0x80)));
        assert_eq!(FrameKind::of(&[]), None);
    }

    #[test]
    fn test_small_frames() {
        assert_eq!(contrast_frame(0x80), [0x00, 0x81, 0x80]);
        assert_eq!(invert_frame(true), [0x00, 0xA7]);
        assert_eq!(invert_frame(false), [0x00, 0xA6]);
    }
}
