//! Background color parsing
//!
//! Colors are written as `#RRGGBB` and kept with 16 bits per channel, each
//! 8-bit value scaled by `0x0101` so that `ff` maps to `ffff`.

use std::fmt;

use log::error;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba16 {
    pub red: u16,
    pub green: u16,
    pub blue: u16,
    pub alpha: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("Invalid input format: expected #RRGGBB, got {0:?}")]
    Format(String),
    #[error("Invalid hex digits in {0:?}")]
    Digits(String),
}

impl Rgba16 {
    pub const BLACK: Rgba16 = Rgba16::new(0, 0, 0, 0xffff);

    pub const fn new(red: u16, green: u16, blue: u16, alpha: u16) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Opaque color from 8-bit channels
    pub const fn from_rgb8(red: u8, green: u8, blue: u8) -> Self {
        Self::new(
            red as u16 * 0x0101,
            green as u16 * 0x0101,
            blue as u16 * 0x0101,
            0xffff,
        )
    }

    /// Pixel value for `wl_shm` XRGB8888
    pub fn to_xrgb8888(&self) -> u32 {
        let channel = |value: u16| u32::from(value >> 8);
        0xff00_0000 | (channel(self.red) << 16) | (channel(self.green) << 8) | channel(self.blue)
    }
}

impl Default for Rgba16 {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for Rgba16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}",
            self.red >> 8,
            self.green >> 8,
            self.blue >> 8
        )
    }
}

/// Parses `#RRGGBB`
pub fn parse_color(input: &str) -> Result<Rgba16, ColorError> {
    let digits = match input.strip_prefix('#') {
        Some(digits) if input.len() == 7 => digits,
        _ => return Err(ColorError::Format(input.to_string())),
    };

    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ColorError::Digits(input.to_string()));
    }

    let channel = |at: usize| u8::from_str_radix(&digits[at..at + 2], 16);
    match (channel(0), channel(2), channel(4)) {
        (Ok(red), Ok(green), Ok(blue)) => Ok(Rgba16::from_rgb8(red, green, blue)),
        _ => Err(ColorError::Digits(input.to_string())),
    }
}

/// Like [`parse_color`], but logs the problem and falls back to opaque black
pub fn parse_color_or_black(input: &str) -> Rgba16 {
    parse_color(input).unwrap_or_else(|err| {
        error!("{}", err);
        Rgba16::BLACK
    })
}
