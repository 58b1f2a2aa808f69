//! 16x2 HD44780 character display behind a PCF8574 I2C backpack.

use embassy_stm32::i2c::{Error, I2c};
use embassy_stm32::mode::Blocking;
use embassy_time::{Duration, block_for};
use heapless::String;

pub const LCD_ADDRESS: u8 = 0x27;
pub const LCD_COLUMNS: usize = 16;

const RS: u8 = 0b0000_0001;
const ENABLE: u8 = 0b0000_0100;
const BACKLIGHT: u8 = 0b0000_1000;

const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_LEFT: u8 = 0x06;
const CMD_DISPLAY_ON: u8 = 0x0C;
const CMD_FOUR_BIT_TWO_LINE: u8 = 0x28;
const CMD_SET_DDRAM: u8 = 0x80;
const ROW_OFFSETS: [u8; 2] = [0x00, 0x40];

type Row = String<LCD_COLUMNS>;

pub struct Lcd<'d> {
    i2c: I2c<'d, Blocking>,
    address: u8,
    rows: [Row; 2],
}

impl<'d> Lcd<'d> {
    pub fn new(i2c: I2c<'d, Blocking>, address: u8) -> Self {
        Self {
            i2c,
            address,
            rows: [Row::new(), Row::new()],
        }
    }

    /// Runs the 4-bit power-on sequence and clears the panel.
    pub fn init(&mut self) -> Result<(), Error> {
        block_for(Duration::from_millis(50));
        for wait in [4_500, 4_500, 150] {
            self.pulse(0x30)?;
            block_for(Duration::from_micros(wait));
        }
        self.pulse(0x20)?;
        for command in [CMD_FOUR_BIT_TWO_LINE, CMD_DISPLAY_ON, CMD_ENTRY_LEFT, CMD_CLEAR] {
            self.command(command)?;
        }
        block_for(Duration::from_millis(2));
        Ok(())
    }

    /// Writes both rows, skipping any row that already shows the same text.
    /// Text beyond the panel width is cut off.
    pub fn show(&mut self, line1: &str, line2: &str) -> Result<(), Error> {
        for (index, text) in [line1, line2].into_iter().enumerate() {
            let row = fit_row(text);
            if self.rows[index] == row {
                continue;
            }
            self.write_row(index, &row)?;
            self.rows[index] = row;
        }
        Ok(())
    }

    fn write_row(&mut self, index: usize, row: &Row) -> Result<(), Error> {
        self.command(CMD_SET_DDRAM | ROW_OFFSETS[index])?;
        for byte in row.bytes() {
            self.write_byte(byte, RS)?;
        }
        Ok(())
    }

    fn command(&mut self, command: u8) -> Result<(), Error> {
        self.write_byte(command, 0)
    }

    fn write_byte(&mut self, value: u8, flags: u8) -> Result<(), Error> {
        self.pulse((value & 0xF0) | flags)?;
        self.pulse((value << 4) | flags)
    }

    fn pulse(&mut self, bits: u8) -> Result<(), Error> {
        let bits = bits | BACKLIGHT;
        self.i2c
            .blocking_write(self.address, &[bits | ENABLE, bits & !ENABLE])?;
        block_for(Duration::from_micros(50));
        Ok(())
    }
}

/// Pads or truncates `text` to exactly one row of ASCII.
fn fit_row(text: &str) -> Row {
    let mut row = Row::new();
    for ch in text.chars().take(LCD_COLUMNS) {
        let _ = row.push(if ch.is_ascii() { ch } else { '?' });
    }
    while row.len() < LCD_COLUMNS {
        let _ = row.push(' ');
    }
    row
}
