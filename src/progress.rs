use std::io::{self, Write};

const ERROR_BYTE: u8 = 0x01;
const RENDER_BYTE: u8 = 0x10;
const COMPOSITE_BYTE: u8 = 0x20;
const IMAGE_BYTE: u8 = 0x30;
const PARSE_BYTE: u8 = 0x40;
const END_BYTE: u8 = 0xf0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProgressMode {
    Silent,
    Text,
    /// Machine-readable frames on stdout: four lowercase hex digits
    /// `<type><value>` per tick, plus an error frame carrying its message.
    Binary,
}

#[derive(Clone, Copy, Debug)]
pub struct Progress {
    mode: ProgressMode,
}

impl Progress {
    pub fn new(mode: ProgressMode) -> Self {
        Self { mode }
    }

    fn frame(ty: u8, value: u8) {
        print!("{:02x}{:02x}", ty, value);
        let _ = io::stdout().flush();
    }

    fn frame_scaled(ty: u8, part: usize, whole: usize) {
        let value = if whole == 0 {
            0xff
        } else {
            ((part * 0xff) / whole) as u8
        };
        Self::frame(ty, value);
    }

    fn text_tick(i: usize, all: usize) {
        if i == all {
            println!("{:>6}", "done!");
        } else if i % 50 == 0 && i > 0 {
            print!(".");
            let _ = io::stdout().flush();
            if i % 1000 == 0 {
                println!("{:>8} {}%", i, (i * 100) / all);
            }
        }
    }

    /// One considered file during the broad phase; the total is unknown.
    pub fn parse_tick(&self, i: usize) {
        match self.mode {
            ProgressMode::Silent => {}
            ProgressMode::Text => {
                if i % 50 == 0 && i > 0 {
                    print!(".");
                    let _ = io::stdout().flush();
                    if i % 1000 == 0 {
                        println!("{:>8} ?%", i);
                    }
                }
            }
            ProgressMode::Binary => {
                Self::frame(PARSE_BYTE, if i % 1000 == 0 { 1 } else { 0 });
            }
        }
    }

    pub fn parse_done(&self) {
        match self.mode {
            ProgressMode::Silent => {}
            ProgressMode::Text => println!("{:>6}", "done!"),
            ProgressMode::Binary => Self::frame(PARSE_BYTE, 2),
        }
    }

    pub fn render_tick(&self, i: usize, all: usize) {
        match self.mode {
            ProgressMode::Silent => {}
            ProgressMode::Text => Self::text_tick(i, all),
            ProgressMode::Binary => Self::frame_scaled(RENDER_BYTE, i, all),
        }
    }

    /// Compositing shares the render pass, so text mode folds it into the
    /// render dots; binary consumers get their own frame type.
    pub fn composite_tick(&self, i: usize, all: usize) {
        if self.mode == ProgressMode::Binary {
            Self::frame_scaled(COMPOSITE_BYTE, i, all);
        }
    }

    pub fn image_tick(&self, row: usize, rows: usize) {
        match self.mode {
            ProgressMode::Silent => {}
            ProgressMode::Text => Self::text_tick(row, rows),
            ProgressMode::Binary => Self::frame_scaled(IMAGE_BYTE, row, rows),
        }
    }

    /// A line of operator chatter; suppressed unless in text mode.
    pub fn note(&self, line: &str) {
        if self.mode == ProgressMode::Text {
            println!("{}", line);
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            ProgressMode::Binary => {
                print!("{:02x}{}", ERROR_BYTE, message);
                let _ = io::stdout().flush();
            }
            _ => eprintln!("carta: {}", message),
        }
    }

    pub fn end(&self) {
        match self.mode {
            ProgressMode::Binary => {
                print!("{:02x}", END_BYTE);
                let _ = io::stdout().flush();
            }
            ProgressMode::Text => println!("carta: all done!"),
            ProgressMode::Silent => {}
        }
    }
}
