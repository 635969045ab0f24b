use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use carta_image::Color;

use crate::{MaterialTable, SIDE_DARKEN};

#[derive(Debug)]
pub enum PaletteError {
    Io(io::Error),
    /// Line number plus what went wrong on it.
    Syntax(usize, String),
}

impl fmt::Display for PaletteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaletteError::Io(e) => write!(f, "palette i/o error: {}", e),
            PaletteError::Syntax(line, why) => write!(f, "palette line {}: {}", line, why),
        }
    }
}

impl std::error::Error for PaletteError {}

impl From<io::Error> for PaletteError {
    fn from(e: io::Error) -> Self {
        PaletteError::Io(e)
    }
}

/// Parse `R,G,B` or `R,G,B,A` (alpha defaults to 255).
pub fn parse_color_spec(spec: &str) -> Result<Color, String> {
    let parts: Vec<&str> = spec.split(',').collect();
    if parts.len() != 3 && parts.len() != 4 {
        return Err(format!(
            "color must be <red>,<green>,<blue>[,<alpha>], not `{}'",
            spec
        ));
    }
    let mut ch = [0u8; 4];
    ch[3] = 0xff;
    for (i, p) in parts.iter().enumerate() {
        ch[i] = p
            .trim()
            .parse::<u8>()
            .map_err(|_| format!("color value must be 0-255, not `{}'", p))?;
    }
    Ok(Color::new(ch[0], ch[1], ch[2], ch[3]))
}

fn resolve_block(table: &MaterialTable, token: &str) -> Result<u8, String> {
    if let Some(id) = table.id_by_name(token) {
        return Ok(id);
    }
    token
        .parse::<u8>()
        .map_err(|_| format!("not a block id or name: `{}'", token))
}

/// Apply a palette file to the table. Rows are whitespace separated:
/// `<block-id-or-name> <base R,G,B[,A]> [<side R,G,B[,A]>]`; `#` starts a
/// comment. A missing side column derives the side from the darkened base.
pub fn load_palette(table: &mut MaterialTable, path: &Path) -> Result<(), PaletteError> {
    let file = BufReader::new(File::open(path)?);
    for (idx, line) in file.lines().enumerate() {
        let line = line?;
        let lineno = idx + 1;

        let mut id = None;
        for (col, token) in line.split_whitespace().enumerate() {
            if token.starts_with('#') {
                break;
            }
            match col {
                0 => {
                    id = Some(
                        resolve_block(table, token)
                            .map_err(|e| PaletteError::Syntax(lineno, e))?,
                    );
                }
                1 => {
                    let c = parse_color_spec(token)
                        .map_err(|e| PaletteError::Syntax(lineno, e))?;
                    let id = id.expect("column 0 precedes column 1");
                    table.set_base(id, c);
                }
                2 => {
                    let c = parse_color_spec(token)
                        .map_err(|e| PaletteError::Syntax(lineno, e))?;
                    let id = id.expect("column 0 precedes column 2");
                    table.set_side(id, c);
                }
                _ => {
                    return Err(PaletteError::Syntax(lineno, "too many columns".to_string()));
                }
            }
        }
    }
    Ok(())
}

fn fmt_color(c: Color) -> String {
    format!("{},{},{},{}", c.r, c.g, c.b, c.a)
}

/// Write the whole table in the palette format `load_palette` reads.
pub fn write_palette(table: &MaterialTable, path: &Path) -> Result<(), PaletteError> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(
        out,
        "#{:<20}{:<16} {:<16}",
        "<block-id>", "<base R,G,B,A>", "<side R,G,B,A>"
    )?;
    for (_, m) in table.iter() {
        writeln!(
            out,
            "{:<21}{:<16} {:<16}",
            m.name,
            fmt_color(m.base),
            fmt_color(m.side)
        )?;
    }
    out.flush()?;
    Ok(())
}
