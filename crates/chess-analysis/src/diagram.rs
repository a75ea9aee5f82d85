//! SVG board diagrams.
//!
//! Diagrams are drawn from White's side with Unicode piece glyphs, file and
//! rank coordinates, and the squares of the last move highlighted.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::position::{ChessMove, Position};

const SQUARE: u32 = 45;
const BOARD: u32 = SQUARE * 8;
const LIGHT: &str = "#f0d9b5";
const DARK: &str = "#b58863";
const HIGHLIGHT: &str = "#cdd26a";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to write diagram: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces an image of a position under a caller-chosen identifier.
pub trait DiagramRenderer: Sync {
    /// Render `position`, returning where the image was stored, or `None` if
    /// this renderer does not produce files.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the image cannot be stored.
    fn render(
        &self,
        position: &Position,
        last_move: Option<&ChessMove>,
        id: &str,
    ) -> Result<Option<PathBuf>, RenderError>;
}

/// Renders nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiagrams;

impl DiagramRenderer for NoDiagrams {
    fn render(
        &self,
        _position: &Position,
        _last_move: Option<&ChessMove>,
        _id: &str,
    ) -> Result<Option<PathBuf>, RenderError> {
        Ok(None)
    }
}

/// Writes `<id>.svg` files into a directory.
#[derive(Debug, Clone)]
pub struct SvgDiagrams {
    dir: PathBuf,
    size: u32,
}

impl SvgDiagrams {
    /// `size` is the width and height of the image in pixels.
    pub fn new(dir: impl Into<PathBuf>, size: u32) -> Self {
        Self {
            dir: dir.into(),
            size,
        }
    }
}

impl DiagramRenderer for SvgDiagrams {
    fn render(
        &self,
        position: &Position,
        last_move: Option<&ChessMove>,
        id: &str,
    ) -> Result<Option<PathBuf>, RenderError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.svg", file_stem(id)));
        fs::write(&path, render_svg(position, last_move, self.size))?;
        debug!(path = %path.display(), "diagram written");
        Ok(Some(path))
    }
}

/// Build the SVG document for a position.
#[must_use]
pub fn render_svg(position: &Position, last_move: Option<&ChessMove>, size: u32) -> String {
    let highlighted = last_move
        .map(|mv| {
            let uci = mv.uci();
            [uci.get(0..2), uci.get(2..4)]
                .into_iter()
                .flatten()
                .filter_map(square_coords)
                .collect()
        })
        .unwrap_or_default();

    SvgBoard {
        placement: position.placement(),
        highlighted,
        size,
    }
    .to_string()
}

struct SvgBoard {
    placement: String,
    highlighted: Vec<(usize, usize)>,
    size: u32,
}

impl fmt::Display for SvgBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.size;
        writeln!(
            f,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{size}" height="{size}" viewBox="0 0 {BOARD} {BOARD}">"#
        )?;

        for row in 0..8 {
            for col in 0..8 {
                let fill = if self.highlighted.contains(&(row, col)) {
                    HIGHLIGHT
                } else if (row + col) % 2 == 0 {
                    LIGHT
                } else {
                    DARK
                };
                writeln!(
                    f,
                    r#"  <rect x="{}" y="{}" width="{SQUARE}" height="{SQUARE}" fill="{fill}"/>"#,
                    col as u32 * SQUARE,
                    row as u32 * SQUARE
                )?;
            }
        }

        for (index, file) in ('a'..='h').enumerate() {
            let color = if (7 + index) % 2 == 0 { DARK } else { LIGHT };
            writeln!(
                f,
                r#"  <text x="{}" y="{}" font-size="9" fill="{color}">{file}</text>"#,
                index as u32 * SQUARE + SQUARE - 8,
                BOARD - 3
            )?;
        }
        for row in 0..8u32 {
            let color = if row % 2 == 0 { DARK } else { LIGHT };
            writeln!(
                f,
                r#"  <text x="2" y="{}" font-size="9" fill="{color}">{}</text>"#,
                row * SQUARE + 10,
                8 - row
            )?;
        }

        for (row, col, symbol) in pieces(&self.placement) {
            writeln!(
                f,
                r#"  <text x="{}" y="{}" font-size="38" text-anchor="middle">{symbol}</text>"#,
                col as u32 * SQUARE + SQUARE / 2,
                row as u32 * SQUARE + SQUARE - 9
            )?;
        }

        writeln!(f, "</svg>")
    }
}

/// Pieces of a FEN placement as (row, column, glyph), row 0 being rank 8.
fn pieces(placement: &str) -> Vec<(usize, usize, char)> {
    let mut pieces = Vec::new();
    for (row, rank) in placement.split('/').enumerate() {
        let mut col = 0;
        for c in rank.chars() {
            if let Some(skip) = c.to_digit(10) {
                col += skip as usize;
            } else {
                if let Some(symbol) = piece_to_symbol(c) {
                    pieces.push((row, col, symbol));
                }
                col += 1;
            }
        }
    }
    pieces
}

/// Convert a FEN piece character to its Unicode chess symbol.
const fn piece_to_symbol(piece: char) -> Option<char> {
    match piece {
        'K' => Some('\u{2654}'),
        'Q' => Some('\u{2655}'),
        'R' => Some('\u{2656}'),
        'B' => Some('\u{2657}'),
        'N' => Some('\u{2658}'),
        'P' => Some('\u{2659}'),
        'k' => Some('\u{265A}'),
        'q' => Some('\u{265B}'),
        'r' => Some('\u{265C}'),
        'b' => Some('\u{265D}'),
        'n' => Some('\u{265E}'),
        'p' => Some('\u{265F}'),
        _ => None,
    }
}

fn square_coords(square: &str) -> Option<(usize, usize)> {
    let mut chars = square.chars();
    let file = chars.next()?;
    let rank = chars.next()?.to_digit(10)?;
    if !('a'..='h').contains(&file) || !(1..=8).contains(&rank) {
        return None;
    }
    Some((8 - rank as usize, file as usize - 'a' as usize))
}

fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pieces_from_starting_position() {
        let placement = Position::startpos().placement();
        let pieces = pieces(&placement);
        assert_eq!(pieces.len(), 32);
        assert!(pieces.contains(&(7, 4, '\u{2654}')));
        assert!(pieces.contains(&(0, 3, '\u{265B}')));
    }

    #[test]
    fn test_square_coords() {
        assert_eq!(square_coords("a8"), Some((0, 0)));
        assert_eq!(square_coords("h1"), Some((7, 7)));
        assert_eq!(square_coords("e4"), Some((4, 4)));
        assert_eq!(square_coords("z9"), None);
    }

    #[test]
    fn test_svg_highlights_last_move() {
        let start = Position::startpos();
        let e4 = start.parse_uci("e2e4").unwrap();
        let after = start.play(&e4).unwrap();

        let svg = render_svg(&after, Some(&e4), 400);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"width="400""#));
        assert_eq!(svg.matches(HIGHLIGHT).count(), 2);
        assert_eq!(svg.matches("font-size=\"38\"").count(), 32);

        let plain = render_svg(&after, None, 400);
        assert_eq!(plain.matches(HIGHLIGHT).count(), 0);
    }

    #[test]
    fn test_svg_diagrams_write_files() {
        let dir = TempDir::new().unwrap();
        let renderer = SvgDiagrams::new(dir.path().join("diagrams"), 300);

        let path = renderer
            .render(&Position::startpos(), None, "variation 1/final")
            .unwrap()
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "variation_1_final.svg");
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("</svg>"));
    }

    #[test]
    fn test_no_diagrams() {
        assert!(NoDiagrams.render(&Position::startpos(), None, "x").unwrap().is_none());
    }
}
