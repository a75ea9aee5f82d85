//! Offline candidates from an opening book.

use chess_analysis::{CandidateError, CandidateMove, CandidateSource, Position, PositionError};
use chess_openings::{MoveBook, Opening};
use tracing::debug;

/// Build a move book from opening lines: every position along a line gets the
/// line's next move, weighted by how many lines continue that way.
///
/// # Errors
///
/// Returns the [`PositionError`] of the first line that is not legal.
pub fn book_from_openings<'a>(
    openings: impl IntoIterator<Item = &'a Opening>,
) -> Result<MoveBook, PositionError> {
    let mut book = MoveBook::new();
    for opening in openings {
        let mut position = Position::startpos();
        for (index, san) in opening.moves.iter().enumerate() {
            let mv = position
                .parse_san(san)
                .map_err(|e| PositionError::IllegalLine {
                    ply: index + 1,
                    source: Box::new(e),
                })?;
            book.add_move(position.key(), mv.san(), 1);
            position = position.play(&mv)?;
        }
    }
    Ok(book)
}

/// Candidate source over a [`MoveBook`], keyed by [`Position::key`].
pub struct BookCandidates {
    book: MoveBook,
}

impl BookCandidates {
    pub fn new(book: MoveBook) -> Self {
        Self { book }
    }

    pub fn book(&self) -> &MoveBook {
        &self.book
    }
}

impl CandidateSource for BookCandidates {
    fn candidates(&self, position: &Position) -> Result<Vec<CandidateMove>, CandidateError> {
        let Some(entries) = self.book.lookup(&position.key()) else {
            return Ok(Vec::new());
        };

        Ok(entries
            .iter()
            .filter_map(|entry| match position.parse_san(&entry.san) {
                Ok(mv) => Some(CandidateMove::new(mv, Some(u64::from(entry.weight)))),
                Err(err) => {
                    debug!(san = %entry.san, error = %err, "skipping book move");
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_openings::BookMove;

    #[test]
    fn test_book_counts_shared_prefixes() {
        let openings = [
            Opening::new("C84", "Ruy Lopez", vec!["e4", "e5", "Nf3", "Nc6", "Bb5"]),
            Opening::new("C54", "Italian Game", vec!["e4", "e5", "Nf3", "Nc6", "Bc4"]),
            Opening::new("B90", "Sicilian", vec!["e4", "c5"]),
        ];
        let book = book_from_openings(&openings).unwrap();
        let source = BookCandidates::new(book);

        let start = Position::startpos();
        let first = source.candidates(&start).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].mv.san(), "e4");
        assert_eq!(first[0].frequency, Some(3));

        let after_e4 = start.play(&first[0].mv).unwrap();
        let replies: Vec<(String, Option<u64>)> = source
            .candidates(&after_e4)
            .unwrap()
            .into_iter()
            .map(|c| (c.mv.san().to_string(), c.frequency))
            .collect();
        assert_eq!(
            replies,
            vec![("e5".to_string(), Some(2)), ("c5".to_string(), Some(1))]
        );
    }

    #[test]
    fn test_unknown_position_has_no_candidates() {
        let source = BookCandidates::new(MoveBook::new());
        assert!(source.candidates(&Position::startpos()).unwrap().is_empty());
    }

    #[test]
    fn test_illegal_book_entries_are_skipped() {
        let mut book = MoveBook::new();
        book.add_position(
            Position::startpos().key(),
            vec![BookMove::new("Ke2", 9), BookMove::new("d4", 4)],
        );
        let moves = BookCandidates::new(book)
            .candidates(&Position::startpos())
            .unwrap();
        assert_eq!(moves.len(), 1);
        assert_eq!(moves[0].mv.san(), "d4");
    }

    #[test]
    fn test_illegal_line_reports_ply() {
        let openings = [Opening::new("A00", "Broken", vec!["e4", "e4"])];
        let err = book_from_openings(&openings).unwrap_err();
        assert!(matches!(err, PositionError::IllegalLine { ply: 2, .. }));
    }
}
