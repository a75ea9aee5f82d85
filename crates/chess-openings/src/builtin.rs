//! Built-in opening dictionary.
//!
//! This module provides the openings that are compiled into the library.
//! Each line stops at a position that is still well inside theory, so the
//! analysis starts where the known moves run out.

use crate::database::OpeningDictionary;
use crate::opening::Opening;

/// Creates the built-in opening dictionary.
#[must_use]
pub fn builtin_dictionary() -> OpeningDictionary {
    OpeningDictionary::with_openings(vec![
        // Open Catalan with ...Nc6 and ...Qd5
        Opening::new(
            "E04",
            "Catalan",
            vec![
                "d4", "Nf6", "c4", "e6", "Nf3", "d5", "g3", "Be7", "Bg2", "O-O", "O-O", "dxc4",
                "Qc2", "a6", "a4", "Nc6", "Qxc4", "Qd5",
            ],
        ),
        Opening::new(
            "C84",
            "Ruy Lopez",
            vec!["e4", "e5", "Nf3", "Nc6", "Bb5", "a6", "Ba4", "Nf6", "O-O", "Be7"],
        ),
        Opening::new(
            "B90",
            "Sicilian Najdorf",
            vec!["e4", "c5", "Nf3", "d6", "d4", "cxd4", "Nxd4", "Nf6", "Nc3", "a6"],
        ),
        Opening::new(
            "D53",
            "Queen's Gambit Declined",
            vec!["d4", "d5", "c4", "e6", "Nc3", "Nf6", "Bg5", "Be7"],
        ),
        Opening::new(
            "E90",
            "King's Indian Defense",
            vec!["d4", "Nf6", "c4", "g6", "Nc3", "Bg7", "e4", "d6", "Nf3", "O-O"],
        ),
        Opening::new(
            "E32",
            "Nimzo-Indian Defense",
            vec!["d4", "Nf6", "c4", "e6", "Nc3", "Bb4", "Qc2", "O-O"],
        ),
        Opening::new(
            "D15",
            "Slav Defense",
            vec!["d4", "d5", "c4", "c6", "Nf3", "Nf6", "Nc3", "dxc4"],
        ),
        Opening::new(
            "C15",
            "French Winawer",
            vec!["e4", "e6", "d4", "d5", "Nc3", "Bb4"],
        ),
        Opening::new(
            "B18",
            "Caro-Kann Classical",
            vec!["e4", "c6", "d4", "d5", "Nc3", "dxe4", "Nxe4", "Bf5"],
        ),
        Opening::new(
            "C54",
            "Italian Game",
            vec!["e4", "e5", "Nf3", "Nc6", "Bc4", "Bc5", "c3", "Nf6"],
        ),
        Opening::new(
            "D02",
            "London System",
            vec!["d4", "d5", "Bf4", "Nf6", "e3", "e6", "Nf3", "c5"],
        ),
        Opening::new(
            "A29",
            "English Four Knights",
            vec!["c4", "e5", "Nc3", "Nf6", "Nf3", "Nc6"],
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_contains_catalan() {
        let dictionary = builtin_dictionary();
        let catalan = dictionary.get("catalan").unwrap();
        assert_eq!(catalan.eco, "E04");
        assert_eq!(catalan.plies(), 18);
        assert_eq!(catalan.moves.last().map(String::as_str), Some("Qd5"));
    }

    #[test]
    fn test_builtin_names_are_unique() {
        let dictionary = builtin_dictionary();
        assert_eq!(dictionary.len(), 12);
    }

    #[test]
    fn test_builtin_lines_are_non_empty() {
        for opening in builtin_dictionary().all() {
            assert!(!opening.moves.is_empty(), "{} has no moves", opening.name);
            assert!(!opening.eco.is_empty(), "{} has no ECO code", opening.name);
        }
    }
}
