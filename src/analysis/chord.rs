//! Chord labels and chord-name notation
//!
//! The single place where chords are named. Two notations are supported and
//! both round-trip exactly:
//!
//! - colon notation (`root:quality`), used internally and by detector
//!   back-ends: `"C:maj"`, `"D:min"`, `"G:7"`, `"B:hdim7"`, `"N"`
//! - display notation, used for output: `"C"`, `"Dm"`, `"G7"`, `"Bm7b5"`, `"N"`
//!
//! Parsing is lenient (flats, `min`, `-`, `°`, `ø`, `+`, Harte bass notes),
//! formatting is canonical (sharps, shortest common suffix).
//!
//! ```
//! use stratum_chords::analysis::chord::{ChordLabel, ChordQuality, PitchClass};
//!
//! let label: ChordLabel = "Bb:min7".parse().unwrap();
//! assert_eq!(label, ChordLabel::chord(PitchClass::new(10), ChordQuality::Minor7));
//! assert_eq!(label.to_string(), "A#m7");
//! assert_eq!(label.to_colon(), "A#:min7");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Pitch class (0 = C, 1 = C#, ..., 11 = B)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PitchClass(u8);

impl PitchClass {
    /// Create a pitch class, wrapping values >= 12
    pub fn new(index: u8) -> Self {
        Self(index % 12)
    }

    /// Index in 0..12
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Transpose upward by `semitones`
    pub fn transpose(self, semitones: u8) -> Self {
        Self::new(self.0 + semitones % 12)
    }

    /// Note name with sharp spelling
    pub fn name(self) -> &'static str {
        NOTE_NAMES[self.index()]
    }

    /// All twelve pitch classes, C first
    pub fn all() -> impl Iterator<Item = PitchClass> {
        (0..12u8).map(PitchClass)
    }

    /// Parse a leading note name (`C`, `C#`, `Db`, `E♭`, ...)
    ///
    /// Returns the pitch class and the unparsed remainder.
    fn parse_prefix(s: &str) -> Option<(Self, &str)> {
        let mut chars = s.chars();
        let letter = chars.next()?;
        let natural: u8 = match letter.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return None,
        };
        let rest = &s[letter.len_utf8()..];
        let mut accidental_chars = rest.chars();
        match accidental_chars.next() {
            Some(c @ ('#' | '♯')) => Some((Self::new(natural + 1), &rest[c.len_utf8()..])),
            Some(c @ ('b' | '♭')) => Some((Self::new(natural + 11), &rest[c.len_utf8()..])),
            _ => Some((Self(natural), rest)),
        }
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Chord quality
///
/// Variants are declared from simplest to most extended; the declaration
/// order is the tie-break order used when two templates score equally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChordQuality {
    /// Major triad (1 3 5)
    Major,
    /// Minor triad (1 b3 5)
    Minor,
    /// Dominant seventh (1 3 5 b7)
    Dominant7,
    /// Minor seventh (1 b3 5 b7)
    Minor7,
    /// Major seventh (1 3 5 7)
    Major7,
    /// Suspended fourth (1 4 5)
    Sus4,
    /// Suspended second (1 2 5)
    Sus2,
    /// Major sixth (1 3 5 6)
    Sixth,
    /// Diminished triad (1 b3 b5)
    Diminished,
    /// Augmented triad (1 3 #5)
    Augmented,
    /// Half-diminished seventh (1 b3 b5 b7)
    HalfDiminished7,
    /// Diminished seventh (1 b3 b5 bb7)
    Diminished7,
    /// Minor-major seventh (1 b3 5 7)
    MinorMajor7,
}

impl ChordQuality {
    /// Every quality, simplest first
    pub const ALL: [ChordQuality; 13] = [
        ChordQuality::Major,
        ChordQuality::Minor,
        ChordQuality::Dominant7,
        ChordQuality::Minor7,
        ChordQuality::Major7,
        ChordQuality::Sus4,
        ChordQuality::Sus2,
        ChordQuality::Sixth,
        ChordQuality::Diminished,
        ChordQuality::Augmented,
        ChordQuality::HalfDiminished7,
        ChordQuality::Diminished7,
        ChordQuality::MinorMajor7,
    ];

    /// Chord tones as semitone offsets from the root
    pub fn intervals(self) -> &'static [usize] {
        match self {
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
            ChordQuality::Dominant7 => &[0, 4, 7, 10],
            ChordQuality::Minor7 => &[0, 3, 7, 10],
            ChordQuality::Major7 => &[0, 4, 7, 11],
            ChordQuality::Sus4 => &[0, 5, 7],
            ChordQuality::Sus2 => &[0, 2, 7],
            ChordQuality::Sixth => &[0, 4, 7, 9],
            ChordQuality::Diminished => &[0, 3, 6],
            ChordQuality::Augmented => &[0, 4, 8],
            ChordQuality::HalfDiminished7 => &[0, 3, 6, 10],
            ChordQuality::Diminished7 => &[0, 3, 6, 9],
            ChordQuality::MinorMajor7 => &[0, 3, 7, 11],
        }
    }

    /// Position in the simplicity ordering (0 = simplest)
    pub fn complexity_rank(self) -> usize {
        self as usize
    }

    /// True for major and minor triads
    pub fn is_basic_triad(self) -> bool {
        matches!(self, ChordQuality::Major | ChordQuality::Minor)
    }

    /// Quality part of colon notation (`maj`, `min`, `7`, ...)
    pub fn colon_suffix(self) -> &'static str {
        match self {
            ChordQuality::Major => "maj",
            ChordQuality::Minor => "min",
            ChordQuality::Dominant7 => "7",
            ChordQuality::Minor7 => "min7",
            ChordQuality::Major7 => "maj7",
            ChordQuality::Sus4 => "sus4",
            ChordQuality::Sus2 => "sus2",
            ChordQuality::Sixth => "maj6",
            ChordQuality::Diminished => "dim",
            ChordQuality::Augmented => "aug",
            ChordQuality::HalfDiminished7 => "hdim7",
            ChordQuality::Diminished7 => "dim7",
            ChordQuality::MinorMajor7 => "minmaj7",
        }
    }

    /// Quality part of display notation (`""`, `m`, `7`, ...)
    pub fn display_suffix(self) -> &'static str {
        match self {
            ChordQuality::Major => "",
            ChordQuality::Minor => "m",
            ChordQuality::Dominant7 => "7",
            ChordQuality::Minor7 => "m7",
            ChordQuality::Major7 => "maj7",
            ChordQuality::Sus4 => "sus4",
            ChordQuality::Sus2 => "sus2",
            ChordQuality::Sixth => "6",
            ChordQuality::Diminished => "dim",
            ChordQuality::Augmented => "aug",
            ChordQuality::HalfDiminished7 => "m7b5",
            ChordQuality::Diminished7 => "dim7",
            ChordQuality::MinorMajor7 => "mMaj7",
        }
    }

    /// Parse a quality suffix in either notation or a common alias
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        let quality = match suffix {
            "" | "maj" | "M" => ChordQuality::Major,
            "m" | "min" | "-" => ChordQuality::Minor,
            "7" | "dom7" => ChordQuality::Dominant7,
            "m7" | "min7" | "-7" => ChordQuality::Minor7,
            "maj7" | "M7" | "Δ" | "Δ7" => ChordQuality::Major7,
            "sus4" | "sus" => ChordQuality::Sus4,
            "sus2" => ChordQuality::Sus2,
            "6" | "maj6" => ChordQuality::Sixth,
            "dim" | "°" | "o" => ChordQuality::Diminished,
            "aug" | "+" => ChordQuality::Augmented,
            "m7b5" | "hdim7" | "ø" | "ø7" | "min7b5" => ChordQuality::HalfDiminished7,
            "dim7" | "°7" | "o7" => ChordQuality::Diminished7,
            "mMaj7" | "minmaj7" | "mM7" | "m(maj7)" => ChordQuality::MinorMajor7,
            _ => return None,
        };
        Some(quality)
    }
}

/// A chord label: a root and quality, or the explicit no-chord label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChordLabel {
    /// No confident chord identified
    NoChord,
    /// A chord with a root and a quality
    Chord {
        /// Root pitch class
        root: PitchClass,
        /// Chord quality
        quality: ChordQuality,
    },
}

impl ChordLabel {
    /// Shorthand constructor
    pub fn chord(root: PitchClass, quality: ChordQuality) -> Self {
        ChordLabel::Chord { root, quality }
    }

    /// True for [`ChordLabel::NoChord`]
    pub fn is_no_chord(&self) -> bool {
        matches!(self, ChordLabel::NoChord)
    }

    /// Root, if this is a chord
    pub fn root(&self) -> Option<PitchClass> {
        match self {
            ChordLabel::NoChord => None,
            ChordLabel::Chord { root, .. } => Some(*root),
        }
    }

    /// Quality, if this is a chord
    pub fn quality(&self) -> Option<ChordQuality> {
        match self {
            ChordLabel::NoChord => None,
            ChordLabel::Chord { quality, .. } => Some(*quality),
        }
    }

    /// Colon notation (`"C:maj"`, `"N"`)
    pub fn to_colon(&self) -> String {
        match self {
            ChordLabel::NoChord => "N".to_string(),
            ChordLabel::Chord { root, quality } => {
                format!("{}:{}", root.name(), quality.colon_suffix())
            }
        }
    }

    /// Pitch classes sounding in this chord (empty for no-chord)
    pub fn pitch_classes(&self) -> Vec<PitchClass> {
        match self {
            ChordLabel::NoChord => Vec::new(),
            ChordLabel::Chord { root, quality } => quality
                .intervals()
                .iter()
                .map(|&i| root.transpose(i as u8))
                .collect(),
        }
    }

    /// Harmonic similarity: identical, same root, or relative major/minor
    pub fn is_similar(&self, other: &ChordLabel) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (
                ChordLabel::Chord { root: a, quality: qa },
                ChordLabel::Chord { root: b, quality: qb },
            ) => {
                if a == b {
                    return true;
                }
                let relative = |major: PitchClass, minor: PitchClass| minor == major.transpose(9);
                match (qa, qb) {
                    (ChordQuality::Major, ChordQuality::Minor) => relative(*a, *b),
                    (ChordQuality::Minor, ChordQuality::Major) => relative(*b, *a),
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

impl fmt::Display for ChordLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChordLabel::NoChord => f.write_str("N"),
            ChordLabel::Chord { root, quality } => {
                write!(f, "{}{}", root.name(), quality.display_suffix())
            }
        }
    }
}

/// Error returned when a chord name cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized chord name: {0:?}")]
pub struct ParseChordError(pub String);

impl FromStr for ChordLabel {
    type Err = ParseChordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if matches!(trimmed, "N" | "X" | "N.C." | "NC" | "") {
            return Ok(ChordLabel::NoChord);
        }

        // Harte bass notes ("C:maj/3", "G7/B") do not change the label
        let without_bass = trimmed.split('/').next().unwrap_or(trimmed);
        let err = || ParseChordError(s.to_string());

        let (root, suffix) = match without_bass.split_once(':') {
            Some((root_str, quality_str)) => {
                let (root, rest) = PitchClass::parse_prefix(root_str).ok_or_else(err)?;
                if !rest.is_empty() {
                    return Err(err());
                }
                (root, quality_str)
            }
            None => PitchClass::parse_prefix(without_bass).ok_or_else(err)?,
        };

        let quality = ChordQuality::from_suffix(suffix).ok_or_else(err)?;
        Ok(ChordLabel::chord(root, quality))
    }
}

impl Serialize for ChordLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChordLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(root: u8, quality: ChordQuality) -> ChordLabel {
        ChordLabel::chord(PitchClass::new(root), quality)
    }

    #[test]
    fn test_display_names() {
        assert_eq!(c(0, ChordQuality::Major).to_string(), "C");
        assert_eq!(c(2, ChordQuality::Minor).to_string(), "Dm");
        assert_eq!(c(7, ChordQuality::Dominant7).to_string(), "G7");
        assert_eq!(c(11, ChordQuality::HalfDiminished7).to_string(), "Bm7b5");
        assert_eq!(c(1, ChordQuality::MinorMajor7).to_string(), "C#mMaj7");
        assert_eq!(ChordLabel::NoChord.to_string(), "N");
    }

    #[test]
    fn test_colon_names() {
        assert_eq!(c(0, ChordQuality::Major).to_colon(), "C:maj");
        assert_eq!(c(9, ChordQuality::Minor7).to_colon(), "A:min7");
        assert_eq!(c(5, ChordQuality::Sixth).to_colon(), "F:maj6");
        assert_eq!(ChordLabel::NoChord.to_colon(), "N");
    }

    #[test]
    fn test_roundtrip_both_notations() {
        for root in PitchClass::all() {
            for quality in ChordQuality::ALL {
                let label = ChordLabel::chord(root, quality);
                assert_eq!(label.to_string().parse::<ChordLabel>(), Ok(label));
                assert_eq!(label.to_colon().parse::<ChordLabel>(), Ok(label));
            }
        }
        assert_eq!("N".parse::<ChordLabel>(), Ok(ChordLabel::NoChord));
    }

    #[test]
    fn test_lenient_parsing() {
        assert_eq!("Db".parse::<ChordLabel>(), Ok(c(1, ChordQuality::Major)));
        assert_eq!("Ebmin".parse::<ChordLabel>(), Ok(c(3, ChordQuality::Minor)));
        assert_eq!("F#-7".parse::<ChordLabel>(), Ok(c(6, ChordQuality::Minor7)));
        assert_eq!("Bø".parse::<ChordLabel>(), Ok(c(11, ChordQuality::HalfDiminished7)));
        assert_eq!("G7/B".parse::<ChordLabel>(), Ok(c(7, ChordQuality::Dominant7)));
        assert_eq!("C:maj/3".parse::<ChordLabel>(), Ok(c(0, ChordQuality::Major)));
        assert_eq!("Cb".parse::<ChordLabel>(), Ok(c(11, ChordQuality::Major)));
        assert_eq!("X".parse::<ChordLabel>(), Ok(ChordLabel::NoChord));
    }

    #[test]
    fn test_parse_errors() {
        assert!("H".parse::<ChordLabel>().is_err());
        assert!("Cxyz".parse::<ChordLabel>().is_err());
        assert!("C#x:maj".parse::<ChordLabel>().is_err());
    }

    #[test]
    fn test_pitch_classes() {
        let tones: Vec<usize> = c(9, ChordQuality::Minor)
            .pitch_classes()
            .iter()
            .map(|p| p.index())
            .collect();
        assert_eq!(tones, vec![9, 0, 4]);
        assert!(ChordLabel::NoChord.pitch_classes().is_empty());
    }

    #[test]
    fn test_similarity() {
        let cmaj = c(0, ChordQuality::Major);
        assert!(cmaj.is_similar(&c(0, ChordQuality::Dominant7)));
        assert!(cmaj.is_similar(&c(9, ChordQuality::Minor)));
        assert!(c(9, ChordQuality::Minor).is_similar(&cmaj));
        assert!(!cmaj.is_similar(&c(7, ChordQuality::Major)));
        assert!(!cmaj.is_similar(&ChordLabel::NoChord));
    }

    #[test]
    fn test_serde_uses_display_name() {
        let json = serde_json::to_string(&c(2, ChordQuality::Minor)).unwrap();
        assert_eq!(json, "\"Dm\"");
        let back: ChordLabel = serde_json::from_str("\"D:min\"").unwrap();
        assert_eq!(back, c(2, ChordQuality::Minor));
    }
}
