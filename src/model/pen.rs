//! Pen type and pen colour enumerants.
//!
//! Both are integer-backed and keep values they do not recognise in an
//! `Unknown` variant: newer firmware adds tools and colours, and a
//! structurally valid stroke must still decode.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Drawing tool used for a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum PenType {
    Brush1,
    Pencil1,
    BallPoint1,
    Marker1,
    Fineliner1,
    Highlighter1,
    Eraser,
    MechanicalPencil1,
    EraserArea,
    Brush2,
    MechanicalPencil2,
    Pencil2,
    BallPoint2,
    Marker2,
    Fineliner2,
    Highlighter2,
    Caligraphy,
    Shader,
    Unknown(i32),
}

impl PenType {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Brush1 => 0,
            Self::Pencil1 => 1,
            Self::BallPoint1 => 2,
            Self::Marker1 => 3,
            Self::Fineliner1 => 4,
            Self::Highlighter1 => 5,
            Self::Eraser => 6,
            Self::MechanicalPencil1 => 7,
            Self::EraserArea => 8,
            Self::Brush2 => 12,
            Self::MechanicalPencil2 => 13,
            Self::Pencil2 => 14,
            Self::BallPoint2 => 15,
            Self::Marker2 => 16,
            Self::Fineliner2 => 17,
            Self::Highlighter2 => 18,
            Self::Caligraphy => 21,
            Self::Shader => 23,
            Self::Unknown(code) => code,
        }
    }

    /// True for tools whose strokes carry no recognisable ink.
    #[must_use]
    pub const fn is_eraser_or_highlighter(self) -> bool {
        matches!(
            self,
            Self::Eraser | Self::EraserArea | Self::Highlighter1 | Self::Highlighter2
        )
    }
}

impl From<i32> for PenType {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Brush1,
            1 => Self::Pencil1,
            2 => Self::BallPoint1,
            3 => Self::Marker1,
            4 => Self::Fineliner1,
            5 => Self::Highlighter1,
            6 => Self::Eraser,
            7 => Self::MechanicalPencil1,
            8 => Self::EraserArea,
            12 => Self::Brush2,
            13 => Self::MechanicalPencil2,
            14 => Self::Pencil2,
            15 => Self::BallPoint2,
            16 => Self::Marker2,
            17 => Self::Fineliner2,
            18 => Self::Highlighter2,
            21 => Self::Caligraphy,
            23 => Self::Shader,
            other => Self::Unknown(other),
        }
    }
}

impl From<PenType> for i32 {
    fn from(pen: PenType) -> Self {
        pen.code()
    }
}

impl fmt::Display for PenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown({code})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Stroke colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum PenColor {
    Black,
    Grey,
    White,
    Yellow,
    Green,
    Pink,
    Blue,
    Red,
    GreyOverlap,
    Highlight,
    Green2,
    Cyan,
    Magenta,
    Yellow2,
    Unknown(i32),
}

impl PenColor {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Black => 0,
            Self::Grey => 1,
            Self::White => 2,
            Self::Yellow => 3,
            Self::Green => 4,
            Self::Pink => 5,
            Self::Blue => 6,
            Self::Red => 7,
            Self::GreyOverlap => 8,
            Self::Highlight => 9,
            Self::Green2 => 10,
            Self::Cyan => 11,
            Self::Magenta => 12,
            Self::Yellow2 => 13,
            Self::Unknown(code) => code,
        }
    }
}

impl From<i32> for PenColor {
    fn from(code: i32) -> Self {
        match code {
            0 => Self::Black,
            1 => Self::Grey,
            2 => Self::White,
            3 => Self::Yellow,
            4 => Self::Green,
            5 => Self::Pink,
            6 => Self::Blue,
            7 => Self::Red,
            8 => Self::GreyOverlap,
            9 => Self::Highlight,
            10 => Self::Green2,
            11 => Self::Cyan,
            12 => Self::Magenta,
            13 => Self::Yellow2,
            other => Self::Unknown(other),
        }
    }
}

impl From<PenColor> for i32 {
    fn from(color: PenColor) -> Self {
        color.code()
    }
}

impl fmt::Display for PenColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown({code})"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pen_type_codes_round_trip() {
        for code in [0, 1, 2, 3, 4, 5, 6, 7, 8, 12, 13, 14, 15, 16, 17, 18, 21, 23] {
            let pen = PenType::from(code);
            assert!(!matches!(pen, PenType::Unknown(_)), "code {code}");
            assert_eq!(pen.code(), code);
        }
    }

    #[test]
    fn test_unknown_values_are_preserved() {
        assert_eq!(PenType::from(99), PenType::Unknown(99));
        assert_eq!(PenType::from(99).code(), 99);
        assert_eq!(PenColor::from(-3), PenColor::Unknown(-3));
        assert_eq!(PenColor::from(42).to_string(), "unknown(42)");
    }

    #[test]
    fn test_eraser_and_highlighter_filter() {
        assert!(PenType::Eraser.is_eraser_or_highlighter());
        assert!(PenType::EraserArea.is_eraser_or_highlighter());
        assert!(PenType::Highlighter1.is_eraser_or_highlighter());
        assert!(PenType::Highlighter2.is_eraser_or_highlighter());
        assert!(!PenType::BallPoint2.is_eraser_or_highlighter());
        assert!(!PenType::Unknown(30).is_eraser_or_highlighter());
    }

    #[test]
    fn test_serializes_as_integer() {
        let json = serde_json::to_string(&PenColor::Blue).unwrap();
        assert_eq!(json, "6");
        let back: PenType = serde_json::from_str("15").unwrap();
        assert_eq!(back, PenType::BallPoint2);
    }
}
