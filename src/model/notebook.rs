//! Decoded stroke representation of a notebook.

use serde::{Deserialize, Serialize};

use super::pen::{PenColor, PenType};

/// A single sampled pen position in device coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub pen_type: PenType,
    pub pen_color: PenColor,
    pub points: Vec<Point>,
}

impl Line {
    /// Whether the stroke should be handed to a handwriting recognizer.
    #[must_use]
    pub const fn is_recognizable(&self) -> bool {
        !self.pen_type.is_eraser_or_highlighter()
    }
}

/// Strokes of one notebook page, in drawing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page identifier as listed in the content descriptor.
    pub id: String,
    pub lines: Vec<Line>,
}

impl Page {
    /// Iterate strokes that carry recognisable ink.
    pub fn recognizable_lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter().filter(|line| line.is_recognizable())
    }
}

/// A decoded notebook: pages in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    pub id: String,
    pub pages: Vec<Page>,
}

impl Notebook {
    /// Total number of strokes across all pages.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.pages.iter().map(|p| p.lines.len()).sum()
    }
}
