//! Preparation of decoded pages for handwriting recognition.
//!
//! The recognizer itself is an external collaborator behind [`Recognizer`].
//! This module turns pages into what it consumes: per-stroke x/y sequences
//! plus a language code and the device's page resolution. Eraser and
//! highlighter strokes are left out.

use std::fmt;
use std::future::Future;

use serde::Serialize;
use tracing::debug;

use crate::device::DeviceType;
use crate::model::{Notebook, Page};

/// Classification of a recognizer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionErrorKind {
    /// Credentials rejected.
    Auth,
    /// Request exceeds what the service accepts.
    TooLarge,
    UnsupportedLanguage,
    Other,
}

impl fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auth => "authentication failed",
            Self::TooLarge => "request too large",
            Self::UnsupportedLanguage => "unsupported language",
            Self::Other => "recognition failed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RecognitionError {
    pub kind: RecognitionErrorKind,
    pub message: String,
}

impl RecognitionError {
    #[must_use]
    pub fn new(kind: RecognitionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// One stroke as parallel coordinate sequences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stroke {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
}

/// Everything a recognizer needs for one page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionInput {
    pub page_id: String,
    pub language: String,
    pub width: u32,
    pub height: u32,
    pub strokes: Vec<Stroke>,
}

impl RecognitionInput {
    #[must_use]
    pub fn from_page(page: &Page, language: &str, device: DeviceType) -> Self {
        let (width, height) = device.resolution();
        let strokes = page
            .recognizable_lines()
            .filter(|line| !line.points.is_empty())
            .map(|line| Stroke {
                x: line.points.iter().map(|p| p.x).collect(),
                y: line.points.iter().map(|p| p.y).collect(),
            })
            .collect();
        Self {
            page_id: page.id.clone(),
            language: language.to_string(),
            width,
            height,
            strokes,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    #[must_use]
    pub fn point_count(&self) -> usize {
        self.strokes.iter().map(|s| s.x.len()).sum()
    }
}

/// Handwriting recognition service.
pub trait Recognizer: Send + Sync {
    fn recognize(
        &self,
        input: &RecognitionInput,
    ) -> impl Future<Output = Result<String, RecognitionError>> + Send;
}

/// Recognized text of one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageText {
    pub page_id: String,
    pub text: String,
}

/// Run `recognizer` over every page of `notebook`.
///
/// Pages without recognizable ink produce empty text without a call. The
/// first failing page aborts the whole notebook.
///
/// # Errors
///
/// Returns the recognizer's classified error.
pub async fn recognize_notebook<R: Recognizer>(
    recognizer: &R,
    notebook: &Notebook,
    language: &str,
    device: DeviceType,
) -> Result<Vec<PageText>, RecognitionError> {
    if language.trim().is_empty() {
        return Err(RecognitionError::new(
            RecognitionErrorKind::UnsupportedLanguage,
            "no language given",
        ));
    }

    let mut out = Vec::with_capacity(notebook.pages.len());
    for page in &notebook.pages {
        let input = RecognitionInput::from_page(page, language, device);
        let text = if input.is_empty() {
            String::new()
        } else {
            debug!(page = %page.id, strokes = input.strokes.len(), "Recognizing page");
            recognizer.recognize(&input).await?
        };
        out.push(PageText {
            page_id: page.id.clone(),
            text,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Line, PenColor, PenType, Point};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn page(id: &str, pens: &[PenType]) -> Page {
        Page {
            id: id.to_string(),
            lines: pens
                .iter()
                .map(|&pen_type| Line {
                    pen_type,
                    pen_color: PenColor::Black,
                    points: vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)],
                })
                .collect(),
        }
    }

    #[derive(Default)]
    struct CountingRecognizer {
        calls: AtomicUsize,
    }

    impl Recognizer for CountingRecognizer {
        async fn recognize(&self, input: &RecognitionInput) -> Result<String, RecognitionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if input.point_count() > 4 {
                return Err(RecognitionError::new(RecognitionErrorKind::TooLarge, "too many points"));
            }
            Ok(format!("{} strokes", input.strokes.len()))
        }
    }

    #[test]
    fn test_input_drops_erasers_and_highlighters() {
        let page = page(
            "p",
            &[PenType::BallPoint1, PenType::Eraser, PenType::Highlighter2, PenType::Fineliner2],
        );
        let input = RecognitionInput::from_page(&page, "en_US", DeviceType::PaperPro);
        assert_eq!(input.strokes.len(), 2);
        assert_eq!(input.strokes[0].x, vec![1.0, 3.0]);
        assert_eq!(input.strokes[0].y, vec![2.0, 4.0]);
        assert_eq!((input.width, input.height), (1620, 2160));
    }

    #[tokio::test]
    async fn test_blank_pages_skip_the_recognizer() {
        let notebook = Notebook {
            id: "n".to_string(),
            pages: vec![page("blank", &[PenType::EraserArea]), page("ink", &[PenType::Pencil2])],
        };
        let recognizer = CountingRecognizer::default();
        let texts = recognize_notebook(&recognizer, &notebook, "en_US", DeviceType::Rm2)
            .await
            .unwrap();
        assert_eq!(recognizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(texts[0].text, "");
        assert_eq!(texts[1].text, "1 strokes");
    }

    #[tokio::test]
    async fn test_failure_is_classified() {
        let notebook = Notebook {
            id: "n".to_string(),
            pages: vec![page("big", &[PenType::Pencil2, PenType::Pencil2, PenType::Pencil2])],
        };
        let err = recognize_notebook(&CountingRecognizer::default(), &notebook, "de_DE", DeviceType::Rm1)
            .await
            .unwrap_err();
        assert_eq!(err.kind, RecognitionErrorKind::TooLarge);

        let err = recognize_notebook(&CountingRecognizer::default(), &notebook, " ", DeviceType::Rm1)
            .await
            .unwrap_err();
        assert_eq!(err.kind, RecognitionErrorKind::UnsupportedLanguage);
    }
}
