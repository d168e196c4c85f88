//! Positioned text fragments and per-page containers.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Where a fragment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FragmentSource {
    /// A text block decoded from the PDF content stream.
    NativeText,
    /// A blank-line delimited paragraph of OCR output.
    OcrPseudo,
}

/// Axis-aligned bounding box in page space, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Whether the horizontal extents of the two boxes overlap.
    pub fn overlaps_horizontally(&self, other: &BBox) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1
    }
}

/// A contiguous piece of page text with a known bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Raw text, internal line breaks preserved.
    pub text: String,
    /// Bounding box on the page.
    pub bbox: BBox,
    /// Origin of the fragment.
    pub source: FragmentSource,
}

impl Fragment {
    /// Create a native text fragment.
    pub fn native(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
            source: FragmentSource::NativeText,
        }
    }

    /// Create an OCR pseudo-fragment. OCR paragraphs carry no geometry.
    pub fn ocr(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bbox: BBox::default(),
            source: FragmentSource::OcrPseudo,
        }
    }
}

/// Everything a page decoder reports for one native page.
#[derive(Debug, Clone, Default)]
pub struct NativePage {
    /// Plain text of the whole page, used for the scanned-page check.
    pub raw_text: String,
    /// Page height in the same units as the fragment boxes.
    pub page_height: f32,
    /// Text blocks in content-stream order.
    pub fragments: Vec<Fragment>,
}

/// Fragments of one page in reading order.
#[derive(Debug, Clone)]
pub struct PageContext {
    page_height: f32,
    fragments: Vec<Fragment>,
}

impl PageContext {
    /// Build a context, ordering fragments top-to-bottom then left-to-right.
    pub fn new(page_height: f32, mut fragments: Vec<Fragment>) -> Self {
        fragments.sort_by(reading_order);
        Self {
            page_height,
            fragments,
        }
    }

    pub fn page_height(&self) -> f32 {
        self.page_height
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn into_fragments(self) -> Vec<Fragment> {
        self.fragments
    }
}

impl From<NativePage> for PageContext {
    fn from(page: NativePage) -> Self {
        PageContext::new(page.page_height, page.fragments)
    }
}

fn reading_order(a: &Fragment, b: &Fragment) -> Ordering {
    a.bbox
        .y0
        .total_cmp(&b.bbox.y0)
        .then_with(|| a.bbox.x0.total_cmp(&b.bbox.x0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_context_sorts_by_y_then_x() {
        let fragments = vec![
            Fragment::native("bottom", BBox::new(10.0, 500.0, 100.0, 520.0)),
            Fragment::native("top right", BBox::new(300.0, 100.0, 400.0, 120.0)),
            Fragment::native("top left", BBox::new(10.0, 100.0, 100.0, 120.0)),
        ];

        let page = PageContext::new(800.0, fragments);
        let order: Vec<&str> = page.fragments().iter().map(|f| f.text.as_str()).collect();

        assert_eq!(order, vec!["top left", "top right", "bottom"]);
    }

    #[test]
    fn test_bbox_union() {
        let a = BBox::new(10.0, 20.0, 50.0, 30.0);
        let b = BBox::new(5.0, 25.0, 40.0, 60.0);
        assert_eq!(a.union(&b), BBox::new(5.0, 20.0, 50.0, 60.0));
    }

    #[test]
    fn test_horizontal_overlap() {
        let a = BBox::new(0.0, 0.0, 100.0, 10.0);
        assert!(a.overlaps_horizontally(&BBox::new(50.0, 20.0, 150.0, 30.0)));
        assert!(!a.overlaps_horizontally(&BBox::new(200.0, 0.0, 300.0, 10.0)));
    }
}
