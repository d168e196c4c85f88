//! Groups decoded glyphs into lines and lines into positioned text blocks.

use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};

use crate::models::fragment::{BBox, Fragment, NativePage};

/// Vertical gap, in font sizes, still bridged between two lines of one block.
const LINE_GAP: f32 = 0.8;

/// Font size ratio range for lines of one block.
const SIZE_RATIO: (f32, f32) = (0.8, 1.25);

#[derive(Debug, Clone)]
struct Line {
    text: String,
    bbox: BBox,
    size: f32,
    baseline: f32,
    last_end: f32,
}

impl Line {
    fn start(x: f32, baseline: f32, size: f32) -> Self {
        Self {
            text: String::new(),
            bbox: BBox::new(x, baseline - size, x, baseline),
            size,
            baseline,
            last_end: x,
        }
    }

    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug)]
struct Block {
    lines: Vec<String>,
    bbox: BBox,
    size: f32,
}

impl Block {
    fn from_line(line: Line) -> Self {
        Self {
            bbox: line.bbox,
            size: line.size,
            lines: vec![line.text.trim().to_string()],
        }
    }

    fn accepts(&self, line: &Line) -> bool {
        let gap = line.bbox.y0 - self.bbox.y1;
        let ratio = if self.size > 0.0 { line.size / self.size } else { 1.0 };

        gap >= -0.5 * self.size
            && gap <= LINE_GAP * self.size
            && (SIZE_RATIO.0..=SIZE_RATIO.1).contains(&ratio)
            && self.bbox.overlaps_horizontally(&line.bbox)
    }

    fn push(&mut self, line: Line) {
        self.bbox = self.bbox.union(&line.bbox);
        self.lines.push(line.text.trim().to_string());
    }

    fn into_fragment(self) -> Fragment {
        Fragment::native(self.lines.join("\n"), self.bbox)
    }
}

/// Collects one page of glyphs from the content-stream interpreter.
///
/// Coordinates are flipped so that y grows downwards from the top of the
/// media box, matching the bounding boxes the classifier expects.
#[derive(Debug, Default)]
pub struct BlockCollector {
    page_height: f32,
    lines: Vec<Line>,
    current: Option<Line>,
    word_start: bool,
}

impl BlockCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a new page of the given height.
    pub fn start_page(&mut self, page_height: f32) {
        self.page_height = page_height;
        self.lines.clear();
        self.current = None;
        self.word_start = false;
    }

    /// Mark the next glyph as the first of a word.
    pub fn start_word(&mut self) {
        self.word_start = true;
    }

    /// Record one glyph at `x` on the given baseline (top-down), `advance`
    /// being its width in font-size units.
    pub fn push_glyph(&mut self, x: f32, baseline: f32, advance: f32, size: f32, text: &str) {
        let size = if size > 0.0 { size } else { 1.0 };

        let breaks_line = match &self.current {
            Some(line) => {
                let dy = (baseline - line.baseline).abs();
                dy > 0.5 * size || x + size < line.bbox.x0
            }
            None => true,
        };

        if breaks_line {
            self.close_line();
            self.current = Some(Line::start(x, baseline, size));
        }

        let word_start = std::mem::take(&mut self.word_start);
        if let Some(line) = self.current.as_mut() {
            if word_start && !line.text.is_empty() && x > line.last_end + 0.1 * size {
                line.text.push(' ');
            }
            line.text.push_str(text);
            line.last_end = x + advance * size;
            line.size = line.size.max(size);
            line.bbox = line
                .bbox
                .union(&BBox::new(x, baseline - size, line.last_end, baseline));
        }
    }

    /// Close the line being built, if any.
    pub fn close_line(&mut self) {
        if let Some(line) = self.current.take() {
            if !line.is_blank() {
                self.lines.push(line);
            }
        }
    }

    /// Finish the page: merge lines into blocks.
    pub fn finish(&mut self) -> NativePage {
        self.close_line();

        let lines = std::mem::take(&mut self.lines);
        let raw_text = lines
            .iter()
            .map(|l| l.text.trim())
            .collect::<Vec<_>>()
            .join("\n");

        let mut blocks: Vec<Block> = Vec::new();
        for line in lines {
            match blocks.iter_mut().rev().find(|b| b.accepts(&line)) {
                Some(block) => block.push(line),
                None => blocks.push(Block::from_line(line)),
            }
        }

        NativePage {
            raw_text,
            page_height: self.page_height,
            fragments: blocks.into_iter().map(Block::into_fragment).collect(),
        }
    }
}

impl OutputDev for BlockCollector {
    fn begin_page(
        &mut self,
        _page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.start_page((media_box.ury - media_box.lly) as f32);
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        self.close_line();
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        glyph: &str,
    ) -> Result<(), OutputError> {
        let sx = font_size * (trm.m11 + trm.m21);
        let sy = font_size * (trm.m12 + trm.m22);
        let size = (sx * sy).abs().sqrt() as f32;

        let x = trm.m31 as f32;
        let baseline = self.page_height - trm.m32 as f32;

        self.push_glyph(x, baseline, width as f32, size, glyph);
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        self.start_word();
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Lay out `text` as one word per space-separated token.
    fn write_line(collector: &mut BlockCollector, x: f32, baseline: f32, size: f32, text: &str) {
        let mut cursor = x;
        for word in text.split(' ') {
            collector.start_word();
            for ch in word.chars() {
                collector.push_glyph(cursor, baseline, 0.5, size, &ch.to_string());
                cursor += 0.5 * size;
            }
            cursor += 0.3 * size;
        }
    }

    #[test]
    fn test_words_spaced_within_line() {
        let mut collector = BlockCollector::new();
        collector.start_page(800.0);
        write_line(&mut collector, 72.0, 100.0, 10.0, "hello wide world");

        let page = collector.finish();
        assert_eq!(page.fragments.len(), 1);
        assert_eq!(page.fragments[0].text, "hello wide world");
        assert_eq!(page.raw_text, "hello wide world");
        assert_eq!(page.page_height, 800.0);
    }

    #[test]
    fn test_close_lines_form_one_block() {
        let mut collector = BlockCollector::new();
        collector.start_page(800.0);
        write_line(&mut collector, 72.0, 100.0, 10.0, "first line of the");
        write_line(&mut collector, 72.0, 112.0, 10.0, "same paragraph");

        let page = collector.finish();
        assert_eq!(page.fragments.len(), 1);
        assert_eq!(page.fragments[0].text, "first line of the\nsame paragraph");

        let bbox = page.fragments[0].bbox;
        assert_eq!(bbox.y0, 90.0);
        assert_eq!(bbox.y1, 112.0);
    }

    #[test]
    fn test_large_gap_starts_new_block() {
        let mut collector = BlockCollector::new();
        collector.start_page(800.0);
        write_line(&mut collector, 72.0, 30.0, 8.0, "Running header");
        write_line(&mut collector, 72.0, 120.0, 10.0, "Body text begins");

        let page = collector.finish();
        let texts: Vec<&str> = page.fragments.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["Running header", "Body text begins"]);
        assert_eq!(page.raw_text, "Running header\nBody text begins");
    }

    #[test]
    fn test_size_change_starts_new_block() {
        let mut collector = BlockCollector::new();
        collector.start_page(800.0);
        write_line(&mut collector, 72.0, 100.0, 20.0, "TITLE");
        write_line(&mut collector, 72.0, 112.0, 10.0, "body");

        let page = collector.finish();
        assert_eq!(page.fragments.len(), 2);
    }

    #[test]
    fn test_columns_kept_apart() {
        let mut collector = BlockCollector::new();
        collector.start_page(800.0);
        write_line(&mut collector, 72.0, 100.0, 10.0, "left");
        write_line(&mut collector, 400.0, 112.0, 10.0, "right");

        let page = collector.finish();
        assert_eq!(page.fragments.len(), 2);
    }

    #[test]
    fn test_empty_page() {
        let mut collector = BlockCollector::new();
        collector.start_page(842.0);
        let page = collector.finish();
        assert!(page.fragments.is_empty());
        assert!(page.raw_text.is_empty());
    }
}
