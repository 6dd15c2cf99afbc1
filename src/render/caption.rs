use crate::geometry::{Point, Rect};
use crate::pixels::{PixelBuffer, Rgba};

const ELLIPSIS: &str = "\u{2026}";

/// Measures and paints single-line captions. Text shaping belongs to the
/// embedding application; the renderer only needs widths and a paint call.
pub trait CaptionPainter: Send + Sync {
    fn measure(&self, text: &str) -> i32;

    fn line_height(&self) -> i32;

    fn paint(&self, target: &mut PixelBuffer, text: &str, at: Point, color: Rgba);
}

/// Shortens `text` so it fits in `max_width`, ending with an ellipsis when
/// anything was cut. Line breaks are flattened; captions never wrap.
pub fn fit_caption(painter: &dyn CaptionPainter, text: &str, max_width: i32) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if max_width <= 0 {
        return String::new();
    }
    if painter.measure(&flat) <= max_width {
        return flat;
    }
    if painter.measure(ELLIPSIS) > max_width {
        return String::new();
    }

    let offsets: Vec<usize> = flat.char_indices().map(|(i, _)| i).collect();
    let truncated = |chars: usize| format!("{}{ELLIPSIS}", flat[..offsets[chars]].trim_end());
    // Largest prefix whose truncated form still fits; zero chars always does.
    let (mut lo, mut hi) = (0usize, offsets.len() - 1);
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if painter.measure(&truncated(mid)) <= max_width {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    truncated(lo)
}

/// Fixed-advance painter that draws each visible character as a solid cell.
/// Useful for headless rendering and as a stand-in until the host supplies a
/// real text painter.
#[derive(Debug, Clone, Copy)]
pub struct BlockCaptionPainter {
    pub advance: i32,
    pub height: i32,
}

impl Default for BlockCaptionPainter {
    fn default() -> Self {
        Self {
            advance: 7,
            height: 12,
        }
    }
}

impl CaptionPainter for BlockCaptionPainter {
    fn measure(&self, text: &str) -> i32 {
        text.chars().count() as i32 * self.advance
    }

    fn line_height(&self) -> i32 {
        self.height
    }

    fn paint(&self, target: &mut PixelBuffer, text: &str, at: Point, color: Rgba) {
        let glyph_width = (self.advance - 2).max(1);
        let glyph_height = (self.height - 4).max(1);
        for (i, c) in text.chars().enumerate() {
            if c.is_whitespace() {
                continue;
            }
            let x = at.x + i as i32 * self.advance + 1;
            target.blend_rect(Rect::new(x, at.y + 2, glyph_width, glyph_height), color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{fit_caption, BlockCaptionPainter, CaptionPainter};

    fn painter() -> BlockCaptionPainter {
        BlockCaptionPainter {
            advance: 10,
            height: 12,
        }
    }

    #[test]
    fn short_caption_is_untouched() {
        assert_eq!(fit_caption(&painter(), "Inbox", 100), "Inbox");
    }

    #[test]
    fn long_caption_ends_with_ellipsis_and_fits() {
        let fitted = fit_caption(&painter(), "A very long document title", 80);
        assert!(fitted.ends_with('\u{2026}'));
        assert!(painter().measure(&fitted) <= 80);
        assert_eq!(fitted, "A very\u{2026}");
    }

    #[test]
    fn newlines_do_not_wrap() {
        assert_eq!(fit_caption(&painter(), "a\nb", 100), "a b");
    }

    #[test]
    fn no_room_yields_empty_caption() {
        assert_eq!(fit_caption(&painter(), "Inbox", 5), "");
        assert_eq!(fit_caption(&painter(), "Inbox", 0), "");
    }
}
