//! Review overlay: every bubble outlined, selections highlighted.
//!
//! Pure function over a cloned buffer; saving the result is the caller's
//! concern.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::template::Template;
use crate::DetectionResult;

const OPTION_OUTLINE: Rgb<u8> = Rgb([0, 200, 0]);
const SELECTION_OUTLINE: Rgb<u8> = Rgb([220, 0, 0]);

/// Draw all option boxes as thin outlines and each selected option with a
/// heavy colored outline plus an X marker.
pub fn render_overlay(
    canonical: &RgbImage,
    template: &Template,
    detection: &DetectionResult,
) -> RgbImage {
    let mut overlay = canonical.clone();

    for question in &template.questions {
        let selected = detection
            .answers
            .get(&question.number)
            .and_then(|a| a.as_deref());

        for option in &question.options {
            let [x, y, w, h] = option.bbox;
            if w <= 0 || h <= 0 {
                continue;
            }
            let rect = Rect::at(x as i32, y as i32).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(&mut overlay, rect, OPTION_OUTLINE);

            if selected == Some(option.id.as_str()) {
                draw_selection(&mut overlay, x as f32, y as f32, w as f32, h as f32, rect);
            }
        }
    }

    overlay
}

fn draw_selection(overlay: &mut RgbImage, x: f32, y: f32, w: f32, h: f32, rect: Rect) {
    // Double outline reads as a heavier stroke.
    draw_hollow_rect_mut(overlay, rect, SELECTION_OUTLINE);
    if w > 4.0 && h > 4.0 {
        let inner = Rect::at(rect.left() + 1, rect.top() + 1).of_size(w as u32 - 2, h as u32 - 2);
        draw_hollow_rect_mut(overlay, inner, SELECTION_OUTLINE);
    }

    // X marker across the box interior.
    let inset = 3.0_f32.min(w / 4.0).min(h / 4.0);
    let (x0, y0) = (x + inset, y + inset);
    let (x1, y1) = (x + w - 1.0 - inset, y + h - 1.0 - inset);
    draw_line_segment_mut(overlay, (x0, y0), (x1, y1), SELECTION_OUTLINE);
    draw_line_segment_mut(overlay, (x0, y1), (x1, y0), SELECTION_OUTLINE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{OptionBox, Question};
    use crate::test_utils::flat_rgb;

    fn two_option_template() -> Template {
        Template {
            name: String::new(),
            canvas_size: [100, 100],
            questions: vec![Question {
                number: 1,
                options: vec![
                    OptionBox {
                        id: "A".to_string(),
                        bbox: [10, 10, 20, 20],
                    },
                    OptionBox {
                        id: "B".to_string(),
                        bbox: [50, 10, 20, 20],
                    },
                ],
            }],
        }
    }

    #[test]
    fn outlines_every_option_and_highlights_selection() {
        let canonical = flat_rgb(100, 100, [255, 255, 255]);
        let detection = DetectionResult {
            answers: [(1, Some("A".to_string()))].into_iter().collect(),
            flags: Vec::new(),
        };
        let overlay = render_overlay(&canonical, &two_option_template(), &detection);

        assert_eq!(overlay.dimensions(), canonical.dimensions());
        // Selected option A is redrawn in the selection color.
        assert_eq!(overlay.get_pixel(10, 10), &SELECTION_OUTLINE);
        // Unselected option B keeps the thin outline color.
        assert_eq!(overlay.get_pixel(50, 10), &OPTION_OUTLINE);
        // Source buffer untouched.
        assert_eq!(canonical.get_pixel(10, 10), &image::Rgb([255, 255, 255]));
    }

    #[test]
    fn no_selection_draws_only_thin_outlines() {
        let canonical = flat_rgb(100, 100, [255, 255, 255]);
        let detection = DetectionResult {
            answers: [(1, None)].into_iter().collect(),
            flags: Vec::new(),
        };
        let overlay = render_overlay(&canonical, &two_option_template(), &detection);
        assert_eq!(overlay.get_pixel(10, 10), &OPTION_OUTLINE);
        assert_eq!(overlay.get_pixel(50, 10), &OPTION_OUTLINE);
    }

    #[test]
    fn out_of_canvas_boxes_are_skipped_gracefully() {
        let canonical = flat_rgb(50, 50, [255, 255, 255]);
        let mut template = two_option_template();
        template.questions[0].options[0].bbox = [200, 200, 20, 20];
        let detection = DetectionResult {
            answers: [(1, Some("A".to_string()))].into_iter().collect(),
            flags: Vec::new(),
        };
        let overlay = render_overlay(&canonical, &template, &detection);
        assert_eq!(overlay.dimensions(), (50, 50));
    }
}
