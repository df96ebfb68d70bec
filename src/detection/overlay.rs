//! Debug overlay: detection boxes, confidence labels and the people-count badge.
//!
//! Boxes are stroked with raqote over a copy of the frame, labels are
//! rasterized by imageproc from the bundled DejaVu Sans Mono face. Both clip
//! at the image edge, so boxes hanging off a border are partially drawn.

use std::sync::OnceLock;

use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use raqote::{DrawOptions, DrawTarget, LineJoin, PathBuilder, SolidSource, Source, StrokeStyle};
use tracing::warn;

use crate::types::{BoundingBox, PersonBox};

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const BOX_THICKNESS: f32 = 2.0;

const LABEL_SCALE: f32 = 14.0;
const BADGE_SCALE: f32 = 28.0;
const BADGE_ORIGIN: (i32, i32) = (10, 10);

static LABEL_FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSansMono-Bold.ttf");

fn label_font() -> Option<&'static FontRef<'static>> {
    static FONT: OnceLock<Option<FontRef<'static>>> = OnceLock::new();
    FONT.get_or_init(|| match FontRef::try_from_slice(LABEL_FONT_DATA) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!("Overlay font unusable, labels disabled: {}", e);
            None
        }
    })
    .as_ref()
}

/// Stroke box outlines onto `img`, centred on each box edge.
pub fn stroke_boxes(img: &mut RgbImage, boxes: &[BoundingBox], color: Rgb<u8>) {
    let (Ok(width), Ok(height)) = (i32::try_from(img.width()), i32::try_from(img.height())) else {
        return;
    };
    if boxes.is_empty() || width == 0 || height == 0 {
        return;
    }

    // raqote works on premultiplied ARGB; the frame is opaque so that is plain ARGB.
    let argb: Vec<u32> = img
        .pixels()
        .map(|&Rgb([r, g, b])| u32::from_le_bytes([b, g, r, 0xFF]))
        .collect();
    let mut dt = DrawTarget::new(width, height);
    dt.draw_image_at(
        0.0,
        0.0,
        &raqote::Image { width, height, data: &argb },
        &DrawOptions::new(),
    );

    let Rgb([r, g, b]) = color;
    let source = Source::Solid(SolidSource::from_unpremultiplied_argb(0xFF, r, g, b));
    let style = StrokeStyle {
        width: BOX_THICKNESS,
        join: LineJoin::Miter,
        ..StrokeStyle::default()
    };
    for bbox in boxes {
        let mut pb = PathBuilder::new();
        pb.rect(bbox.x as f32, bbox.y as f32, bbox.width as f32, bbox.height as f32);
        dt.stroke(&pb.finish(), &source, &style, &DrawOptions::new());
    }

    for (dst, px) in img.pixels_mut().zip(dt.get_data()) {
        let [b, g, r, _] = px.to_le_bytes();
        *dst = Rgb([r, g, b]);
    }
}

/// Render `text` with its top-left corner at `(x, y)`, `scale` pixels tall.
pub fn draw_label(img: &mut RgbImage, x: i32, y: i32, text: &str, scale: f32, color: Rgb<u8>) {
    if let Some(font) = label_font() {
        draw_text_mut(img, color, x, y, PxScale::from(scale), font, text);
    }
}

/// Outline every box and label it with its confidence.
pub fn draw_detections(img: &mut RgbImage, people: &[PersonBox]) {
    let boxes: Vec<BoundingBox> = people.iter().map(|p| p.bbox).collect();
    stroke_boxes(img, &boxes, BOX_COLOR);

    for person in people {
        let label = format!("Person {:.2}", person.confidence);
        let label_y = person.bbox.y.saturating_sub(LABEL_SCALE as i32 + 2).max(0);
        draw_label(img, person.bbox.x, label_y, &label, LABEL_SCALE, BOX_COLOR);
    }
}

/// `People: N` badge in the top-left corner.
pub fn draw_people_count(img: &mut RgbImage, count: u32) {
    let (x, y) = BADGE_ORIGIN;
    draw_label(img, x, y, &format!("People: {count}"), BADGE_SCALE, BOX_COLOR);
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

    fn is_green(p: &Rgb<u8>) -> bool {
        p[1] > 0 && p[0] == 0 && p[2] == 0
    }

    fn is_stroked(p: &Rgb<u8>) -> bool {
        p[1] > 200 && p[0] == 0 && p[2] == 0
    }

    #[test]
    fn bundled_font_loads() {
        assert!(label_font().is_some());
    }

    #[test]
    fn box_outline_leaves_interior_untouched() {
        let mut img = RgbImage::new(20, 20);
        let bbox = BoundingBox { x: 2, y: 2, width: 10, height: 10 };
        stroke_boxes(&mut img, &[bbox], BOX_COLOR);

        assert!(is_stroked(img.get_pixel(2, 7)));
        assert!(is_stroked(img.get_pixel(11, 7)));
        assert!(is_stroked(img.get_pixel(7, 2)));
        assert_eq!(*img.get_pixel(7, 7), BLACK);
        assert_eq!(*img.get_pixel(16, 16), BLACK);
    }

    #[test]
    fn stroking_preserves_frame_content() {
        let mut img = RgbImage::from_pixel(10, 10, Rgb([200, 40, 90]));
        stroke_boxes(&mut img, &[BoundingBox { x: 6, y: 6, width: 2, height: 2 }], BOX_COLOR);
        let Rgb([r, g, b]) = *img.get_pixel(1, 1);
        assert!(r.abs_diff(200) <= 1 && g.abs_diff(40) <= 1 && b.abs_diff(90) <= 1);
    }

    #[test]
    fn drawing_off_the_edge_is_clipped() {
        let mut img = RgbImage::new(8, 8);
        let bbox = BoundingBox { x: -5, y: 4, width: 100, height: 100 };
        stroke_boxes(&mut img, &[bbox], BOX_COLOR);
        draw_label(&mut img, -3, 6, "People: 99", 30.0, BOX_COLOR);
        assert!(is_stroked(img.get_pixel(0, 4)));
    }

    #[test]
    fn badge_marks_top_left_corner() {
        let mut img = RgbImage::new(300, 80);
        draw_people_count(&mut img, 3);

        let lit = (10..45).any(|y| (10..200).any(|x| is_green(img.get_pixel(x, y))));
        assert!(lit);
        assert!((0..5).all(|y| (0..300).all(|x| *img.get_pixel(x, y) == BLACK)));
        assert_eq!(*img.get_pixel(299, 79), BLACK);
    }

    #[test]
    fn detection_label_sits_above_box() {
        let mut img = RgbImage::new(140, 100);
        let person = PersonBox {
            bbox: BoundingBox { x: 20, y: 40, width: 30, height: 50 },
            confidence: 0.87,
        };
        draw_detections(&mut img, &[person]);
        let label_rows = (20..38).any(|y| (20..140).any(|x| is_green(img.get_pixel(x, y))));
        assert!(label_rows);
        assert_eq!(*img.get_pixel(35, 65), BLACK);
    }
}
