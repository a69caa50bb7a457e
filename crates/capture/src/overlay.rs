use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use inference::Action;

const BORDER_PX: u32 = 6;
const BAR_HEIGHT: u32 = 10;

fn action_color(action: Action) -> Rgb<u8> {
    match action {
        Action::SortPlastic => Rgb([0, 255, 0]),
        Action::SortTinCan => Rgb([255, 165, 0]),
        Action::Reject => Rgb([255, 0, 0]),
    }
}

/// Draw the classification result onto a frame for human viewing: a
/// border colored by the mapped action plus a confidence bar along the
/// top edge.
pub fn annotate(frame: &mut RgbImage, material_type: &str, confidence: f32) {
    let (width, height) = frame.dimensions();
    if width < 6 * BORDER_PX || height < 6 * BORDER_PX {
        return;
    }

    let color = action_color(Action::for_label(material_type));

    for inset in 0..BORDER_PX {
        draw_hollow_rect_mut(
            frame,
            Rect::at(inset as i32, inset as i32).of_size(width - 2 * inset, height - 2 * inset),
            color,
        );
    }

    let bar_area = width - 4 * BORDER_PX;
    let bar_x = (2 * BORDER_PX) as i32;
    let bar_y = (2 * BORDER_PX) as i32;
    draw_filled_rect_mut(
        frame,
        Rect::at(bar_x, bar_y).of_size(bar_area, BAR_HEIGHT),
        Rgb([0, 0, 0]),
    );

    let filled = (bar_area as f32 * confidence.clamp(0.0, 1.0)) as u32;
    if filled > 0 {
        draw_filled_rect_mut(
            frame,
            Rect::at(bar_x, bar_y).of_size(filled, BAR_HEIGHT),
            color,
        );
    }
}
