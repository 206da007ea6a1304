use blobsheet::{
    export,
    geom::{Rect, Size},
    image_util::{rgba_from_raw, ImageBufferExt as _},
    mser::MserOptions,
    sprites::{detect_blobs, order_rects, Animation},
};
use image::{Rgba, RgbaImage};

const BACKGROUND: [u8; 3] = [30, 30, 60];

const fn options() -> MserOptions {
    MserOptions {
        delta: 0,
        min_area: 0.0,
        max_area: 0.5,
        max_variation: 0.5,
        min_diversity: 0.33,
    }
}

fn fill(image: &mut RgbaImage, rect: Rect, color: [u8; 3]) {
    for y in rect.top()..rect.bottom() {
        for x in rect.left()..rect.right() {
            image.put_pixel(x as u32, y as u32, Rgba([color[0], color[1], color[2], 255]));
        }
    }
}

#[test]
fn detects_orders_and_packs_a_synthetic_sheet() {
    let mut image = RgbaImage::from_pixel(
        64,
        32,
        Rgba([BACKGROUND[0], BACKGROUND[1], BACKGROUND[2], 255]),
    );

    let red = Rect::new(4, 6, 8, 10);
    let green = Rect::new(20, 4, 6, 12);
    let blue = Rect::new(40, 8, 10, 6);

    fill(&mut image, red, [220, 40, 40]);
    fill(&mut image, green, [40, 220, 40]);
    fill(&mut image, blue, [40, 40, 220]);

    let mut rects = detect_blobs(&image, BACKGROUND, options()).unwrap();
    let tags = order_rects(&mut rects);

    // all three sprites share a row, ordered left to right
    assert_eq!(rects, vec![red, green, blue]);
    assert!(tags.iter().all(|tag| tag.row == 0));
    assert_eq!(tags.iter().map(|tag| tag.col).collect::<Vec<_>>(), [0, 1, 2]);

    let animation = Animation::from_rects("strip", &rects, Size::default());

    // canvas covers the widest and tallest frame, frames bottom aligned
    assert_eq!(animation.size, Size::new(10.0, 12.0));
    let offsets = animation
        .frames
        .iter()
        .map(|frame| frame.offset.y)
        .collect::<Vec<_>>();
    assert_eq!(offsets, [2.0, 0.0, 6.0]);

    let sheet = export::pack(&animation, &image, 1).unwrap();

    assert_eq!(sheet.dimensions(), (30, 12));
    assert_eq!(sheet.get_pixel(0, 2).0, [220, 40, 40, 255]);
    // above the bottom-aligned red frame the cell stays empty
    assert_eq!(sheet.get_pixel(0, 0).0[3], 0);
    assert_eq!(sheet.get_pixel(10, 0).0, [40, 220, 40, 255]);
    assert_eq!(sheet.get_pixel(20, 6).0, [40, 40, 220, 255]);
    assert_eq!(sheet.get_pixel(20, 0).0[3], 0);
}

#[test]
fn packed_sheet_survives_a_png_round_trip() {
    let mut image = RgbaImage::from_pixel(
        32,
        16,
        Rgba([BACKGROUND[0], BACKGROUND[1], BACKGROUND[2], 255]),
    );
    fill(&mut image, Rect::new(2, 2, 5, 7), [200, 10, 120]);
    fill(&mut image, Rect::new(12, 3, 4, 4), [10, 200, 120]);

    let mut rects = detect_blobs(&image, BACKGROUND, options()).unwrap();
    order_rects(&mut rects);

    let animation = Animation::from_rects("pair", &rects, Size::new(1.0, 1.0));
    let sheet = export::pack(&animation, &image, 1).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pair.png");
    sheet.save_optimized_png(&path).unwrap();

    let reloaded = image::open(&path).unwrap().to_rgba8();
    assert_eq!(reloaded, sheet);
}

#[test]
fn raw_buffers_feed_the_pipeline() {
    let (width, height) = (8u32, 8u32);
    let mut data = Vec::with_capacity((width * height * 4) as usize);

    for y in 0..height {
        for x in 0..width {
            if (2..5).contains(&x) && (2..5).contains(&y) {
                data.extend_from_slice(&[255, 255, 255, 255]);
            } else {
                data.extend_from_slice(&[0, 0, 0, 255]);
            }
        }
    }

    let image = rgba_from_raw(width, height, data).unwrap();
    let rects = detect_blobs(&image, [0, 0, 0], options()).unwrap();

    assert_eq!(rects, vec![Rect::new(2, 2, 3, 3)]);
}
