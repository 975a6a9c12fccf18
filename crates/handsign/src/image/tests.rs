use super::*;
use Color as C;

fn mkimage<const W: usize, const H: usize>(data: [[Color; W]; H]) -> Image {
    let data = data
        .into_iter()
        .flat_map(|row| row.into_iter())
        .flat_map(|col| col.0)
        .collect::<Vec<_>>();
    Image::from_rgba8(Resolution::new(W as u32, H as u32), &data)
}

#[test]
fn get_and_set() {
    let mut image = mkimage([[C::RED, C::GREEN], [C::BLUE, C::WHITE]]);
    assert_eq!(image.get(1, 0), C::GREEN);
    assert_eq!(image.get(0, 1), C::BLUE);
    assert_eq!(image.get(2, 0), C::NULL);

    image.set(1, 1, C::YELLOW);
    image.set(5, 5, C::YELLOW);
    assert_eq!(image.get(1, 1), C::YELLOW);
}

#[test]
fn flip_horizontal() {
    let mut image = mkimage([[C::RED, C::GREEN, C::BLUE]]);
    image.flip_horizontal_in_place();
    assert_eq!(image.get(0, 0), C::BLUE);
    assert_eq!(image.get(1, 0), C::GREEN);
    assert_eq!(image.get(2, 0), C::RED);
}

#[test]
fn view_sampling() {
    let image = mkimage([
        [C::YELLOW, C::WHITE, C::WHITE],
        [C::WHITE, C::RED, C::WHITE],
        [C::WHITE, C::WHITE, C::WHITE],
    ]);

    let full = image.as_view();
    assert_eq!(full.rect(), Rect::from_top_left(0.0, 0.0, 3.0, 3.0));
    assert_eq!(full.sample(0.0, 0.0), C::YELLOW);
    assert_eq!(full.sample(0.5, 0.5), C::RED);

    let center = image.view(Rect::from_top_left(1.0, 1.0, 1.0, 1.0));
    assert_eq!(center.sample(0.0, 0.0), C::RED);

    // Views may extend past the image borders.
    let outside = image.view(Rect::from_top_left(-2.0, -2.0, 2.0, 2.0));
    assert_eq!(outside.sample(0.0, 0.0), C::NULL);
    assert_eq!(outside.sample(0.99, 0.99), C::NULL);
}

#[test]
fn view_transform_out() {
    let image = Image::new(100, 100);
    let view = image.view(Rect::from_top_left(10.0, 20.0, 50.0, 50.0));
    let res = Resolution::new(224, 224);
    assert_eq!(view.transform_out(res, 0.0, 0.0), [10.0, 20.0]);
    assert_eq!(view.transform_out(res, 224.0, 112.0), [60.0, 45.0]);
}

#[test]
fn draw_marker_and_line() {
    let mut image = Image::filled(9, 9, C::BLACK);
    draw::marker(&mut image, 4.0, 4.0).color(C::GREEN);
    assert_eq!(image.get(4, 4), C::GREEN);
    assert_eq!(image.get(2, 2), C::GREEN);
    assert_eq!(image.get(6, 2), C::GREEN);
    assert_eq!(image.get(4, 2), C::BLACK);

    image.clear(C::BLACK);
    draw::line(&mut image, [0.0, 8.0], [8.0, 8.0]).color(C::WHITE);
    assert!((0..9).all(|x| image.get(x, 8) == C::WHITE));
    assert_eq!(image.get(0, 0), C::BLACK);
}

#[test]
fn draw_text_clips_to_image() {
    let mut image = Image::filled(40, 30, C::BLACK);
    draw::text(&mut image, 0.0, 0.0, "peace")
        .align_top()
        .align_left()
        .color(C::GREEN);

    let painted = image.buf.pixels().filter(|p| p.0 == C::GREEN.0).count();
    assert!(painted > 0);
}
