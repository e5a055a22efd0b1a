use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use easel::{
    ArcMode, BlendMode, Color, EndShape, Image, RenderMode, Result, ShapeMode, Surface,
};

use crate::expectations::PixelExpectation;

// ── Grid layout constants ────────────────────────────────────────────────────

const TILE_SIZE: u32 = 40;
const COLUMNS: u32 = 6;
const ROWS: u32 = 3;

pub const CANVAS_WIDTH: u32 = TILE_SIZE * COLUMNS;
pub const CANVAS_HEIGHT: u32 = TILE_SIZE * ROWS;

/// Edge of the square canvas used by [`build_depth_scene`].
pub const DEPTH_CANVAS_SIZE: u32 = 120;

/// Returns the pixel origin (top-left corner) of tile number `n` (1-based).
fn tile_origin(tile_number: u32) -> (f32, f32) {
    let index = tile_number - 1;
    let column = index % COLUMNS;
    let row = index / COLUMNS;
    ((column * TILE_SIZE) as f32, (row * TILE_SIZE) as f32)
}

fn px(origin: (f32, f32), dx: u32, dy: u32) -> (u32, u32) {
    (origin.0 as u32 + dx, origin.1 as u32 + dy)
}

fn opaque(origin: (f32, f32), dx: u32, dy: u32, c: Color, label: &'static str) -> PixelExpectation {
    let (x, y) = px(origin, dx, dy);
    PixelExpectation::new(x, y, c, label)
}

fn untouched(origin: (f32, f32), dx: u32, dy: u32, label: &'static str) -> PixelExpectation {
    opaque(origin, dx, dy, Color::WHITE, label)
}

/// Draws the 2D test scene on a surface that is between `begin_draw` and `end_draw`, sized
/// [`CANVAS_WIDTH`] x [`CANVAS_HEIGHT`] in [`RenderMode::P2D`], and returns the pixels to
/// check once the frame has ended.
///
/// Shared between the integration tests of both backends and the window demo.
pub fn build_main_scene(surface: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let mut expectations: Vec<PixelExpectation> = Vec::new();

    surface.background(Color::WHITE)?;
    surface.no_stroke();

    expectations.extend(tile_01_rect_solid(surface)?);
    expectations.extend(tile_02_rounded_rect(surface)?);
    expectations.extend(tile_03_recorded_triangle(surface)?);
    expectations.extend(tile_04_ellipse(surface)?);
    expectations.extend(tile_05_translated_rect(surface)?);
    expectations.extend(tile_06_scaled_rect(surface)?);
    expectations.extend(tile_07_rotated_square(surface)?);
    expectations.extend(tile_08_alpha_blend(surface)?);
    expectations.extend(tile_09_additive_blend(surface)?);
    expectations.extend(tile_10_multiply_blend(surface)?);
    expectations.extend(tile_11_subtract_blend(surface)?);
    expectations.extend(tile_12_replace_keeps_alpha(surface)?);
    expectations.extend(tile_13_textured_quadrants(surface)?);
    expectations.extend(tile_14_tinted_texture(surface)?);
    expectations.extend(tile_15_pie_arc(surface)?);
    expectations.extend(tile_16_thick_line(surface)?);
    expectations.extend(tile_17_recorded_quads(surface)?);
    expectations.extend(tile_18_offscreen_graphics(surface)?);

    Ok(expectations)
}

fn tile_01_rect_solid(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(1);
    let c = Color::rgb(220, 40, 40);
    s.fill(c);
    s.rect(o.0 + 5.0, o.1 + 5.0, 30.0, 30.0)?;
    Ok(vec![
        opaque(o, 20, 20, c, "t01_rect_center"),
        untouched(o, 2, 2, "t01_outside"),
    ])
}

fn tile_02_rounded_rect(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(2);
    let c = Color::rgb(40, 40, 220);
    s.fill(c);
    s.rect_rounded(o.0 + 5.0, o.1 + 5.0, 30.0, 30.0, [10.0; 4])?;
    Ok(vec![
        opaque(o, 20, 20, c, "t02_center"),
        opaque(o, 20, 6, c, "t02_top_edge"),
        untouched(o, 6, 6, "t02_cut_corner"),
    ])
}

fn tile_03_recorded_triangle(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(3);
    let c = Color::rgb(40, 180, 40);
    s.fill(c);
    s.begin_shape(ShapeMode::Triangles)?;
    s.vertex(o.0 + 5.0, o.1 + 35.0)?;
    s.vertex(o.0 + 35.0, o.1 + 35.0)?;
    s.vertex(o.0 + 20.0, o.1 + 5.0)?;
    s.end_shape(EndShape::Close)?;
    Ok(vec![
        opaque(o, 20, 28, c, "t03_inside"),
        untouched(o, 6, 8, "t03_outside_left"),
    ])
}

fn tile_04_ellipse(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(4);
    let c = Color::rgb(200, 120, 0);
    s.fill(c);
    s.ellipse(o.0 + 20.0, o.1 + 20.0, 30.0, 30.0)?;
    Ok(vec![
        opaque(o, 20, 20, c, "t04_center"),
        opaque(o, 20, 8, c, "t04_top"),
        untouched(o, 6, 6, "t04_outside_corner"),
    ])
}

fn tile_05_translated_rect(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(5);
    let c = Color::rgb(128, 0, 128);
    s.fill(c);
    s.push_matrix()?;
    s.translate(o.0 + 20.0, o.1 + 20.0);
    s.rect(-5.0, -5.0, 10.0, 10.0)?;
    s.pop_matrix()?;
    Ok(vec![
        opaque(o, 20, 20, c, "t05_center"),
        untouched(o, 10, 10, "t05_outside"),
    ])
}

fn tile_06_scaled_rect(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(6);
    let c = Color::rgb(0, 128, 128);
    s.fill(c);
    s.push_matrix()?;
    s.translate(o.0, o.1);
    s.scale(3.0);
    s.rect(2.0, 2.0, 8.0, 8.0)?;
    s.pop_matrix()?;
    Ok(vec![
        opaque(o, 18, 18, c, "t06_center"),
        opaque(o, 28, 28, c, "t06_scaled_corner"),
        untouched(o, 3, 3, "t06_outside"),
        untouched(o, 32, 32, "t06_past_scaled_edge"),
    ])
}

fn tile_07_rotated_square(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(7);
    let c = Color::rgb(250, 200, 0);
    s.fill(c);
    s.push_matrix()?;
    s.translate(o.0 + 20.0, o.1 + 20.0);
    s.rotate(FRAC_PI_4);
    s.rect(-10.0, -10.0, 20.0, 20.0)?;
    s.pop_matrix()?;
    Ok(vec![
        opaque(o, 20, 7, c, "t07_top_tip"),
        untouched(o, 7, 7, "t07_outside_corner"),
    ])
}

fn tile_08_alpha_blend(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(8);
    s.fill(Color::rgba(255, 0, 0, 128));
    s.rect(o.0 + 5.0, o.1 + 5.0, 30.0, 30.0)?;
    Ok(vec![opaque(o, 20, 20, Color::rgb(255, 127, 127), "t08_half_red_over_white")])
}

fn tile_09_additive_blend(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(9);
    s.fill(Color::rgb(50, 50, 50));
    s.rect(o.0 + 5.0, o.1 + 5.0, 30.0, 30.0)?;
    s.blend_mode(BlendMode::Add);
    s.fill(Color::rgb(100, 0, 20));
    s.rect(o.0 + 10.0, o.1 + 10.0, 20.0, 20.0)?;
    s.blend_mode(BlendMode::Blend);
    Ok(vec![
        opaque(o, 20, 20, Color::rgb(150, 50, 70), "t09_added"),
        opaque(o, 7, 7, Color::rgb(50, 50, 50), "t09_base"),
    ])
}

fn tile_10_multiply_blend(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(10);
    s.fill(Color::rgb(200, 200, 200));
    s.rect(o.0 + 5.0, o.1 + 5.0, 30.0, 30.0)?;
    s.blend_mode(BlendMode::Multiply);
    s.fill(Color::rgb(128, 255, 0));
    s.rect(o.0 + 10.0, o.1 + 10.0, 20.0, 20.0)?;
    s.blend_mode(BlendMode::Blend);
    Ok(vec![opaque(o, 20, 20, Color::rgb(100, 200, 0), "t10_multiplied")])
}

fn tile_11_subtract_blend(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(11);
    s.fill(Color::rgb(200, 200, 200));
    s.rect(o.0 + 5.0, o.1 + 5.0, 30.0, 30.0)?;
    s.blend_mode(BlendMode::Subtract);
    s.fill(Color::rgb(50, 100, 200));
    s.rect(o.0 + 10.0, o.1 + 10.0, 20.0, 20.0)?;
    s.blend_mode(BlendMode::Blend);
    Ok(vec![opaque(o, 20, 20, Color::rgb(150, 100, 0), "t11_subtracted")])
}

fn tile_12_replace_keeps_alpha(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(12);
    s.blend_mode(BlendMode::Replace);
    s.fill(Color::rgba(0, 0, 255, 128));
    s.rect(o.0 + 5.0, o.1 + 5.0, 30.0, 30.0)?;
    s.blend_mode(BlendMode::Blend);
    Ok(vec![opaque(o, 20, 20, Color::rgba(0, 0, 255, 128), "t12_replaced")])
}

fn quadrant_image() -> Image {
    let image = Image::new(2, 2);
    image.set(0, 0, Color::rgb(255, 0, 0));
    image.set(1, 0, Color::rgb(0, 0, 255));
    image.set(0, 1, Color::rgb(0, 255, 0));
    image.set(1, 1, Color::BLACK);
    image
}

fn tile_13_textured_quadrants(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(13);
    let image = quadrant_image();
    s.image_sized(&image, o.0 + 4.0, o.1 + 4.0, 32.0, 32.0)?;
    // samples far from the texel boundary so linear filtering agrees with nearest
    Ok(vec![
        opaque(o, 8, 8, Color::rgb(255, 0, 0), "t13_top_left"),
        opaque(o, 31, 8, Color::rgb(0, 0, 255), "t13_top_right"),
        opaque(o, 8, 31, Color::rgb(0, 255, 0), "t13_bottom_left"),
        opaque(o, 31, 31, Color::BLACK, "t13_bottom_right"),
    ])
}

fn tile_14_tinted_texture(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(14);
    let image = Image::new(1, 1);
    image.set(0, 0, Color::WHITE);
    s.tint(Color::rgb(0, 200, 0));
    s.image_sized(&image, o.0 + 5.0, o.1 + 5.0, 30.0, 30.0)?;
    s.no_tint();
    Ok(vec![opaque(o, 20, 20, Color::rgb(0, 200, 0), "t14_tinted")])
}

fn tile_15_pie_arc(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(15);
    s.fill(Color::BLACK);
    s.arc(
        o.0 + 20.0,
        o.1 + 20.0,
        30.0,
        30.0,
        0.0,
        FRAC_PI_2,
        ArcMode::Pie,
    )?;
    Ok(vec![
        opaque(o, 28, 28, Color::BLACK, "t15_inside_quarter"),
        untouched(o, 12, 12, "t15_opposite_quarter"),
        untouched(o, 28, 12, "t15_upper_quarter"),
    ])
}

fn tile_16_thick_line(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(16);
    s.stroke(Color::rgb(0, 0, 255));
    s.stroke_weight(4.0);
    s.line(o.0 + 5.0, o.1 + 20.0, o.0 + 35.0, o.1 + 20.0)?;
    s.no_stroke();
    s.stroke_weight(1.0);
    Ok(vec![
        opaque(o, 20, 20, Color::rgb(0, 0, 255), "t16_on_line"),
        untouched(o, 20, 26, "t16_below_line"),
    ])
}

fn tile_17_recorded_quads(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(17);
    let c = Color::rgb(90, 90, 200);
    s.fill(c);
    s.begin_shape(ShapeMode::Quads)?;
    s.vertex(o.0 + 5.0, o.1 + 5.0)?;
    s.vertex(o.0 + 35.0, o.1 + 5.0)?;
    s.vertex(o.0 + 35.0, o.1 + 20.0)?;
    s.vertex(o.0 + 5.0, o.1 + 20.0)?;
    s.end_shape(EndShape::Open)?;
    Ok(vec![
        opaque(o, 20, 12, c, "t17_quad"),
        untouched(o, 20, 30, "t17_below_quad"),
    ])
}

fn tile_18_offscreen_graphics(s: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let o = tile_origin(18);
    let mut offscreen = s.create_graphics(20, 20, RenderMode::P2D)?;
    offscreen.draw(|g| g.background(Color::rgb(255, 0, 255)))?;
    let image = offscreen.as_image()?;
    s.image(&image, o.0 + 10.0, o.1 + 10.0)?;
    Ok(vec![
        opaque(o, 20, 20, Color::rgb(255, 0, 255), "t18_offscreen_contents"),
        untouched(o, 5, 5, "t18_outside"),
    ])
}

/// Draws overlapping rectangles at different depths on a [`DEPTH_CANVAS_SIZE`] square
/// [`RenderMode::P3D`] surface. The near square is drawn first and must stay visible.
pub fn build_depth_scene(surface: &mut Surface) -> Result<Vec<PixelExpectation>> {
    let near = Color::rgb(0, 0, 255);
    let far = Color::rgb(255, 0, 0);
    surface.background(Color::WHITE)?;
    surface.no_stroke();

    surface.fill(near);
    surface.push_matrix()?;
    surface.translate3(0.0, 0.0, 20.0);
    surface.rect(50.0, 50.0, 20.0, 20.0)?;
    surface.pop_matrix()?;

    surface.fill(far);
    surface.push_matrix()?;
    surface.translate3(0.0, 0.0, -50.0);
    surface.rect(10.0, 10.0, 100.0, 100.0)?;
    surface.pop_matrix()?;

    Ok(vec![
        PixelExpectation::new(60, 60, near, "depth_near_wins"),
        PixelExpectation::new(35, 60, far, "depth_far_visible"),
        PixelExpectation::new(5, 5, Color::WHITE, "depth_background"),
    ])
}
