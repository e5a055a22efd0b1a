//! Behavioral properties of the drawing API, checked on the software backend.
//!
//! Run with:   cargo test --test properties
use std::f32::consts::FRAC_PI_3;

use easel::{
    Color, ColorMode, EndShape, FragmentShader, Image, Matrix, RenderError, RenderMode,
    ShapeMode, Surface, SurfaceConfig, SurfaceState,
};

fn surface(width: u32, height: u32) -> Surface {
    Surface::new_software(SurfaceConfig::new(width, height))
}

fn assert_matrix_eq(a: &Matrix, b: &Matrix) {
    for (x, y) in a.to_array().iter().zip(b.to_array().iter()) {
        assert!((x - y).abs() < 1e-4, "{a:?} != {b:?}");
    }
}

#[test]
fn push_then_pop_restores_the_matrix() {
    let mut s = surface(10, 10);
    s.begin_draw().unwrap();
    s.translate(3.0, 4.0);
    s.rotate(0.3);
    let before = *s.current_matrix();

    s.push_matrix().unwrap();
    s.scale_xy(2.0, 5.0);
    s.rotate_axis(1.2, 1.0, 1.0, 0.0);
    s.translate3(1.0, 2.0, 3.0);
    s.pop_matrix().unwrap();

    assert_eq!(*s.current_matrix(), before);
    s.end_draw().unwrap();
}

#[test]
fn nested_transforms_inside_push_pop_leave_no_trace() {
    let mut s = surface(10, 10);
    s.begin_draw().unwrap();
    s.translate(5.0, 0.0);
    s.push_matrix().unwrap();
    s.translate(10.0, 0.0);
    s.rotate(FRAC_PI_3);
    s.pop_matrix().unwrap();
    assert_matrix_eq(s.current_matrix(), &Matrix::translation(5.0, 0.0, 0.0));
    s.end_draw().unwrap();
}

#[test]
fn unbalanced_pop_is_rejected_without_changing_state() {
    let mut s = surface(10, 10);
    s.begin_draw().unwrap();
    s.translate(2.0, 0.0);
    let before = *s.current_matrix();
    assert!(matches!(s.pop_matrix(), Err(RenderError::UnbalancedStack)));
    assert_eq!(*s.current_matrix(), before);
    s.end_draw().unwrap();
}

#[test]
fn stack_depth_limit_is_enforced() {
    let mut s = Surface::new_software(SurfaceConfig::new(4, 4).with_max_matrix_depth(3));
    s.begin_draw().unwrap();
    for _ in 0..3 {
        s.push_matrix().unwrap();
    }
    assert!(matches!(
        s.push_matrix(),
        Err(RenderError::StackDepthExceeded { limit: 3 })
    ));
    assert_eq!(s.matrix_depth(), 3);
    s.end_draw().unwrap();
}

#[test]
fn triangles_need_a_multiple_of_three_vertices() {
    let mut s = surface(10, 10);
    s.begin_draw().unwrap();
    s.background(Color::WHITE).unwrap();
    s.fill(Color::BLACK);
    s.begin_shape(ShapeMode::Triangles).unwrap();
    for (x, y) in [(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (10.0, 10.0)] {
        s.vertex(x, y).unwrap();
    }
    let err = s.end_shape(EndShape::Close).unwrap_err();
    assert!(matches!(
        err,
        RenderError::InvalidVertexCount {
            mode: ShapeMode::Triangles,
            count: 4,
            ..
        }
    ));
    assert!(err.is_protocol_violation());
    s.end_draw().unwrap();

    // nothing of the rejected shape reached the target
    let pixels = s.load_pixels().unwrap();
    assert!(pixels.chunks_exact(4).all(|p| p == [255, 255, 255, 255]));
}

#[test]
fn colors_are_resolved_when_they_are_set() {
    let mut s = surface(10, 10);
    s.begin_draw().unwrap();
    s.no_stroke();
    s.color_mode_with(ColorMode::Hsb, 360.0, 100.0, 100.0, 255.0);
    s.fill((0.0, 100.0, 100.0));
    // switching back must not reinterpret the stored fill
    s.color_mode(ColorMode::Rgb, 255.0);
    s.rect(0.0, 0.0, 10.0, 10.0).unwrap();
    s.end_draw().unwrap();

    assert_eq!(s.style().fill, Color::rgb(255, 0, 0));
    assert_eq!(s.get_pixel(5, 5).unwrap(), Color::rgb(255, 0, 0));
}

#[test]
fn vertex_without_begin_shape_draws_nothing() {
    let mut s = surface(10, 10);
    s.begin_draw().unwrap();
    s.background(Color::WHITE).unwrap();
    let err = s.vertex(5.0, 5.0).unwrap_err();
    assert!(matches!(err, RenderError::UnmatchedEndShape { .. }));
    assert!(matches!(
        s.end_shape(EndShape::Open),
        Err(RenderError::UnmatchedEndShape { .. })
    ));
    s.end_draw().unwrap();
    assert_eq!(s.get_pixel(5, 5).unwrap(), Color::WHITE);
}

#[test]
fn nested_begin_shape_is_rejected() {
    let mut s = surface(10, 10);
    s.begin_draw().unwrap();
    s.begin_shape(ShapeMode::Polygon).unwrap();
    assert!(matches!(
        s.begin_shape(ShapeMode::Lines),
        Err(RenderError::NestedShape)
    ));
    // the first shape is still open and can be finished
    s.vertex(0.0, 0.0).unwrap();
    s.vertex(5.0, 0.0).unwrap();
    s.vertex(0.0, 5.0).unwrap();
    s.end_shape(EndShape::Close).unwrap();
    s.end_draw().unwrap();
}

#[test]
fn drawing_offscreen_leaves_the_parent_untouched() {
    let mut main = surface(20, 20);
    main.begin_draw().unwrap();
    main.background(Color::BLACK).unwrap();
    main.translate(4.0, 4.0);
    main.fill(Color::rgb(10, 20, 30));
    let matrix = *main.current_matrix();
    let style = *main.style();

    let mut offscreen = main.create_graphics(8, 8, RenderMode::P2D).unwrap();
    offscreen
        .draw(|g| {
            g.background(Color::WHITE)?;
            g.fill(Color::rgb(200, 0, 0));
            g.translate(1.0, 1.0);
            g.rect(0.0, 0.0, 4.0, 4.0)
        })
        .unwrap();

    assert_eq!(main.state(), SurfaceState::Drawing);
    assert_eq!(*main.current_matrix(), matrix);
    assert_eq!(*main.style(), style);
    main.end_draw().unwrap();
    assert_eq!(main.get_pixel(10, 10).unwrap(), Color::BLACK);
    assert_eq!(offscreen.size(), (8, 8));
    assert_eq!(offscreen.get_pixel(2, 2).unwrap(), Color::rgb(200, 0, 0));
}

#[test]
fn offscreen_images_follow_later_frames() {
    let mut main = surface(4, 4);
    let mut offscreen = main.create_graphics(2, 2, RenderMode::P2D).unwrap();
    offscreen.draw(|g| g.background(Color::rgb(255, 0, 0))).unwrap();
    let image = offscreen.as_image().unwrap();
    let generation = image.generation();

    offscreen.draw(|g| g.background(Color::rgb(0, 0, 255))).unwrap();
    assert!(image.generation() > generation);
    assert_eq!(image.get(0, 0), Some(Color::rgb(0, 0, 255)));

    main.draw(|s| s.image_sized(&image, 0.0, 0.0, 4.0, 4.0)).unwrap();
    assert_eq!(main.get_pixel(1, 1).unwrap(), Color::rgb(0, 0, 255));
}

#[test]
fn modified_images_are_uploaded_again() {
    let mut s = surface(4, 4);
    let image = Image::new(1, 1);
    image.set(0, 0, Color::rgb(255, 0, 0));
    s.draw(|s| s.image_sized(&image, 0.0, 0.0, 4.0, 4.0)).unwrap();
    assert_eq!(s.get_pixel(2, 2).unwrap(), Color::rgb(255, 0, 0));

    image.set(0, 0, Color::rgb(0, 255, 0));
    s.draw(|s| s.image_sized(&image, 0.0, 0.0, 4.0, 4.0)).unwrap();
    assert_eq!(s.get_pixel(2, 2).unwrap(), Color::rgb(0, 255, 0));
}

#[test]
fn software_backend_reports_custom_shaders_as_unsupported() {
    let shader = FragmentShader::new(
        "@fragment fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> { return in.color; }",
    )
    .unwrap();
    let mut s = surface(4, 4);
    assert!(!s.backend().capabilities().custom_shaders);

    let result = s.draw(|s| {
        s.no_stroke();
        s.fill(Color::rgb(0, 0, 255));
        s.shader(&shader);
        s.rect(0.0, 0.0, 4.0, 4.0)
    });
    assert!(matches!(
        result,
        Err(RenderError::UnsupportedCapability { .. })
    ));
    // the frame still ended and the geometry was drawn with the default shading
    assert_eq!(s.state(), SurfaceState::Idle);
    assert_eq!(s.get_pixel(2, 2).unwrap(), Color::rgb(0, 0, 255));
}

#[test]
fn shaders_without_an_entry_point_are_rejected() {
    let err = FragmentShader::new("fn helper() -> f32 { return 1.0; }").unwrap_err();
    assert!(matches!(err, RenderError::ResourceUpload { .. }));
}

#[test]
fn style_persists_across_frames_but_transforms_do_not() {
    let mut s = surface(10, 10);
    s.draw(|s| {
        s.fill(Color::rgb(1, 2, 3));
        s.stroke_weight(7.0);
        s.translate(4.0, 4.0);
        Ok(())
    })
    .unwrap();

    s.begin_draw().unwrap();
    assert_eq!(s.style().fill, Color::rgb(1, 2, 3));
    assert_eq!(s.style().stroke_weight, 7.0);
    assert_eq!(*s.current_matrix(), Matrix::identity());
    s.end_draw().unwrap();
}

#[test]
fn long_hairlines_render_only_their_visible_part() {
    let mut s = Surface::new_software(SurfaceConfig::new(64, 64).with_render_mode(RenderMode::P3D));
    let started = std::time::Instant::now();
    s.draw(|s| {
        s.background(Color::BLACK)?;
        s.stroke(Color::WHITE);
        s.line3([-1.0e8, 32.0, 0.0], [1.0e8, 32.0, 1.0])
    })
    .unwrap();
    assert!(
        started.elapsed() < std::time::Duration::from_secs(1),
        "took {:?}",
        started.elapsed()
    );
    let pixels = s.load_pixels().unwrap();
    let lit = |x: usize, y: usize| pixels[(y * 64 + x) * 4] == 255;
    for x in [0, 32, 63] {
        assert!(lit(x, 31) || lit(x, 32), "column {x} has no line pixel");
    }
    assert!(!lit(32, 10));
}
