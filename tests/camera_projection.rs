//! Camera and projection behavior observed through `screen_position` and rendered pixels.
//!
//! Run with:   cargo test --test camera_projection
use easel::{Color, RenderMode, Surface, SurfaceConfig};

fn close(actual: [f32; 3], expected: [f32; 3]) -> bool {
    (0..3).all(|i| (actual[i] - expected[i]).abs() < 1e-3)
}

fn surface_3d(width: u32, height: u32) -> Surface {
    Surface::new_software(SurfaceConfig::new(width, height).with_render_mode(RenderMode::P3D))
}

#[test]
fn default_2d_projection_is_pixel_aligned() {
    let s = Surface::new_software(SurfaceConfig::new(200, 100));
    let p = s.screen_position(30.0, 70.0, 0.0).unwrap();
    assert!((p[0] - 30.0).abs() < 1e-3, "{p:?}");
    assert!((p[1] - 70.0).abs() < 1e-3, "{p:?}");
}

#[test]
fn default_perspective_shows_the_z_zero_plane_one_to_one() {
    let s = surface_3d(200, 100);
    for (x, y) in [(0.0, 0.0), (200.0, 100.0), (50.0, 25.0)] {
        let p = s.screen_position(x, y, 0.0).unwrap();
        assert!((p[0] - x).abs() < 1e-2 && (p[1] - y).abs() < 1e-2, "{p:?}");
    }
}

#[test]
fn closer_points_spread_away_from_the_center() {
    let s = surface_3d(100, 100);
    let flat = s.screen_position(90.0, 50.0, 0.0).unwrap();
    let near = s.screen_position(90.0, 50.0, 30.0).unwrap();
    let far = s.screen_position(90.0, 50.0, -30.0).unwrap();
    assert!(near[0] > flat[0] && flat[0] > far[0]);
    // nearer points have smaller depth values
    assert!(near[2] < flat[2] && flat[2] < far[2]);
}

#[test]
fn ortho_bounds_map_the_near_bottom_left_corner() {
    let mut s = surface_3d(64, 32);
    // identity view so the projection sees eye space directly
    s.camera_look_at([0.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]);
    s.ortho_bounds(-4.0, 4.0, -2.0, 2.0, 1.0, 10.0);

    let corner = s.screen_position(-4.0, -2.0, -1.0).unwrap();
    assert!(close(corner, [0.0, 32.0, 0.0]), "{corner:?}");
    let far_top_right = s.screen_position(4.0, 2.0, -10.0).unwrap();
    assert!(close(far_top_right, [64.0, 0.0, 1.0]), "{far_top_right:?}");
}

#[test]
fn camera_restores_the_default_view() {
    let mut s = surface_3d(100, 100);
    let before = s.screen_position(20.0, 30.0, 0.0).unwrap();
    s.camera_look_at([0.0, 0.0, 500.0], [0.0, 0.0, 0.0], [0.0, 1.0, 0.0]);
    assert!(!close(s.screen_position(20.0, 30.0, 0.0).unwrap(), before));
    s.camera();
    assert!(close(s.screen_position(20.0, 30.0, 0.0).unwrap(), before));
}

#[test]
fn points_behind_the_eye_have_no_screen_position() {
    let s = surface_3d(100, 100);
    let eye_z = s.view_state().defaults().eye[2];
    assert!(s.screen_position(50.0, 50.0, eye_z).is_none());
    assert!(s.screen_position(50.0, 50.0, eye_z + 100.0).is_none());
    assert!(s.screen_position(10.0, 90.0, eye_z + 1.0).is_none());
    // just in front of the eye is still visible
    assert!(s.screen_position(50.0, 50.0, eye_z - 1.0).is_some());
}

#[test]
fn resize_reapplies_the_default_camera() {
    let mut s = surface_3d(100, 100);
    s.draw(|s| s.background(Color::WHITE)).unwrap();
    s.resize(40, 20).unwrap();
    s.begin_draw().unwrap();
    let p = s.screen_position(40.0, 20.0, 0.0).unwrap();
    assert!((p[0] - 40.0).abs() < 1e-2 && (p[1] - 20.0).abs() < 1e-2, "{p:?}");
    s.end_draw().unwrap();
    assert_eq!(s.load_pixels().unwrap().len(), 40 * 20 * 4);
}

#[test]
fn perspective_cube_is_drawn_in_front_of_the_background() {
    let mut s = surface_3d(60, 60);
    s.draw(|s| {
        s.background(Color::WHITE)?;
        s.no_stroke();
        s.fill(Color::rgb(0, 160, 0));
        s.translate(30.0, 30.0);
        s.rotate_y(0.5);
        s.rotate_x(0.3);
        s.cube(20.0)
    })
    .unwrap();
    assert_eq!(s.get_pixel(30, 30).unwrap(), Color::rgb(0, 160, 0));
    assert_eq!(s.get_pixel(2, 2).unwrap(), Color::WHITE);
}
