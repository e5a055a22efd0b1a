pub mod expectations;
pub mod scene;

pub use expectations::{assert_pixels, check_pixels, PixelExpectation};
pub use scene::{
    build_depth_scene, build_main_scene, CANVAS_HEIGHT, CANVAS_WIDTH, DEPTH_CANVAS_SIZE,
};
