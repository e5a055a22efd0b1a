use easel::Color;

/// A single pixel-color expectation to validate after rendering.
#[derive(Debug, Clone)]
pub struct PixelExpectation {
    pub x: u32,
    pub y: u32,
    pub expected: Color,
    /// Per-channel tolerance for comparison (default 5).
    pub tolerance: u8,
    /// Human-readable label for failure messages.
    pub label: &'static str,
}

impl PixelExpectation {
    pub fn new(x: u32, y: u32, expected: Color, label: &'static str) -> Self {
        Self {
            x,
            y,
            expected,
            tolerance: 5,
            label,
        }
    }

    pub fn with_tolerance(mut self, tolerance: u8) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Convenience: expect a fully opaque color.
    pub fn opaque(x: u32, y: u32, r: u8, g: u8, b: u8, label: &'static str) -> Self {
        Self::new(x, y, Color::rgb(r, g, b), label)
    }

    /// Convenience: expect a fully transparent pixel.
    pub fn transparent(x: u32, y: u32, label: &'static str) -> Self {
        Self::new(x, y, Color::TRANSPARENT, label)
    }
}

/// Validates pixel expectations against straight-alpha RGBA8 rows as returned by
/// `Surface::load_pixels()`.
///
/// Returns a list of human-readable failure descriptions. An empty list means
/// all expectations passed.
pub fn check_pixels(
    pixel_data: &[u8],
    width: u32,
    height: u32,
    expectations: &[PixelExpectation],
) -> Vec<String> {
    let mut failures = Vec::new();
    let stride = (width as usize) * 4;

    for expectation in expectations {
        if expectation.x >= width || expectation.y >= height {
            failures.push(format!(
                "[{}] pixel ({},{}) is outside canvas {}×{}",
                expectation.label, expectation.x, expectation.y, width, height,
            ));
            continue;
        }

        let offset = (expectation.y as usize) * stride + (expectation.x as usize) * 4;
        if offset + 4 > pixel_data.len() {
            failures.push(format!(
                "[{}] pixel ({},{}) is out of bounds (buffer len {})",
                expectation.label,
                expectation.x,
                expectation.y,
                pixel_data.len(),
            ));
            continue;
        }

        let actual = &pixel_data[offset..offset + 4];
        let expected = expectation.expected.to_array();
        let tolerance = expectation.tolerance as i16;
        let matches = actual
            .iter()
            .zip(expected.iter())
            .all(|(&a, &e)| channel_matches(a, e, tolerance));

        if !matches {
            failures.push(format!(
                "[{}] pixel ({},{}) expected rgba({},{},{},{}) ±{} but got rgba({},{},{},{})",
                expectation.label,
                expectation.x,
                expectation.y,
                expected[0],
                expected[1],
                expected[2],
                expected[3],
                expectation.tolerance,
                actual[0],
                actual[1],
                actual[2],
                actual[3],
            ));
        }
    }

    failures
}

/// Panics with every failed expectation listed.
pub fn assert_pixels(pixel_data: &[u8], width: u32, height: u32, expectations: &[PixelExpectation]) {
    let failures = check_pixels(pixel_data, width, height, expectations);
    if !failures.is_empty() {
        panic!(
            "{} pixel expectation(s) failed:\n{}",
            failures.len(),
            failures.join("\n"),
        );
    }
}

fn channel_matches(actual: u8, expected: u8, tolerance: i16) -> bool {
    let diff = (actual as i16) - (expected as i16);
    diff.abs() <= tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_mismatches_and_out_of_range_pixels() {
        let pixels = [10, 20, 30, 255, 0, 0, 0, 0];
        let expectations = [
            PixelExpectation::opaque(0, 0, 12, 18, 30, "close_enough"),
            PixelExpectation::transparent(1, 0, "transparent"),
            PixelExpectation::opaque(1, 0, 255, 255, 255, "wrong"),
            PixelExpectation::transparent(2, 0, "outside"),
        ];
        let failures = check_pixels(&pixels, 2, 1, &expectations);
        assert_eq!(failures.len(), 2);
        assert!(failures[0].starts_with("[wrong]"));
        assert!(failures[1].starts_with("[outside]"));
    }
}
