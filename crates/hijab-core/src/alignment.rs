//! Face alignment via 4-DOF similarity transform.
//!
//! Aligns a detected face to a canonical square crop using the outer eyes
//! and nose landmarks and least-squares estimation.

use image::{Rgb, RgbImage};

/// Canonical eye and nose positions for a 112×112 crop.
/// Scaled linearly for other output sizes.
const REFERENCE_EYES_AND_NOSE_112: [(f32, f32); 3] = [
    (38.2946, 51.6963), // left eye
    (73.5318, 51.5014), // right eye
    (56.0252, 71.7366), // nose
];
const REFERENCE_SIZE: f32 = 112.0;

/// Indices of left eye, right eye and nose in five-point detector landmarks.
const EYES_AND_NOSE: [usize; 3] = [0, 1, 2];

/// Side length of aligned faces written by the extractor.
pub const DEFAULT_ALIGNED_SIZE: u32 = 200;

/// Reference eyes-and-nose positions for a `size × size` crop.
fn reference_landmarks(size: u32) -> [(f32, f32); 3] {
    let k = size as f32 / REFERENCE_SIZE;
    REFERENCE_EYES_AND_NOSE_112.map(|(x, y)| (x * k, y * k))
}

/// Estimate a 2×3 similarity transform (4-DOF: scale, rotation, translation)
/// from `src` landmarks to `dst` landmarks using least-squares.
///
/// Returns [a, -b, tx, b, a, ty] representing the matrix:
/// ```text
/// | a  -b  tx |
/// | b   a  ty |
/// ```
fn estimate_similarity_transform(src: &[(f32, f32)], dst: &[(f32, f32)]) -> [f32; 6] {
    // Normal equations of the overdetermined system A * [a, b, tx, ty]^T = B.
    // Each point pair (sx, sy) -> (dx, dy) adds two rows:
    //   sx * a - sy * b + tx = dx
    //   sy * a + sx * b + ty = dy
    let mut ata = [0.0f32; 16];
    let mut atb = [0.0f32; 4];

    for (&(sx, sy), &(dx, dy)) in src.iter().zip(dst) {
        let r1 = [sx, -sy, 1.0, 0.0];
        let r2 = [sy, sx, 0.0, 1.0];

        for j in 0..4 {
            for k in 0..4 {
                ata[j * 4 + k] += r1[j] * r1[k] + r2[j] * r2[k];
            }
            atb[j] += r1[j] * dx + r2[j] * dy;
        }
    }

    let [a, b, tx, ty] = solve_4x4(&ata, &atb);
    [a, -b, tx, b, a, ty]
}

/// Solve a 4×4 linear system via Gaussian elimination with partial pivoting.
#[allow(clippy::needless_range_loop)]
fn solve_4x4(ata: &[f32; 16], atb: &[f32; 4]) -> [f32; 4] {
    let mut m = [[0.0f32; 5]; 4];
    for i in 0..4 {
        m[i][..4].copy_from_slice(&ata[i * 4..i * 4 + 4]);
        m[i][4] = atb[i];
    }

    for col in 0..4 {
        let max_row = (col..4)
            .max_by(|&r1, &r2| m[r1][col].abs().total_cmp(&m[r2][col].abs()))
            .unwrap_or(col);
        m.swap(col, max_row);

        let pivot = m[col][col];
        if pivot.abs() < 1e-12 {
            return [1.0, 0.0, 0.0, 0.0];
        }

        for row in (col + 1)..4 {
            let factor = m[row][col] / pivot;
            for j in col..5 {
                m[row][j] -= factor * m[col][j];
            }
        }
    }

    let mut x = [0.0f32; 4];
    for i in (0..4).rev() {
        x[i] = m[i][4];
        for j in (i + 1)..4 {
            x[i] -= m[i][j] * x[j];
        }
        x[i] /= m[i][i];
    }

    x
}

/// Apply a similarity warp to produce a `out_size × out_size` RGB image.
///
/// Uses bilinear interpolation. Out-of-bounds pixels are black.
fn warp_affine(image: &RgbImage, matrix: &[f32; 6], out_size: u32) -> RgbImage {
    let (a, tx, b, ty) = (matrix[0], matrix[2], matrix[3], matrix[5]);
    let mut output = RgbImage::new(out_size, out_size);

    // M = [[a, -b], [b, a]], det = a^2 + b^2
    let det = a * a + b * b;
    if det.abs() < 1e-12 {
        return output;
    }
    let ia = a / det;
    let ib = b / det;

    let (w, h) = (image.width() as i64, image.height() as i64);
    let sample = |x: i64, y: i64, c: usize| -> f32 {
        if x >= 0 && x < w && y >= 0 && y < h {
            image.get_pixel(x as u32, y as u32)[c] as f32
        } else {
            0.0
        }
    };

    for (ox, oy, out_pixel) in output.enumerate_pixels_mut() {
        // src = M^-1 * (dst - t)
        let dx = ox as f32 - tx;
        let dy = oy as f32 - ty;
        let sx = ia * dx + ib * dy;
        let sy = -ib * dx + ia * dy;

        let x0 = sx.floor() as i64;
        let y0 = sy.floor() as i64;
        let fx = sx - x0 as f32;
        let fy = sy - y0 as f32;

        let mut rgb = [0u8; 3];
        for (c, channel) in rgb.iter_mut().enumerate() {
            let val = sample(x0, y0, c) * (1.0 - fx) * (1.0 - fy)
                + sample(x0 + 1, y0, c) * fx * (1.0 - fy)
                + sample(x0, y0 + 1, c) * (1.0 - fx) * fy
                + sample(x0 + 1, y0 + 1, c) * fx * fy;
            *channel = val.round().clamp(0.0, 255.0) as u8;
        }
        *out_pixel = Rgb(rgb);
    }

    output
}

/// Align a detected face to a canonical `size × size` crop.
///
/// Only the outer eyes and nose of the five detector landmarks take part
/// in the fit; mouth corners are ignored.
pub fn align_face(image: &RgbImage, landmarks: &[(f32, f32); 5], size: u32) -> RgbImage {
    let src = EYES_AND_NOSE.map(|i| landmarks[i]);
    let matrix = estimate_similarity_transform(&src, &reference_landmarks(size));
    warp_affine(image, &matrix, size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_transform() {
        let pts = REFERENCE_EYES_AND_NOSE_112;
        let m = estimate_similarity_transform(&pts, &pts);

        assert!((m[0] - 1.0).abs() < 1e-4, "a = {}", m[0]);
        assert!(m[1].abs() < 1e-4, "-b = {}", m[1]);
        assert!(m[2].abs() < 1e-3, "tx = {}", m[2]);
        assert!(m[3].abs() < 1e-4, "b = {}", m[3]);
        assert!((m[4] - 1.0).abs() < 1e-4, "a2 = {}", m[4]);
        assert!(m[5].abs() < 1e-3, "ty = {}", m[5]);
    }

    #[test]
    fn test_scaled_transform() {
        // Source landmarks at 2x scale → transform should have a ≈ 0.5
        let src = REFERENCE_EYES_AND_NOSE_112.map(|(x, y)| (x * 2.0, y * 2.0));
        let m = estimate_similarity_transform(&src, &REFERENCE_EYES_AND_NOSE_112);
        assert!((m[0] - 0.5).abs() < 0.01, "a = {}, expected ~0.5", m[0]);
    }

    #[test]
    fn test_reference_landmarks_scale_with_size() {
        let refs = reference_landmarks(224);
        assert!((refs[2].0 - 112.0504).abs() < 1e-3);
        assert!((refs[2].1 - 143.4732).abs() < 1e-3);
    }

    #[test]
    fn test_align_face_output_size() {
        let image = RgbImage::from_pixel(640, 480, Rgb([128, 64, 32]));
        let landmarks = [
            (300.0, 200.0),
            (340.0, 200.0),
            (320.0, 225.0),
            (305.0, 250.0),
            (335.0, 250.0),
        ];
        let aligned = align_face(&image, &landmarks, DEFAULT_ALIGNED_SIZE);
        assert_eq!(aligned.dimensions(), (DEFAULT_ALIGNED_SIZE, DEFAULT_ALIGNED_SIZE));
        // Interior of a uniform source stays uniform.
        assert_eq!(aligned.get_pixel(100, 100), &Rgb([128, 64, 32]));
    }

    #[test]
    fn test_align_face_out_of_bounds_is_black() {
        let image = RgbImage::from_pixel(20, 20, Rgb([255, 255, 255]));
        // Tiny face near the bottom-right corner: the lower-right of the crop
        // lies outside the source.
        let landmarks = [(17.0, 17.0), (19.0, 17.0), (18.0, 18.0), (17.5, 19.0), (18.5, 19.0)];
        let aligned = align_face(&image, &landmarks, 200);
        assert_eq!(aligned.get_pixel(199, 199), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_landmark_roundtrip() {
        // A bright patch at the left eye lands near the reference left eye.
        let mut image = RgbImage::new(200, 200);
        let src_landmarks: [(f32, f32); 5] = [
            (80.0, 60.0),
            (120.0, 60.0),
            (100.0, 85.0),
            (85.0, 110.0),
            (115.0, 110.0),
        ];
        for dy in 0..5 {
            for dx in 0..5 {
                image.put_pixel(78 + dx, 58 + dy, Rgb([255, 255, 255]));
            }
        }

        let size = 112;
        let aligned = align_face(&image, &src_landmarks, size);

        let ref_x = REFERENCE_EYES_AND_NOSE_112[0].0.round() as u32;
        let ref_y = REFERENCE_EYES_AND_NOSE_112[0].1.round() as u32;
        let mut max_val = 0u8;
        for y in ref_y - 1..=ref_y + 1 {
            for x in ref_x - 1..=ref_x + 1 {
                max_val = max_val.max(aligned.get_pixel(x, y)[0]);
            }
        }
        assert!(max_val > 100, "expected bright patch near ({ref_x}, {ref_y}), max={max_val}");
    }
}
