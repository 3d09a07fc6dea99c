//! Sphere sample directions for the multiple-scattering integral.

use std::f32::consts::{PI, TAU};

use glam::Vec4;

/// Directions integrated per multiple-scattering texel.
pub const SAMPLE_COUNT: usize = 64;

/// Solid-angle weight carried in each direction's `w`: the full sphere, 4π.
pub const SAMPLE_WEIGHT: f32 = 4.0 * PI;

const GRID_SIDE: usize = 8;

/// How the 64 directions cover the sphere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SamplingMode {
    /// Fibonacci spiral: near-uniform area coverage.
    #[default]
    Fibonacci,
    /// 8x8 grid over azimuth and polar angle, denser at the poles.
    UniformGrid,
}

impl SamplingMode {
    pub fn from_fibonacci_flag(use_fibonacci: bool) -> Self {
        if use_fibonacci {
            Self::Fibonacci
        } else {
            Self::UniformGrid
        }
    }
}

/// 64 unit directions, each with [`SAMPLE_WEIGHT`] in `w`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleDirectionSet {
    mode: SamplingMode,
    directions: [Vec4; SAMPLE_COUNT],
}

impl SampleDirectionSet {
    pub fn generate(mode: SamplingMode) -> Self {
        let directions = match mode {
            SamplingMode::Fibonacci => fibonacci_sphere(),
            SamplingMode::UniformGrid => uniform_grid(),
        };
        Self { mode, directions }
    }

    pub fn mode(&self) -> SamplingMode {
        self.mode
    }

    pub fn as_slice(&self) -> &[Vec4] {
        &self.directions
    }
}

fn fibonacci_sphere() -> [Vec4; SAMPLE_COUNT] {
    let phi = (5.0_f32.sqrt() - 1.0) / 2.0;
    let count = SAMPLE_COUNT as f32;
    std::array::from_fn(|i| {
        let n = (i + 1) as f32;
        let y = (2.0 * n - 1.0) / count - 1.0;
        let ring = (1.0 - y * y).max(0.0).sqrt();
        let angle = TAU * n * phi;
        Vec4::new(angle.cos() * ring, y, angle.sin() * ring, SAMPLE_WEIGHT)
    })
}

/// Row-major over the polar index: `directions[phi * 8 + theta]`.
fn uniform_grid() -> [Vec4; SAMPLE_COUNT] {
    let side = GRID_SIDE as f32;
    std::array::from_fn(|i| {
        let (phi, theta) = (i / GRID_SIDE, i % GRID_SIDE);
        let u = (theta as f32 + 0.5) / side;
        let v = (phi as f32 + 0.5) / side;
        let (sin_polar, cos_polar) = (v * PI).sin_cos();
        let (sin_azimuth, cos_azimuth) = (u * TAU).sin_cos();
        Vec4::new(
            cos_azimuth * sin_polar,
            cos_polar,
            sin_azimuth * sin_polar,
            SAMPLE_WEIGHT,
        )
    })
}
