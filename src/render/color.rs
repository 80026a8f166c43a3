//! Normalised RGB colour value and the named palette used as gradient anchors.
//!
//! Channels are `f32` intensities in `[0.0, 1.0]`.  The fields are private
//! and every constructor and operation clamps its output, so a `Color` can
//! be handed to a PWM sink without further checks.

use core::ops::Mul;

/// An immutable RGB colour with normalised channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    r: f32,
    g: f32,
    b: f32,
}

pub const RED: Color = Color::rgb_const(1.0, 0.0, 0.0);
pub const YELLOW: Color = Color::rgb_const(1.0, 1.0, 0.0);
pub const GREEN: Color = Color::rgb_const(0.0, 1.0, 0.0);
pub const CYAN: Color = Color::rgb_const(0.0, 1.0, 1.0);
pub const BLUE: Color = Color::rgb_const(0.0, 0.0, 1.0);
pub const PURPLE: Color = Color::rgb_const(1.0, 0.0, 1.0);
pub const WHITE: Color = Color::rgb_const(1.0, 1.0, 1.0);
pub const BLACK: Color = Color::rgb_const(0.0, 0.0, 0.0);

impl Color {
    /// Palette constructor; callers guarantee channels are already in range.
    const fn rgb_const(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build a colour, clamping each channel into `[0.0, 1.0]`.
    /// NaN channels collapse to 0.
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self {
            r: clamp_unit(r),
            g: clamp_unit(g),
            b: clamp_unit(b),
        }
    }

    pub fn r(&self) -> f32 {
        self.r
    }

    pub fn g(&self) -> f32 {
        self.g
    }

    pub fn b(&self) -> f32 {
        self.b
    }

    /// Per-channel linear interpolation: `self + (to - self) * t`.
    ///
    /// `t` is clamped to `[0, 1]` before use.
    pub fn lerp(self, to: Color, t: f32) -> Color {
        let t = clamp_unit(t);
        Color::new(
            self.r + (to.r - self.r) * t,
            self.g + (to.g - self.g) * t,
            self.b + (to.b - self.b) * t,
        )
    }

    /// Scale brightness by `factor` (per-channel multiply).
    pub fn scaled(self, factor: f32) -> Color {
        Color::new(self.r * factor, self.g * factor, self.b * factor)
    }

    /// Channels as `(r, g, b)` duty values against `max_duty`.
    pub fn to_duty(self, max_duty: u16) -> (u16, u16, u16) {
        let max = f32::from(max_duty);
        (
            (self.r * max).round() as u16,
            (self.g * max).round() as u16,
            (self.b * max).round() as u16,
        )
    }

    /// True if every channel lies in `[0.0, 1.0]`.
    pub fn is_normalised(&self) -> bool {
        [self.r, self.g, self.b]
            .iter()
            .all(|c| (0.0..=1.0).contains(c))
    }
}

impl Mul<f32> for Color {
    type Output = Color;

    fn mul(self, factor: f32) -> Color {
        self.scaled(factor)
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
