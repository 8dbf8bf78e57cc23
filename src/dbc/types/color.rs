use serde::{Deserialize, Serialize};

/// 8-bit sRGB color.
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// UI theme the signal palette is tuned for.
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

const PHI_INV: f32 = 0.618_034;
const TAU: f32 = 6.283_185_3;

const L_DARK: [f32; 3] = [0.75, 0.68, 0.82];
const L_LIGHT: [f32; 3] = [0.58, 0.50, 0.65];
const C_LEVELS: [f32; 4] = [0.14, 0.10, 0.17, 0.12];

/// Deterministic palette color for a signal whose least significant bit is `lsb`.
///
/// Hue steps by the golden ratio; lightness and chroma are picked from small
/// tiers in OKLab space, then converted to sRGB.
pub fn signal_color(lsb: u16, theme: Theme) -> Rgb {
    let hue: f32 = (lsb as f32 * PHI_INV).rem_euclid(1.0) * TAU;

    let lsb: u32 = lsb as u32;
    let scrambled: u32 = lsb ^ (lsb >> 2) ^ (lsb >> 5);
    let l: f32 = match theme {
        Theme::Dark => L_DARK[(scrambled % 3) as usize],
        Theme::Light => L_LIGHT[(scrambled % 3) as usize],
    };
    let c: f32 = C_LEVELS[((scrambled >> 2) & 3) as usize];

    let a: f32 = c * hue.cos();
    let b: f32 = c * hue.sin();

    // OKLab -> LMS
    let l_: f32 = l + 0.396_337_78 * a + 0.215_803_76 * b;
    let m_: f32 = l - 0.105_561_346 * a - 0.063_854_17 * b;
    let s_: f32 = l - 0.089_484_18 * a - 1.291_485_5 * b;

    let l3: f32 = l_ * l_ * l_;
    let m3: f32 = m_ * m_ * m_;
    let s3: f32 = s_ * s_ * s_;

    // LMS -> linear sRGB
    let r_lin: f32 = 4.076_741_7 * l3 - 3.307_711_6 * m3 + 0.230_969_94 * s3;
    let g_lin: f32 = -1.268_438 * l3 + 2.609_757_4 * m3 - 0.341_319_38 * s3;
    let b_lin: f32 = -0.004_196_086_3 * l3 - 0.703_418_6 * m3 + 1.707_614_7 * s3;

    Rgb {
        r: to_srgb(r_lin),
        g: to_srgb(g_lin),
        b: to_srgb(b_lin),
    }
}

// gamma 2.2 approximation
fn to_srgb(x: f32) -> u8 {
    let x: f32 = x.clamp(0.0, 1.0);
    (x.powf(1.0 / 2.2) * 255.0 + 0.5) as u8
}
