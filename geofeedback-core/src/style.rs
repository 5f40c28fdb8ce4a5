// Static style tables for facility categories and risk levels

use geofeedback_loader::{Category, RiskLevel};
use serde::Serialize;
use std::fmt;

/// 8-bit RGB color parsed from `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().strip_prefix('#')?;
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
        let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
        let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
        Some(Rgb(r, g, b))
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryStyle {
    /// Icon name from the Font Awesome set used by the web client.
    pub icon: &'static str,
    /// Single-cell glyph drawn by terminal renderers.
    pub glyph: char,
    pub color: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskStyle {
    pub color: Rgb,
    pub label: &'static str,
}

pub const EDUCACION_STYLE: CategoryStyle = CategoryStyle {
    icon: "graduation-cap",
    glyph: 'E',
    color: Rgb(0x2E, 0x86, 0xAB),
};

pub const SALUD_STYLE: CategoryStyle = CategoryStyle {
    icon: "hospital",
    glyph: 'H',
    color: Rgb(0xA2, 0x3B, 0x72),
};

pub const EMERGENCIAS_STYLE: CategoryStyle = CategoryStyle {
    icon: "fire-extinguisher",
    glyph: '!',
    color: Rgb(0xF1, 0x8F, 0x01),
};

pub const GOBIERNO_STYLE: CategoryStyle = CategoryStyle {
    icon: "landmark",
    glyph: 'G',
    color: Rgb(0xC7, 0x3E, 0x1D),
};

pub const COMERCIO_STYLE: CategoryStyle = CategoryStyle {
    icon: "shopping-cart",
    glyph: '$',
    color: Rgb(0x6A, 0x4C, 0x93),
};

/// Unknown categories are drawn with the `Comercio` style.
pub fn category_style(category: &Category) -> CategoryStyle {
    match category {
        Category::Educacion => EDUCACION_STYLE,
        Category::Salud => SALUD_STYLE,
        Category::Emergencias => EMERGENCIAS_STYLE,
        Category::Gobierno => GOBIERNO_STYLE,
        Category::Comercio | Category::Other(_) => COMERCIO_STYLE,
    }
}

pub fn risk_style(level: RiskLevel) -> RiskStyle {
    match level {
        RiskLevel::High => RiskStyle {
            color: Rgb(0xFF, 0x6B, 0x6B),
            label: "Alto",
        },
        RiskLevel::Medium => RiskStyle {
            color: Rgb(0xFF, 0xD7, 0x00),
            label: "Medio",
        },
        RiskLevel::Low => RiskStyle {
            color: Rgb(0x90, 0xEE, 0x90),
            label: "Bajo",
        },
        RiskLevel::NoData => RiskStyle {
            color: Rgb(0xCC, 0xCC, 0xCC),
            label: "Sin Datos",
        },
    }
}

/// Paint parameters for risk-zone circles.
pub const ZONE_FILL_OPACITY: f64 = 0.4;
pub const ZONE_STROKE_WEIGHT: u8 = 2;
pub const ZONE_STROKE_OPACITY: f64 = 0.7;
