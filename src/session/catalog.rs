//! Fixed option lists offered to the user

/// Interior design styles; the first one is the session default
pub const INTERIOR_STYLES: &[&str] = &[
    "Mid-Century Modern",
    "Scandinavian",
    "Boho",
    "Industrial",
    "Minimalist",
    "Japandi",
    "Art Deco",
    "Farmhouse",
    "Contemporary",
];

pub const COLOR_PALETTES: &[&str] = &[
    "Neutral",
    "Earth Tones",
    "Cool Blues",
    "Monochrome",
    "Pastel",
];

/// A ready-made room photo the user can start from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleImage {
    pub label: &'static str,
    pub url: &'static str,
}

pub const SAMPLE_IMAGES: &[SampleImage] = &[
    SampleImage {
        label: "Living Room",
        url: "https://i.imgur.com/ZvIli2u.jpg",
    },
    SampleImage {
        label: "Gourmet Kitchen",
        url: "https://i.imgur.com/x3jxHSB.jpg",
    },
    SampleImage {
        label: "Modern Bedroom",
        url: "https://i.imgur.com/nfrpXdQ.jpg",
    },
];

pub fn default_style() -> String {
    INTERIOR_STYLES[0].to_string()
}

/// Look up a sample image by (case-insensitive) label
pub fn sample_image(label: &str) -> Option<&'static SampleImage> {
    SAMPLE_IMAGES
        .iter()
        .find(|sample| sample.label.eq_ignore_ascii_case(label.trim()))
}

/// Canonical spelling of a known style, if any
pub fn find_style(name: &str) -> Option<&'static str> {
    INTERIOR_STYLES
        .iter()
        .copied()
        .find(|style| style.eq_ignore_ascii_case(name.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookups() {
        assert_eq!(default_style(), "Mid-Century Modern");
        assert_eq!(find_style("scandinavian"), Some("Scandinavian"));
        assert_eq!(find_style("Gothic"), None);
        assert_eq!(
            sample_image("living room").map(|s| s.url),
            Some("https://i.imgur.com/ZvIli2u.jpg")
        );
    }
}
