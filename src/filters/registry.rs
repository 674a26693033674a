//! Catalogue of filter tags understood by the executor.
//!
//! The tag set is closed. Each tag knows its wire name, display name,
//! category, whether it runs as a convolution, and the parameters a fresh
//! filter of that kind starts with.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Category of a filter, used to group tags in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Per-pixel color adjustments
    Color,
    /// Blur kernels
    Blur,
    /// Edge detection and sharpening kernels
    Edge,
    /// Stylizing effects (pixelate, noise, bitcrush)
    Stylize,
}

impl Category {
    /// Get the display name for this category.
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Color => "Color",
            Category::Blur => "Blur",
            Category::Edge => "Edge",
            Category::Stylize => "Stylize",
        }
    }
}

/// Every filter tag the executor knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterTag {
    Grayscale,
    Invert,
    Threshold,
    HsvAdjust,
    LinearBrightness,
    Gamma,
    Box,
    Gaussian,
    Sobel,
    Laplace,
    UnsharpMask,
    Kernel,
    Pixelate,
    Noise,
    Bitcrush,
}

impl FilterTag {
    /// All tags in catalogue order.
    pub const ALL: [FilterTag; 15] = [
        FilterTag::Grayscale,
        FilterTag::Invert,
        FilterTag::Threshold,
        FilterTag::HsvAdjust,
        FilterTag::LinearBrightness,
        FilterTag::Gamma,
        FilterTag::Box,
        FilterTag::Gaussian,
        FilterTag::Sobel,
        FilterTag::Laplace,
        FilterTag::UnsharpMask,
        FilterTag::Kernel,
        FilterTag::Pixelate,
        FilterTag::Noise,
        FilterTag::Bitcrush,
    ];

    /// Wire name of the tag, as it appears in a descriptor's `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterTag::Grayscale => "grayscale",
            FilterTag::Invert => "invert",
            FilterTag::Threshold => "threshold",
            FilterTag::HsvAdjust => "hsv-adjust",
            FilterTag::LinearBrightness => "linear-brightness",
            FilterTag::Gamma => "gamma",
            FilterTag::Box => "box",
            FilterTag::Gaussian => "gaussian",
            FilterTag::Sobel => "sobel",
            FilterTag::Laplace => "laplace",
            FilterTag::UnsharpMask => "unsharp-mask",
            FilterTag::Kernel => "kernel",
            FilterTag::Pixelate => "pixelate",
            FilterTag::Noise => "noise",
            FilterTag::Bitcrush => "bitcrush",
        }
    }

    /// Human-readable name for listings and UIs.
    pub fn display_name(&self) -> &'static str {
        match self {
            FilterTag::Grayscale => "Grayscale",
            FilterTag::Invert => "Invert",
            FilterTag::Threshold => "Threshold",
            FilterTag::HsvAdjust => "HSV Adjust",
            FilterTag::LinearBrightness => "Linear brightness",
            FilterTag::Gamma => "Gamma correction",
            FilterTag::Box => "Box Blur",
            FilterTag::Gaussian => "Gaussian Blur",
            FilterTag::Sobel => "Sobel",
            FilterTag::Laplace => "Laplace",
            FilterTag::UnsharpMask => "Unsharp Masking",
            FilterTag::Kernel => "Custom Kernel",
            FilterTag::Pixelate => "Pixelate",
            FilterTag::Noise => "Noise",
            FilterTag::Bitcrush => "Bitcrush",
        }
    }

    /// Category the tag is listed under.
    pub fn category(&self) -> Category {
        match self {
            FilterTag::Grayscale
            | FilterTag::Invert
            | FilterTag::Threshold
            | FilterTag::HsvAdjust
            | FilterTag::LinearBrightness
            | FilterTag::Gamma => Category::Color,
            FilterTag::Box | FilterTag::Gaussian => Category::Blur,
            FilterTag::Sobel | FilterTag::Laplace | FilterTag::UnsharpMask | FilterTag::Kernel => {
                Category::Edge
            }
            FilterTag::Pixelate | FilterTag::Noise | FilterTag::Bitcrush => Category::Stylize,
        }
    }

    /// Convolution tags write into the back buffer and swap; the rest run in place.
    pub fn is_convolution(&self) -> bool {
        matches!(
            self,
            FilterTag::Box
                | FilterTag::Gaussian
                | FilterTag::Sobel
                | FilterTag::Laplace
                | FilterTag::UnsharpMask
                | FilterTag::Kernel
        )
    }

    /// Parameters a newly added filter of this kind starts with.
    pub fn default_params(&self) -> Value {
        match self {
            FilterTag::Grayscale | FilterTag::Invert | FilterTag::Laplace => json!({}),
            FilterTag::Threshold => json!({ "value": 127 }),
            FilterTag::LinearBrightness => json!({ "value": 0 }),
            FilterTag::Gamma => json!({ "value": 1 }),
            FilterTag::HsvAdjust => json!({ "hue": 0, "saturation": 1, "value": 1 }),
            FilterTag::Box | FilterTag::Gaussian => json!({ "size": 3 }),
            FilterTag::Sobel => json!({ "direction": "x" }),
            FilterTag::UnsharpMask => json!({ "value": 1 }),
            FilterTag::Kernel => json!({
                "size": 3,
                "numerator": 1,
                "denumerator": 1,
                "matrix": [[0, 0, 0], [0, 1, 0], [0, 0, 0]],
            }),
            FilterTag::Pixelate => json!({ "pixelSize": 10 }),
            FilterTag::Noise => json!({ "color": false, "noise": 10 }),
            FilterTag::Bitcrush => json!({ "bits": 4 }),
        }
    }
}

impl fmt::Display for FilterTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| format!("unknown filter tag '{s}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip_through_str() {
        for tag in FilterTag::ALL {
            assert_eq!(tag.as_str().parse::<FilterTag>().unwrap(), tag);
        }
        assert!("sepia".parse::<FilterTag>().is_err());
    }

    #[test]
    fn test_serde_matches_wire_name() {
        for tag in FilterTag::ALL {
            let json = serde_json::to_string(&tag).unwrap();
            assert_eq!(json, format!("\"{}\"", tag.as_str()));
        }
    }

    #[test]
    fn test_convolution_classification() {
        let convolutions: Vec<_> = FilterTag::ALL
            .iter()
            .filter(|tag| tag.is_convolution())
            .collect();
        assert_eq!(convolutions.len(), 6);
        assert!(!FilterTag::Pixelate.is_convolution());
        assert!(FilterTag::Laplace.is_convolution());
    }

    #[test]
    fn test_display_names_and_categories() {
        assert_eq!(FilterTag::Box.display_name(), "Box Blur");
        assert_eq!(FilterTag::Kernel.display_name(), "Custom Kernel");
        assert_eq!(FilterTag::Noise.category(), Category::Stylize);
        assert_eq!(FilterTag::Gaussian.category().display_name(), "Blur");
    }
}
