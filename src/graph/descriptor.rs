//! Typed filter descriptors.
//!
//! A descriptor arrives as `{ id, type, params }` with loosely typed params.
//! [`Filter::from_params`] validates the params for the given tag once, at
//! the parsing boundary, so the executor never casts or range-checks.

use crate::core::error::FilterError;
use crate::filters::kernels::{self, KernelDescriptor, SobelDirection};
use crate::filters::registry::FilterTag;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

/// Largest kernel side the engine can address.
pub const MAX_KERNEL_SIZE: i64 = 255;

/// A filter with validated parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Grayscale,
    Invert,
    Threshold { value: u8 },
    HsvAdjust { hue: f32, saturation: f32, value: f32 },
    /// Brightness in percent; applied as the multiplier `10^(value / 100)`.
    LinearBrightness { value: f64 },
    Gamma { value: f32 },
    Box { size: u32 },
    /// Sizes other than 3, 5 and 7 run the 3x3 kernel.
    Gaussian { size: i64 },
    Sobel { direction: SobelDirection },
    Laplace,
    UnsharpMask { value: f32 },
    Kernel {
        size: u32,
        numerator: f64,
        denumerator: f64,
        matrix: Vec<Vec<f64>>,
    },
    Pixelate { pixel_size: u8 },
    Noise { noise: u8, color: bool },
    Bitcrush { bits: u8 },
    /// A tag outside the catalogue. Skipped at execution time.
    Unsupported { tag: String },
}

#[derive(Deserialize)]
struct NoArgs {}

#[derive(Deserialize)]
struct ValueArgs {
    value: f64,
}

#[derive(Deserialize)]
struct SizeArgs {
    size: i64,
}

#[derive(Deserialize)]
struct DirectionArgs {
    direction: SobelDirection,
}

#[derive(Deserialize)]
struct HsvArgs {
    hue: f64,
    saturation: f64,
    value: f64,
}

#[derive(Deserialize)]
struct PixelateArgs {
    #[serde(rename = "pixelSize")]
    pixel_size: i64,
}

#[derive(Deserialize)]
struct NoiseArgs {
    noise: i64,
    color: bool,
}

#[derive(Deserialize)]
struct BitcrushArgs {
    bits: i64,
}

#[derive(Deserialize)]
struct CustomKernelArgs {
    size: i64,
    numerator: f64,
    denumerator: f64,
    #[serde(alias = "kernel")]
    matrix: Vec<Vec<f64>>,
}

fn parse_args<T: DeserializeOwned>(tag: FilterTag, params: &Value) -> Result<T, FilterError> {
    // Param-less filters may omit `params` entirely.
    let empty = json!({});
    let params = if params.is_null() { &empty } else { params };
    T::deserialize(params).map_err(|e| FilterError::MalformedParams {
        filter: tag.to_string(),
        reason: e.to_string(),
    })
}

fn out_of_range(tag: FilterTag, param: &'static str, value: f64, expected: &'static str) -> FilterError {
    FilterError::ParamOutOfRange {
        filter: tag.to_string(),
        param,
        value,
        expected,
    }
}

fn check_range(
    tag: FilterTag,
    param: &'static str,
    value: f64,
    min: f64,
    max: f64,
    expected: &'static str,
) -> Result<(), FilterError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(out_of_range(tag, param, value, expected))
    }
}

fn check_finite(tag: FilterTag, param: &'static str, value: f64) -> Result<(), FilterError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(out_of_range(tag, param, value, "a finite number"))
    }
}

impl Filter {
    /// Parse a descriptor's tag and params into a validated filter.
    ///
    /// Unknown tags are not an error here; they become [`Filter::Unsupported`].
    pub fn from_params(tag: &str, params: &Value) -> Result<Self, FilterError> {
        let Ok(known) = tag.parse::<FilterTag>() else {
            return Ok(Filter::Unsupported {
                tag: tag.to_string(),
            });
        };
        Self::from_tag(known, params)
    }

    /// Validate params for a catalogue tag.
    pub fn from_tag(tag: FilterTag, params: &Value) -> Result<Self, FilterError> {
        let filter = match tag {
            FilterTag::Grayscale => {
                parse_args::<NoArgs>(tag, params)?;
                Filter::Grayscale
            }
            FilterTag::Invert => {
                parse_args::<NoArgs>(tag, params)?;
                Filter::Invert
            }
            FilterTag::Laplace => {
                parse_args::<NoArgs>(tag, params)?;
                Filter::Laplace
            }
            FilterTag::Threshold => {
                let args: ValueArgs = parse_args(tag, params)?;
                check_range(tag, "value", args.value, 0.0, 255.0, "0..=255")?;
                Filter::Threshold {
                    value: args.value.round() as u8,
                }
            }
            FilterTag::HsvAdjust => {
                let args: HsvArgs = parse_args(tag, params)?;
                check_range(tag, "hue", args.hue, -180.0, 180.0, "-180..=180")?;
                check_range(tag, "saturation", args.saturation, 0.0, 10.0, "0..=10")?;
                check_range(tag, "value", args.value, 0.0, 10.0, "0..=10")?;
                Filter::HsvAdjust {
                    hue: args.hue as f32,
                    saturation: args.saturation as f32,
                    value: args.value as f32,
                }
            }
            FilterTag::LinearBrightness => {
                let args: ValueArgs = parse_args(tag, params)?;
                check_finite(tag, "value", args.value)?;
                Filter::LinearBrightness { value: args.value }
            }
            FilterTag::Gamma => {
                let args: ValueArgs = parse_args(tag, params)?;
                if !(args.value.is_finite() && args.value > 0.0) {
                    return Err(out_of_range(tag, "value", args.value, "greater than 0"));
                }
                Filter::Gamma {
                    value: args.value as f32,
                }
            }
            FilterTag::Box => {
                let args: SizeArgs = parse_args(tag, params)?;
                if !(1..=MAX_KERNEL_SIZE).contains(&args.size) {
                    return Err(out_of_range(tag, "size", args.size as f64, "1..=255"));
                }
                Filter::Box {
                    size: args.size as u32,
                }
            }
            FilterTag::Gaussian => {
                let args: SizeArgs = parse_args(tag, params)?;
                Filter::Gaussian { size: args.size }
            }
            FilterTag::Sobel => {
                let args: DirectionArgs = parse_args(tag, params)?;
                Filter::Sobel {
                    direction: args.direction,
                }
            }
            FilterTag::UnsharpMask => {
                let args: ValueArgs = parse_args(tag, params)?;
                check_finite(tag, "value", args.value)?;
                Filter::UnsharpMask {
                    value: args.value as f32,
                }
            }
            FilterTag::Kernel => Self::custom_kernel(tag, parse_args(tag, params)?)?,
            FilterTag::Pixelate => {
                let args: PixelateArgs = parse_args(tag, params)?;
                if !(2..=255).contains(&args.pixel_size) {
                    return Err(out_of_range(
                        tag,
                        "pixelSize",
                        args.pixel_size as f64,
                        "2..=255",
                    ));
                }
                Filter::Pixelate {
                    pixel_size: args.pixel_size as u8,
                }
            }
            FilterTag::Noise => {
                let args: NoiseArgs = parse_args(tag, params)?;
                if !(1..=255).contains(&args.noise) {
                    return Err(out_of_range(tag, "noise", args.noise as f64, "1..=255"));
                }
                Filter::Noise {
                    noise: args.noise as u8,
                    color: args.color,
                }
            }
            FilterTag::Bitcrush => {
                let args: BitcrushArgs = parse_args(tag, params)?;
                if !(1..=7).contains(&args.bits) {
                    return Err(out_of_range(tag, "bits", args.bits as f64, "1..=7"));
                }
                Filter::Bitcrush {
                    bits: args.bits as u8,
                }
            }
        };
        Ok(filter)
    }

    fn custom_kernel(tag: FilterTag, args: CustomKernelArgs) -> Result<Self, FilterError> {
        if !(1..=MAX_KERNEL_SIZE).contains(&args.size) {
            return Err(out_of_range(tag, "size", args.size as f64, "1..=255"));
        }
        check_finite(tag, "numerator", args.numerator)?;
        if args.denumerator == 0.0 || !args.denumerator.is_finite() {
            return Err(out_of_range(
                tag,
                "denumerator",
                args.denumerator,
                "a finite non-zero number",
            ));
        }

        let size = args.size as usize;
        let shape_error = |reason: String| FilterError::Shape {
            filter: tag.to_string(),
            size: args.size,
            reason,
        };
        if args.matrix.len() != size {
            return Err(shape_error(format!("got {} row(s)", args.matrix.len())));
        }
        if let Some((row, cells)) = args
            .matrix
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != size)
        {
            return Err(shape_error(format!("row {row} has {} cell(s)", cells.len())));
        }
        if args.matrix.iter().flatten().any(|w| !w.is_finite()) {
            return Err(shape_error("weights must be finite".to_string()));
        }

        Ok(Filter::Kernel {
            size: args.size as u32,
            numerator: args.numerator,
            denumerator: args.denumerator,
            matrix: args.matrix,
        })
    }

    /// The catalogue tag, or `None` for unsupported filters.
    pub fn tag(&self) -> Option<FilterTag> {
        let tag = match self {
            Filter::Grayscale => FilterTag::Grayscale,
            Filter::Invert => FilterTag::Invert,
            Filter::Threshold { .. } => FilterTag::Threshold,
            Filter::HsvAdjust { .. } => FilterTag::HsvAdjust,
            Filter::LinearBrightness { .. } => FilterTag::LinearBrightness,
            Filter::Gamma { .. } => FilterTag::Gamma,
            Filter::Box { .. } => FilterTag::Box,
            Filter::Gaussian { .. } => FilterTag::Gaussian,
            Filter::Sobel { .. } => FilterTag::Sobel,
            Filter::Laplace => FilterTag::Laplace,
            Filter::UnsharpMask { .. } => FilterTag::UnsharpMask,
            Filter::Kernel { .. } => FilterTag::Kernel,
            Filter::Pixelate { .. } => FilterTag::Pixelate,
            Filter::Noise { .. } => FilterTag::Noise,
            Filter::Bitcrush { .. } => FilterTag::Bitcrush,
            Filter::Unsupported { .. } => return None,
        };
        Some(tag)
    }

    /// Wire name of the filter, including unsupported tags.
    pub fn name(&self) -> &str {
        match self {
            Filter::Unsupported { tag } => tag,
            other => other.tag().map(|t| t.as_str()).unwrap_or_default(),
        }
    }

    /// Kernel for convolution filters; `None` for in-place and unsupported ones.
    pub fn kernel(&self) -> Option<KernelDescriptor> {
        let kernel = match self {
            Filter::Box { size } => kernels::box_kernel(*size),
            Filter::Gaussian { size } => kernels::gaussian_kernel(*size),
            Filter::Sobel { direction } => kernels::sobel_kernel(*direction),
            Filter::Laplace => kernels::laplace_kernel(),
            Filter::UnsharpMask { value } => kernels::unsharp_mask_kernel(*value),
            Filter::Kernel {
                size,
                numerator,
                denumerator,
                matrix,
            } => kernels::custom_kernel(*size, *numerator, *denumerator, matrix.clone()),
            _ => return None,
        };
        Some(kernel)
    }

    /// Params in wire form, suitable for writing the descriptor back out.
    pub fn params(&self) -> Value {
        match self {
            Filter::Grayscale | Filter::Invert | Filter::Laplace => json!({}),
            Filter::Threshold { value } => json!({ "value": value }),
            Filter::HsvAdjust {
                hue,
                saturation,
                value,
            } => json!({ "hue": hue, "saturation": saturation, "value": value }),
            Filter::LinearBrightness { value } => json!({ "value": value }),
            Filter::Gamma { value } => json!({ "value": value }),
            Filter::Box { size } => json!({ "size": size }),
            Filter::Gaussian { size } => json!({ "size": size }),
            Filter::Sobel { direction } => json!({ "direction": direction }),
            Filter::UnsharpMask { value } => json!({ "value": value }),
            Filter::Kernel {
                size,
                numerator,
                denumerator,
                matrix,
            } => json!({
                "size": size,
                "numerator": numerator,
                "denumerator": denumerator,
                "matrix": matrix,
            }),
            Filter::Pixelate { pixel_size } => json!({ "pixelSize": pixel_size }),
            Filter::Noise { noise, color } => json!({ "noise": noise, "color": color }),
            Filter::Bitcrush { bits } => json!({ "bits": bits }),
            Filter::Unsupported { .. } => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(tag: &str, params: Value) -> Result<Filter, FilterError> {
        Filter::from_params(tag, &params)
    }

    #[test]
    fn test_defaults_parse_for_every_tag() {
        for tag in FilterTag::ALL {
            let filter = Filter::from_tag(tag, &tag.default_params()).unwrap();
            assert_eq!(filter.tag(), Some(tag));
            assert_eq!(filter.name(), tag.as_str());
        }
    }

    #[test]
    fn test_unknown_tag_is_unsupported() {
        let filter = parse("sepia", json!({ "amount": 3 })).unwrap();
        assert_eq!(
            filter,
            Filter::Unsupported {
                tag: "sepia".to_string()
            }
        );
        assert_eq!(filter.tag(), None);
        assert_eq!(filter.name(), "sepia");
    }

    #[test]
    fn test_threshold_range_and_rounding() {
        assert_eq!(
            parse("threshold", json!({ "value": 126.6 })).unwrap(),
            Filter::Threshold { value: 127 }
        );
        let error = parse("threshold", json!({ "value": 256 })).unwrap_err();
        assert!(matches!(
            error,
            FilterError::ParamOutOfRange { param: "value", .. }
        ));
        assert!(parse("threshold", json!({ "value": -1 })).is_err());
    }

    #[test]
    fn test_hsv_ranges() {
        assert!(parse("hsv-adjust", json!({ "hue": -180, "saturation": 0, "value": 10 })).is_ok());
        let error = parse("hsv-adjust", json!({ "hue": 181, "saturation": 1, "value": 1 })).unwrap_err();
        assert!(matches!(error, FilterError::ParamOutOfRange { param: "hue", .. }));
        let error = parse("hsv-adjust", json!({ "hue": 0, "saturation": 10.5, "value": 1 })).unwrap_err();
        assert!(matches!(
            error,
            FilterError::ParamOutOfRange { param: "saturation", .. }
        ));
    }

    #[test]
    fn test_gamma_must_be_positive() {
        assert!(parse("gamma", json!({ "value": 0.1 })).is_ok());
        assert!(parse("gamma", json!({ "value": 0 })).is_err());
        assert!(parse("gamma", json!({ "value": -2 })).is_err());
    }

    #[test]
    fn test_integer_bounds() {
        assert!(parse("box", json!({ "size": 0 })).is_err());
        assert!(parse("box", json!({ "size": 256 })).is_err());
        assert!(parse("pixelate", json!({ "pixelSize": 1 })).is_err());
        assert!(parse("pixelate", json!({ "pixelSize": 2 })).is_ok());
        assert!(parse("noise", json!({ "noise": 0, "color": true })).is_err());
        assert!(parse("noise", json!({ "noise": 255, "color": true })).is_ok());
        assert!(parse("bitcrush", json!({ "bits": 8 })).is_err());
        assert!(parse("bitcrush", json!({ "bits": 1 })).is_ok());
    }

    #[test]
    fn test_gaussian_accepts_any_size() {
        assert_eq!(
            parse("gaussian", json!({ "size": 4 })).unwrap(),
            Filter::Gaussian { size: 4 }
        );
    }

    #[test]
    fn test_sobel_direction() {
        assert_eq!(
            parse("sobel", json!({ "direction": "y" })).unwrap(),
            Filter::Sobel {
                direction: SobelDirection::Y
            }
        );
        let error = parse("sobel", json!({ "direction": "z" })).unwrap_err();
        assert!(matches!(error, FilterError::MalformedParams { .. }));
    }

    #[test]
    fn test_missing_params_are_malformed() {
        let error = parse("gamma", json!({})).unwrap_err();
        assert!(matches!(error, FilterError::MalformedParams { .. }));
        assert_eq!(error.filter(), "gamma");
        assert!(parse("invert", Value::Null).is_ok());
    }

    #[test]
    fn test_custom_kernel_shape() {
        let ok = parse(
            "kernel",
            json!({ "size": 1, "numerator": 1, "denumerator": 2, "kernel": [[4]] }),
        )
        .unwrap();
        assert_eq!(ok.kernel().unwrap().multiplier, 0.5);

        let error = parse(
            "kernel",
            json!({ "size": 3, "numerator": 1, "denumerator": 1, "matrix": [[1, 2, 3], [4, 5]] }),
        )
        .unwrap_err();
        assert!(matches!(error, FilterError::Shape { size: 3, .. }));
    }

    #[test]
    fn test_custom_kernel_rejects_zero_denumerator() {
        let error = parse(
            "kernel",
            json!({ "size": 1, "numerator": 1, "denumerator": 0, "matrix": [[1]] }),
        )
        .unwrap_err();
        assert!(matches!(
            error,
            FilterError::ParamOutOfRange { param: "denumerator", .. }
        ));
    }

    #[test]
    fn test_kernel_only_for_convolutions() {
        assert!(Filter::Invert.kernel().is_none());
        assert!(Filter::Laplace.kernel().is_some());
        assert_eq!(Filter::Box { size: 5 }.kernel().unwrap().size, 5);
    }

    #[test]
    fn test_params_reparse_to_same_filter() {
        let filter = parse("noise", json!({ "noise": 12, "color": true })).unwrap();
        assert_eq!(Filter::from_params("noise", &filter.params()).unwrap(), filter);
    }
}
