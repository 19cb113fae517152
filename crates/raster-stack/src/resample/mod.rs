//! Resampling kernels and method dispatch.

pub mod kernels;

pub use kernels::SourceBand;

use crate::types::ResamplingMethod;

/// Sample `band` at index-space position `(x, y)`.
///
/// `scale` is the destination pixel size measured in source pixels along
/// each axis; values below 1 (upsampling) behave like 1.
pub fn sample(
    method: ResamplingMethod,
    band: &SourceBand,
    x: f64,
    y: f64,
    scale: (f64, f64),
) -> Option<f32> {
    match method {
        ResamplingMethod::Nearest => kernels::nearest(band, x, y),
        ResamplingMethod::Bilinear => kernels::bilinear(band, x, y, scale),
        ResamplingMethod::Cubic => kernels::cubic(band, x, y, scale),
        ResamplingMethod::CubicSpline => kernels::cubic_spline(band, x, y, scale),
        ResamplingMethod::Lanczos => kernels::lanczos(band, x, y, scale),
        ResamplingMethod::Average => kernels::average(band, x, y, scale),
        ResamplingMethod::Mode => kernels::mode(band, x, y, scale),
        ResamplingMethod::Gauss => kernels::gauss(band, x, y, scale),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_method_reproduces_constant() {
        let data = vec![4.0_f32; 25];
        let band = SourceBand::new(&data, 5, 5, f32::MIN);
        for method in ResamplingMethod::ALL {
            let v = sample(method, &band, 2.3, 1.7, (1.0, 1.0)).unwrap();
            assert!((v - 4.0).abs() < 1e-5, "{method}: {v}");
        }
    }

    #[test]
    fn test_average_over_downsample_window() {
        #[rustfmt::skip]
        let data: Vec<f32> = vec![
            1.0, 3.0, 10.0, 10.0,
            1.0, 3.0, 10.0, 10.0,
        ];
        let band = SourceBand::new(&data, 4, 2, f32::MIN);
        let v = sample(ResamplingMethod::Average, &band, 0.5, 0.5, (2.0, 2.0)).unwrap();
        assert_eq!(v, 2.0);
    }

    #[test]
    fn test_all_nodata_neighbourhood() {
        let data = vec![f32::MIN; 4];
        let band = SourceBand::new(&data, 2, 2, f32::MIN);
        for method in ResamplingMethod::ALL {
            assert_eq!(sample(method, &band, 0.5, 0.5, (1.0, 1.0)), None, "{method}");
        }
    }
}
