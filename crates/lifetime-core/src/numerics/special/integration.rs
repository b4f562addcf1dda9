use tracing::trace;

/// 21-point Kronrod abscissae on `[-1, 1]`, positive half, descending; the last is the centre.
const KRONROD_NODES: [f64; 11] = [
    0.995_657_163_025_808_080_735_527_280_689_003,
    0.973_906_528_517_171_720_077_964_012_084_452,
    0.930_157_491_355_708_226_001_207_180_059_508,
    0.865_063_366_688_984_510_732_096_688_423_493,
    0.780_817_726_586_416_897_063_717_578_345_042,
    0.679_409_568_299_024_406_234_327_365_114_874,
    0.562_757_134_668_604_683_339_000_099_272_694,
    0.433_395_394_129_247_190_799_265_943_165_784,
    0.294_392_862_701_460_198_131_126_603_103_866,
    0.148_874_338_981_631_210_884_826_001_129_720,
    0.0,
];

const KRONROD_WEIGHTS: [f64; 11] = [
    0.011_694_638_867_371_874_278_064_396_062_192,
    0.032_558_162_307_964_727_478_818_972_459_390,
    0.054_755_896_574_351_996_031_381_300_244_580,
    0.075_039_674_810_919_952_767_043_140_916_190,
    0.093_125_454_583_697_605_535_065_465_083_366,
    0.109_387_158_802_297_641_899_210_590_325_805,
    0.123_491_976_262_065_851_077_208_980_876_181,
    0.134_709_217_311_473_325_928_054_001_771_707,
    0.142_775_938_577_060_080_797_094_273_138_717,
    0.147_739_104_901_338_491_374_841_515_972_068,
    0.149_445_554_002_916_905_664_936_468_389_821,
];

/// 10-point Gauss weights for the odd-indexed Kronrod nodes.
const GAUSS_WEIGHTS: [f64; 5] = [
    0.066_671_344_308_688_137_593_568_809_893_332,
    0.149_451_349_150_580_593_145_776_339_657_697,
    0.219_086_362_515_982_043_995_534_934_228_163,
    0.269_266_719_309_996_355_091_226_921_569_469,
    0.295_524_224_714_752_870_173_892_994_651_338,
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemiInfiniteQuadrature {
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub max_subdivisions: usize,
}

impl SemiInfiniteQuadrature {
    pub fn new(abs_tol: f64, rel_tol: f64, max_subdivisions: usize) -> Self {
        Self {
            abs_tol,
            rel_tol,
            max_subdivisions,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadratureEstimate {
    pub value: f64,
    pub abs_error: f64,
    pub subdivisions: usize,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QuadratureError {
    #[error("quadrature lower bound must be finite, got {value}")]
    NonFiniteLowerBound { value: f64 },
    #[error(
        "quadrature tolerances must be finite, non-negative and not both zero: abs_tol={abs_tol}, rel_tol={rel_tol}"
    )]
    InvalidTolerance { abs_tol: f64, rel_tol: f64 },
    #[error("quadrature subdivision limit must be at least 1")]
    ZeroSubdivisionLimit,
    #[error("integrand is not finite at x={x}: {value}")]
    NonFiniteIntegrand { x: f64, value: f64 },
    #[error(
        "quadrature did not converge within {limit} subdivisions: value={value:e}, estimated error={abs_error:e}"
    )]
    SubdivisionLimit {
        limit: usize,
        value: f64,
        abs_error: f64,
    },
}

#[derive(Debug, Clone, Copy)]
struct Interval {
    lower: f64,
    upper: f64,
    value: f64,
    abs_error: f64,
}

/// Adaptive Gauss–Kronrod integration of `integrand` over `[lower, +inf)`.
///
/// The half-line is mapped onto `(0, 1]` with `x = lower + (1 - t)/t` and the
/// interval with the largest error estimate is bisected until the summed error
/// drops below `max(abs_tol, rel_tol * |value|)`.
pub fn integrate_semi_infinite(
    integrand: impl Fn(f64) -> f64,
    lower: f64,
    settings: &SemiInfiniteQuadrature,
) -> Result<QuadratureEstimate, QuadratureError> {
    validate_settings(lower, settings)?;

    let mapped = |t: f64| {
        let x = lower + (1.0 - t) / t;
        (x, integrand(x) / (t * t))
    };

    let mut intervals = vec![kronrod_interval(&mapped, 0.0, 1.0)?];

    loop {
        let value: f64 = intervals.iter().map(|interval| interval.value).sum();
        let abs_error: f64 = intervals.iter().map(|interval| interval.abs_error).sum();
        let tolerance = settings.abs_tol.max(settings.rel_tol * value.abs());

        if abs_error <= tolerance {
            trace!(
                lower,
                value,
                abs_error,
                subdivisions = intervals.len(),
                "semi-infinite quadrature converged"
            );
            return Ok(QuadratureEstimate {
                value,
                abs_error,
                subdivisions: intervals.len(),
            });
        }

        if intervals.len() >= settings.max_subdivisions {
            return Err(QuadratureError::SubdivisionLimit {
                limit: settings.max_subdivisions,
                value,
                abs_error,
            });
        }

        let worst = intervals
            .iter()
            .enumerate()
            .max_by(|(_, lhs), (_, rhs)| lhs.abs_error.total_cmp(&rhs.abs_error))
            .map(|(index, _)| index)
            .unwrap_or(0);
        let split = intervals.swap_remove(worst);
        let midpoint = 0.5 * (split.lower + split.upper);
        intervals.push(kronrod_interval(&mapped, split.lower, midpoint)?);
        intervals.push(kronrod_interval(&mapped, midpoint, split.upper)?);
    }
}

fn validate_settings(lower: f64, settings: &SemiInfiniteQuadrature) -> Result<(), QuadratureError> {
    if !lower.is_finite() {
        return Err(QuadratureError::NonFiniteLowerBound { value: lower });
    }

    let SemiInfiniteQuadrature {
        abs_tol, rel_tol, ..
    } = *settings;
    let valid = abs_tol.is_finite()
        && rel_tol.is_finite()
        && abs_tol >= 0.0
        && rel_tol >= 0.0
        && (abs_tol > 0.0 || rel_tol > 0.0);
    if !valid {
        return Err(QuadratureError::InvalidTolerance { abs_tol, rel_tol });
    }

    if settings.max_subdivisions == 0 {
        return Err(QuadratureError::ZeroSubdivisionLimit);
    }

    Ok(())
}

fn kronrod_interval(
    mapped: &impl Fn(f64) -> (f64, f64),
    lower: f64,
    upper: f64,
) -> Result<Interval, QuadratureError> {
    let centre = 0.5 * (lower + upper);
    let half_width = 0.5 * (upper - lower);

    let evaluate = |t: f64| -> Result<f64, QuadratureError> {
        let (x, value) = mapped(t);
        if value.is_finite() {
            Ok(value)
        } else {
            Err(QuadratureError::NonFiniteIntegrand { x, value })
        }
    };

    let mut kronrod = KRONROD_WEIGHTS[10] * evaluate(centre)?;
    let mut gauss = 0.0;
    for node in 0..10 {
        let offset = half_width * KRONROD_NODES[node];
        let pair = evaluate(centre - offset)? + evaluate(centre + offset)?;
        kronrod += KRONROD_WEIGHTS[node] * pair;
        if node % 2 == 1 {
            gauss += GAUSS_WEIGHTS[node / 2] * pair;
        }
    }

    Ok(Interval {
        lower,
        upper,
        value: kronrod * half_width,
        abs_error: ((kronrod - gauss) * half_width).abs(),
    })
}
