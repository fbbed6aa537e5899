//! Holt-Winters triple exponential smoothing for the monthly sales series.
//!
//! ```text
//! Level:    L_t = α (x_t - S_{t-m}) + (1 - α)(L_{t-1} + T_{t-1})
//! Trend:    T_t = β (L_t - L_{t-1}) + (1 - β) T_{t-1}
//! Season:   S_t = γ (x_t - L_t) + (1 - γ) S_{t-m}
//! Forecast: F_{t+h} = L_t + h T_t + S_{t-m+h_m}
//! ```
//!
//! The multiplicative variant divides by the seasonal factor instead of
//! subtracting it, and multiplies the forecast by it. Smoothing constants
//! left unset in [`ForecastSettings`] are chosen by a grid search that
//! minimises the in-sample one-step squared error.

use crate::domain::model::{Forecast, ForecastPoint, MonthlyAggregate, Seasonality, SmoothingParams};
use crate::utils::error::{EtlError, Result};
use serde::{Deserialize, Serialize};

const GRID_STEPS: usize = 19;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    pub steps: usize,
    pub period: usize,
    pub seasonality: Seasonality,
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
    /// Fail the run instead of skipping the forecast when history is short.
    pub required: bool,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            steps: 12,
            period: 12,
            seasonality: Seasonality::Additive,
            alpha: None,
            beta: None,
            gamma: None,
            required: false,
        }
    }
}

impl ForecastSettings {
    pub fn min_history(&self) -> usize {
        2 * self.period
    }
}

#[derive(Debug, Clone)]
pub struct HoltWintersFit {
    pub level: Vec<f64>,
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    /// One-step-ahead in-sample forecasts.
    pub fitted: Vec<f64>,
    pub sse: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct HoltWinters {
    params: SmoothingParams,
}

impl HoltWinters {
    pub fn new(
        alpha: f64,
        beta: f64,
        gamma: f64,
        period: usize,
        seasonality: Seasonality,
    ) -> Result<Self> {
        for (name, value) in [("alpha", alpha), ("beta", beta), ("gamma", gamma)] {
            if !value.is_finite() || value <= 0.0 || value >= 1.0 {
                return Err(EtlError::InvalidConfigValueError {
                    field: format!("forecast.{}", name),
                    value: value.to_string(),
                    reason: "Smoothing constant must be strictly between 0 and 1".to_string(),
                });
            }
        }
        if period < 2 {
            return Err(EtlError::InvalidConfigValueError {
                field: "forecast.period".to_string(),
                value: period.to_string(),
                reason: "Seasonal period must be at least 2".to_string(),
            });
        }

        Ok(Self {
            params: SmoothingParams {
                alpha,
                beta,
                gamma,
                period,
                seasonality,
            },
        })
    }

    pub fn params(&self) -> SmoothingParams {
        self.params
    }

    /// Requires at least two full seasons. Multiplicative seasonality
    /// additionally requires strictly positive data.
    pub fn smooth(&self, data: &[f64]) -> Result<HoltWintersFit> {
        let SmoothingParams {
            alpha,
            beta,
            gamma,
            period: m,
            seasonality,
        } = self.params;
        let n = data.len();

        if n < 2 * m {
            return Err(EtlError::InsufficientDataError {
                required: 2 * m,
                actual: n,
            });
        }
        if seasonality == Seasonality::Multiplicative && data.iter().any(|&x| x <= 0.0) {
            return Err(EtlError::ProcessingError {
                message: "Multiplicative seasonality requires every month to have positive sales"
                    .to_string(),
            });
        }

        // 初始值：第一季平均為水準，前兩季差異為趨勢
        let l0 = data[..m].iter().sum::<f64>() / m as f64;
        let t0 = (0..m).map(|i| (data[m + i] - data[i]) / m as f64).sum::<f64>() / m as f64;

        let mut level = vec![l0; n];
        let mut trend = vec![t0; n];
        let mut seasonal = vec![0.0; n];
        let mut fitted = vec![0.0; n];

        for i in 0..m {
            seasonal[i] = match seasonality {
                Seasonality::Additive => data[i] - l0,
                Seasonality::Multiplicative => data[i] / l0,
            };
            fitted[i] = combine(seasonality, l0, seasonal[i]);
        }

        let mut sse = 0.0;
        for t in m..n {
            let s_prev = seasonal[t - m];
            let base = level[t - 1] + trend[t - 1];

            let deseasonalized = match seasonality {
                Seasonality::Additive => data[t] - s_prev,
                Seasonality::Multiplicative => data[t] / s_prev,
            };
            let l = alpha * deseasonalized + (1.0 - alpha) * base;
            let b = beta * (l - level[t - 1]) + (1.0 - beta) * trend[t - 1];
            let s = match seasonality {
                Seasonality::Additive => gamma * (data[t] - l) + (1.0 - gamma) * s_prev,
                Seasonality::Multiplicative => gamma * (data[t] / l) + (1.0 - gamma) * s_prev,
            };

            fitted[t] = combine(seasonality, base, s_prev);
            sse += (data[t] - fitted[t]).powi(2);

            level[t] = l;
            trend[t] = b;
            seasonal[t] = s;
        }

        Ok(HoltWintersFit {
            level,
            trend,
            seasonal,
            fitted,
            sse,
        })
    }

    /// Projects `steps` values past the end of the fitted data.
    pub fn forecast(&self, fit: &HoltWintersFit, steps: usize) -> Vec<f64> {
        let m = self.params.period;
        let (Some(&last_level), Some(&last_trend)) = (fit.level.last(), fit.trend.last()) else {
            return Vec::new();
        };
        let s_len = fit.seasonal.len();

        (1..=steps)
            .map(|h| {
                let s = fit.seasonal[s_len - m + ((h - 1) % m)];
                combine(self.params.seasonality, last_level + h as f64 * last_trend, s)
            })
            .collect()
    }
}

fn combine(seasonality: Seasonality, base: f64, seasonal: f64) -> f64 {
    match seasonality {
        Seasonality::Additive => base + seasonal,
        Seasonality::Multiplicative => base * seasonal,
    }
}

fn candidates(fixed: Option<f64>) -> Vec<f64> {
    match fixed {
        Some(value) => vec![value],
        None => (1..=GRID_STEPS).map(|i| i as f64 * 0.05).collect(),
    }
}

/// Chooses smoothing constants for `data`. Fixed constants in `settings`
/// are kept; the rest are searched on a 0.05 grid.
pub fn fit_model(data: &[f64], settings: &ForecastSettings) -> Result<(HoltWinters, HoltWintersFit)> {
    let mut best: Option<(HoltWinters, HoltWintersFit)> = None;

    for alpha in candidates(settings.alpha) {
        for beta in candidates(settings.beta) {
            for gamma in candidates(settings.gamma) {
                let model =
                    HoltWinters::new(alpha, beta, gamma, settings.period, settings.seasonality)?;
                let fit = model.smooth(data)?;
                if !fit.sse.is_finite() {
                    continue;
                }
                if best.as_ref().map_or(true, |(_, b)| fit.sse < b.sse) {
                    best = Some((model, fit));
                }
            }
        }
    }

    best.ok_or_else(|| EtlError::ProcessingError {
        message: "Holt-Winters fit diverged for every parameter combination".to_string(),
    })
}

/// Fits the monthly series and forecasts `settings.steps` months after
/// the last observed month.
pub fn forecast_monthly(
    monthly: &[MonthlyAggregate],
    settings: &ForecastSettings,
) -> Result<Forecast> {
    let data: Vec<f64> = monthly.iter().map(|m| m.amount).collect();
    let last_period = match monthly.last() {
        Some(last) if data.len() >= settings.min_history() => last.period,
        _ => {
            return Err(EtlError::InsufficientDataError {
                required: settings.min_history(),
                actual: data.len(),
            })
        }
    };

    let (model, fit) = fit_model(&data, settings)?;
    let params = model.params();
    tracing::debug!(
        "Holt-Winters fit: alpha={:.2}, beta={:.2}, gamma={:.2}, sse={:.2}",
        params.alpha,
        params.beta,
        params.gamma,
        fit.sse
    );

    let mut period = last_period;
    let points = model
        .forecast(&fit, settings.steps)
        .into_iter()
        .map(|value| {
            period = period.succ();
            ForecastPoint { period, value }
        })
        .collect();

    Ok(Forecast {
        params,
        sse: fit.sse,
        points,
    })
}
