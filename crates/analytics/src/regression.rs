//! Weighted-correlation and OLS analysis of prediction datasets.
//!
//! Two independent readings of the same dataset: a Pearson correlation of an
//! allocation-weighted synthetic predictor against the label, and an
//! unweighted least-squares fit with intercept over all feature columns.

use crate::prediction::PredictionDataset;
use basket_core::{Error, Result, Universe};
use ndarray::{concatenate, s, Array1, Array2, Axis};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Fitted analysis of one dataset.
#[derive(Debug, Clone)]
pub struct RegressionReport {
    /// Rows with a complete feature vector.
    pub observations: usize,
    /// Predictor weights, parallel to the dataset's feature tickers.
    pub weights: Vec<f64>,
    /// Pearson correlation of the weighted predictor against the label;
    /// `None` when either side has zero variance.
    pub correlation: Option<f64>,
    /// OLS intercept.
    pub intercept: f64,
    /// OLS coefficients as (ticker, value).
    pub coefficients: Vec<(String, f64)>,
    /// Coefficient of determination of the OLS fit.
    pub r_squared: f64,
}

impl RegressionReport {
    /// Human-readable summary block.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Observations: {}\n", self.observations));
        match self.correlation {
            Some(c) => out.push_str(&format!("Weighted predictor correlation: {c:.6}\n")),
            None => out.push_str("Weighted predictor correlation: n/a (zero variance)\n"),
        }
        out.push_str(&format!("OLS intercept: {:.6}\n", self.intercept));
        out.push_str("OLS coefficients:\n");
        for (ticker, coefficient) in &self.coefficients {
            out.push_str(&format!("  {ticker:<8} {coefficient:>12.6}\n"));
        }
        out.push_str(&format!("R-squared: {:.6}\n", self.r_squared));
        out
    }
}

/// Runs correlation and regression over a prediction dataset.
pub struct RegressionAnalyzer<'a> {
    universe: &'a Universe,
}

impl<'a> RegressionAnalyzer<'a> {
    pub fn new(universe: &'a Universe) -> Self {
        Self { universe }
    }

    /// Analyze a dataset.
    ///
    /// Rows with any missing feature cell are dropped first; fewer than two
    /// complete rows is `EmptyDataset`. Predictor weights come from the
    /// universe allocation fractions, default to 0.0 for tickers without an
    /// allocation (the references) and can be overridden per ticker.
    pub fn analyze(
        &self,
        dataset: &PredictionDataset,
        overrides: &BTreeMap<String, f64>,
    ) -> Result<RegressionReport> {
        let complete: Vec<(Vec<f64>, f64)> = dataset
            .rows
            .iter()
            .filter_map(|row| {
                let features: Option<Vec<f64>> = row.features.iter().copied().collect();
                features.map(|f| (f, row.label))
            })
            .collect();
        if complete.len() < 2 {
            return Err(Error::empty_dataset(format!(
                "{} complete rows for {}, need at least 2",
                complete.len(),
                dataset.date
            )));
        }

        let allocations = self.universe.weights();
        let weights: Vec<f64> = dataset
            .feature_tickers
            .iter()
            .map(|ticker| {
                overrides
                    .get(ticker)
                    .copied()
                    .or_else(|| allocations.get(ticker).copied())
                    .unwrap_or(0.0)
            })
            .collect();

        let labels: Vec<f64> = complete.iter().map(|(_, label)| *label).collect();
        let predictor: Vec<f64> = complete
            .iter()
            .map(|(features, _)| features.iter().zip(&weights).map(|(x, w)| x * w).sum())
            .collect();
        let correlation = pearson(&predictor, &labels);

        let (intercept, coefficients, r_squared) = fit_ols(&complete, &labels)?;

        Ok(RegressionReport {
            observations: complete.len(),
            weights,
            correlation,
            intercept,
            coefficients: dataset
                .feature_tickers
                .iter()
                .cloned()
                .zip(coefficients)
                .collect(),
            r_squared,
        })
    }
}

/// Pearson correlation; `None` for degenerate input.
fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mean_x = x.iter().copied().mean();
    let mean_y = y.iter().copied().mean();
    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(covariance / (var_x.sqrt() * var_y.sqrt()))
}

/// Least squares with intercept via the normal equations.
fn fit_ols(rows: &[(Vec<f64>, f64)], labels: &[f64]) -> Result<(f64, Vec<f64>, f64)> {
    let n = rows.len();
    let k = rows[0].0.len();
    let mut x = Array2::<f64>::zeros((n, k));
    for (i, (features, _)) in rows.iter().enumerate() {
        for (j, &value) in features.iter().enumerate() {
            x[[i, j]] = value;
        }
    }
    let y = Array1::from_vec(labels.to_vec());

    let ones = Array2::<f64>::ones((n, 1));
    let design = concatenate(Axis(1), &[ones.view(), x.view()])
        .map_err(|e| Error::empty_dataset(format!("assemble design matrix: {e}")))?;

    let xt = design.t();
    let xtx = xt.dot(&design);
    let xty = xt.dot(&y);
    let beta = cholesky_solve(&xtx, &xty)?;

    let predictions = design.dot(&beta);
    let y_mean = labels.iter().copied().mean();
    let ss_tot: f64 = labels.iter().map(|&v| (v - y_mean).powi(2)).sum();
    let ss_res: f64 = y
        .iter()
        .zip(predictions.iter())
        .map(|(&yi, &pi)| (yi - pi).powi(2))
        .sum();
    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    };

    Ok((beta[0], beta.slice(s![1..]).to_vec(), r_squared))
}

/// Solve A x = b for symmetric positive definite A by Cholesky
/// decomposition, with a tiny ridge term for numerical stability.
fn cholesky_solve(xtx: &Array2<f64>, xty: &Array1<f64>) -> Result<Array1<f64>> {
    let n = xtx.nrows();
    let mut a = xtx.clone();
    for i in 0..n {
        a[[i, i]] += 1e-10;
    }

    // A = L * L^T
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return Err(Error::empty_dataset("singular design matrix"));
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * z[j];
        }
        z[i] = (xty[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T x = z
    let mut beta = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * beta[j];
        }
        beta[i] = (z[i] - sum) / l[[i, i]];
    }
    Ok(beta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::DatasetRow;
    use basket_core::universe::UniverseEntry;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()
    }

    fn universe() -> Universe {
        Universe::from_entries(vec![UniverseEntry {
            ticker: "AAPL".to_string(),
            index_member: true,
            allocation_pct: 8.0,
        }])
    }

    fn dataset(tickers: &[&str], rows: Vec<DatasetRow>) -> PredictionDataset {
        PredictionDataset {
            feature_tickers: tickers.iter().map(|s| s.to_string()).collect(),
            reference_ticker: "QQQ".to_string(),
            date: day(),
            rows,
        }
    }

    fn row(minute: u32, features: Vec<Option<f64>>, label: f64) -> DatasetRow {
        DatasetRow {
            minute_index: minute,
            features,
            label,
        }
    }

    #[test]
    fn test_ols_recovers_line() {
        // label = 2 + 3 * feature
        let rows = (1..=5)
            .map(|i| {
                let x = i as f64;
                row(i, vec![Some(x)], 2.0 + 3.0 * x)
            })
            .collect();
        let universe = universe();
        let analyzer = RegressionAnalyzer::new(&universe);

        let report = analyzer
            .analyze(&dataset(&["AAPL"], rows), &BTreeMap::new())
            .unwrap();

        assert_eq!(report.observations, 5);
        assert!((report.intercept - 2.0).abs() < 1e-6);
        assert!((report.coefficients[0].1 - 3.0).abs() < 1e-6);
        assert_eq!(report.coefficients[0].0, "AAPL");
        assert!(report.r_squared > 0.999);
        // A positively-weighted predictor of a perfect line correlates fully
        assert!((report.correlation.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_relationship_correlation() {
        let rows = (1..=4)
            .map(|i| {
                let x = i as f64;
                row(i, vec![Some(x)], -x)
            })
            .collect();
        let universe = universe();
        let analyzer = RegressionAnalyzer::new(&universe);

        let report = analyzer
            .analyze(&dataset(&["AAPL"], rows), &BTreeMap::new())
            .unwrap();

        assert!((report.correlation.unwrap() - (-1.0)).abs() < 1e-9);
        assert!((report.coefficients[0].1 - (-1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_incomplete_rows_dropped() {
        let rows = vec![
            row(1, vec![Some(1.0)], 5.0),
            row(2, vec![None], 8.0),
            row(3, vec![Some(3.0)], 11.0),
        ];
        let universe = universe();
        let analyzer = RegressionAnalyzer::new(&universe);

        let report = analyzer
            .analyze(&dataset(&["AAPL"], rows), &BTreeMap::new())
            .unwrap();
        assert_eq!(report.observations, 2);
    }

    #[test]
    fn test_too_few_complete_rows() {
        let rows = vec![row(1, vec![Some(1.0)], 5.0), row(2, vec![None], 8.0)];
        let universe = universe();
        let analyzer = RegressionAnalyzer::new(&universe);

        assert!(matches!(
            analyzer.analyze(&dataset(&["AAPL"], rows), &BTreeMap::new()),
            Err(Error::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_weights_default_and_override() {
        let rows = vec![
            row(1, vec![Some(1.0), Some(2.0)], 1.0),
            row(2, vec![Some(2.0), Some(1.0)], 2.0),
        ];
        let universe = universe();
        let analyzer = RegressionAnalyzer::new(&universe);

        // AAPL carries its allocation fraction, QQQ has none
        let report = analyzer
            .analyze(&dataset(&["AAPL", "QQQ"], rows.clone()), &BTreeMap::new())
            .unwrap();
        assert!((report.weights[0] - 0.08).abs() < 1e-10);
        assert_eq!(report.weights[1], 0.0);

        let mut overrides = BTreeMap::new();
        overrides.insert("QQQ".to_string(), 0.5);
        let report = analyzer
            .analyze(&dataset(&["AAPL", "QQQ"], rows), &overrides)
            .unwrap();
        assert!((report.weights[1] - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_weighted_predictor_follows_allocations() {
        // Predictor rows: 0.6*1.0 + 0.4*(-0.5) = 0.4 and 0.6*(-1.0) + 0.4*2.0
        // = 0.2. Labels 4.0 and 2.0 rank the same way, so the correlation is
        // +1; equal weights would rank them oppositely and flip the sign.
        let rows = vec![
            row(1, vec![Some(1.0), Some(-0.5)], 4.0),
            row(2, vec![Some(-1.0), Some(2.0)], 2.0),
        ];
        let universe = Universe::from_entries(vec![
            UniverseEntry {
                ticker: "AAPL".to_string(),
                index_member: true,
                allocation_pct: 60.0,
            },
            UniverseEntry {
                ticker: "MSFT".to_string(),
                index_member: true,
                allocation_pct: 40.0,
            },
        ]);
        let analyzer = RegressionAnalyzer::new(&universe);

        let report = analyzer
            .analyze(&dataset(&["AAPL", "MSFT"], rows), &BTreeMap::new())
            .unwrap();

        assert!((report.weights[0] - 0.6).abs() < 1e-10);
        assert!((report.weights[1] - 0.4).abs() < 1e-10);
        assert!((report.correlation.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_predictor_has_no_correlation() {
        let rows = vec![
            row(1, vec![Some(1.0)], 1.0),
            row(2, vec![Some(2.0)], 2.0),
            row(3, vec![Some(3.0)], 1.5),
        ];
        let universe = universe();
        let analyzer = RegressionAnalyzer::new(&universe);

        let mut overrides = BTreeMap::new();
        overrides.insert("AAPL".to_string(), 0.0);
        let report = analyzer
            .analyze(&dataset(&["AAPL"], rows), &overrides)
            .unwrap();

        assert!(report.correlation.is_none());
        // The OLS fit is independent of the predictor weights
        assert!(report.r_squared.is_finite());
    }

    #[test]
    fn test_summary_renders() {
        let rows = vec![row(1, vec![Some(1.0)], 5.0), row(2, vec![Some(2.0)], 8.0)];
        let universe = universe();
        let analyzer = RegressionAnalyzer::new(&universe);

        let report = analyzer
            .analyze(&dataset(&["AAPL"], rows), &BTreeMap::new())
            .unwrap();
        let summary = report.summary();

        assert!(summary.contains("Observations: 2"));
        assert!(summary.contains("AAPL"));
        assert!(summary.contains("R-squared"));
    }
}
