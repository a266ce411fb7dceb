//! # Return Datasets
//!
//! $$
//! r_{t,j} = \frac{\text{pct}_{t,j}}{100}
//! $$
//!
//! Month-indexed return tables and loaders for the bundled CSV datasets.

use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use anyhow::ensure;
use chrono::Datelike;
use chrono::NaiveDate;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::Axis;
use tracing::debug;

/// Strings treated as missing values besides a dataset's own sentinel.
const MISSING_MARKERS: [&str; 6] = ["", "NA", "N/A", "NaN", "nan", "NULL"];

/// Month-indexed table of decimal returns, one column per asset.
///
/// Index entries are always the first day of their month. Missing
/// observations are stored as `NaN`.
#[derive(Clone, Debug)]
pub struct ReturnTable {
  index: Vec<NaiveDate>,
  columns: Vec<String>,
  values: Array2<f64>,
}

impl ReturnTable {
  /// Build a table, checking that `values` is `index.len() x columns.len()`.
  pub fn new(index: Vec<NaiveDate>, columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
    ensure!(
      values.nrows() == index.len(),
      "return table has {} rows but {} index entries",
      values.nrows(),
      index.len()
    );
    ensure!(
      values.ncols() == columns.len(),
      "return table has {} columns but {} labels",
      values.ncols(),
      columns.len()
    );

    Ok(Self {
      index,
      columns,
      values,
    })
  }

  pub fn index(&self) -> &[NaiveDate] {
    &self.index
  }

  pub fn columns(&self) -> &[String] {
    &self.columns
  }

  pub fn values(&self) -> &Array2<f64> {
    &self.values
  }

  pub fn nrows(&self) -> usize {
    self.values.nrows()
  }

  pub fn ncols(&self) -> usize {
    self.values.ncols()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  /// Borrow a column by label.
  pub fn column(&self, label: &str) -> Option<ArrayView1<'_, f64>> {
    let j = self.columns.iter().position(|c| c == label)?;
    Some(self.values.column(j))
  }

  /// Keep only the given columns, in the given order.
  pub fn select(&self, labels: &[&str]) -> Result<Self> {
    let mut positions = Vec::with_capacity(labels.len());
    for label in labels {
      match self.columns.iter().position(|c| c == label) {
        Some(j) => positions.push(j),
        None => bail!("unknown column '{label}'"),
      }
    }

    Ok(Self {
      index: self.index.clone(),
      columns: positions.iter().map(|&j| self.columns[j].clone()).collect(),
      values: self.values.select(Axis(1), &positions),
    })
  }

  /// Keep the rows whose year lies in `from..=to`.
  pub fn slice_years(&self, from: i32, to: i32) -> Self {
    let rows: Vec<usize> = self
      .index
      .iter()
      .enumerate()
      .filter(|(_, d)| (from..=to).contains(&d.year()))
      .map(|(i, _)| i)
      .collect();

    Self {
      index: rows.iter().map(|&i| self.index[i]).collect(),
      columns: self.columns.clone(),
      values: self.values.select(Axis(0), &rows),
    }
  }

  /// Apply a series statistic to every column.
  pub fn aggregate<T, F>(&self, f: F) -> ColumnSummary<T>
  where
    F: Fn(&[f64]) -> T,
  {
    let values = self
      .values
      .columns()
      .into_iter()
      .map(|col| f(&col.to_vec()))
      .collect();

    ColumnSummary {
      labels: self.columns.clone(),
      values,
    }
  }

  /// Fallible variant of [`ReturnTable::aggregate`]; errors name the column.
  pub fn try_aggregate<T, F>(&self, f: F) -> Result<ColumnSummary<T>>
  where
    F: Fn(&[f64]) -> Result<T>,
  {
    let mut values = Vec::with_capacity(self.ncols());
    for (label, col) in self.columns.iter().zip(self.values.columns()) {
      values.push(f(&col.to_vec()).with_context(|| format!("column '{label}'"))?);
    }

    Ok(ColumnSummary {
      labels: self.columns.clone(),
      values,
    })
  }
}

/// One value per table column, keyed by column label.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnSummary<T> {
  labels: Vec<String>,
  values: Vec<T>,
}

impl<T> ColumnSummary<T> {
  pub fn get(&self, label: &str) -> Option<&T> {
    let j = self.labels.iter().position(|c| c == label)?;
    self.values.get(j)
  }

  pub fn labels(&self) -> &[String] {
    &self.labels
  }

  pub fn values(&self) -> &[T] {
    &self.values
  }

  pub fn len(&self) -> usize {
    self.values.len()
  }

  pub fn is_empty(&self) -> bool {
    self.values.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
    self.labels.iter().map(String::as_str).zip(self.values.iter())
  }
}

/// Supported monthly return datasets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dataset {
  /// Fama-French portfolios formed on market equity, equally weighted.
  MarketEquity,
  /// EDHEC hedge fund indices.
  HedgeFundIndices,
  /// Ken French 30 industry portfolios, value weighted.
  Industry30,
}

#[derive(Clone, Copy, Debug)]
enum DateLayout {
  /// `YYYYMM`
  YearMonth,
  /// `DD/MM/YYYY`
  DayMonthYear,
}

impl Dataset {
  pub fn file_name(&self) -> &'static str {
    match self {
      Dataset::MarketEquity => "Portfolios_Formed_on_ME_monthly_EW.csv",
      Dataset::HedgeFundIndices => "edhec-hedgefundindices.csv",
      Dataset::Industry30 => "ind30_m_vw_rets.csv",
    }
  }

  fn date_layout(&self) -> DateLayout {
    match self {
      Dataset::HedgeFundIndices => DateLayout::DayMonthYear,
      Dataset::MarketEquity | Dataset::Industry30 => DateLayout::YearMonth,
    }
  }

  /// Percent value the provider uses for a missing observation.
  fn missing_sentinel(&self) -> Option<f64> {
    match self {
      Dataset::MarketEquity => Some(-99.99),
      Dataset::HedgeFundIndices | Dataset::Industry30 => None,
    }
  }
}

/// Where dataset files are looked up.
#[derive(Clone, Debug)]
pub struct DataConfig {
  pub data_dir: PathBuf,
}

impl Default for DataConfig {
  fn default() -> Self {
    Self {
      data_dir: PathBuf::from("data"),
    }
  }
}

impl DataConfig {
  pub fn new(data_dir: impl Into<PathBuf>) -> Self {
    Self {
      data_dir: data_dir.into(),
    }
  }

  pub fn path(&self, dataset: Dataset) -> PathBuf {
    self.data_dir.join(dataset.file_name())
  }
}

fn parse_period(raw: &str, layout: DateLayout) -> Result<NaiveDate> {
  let date = match layout {
    DateLayout::YearMonth => NaiveDate::parse_from_str(&format!("{raw}01"), "%Y%m%d"),
    DateLayout::DayMonthYear => NaiveDate::parse_from_str(raw, "%d/%m/%Y"),
  }
  .with_context(|| format!("invalid period '{raw}'"))?;

  date
    .with_day(1)
    .with_context(|| format!("cannot normalize '{raw}' to month start"))
}

fn parse_value(raw: &str, sentinel: Option<f64>) -> Result<f64> {
  if MISSING_MARKERS.contains(&raw) {
    return Ok(f64::NAN);
  }

  let pct: f64 = raw
    .parse()
    .with_context(|| format!("invalid return value '{raw}'"))?;

  match sentinel {
    Some(s) if (pct - s).abs() < 1e-9 => Ok(f64::NAN),
    _ => Ok(pct / 100.0),
  }
}

/// Parse a dataset from any reader holding its CSV text.
pub fn read_returns<R: Read>(reader: R, dataset: Dataset) -> Result<ReturnTable> {
  let mut rdr = csv::ReaderBuilder::new()
    .has_headers(true)
    .trim(csv::Trim::All)
    .from_reader(reader);

  let headers = rdr
    .headers()
    .with_context(|| format!("missing header in {}", dataset.file_name()))?
    .clone();
  ensure!(
    headers.len() >= 2,
    "{} needs an index column and at least one return column",
    dataset.file_name()
  );
  let columns: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

  let layout = dataset.date_layout();
  let sentinel = dataset.missing_sentinel();
  let mut index = Vec::new();
  let mut flat = Vec::new();

  for (row, record) in rdr.records().enumerate() {
    let line = row + 2;
    let record =
      record.with_context(|| format!("malformed record on line {line} of {}", dataset.file_name()))?;
    let raw_period = record.get(0).unwrap_or_default();
    index.push(
      parse_period(raw_period, layout)
        .with_context(|| format!("line {line} of {}", dataset.file_name()))?,
    );

    for field in record.iter().skip(1) {
      flat.push(
        parse_value(field, sentinel)
          .with_context(|| format!("line {line} of {}", dataset.file_name()))?,
      );
    }
  }

  let values = Array2::from_shape_vec((index.len(), columns.len()), flat)?;
  ReturnTable::new(index, columns, values)
}

/// Load a dataset from the configured data directory.
pub fn load(dataset: Dataset, config: &DataConfig) -> Result<ReturnTable> {
  let path = config.path(dataset);
  let file = File::open(&path).with_context(|| format!("cannot open {}", path.display()))?;
  let table = read_returns(BufReader::new(file), dataset)?;

  debug!(
    ?dataset,
    rows = table.nrows(),
    columns = table.ncols(),
    "loaded return dataset"
  );

  Ok(table)
}

/// Fama-French market-equity portfolio returns.
pub fn ffme_returns(config: &DataConfig) -> Result<ReturnTable> {
  load(Dataset::MarketEquity, config)
}

/// EDHEC hedge fund index returns.
pub fn hfi_returns(config: &DataConfig) -> Result<ReturnTable> {
  load(Dataset::HedgeFundIndices, config)
}

/// Ken French 30 industry portfolio returns.
pub fn ind_returns(config: &DataConfig) -> Result<ReturnTable> {
  load(Dataset::Industry30, config)
}

#[cfg(test)]
mod tests {
  use std::fs;

  use approx::assert_relative_eq;

  use super::*;

  const FFME: &str = ",<= 0,Lo 30,Med 40,Hi 30
192607,-99.99,-0.43,1.52,2.04
192608,-99.99,3.90,3.04,4.06
192609,-99.99,-1.08,-0.54,0.56
";

  const HFI: &str = "date,Convertible Arbitrage,CTA Global
31/01/1997,1.19,3.93
28/02/1997,1.23,2.98
";

  const IND: &str = ",Food ,Beer ,Smoke
192607,0.56,-5.19,1.29
192608,2.59,27.03,6.50
199001,1.00,2.00,3.00
";

  #[test]
  fn market_equity_maps_sentinel_to_nan_and_scales() {
    let table = read_returns(FFME.as_bytes(), Dataset::MarketEquity).unwrap();

    assert_eq!(table.nrows(), 3);
    assert_eq!(table.columns(), &["<= 0", "Lo 30", "Med 40", "Hi 30"]);
    assert_eq!(
      table.index()[0],
      NaiveDate::from_ymd_opt(1926, 7, 1).unwrap()
    );
    assert!(table.values()[[0, 0]].is_nan());
    assert_relative_eq!(table.values()[[1, 1]], 0.039, epsilon = 1e-12);
  }

  #[test]
  fn hedge_fund_dates_become_month_periods() {
    let table = read_returns(HFI.as_bytes(), Dataset::HedgeFundIndices).unwrap();

    assert_eq!(
      table.index(),
      &[
        NaiveDate::from_ymd_opt(1997, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(1997, 2, 1).unwrap()
      ]
    );
    let cta = table.column("CTA Global").unwrap();
    assert_relative_eq!(cta[0], 0.0393, epsilon = 1e-12);
  }

  #[test]
  fn industry_labels_are_trimmed() {
    let table = read_returns(IND.as_bytes(), Dataset::Industry30).unwrap();
    assert_eq!(table.columns(), &["Food", "Beer", "Smoke"]);

    let beer = table.select(&["Beer"]).unwrap();
    assert_eq!(beer.ncols(), 1);
    assert_relative_eq!(beer.values()[[1, 0]], 0.2703, epsilon = 1e-12);
  }

  #[test]
  fn select_rejects_unknown_column() {
    let table = read_returns(IND.as_bytes(), Dataset::Industry30).unwrap();
    let err = table.select(&["Coal"]).unwrap_err();
    assert!(err.to_string().contains("Coal"));
  }

  #[test]
  fn slice_years_is_inclusive() {
    let table = read_returns(IND.as_bytes(), Dataset::Industry30).unwrap();
    assert_eq!(table.slice_years(1926, 1926).nrows(), 2);
    assert_eq!(table.slice_years(1926, 1990).nrows(), 3);
    assert_eq!(table.slice_years(2000, 2010).nrows(), 0);
  }

  #[test]
  fn bad_period_reports_line() {
    let csv = ",A\n1926-07,1.0\n";
    let err = read_returns(csv.as_bytes(), Dataset::Industry30).unwrap_err();
    assert!(format!("{err:#}").contains("line 2"));
  }

  #[test]
  fn aggregate_runs_per_column() {
    let table = read_returns(IND.as_bytes(), Dataset::Industry30).unwrap();
    let counts = table.aggregate(|col| col.len());
    assert_eq!(counts.get("Smoke"), Some(&3));

    let err = table
      .try_aggregate(|_| -> Result<f64> { bail!("boom") })
      .unwrap_err();
    assert!(format!("{err:#}").contains("column 'Food'"));
  }

  #[test]
  fn load_reads_from_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(Dataset::HedgeFundIndices.file_name()), HFI).unwrap();

    let config = DataConfig::new(dir.path());
    let table = hfi_returns(&config).unwrap();
    assert_eq!(table.ncols(), 2);

    assert!(ind_returns(&config).is_err());
  }
}
