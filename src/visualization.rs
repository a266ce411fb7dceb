//! # Visualization
//!
//! $$
//! \{(\sigma_k, \mu_k)\}_{k=1}^n \mapsto \text{risk/return chart}
//! $$
//!
//! plotly charts for efficient frontiers and drawdowns. Plots are returned
//! to the caller; `show` opens them in a browser.

use plotly::Layout;
use plotly::Plot;
use plotly::Scatter;
use plotly::common::DashType;
use plotly::common::Line;
use plotly::common::Marker;
use plotly::common::Mode;
use plotly::layout::Axis;
use plotly::layout::GridPattern;
use plotly::layout::LayoutGrid;
use plotly::layout::Margin;
use plotly::layout::RangeMode;

use crate::portfolio::Frontier;
use crate::portfolio::PortfolioPoint;
use crate::stats::Drawdown;

const CML_COLOR: &str = "green";
const EW_COLOR: &str = "goldenrod";
const GMV_COLOR: &str = "midnightblue";
const MARKER_SIZE: usize = 12;

fn risk_return_layout(title: &str, x_from_zero: bool) -> Layout {
  let mut x_axis = Axis::new().title("Volatility");
  if x_from_zero {
    x_axis = x_axis.range_mode(RangeMode::ToZero);
  }

  Layout::new()
    .title(title)
    .auto_size(true)
    .margin(Margin::new().left(56).right(24).top(64).bottom(44))
    .x_axis(x_axis)
    .y_axis(Axis::new().title("Return"))
}

fn marker_trace(point: &PortfolioPoint, name: &str, color: &'static str) -> Box<Scatter<f64, f64>> {
  Scatter::new(vec![point.volatility], vec![point.expected_return])
    .mode(Mode::Markers)
    .name(name)
    .marker(Marker::new().color(color).size(MARKER_SIZE))
}

/// Builder for efficient-frontier charts.
pub struct FrontierPlotter {
  title: String,
  style: Mode,
  line_width: f64,
}

impl Default for FrontierPlotter {
  fn default() -> Self {
    Self::new()
  }
}

impl FrontierPlotter {
  pub fn new() -> Self {
    Self {
      title: "Efficient Frontier".into(),
      style: Mode::LinesMarkers,
      line_width: 1.5,
    }
  }

  pub fn title(mut self, title: &str) -> Self {
    self.title = title.into();
    self
  }

  /// Drawing mode of the frontier trace.
  pub fn style(mut self, style: Mode) -> Self {
    self.style = style;
    self
  }

  pub fn line_width(mut self, w: f64) -> Self {
    self.line_width = w;
    self
  }

  /// Frontier trace plus whichever markers `frontier` carries.
  pub fn plot(&self, frontier: &Frontier) -> Plot {
    let mut plot = Plot::new();
    plot.set_layout(risk_return_layout(
      &self.title,
      frontier.capital_market_line.is_some(),
    ));

    plot.add_trace(
      Scatter::new(frontier.volatilities(), frontier.returns())
        .mode(self.style.clone())
        .name("Efficient frontier")
        .line(Line::new().width(self.line_width)),
    );

    if let Some(cml) = &frontier.capital_market_line {
      let [start, end] = cml.endpoints();
      plot.add_trace(
        Scatter::new(vec![start.0, end.0], vec![start.1, end.1])
          .mode(Mode::LinesMarkers)
          .name("Capital market line")
          .line(Line::new().color(CML_COLOR).dash(DashType::Dash).width(2.0))
          .marker(Marker::new().color(CML_COLOR).size(MARKER_SIZE / 2)),
      );
    }

    if let Some(ew) = &frontier.equal_weight {
      plot.add_trace(marker_trace(ew, "Equal weight", EW_COLOR));
    }

    if let Some(gmv) = &frontier.global_minimum_variance {
      plot.add_trace(marker_trace(gmv, "Global minimum variance", GMV_COLOR));
    }

    plot
  }

  pub fn show(&self, frontier: &Frontier) {
    self.plot(frontier).show();
  }
}

/// Risk/return curve of a two-asset mix sweep.
pub fn plot_two_asset_frontier(points: &[PortfolioPoint]) -> Plot {
  let vols: Vec<f64> = points.iter().map(|p| p.volatility).collect();
  let rets: Vec<f64> = points.iter().map(|p| p.expected_return).collect();

  let mut plot = Plot::new();
  plot.set_layout(risk_return_layout("Two-asset frontier", false));
  plot.add_trace(
    Scatter::new(vols, rets)
      .mode(Mode::LinesMarkers)
      .name("Two-asset frontier"),
  );
  plot
}

/// Wealth index with its running peak on top, percentage drawdown below.
pub fn plot_drawdown(drawdown: &Drawdown, title: &str) -> Plot {
  let t: Vec<f64> = (0..drawdown.len()).map(|i| i as f64).collect();

  let mut plot = Plot::new();
  plot.set_layout(
    Layout::new()
      .title(title)
      .auto_size(true)
      .margin(Margin::new().left(56).right(24).top(64).bottom(44))
      .grid(
        LayoutGrid::new()
          .rows(2)
          .columns(1)
          .pattern(GridPattern::Independent),
      ),
  );

  plot.add_trace(
    Scatter::new(t.clone(), drawdown.wealth.to_vec())
      .mode(Mode::Lines)
      .name("Wealth"),
  );
  plot.add_trace(
    Scatter::new(t.clone(), drawdown.peaks.to_vec())
      .mode(Mode::Lines)
      .name("Peaks")
      .line(Line::new().dash(DashType::Dot)),
  );
  plot.add_trace(
    Scatter::new(t, drawdown.drawdown.to_vec())
      .mode(Mode::Lines)
      .name("Drawdown")
      .x_axis("x2")
      .y_axis("y2"),
  );

  plot
}
