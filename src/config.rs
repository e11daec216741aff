//! Runtime configuration for the grid.
//!
//! Nothing here is persisted. Defaults can be overridden through
//! `PACKGRID_*` environment variables, which is mostly useful for the
//! simulation and for poking at the GTK front-end.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::error::{GridError, GridResult};
use crate::layout::CellSize;

/// Rows kept materialized above and below the visible rows.
pub const DEFAULT_BUFFER_ROWS: usize = 8;

/// Rows moved by a single forwards/backwards shift.
pub const DEFAULT_STRIDE_ROWS: usize = 5;

/// Configuration for the virtualized grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    /// Size of one tile in pixels (default: 150x100)
    pub cell: CellSize,
    /// Gap between tiles, both axes (default: 25)
    pub gap: f32,
    /// Buffer rows on each side of the viewport (default: 8)
    pub buffer_rows: usize,
    /// Rows moved per shift (default: 5)
    pub stride_rows: usize,
    /// Distance from the viewport edge at which a sentinel counts as near
    pub proximity_threshold: f32,
    /// Delay between periodic reconciliation checks
    pub recheck_interval: Duration,
    /// Upper bound on shifts performed by one reconciliation pass
    pub max_reconcile_steps: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell: CellSize::new(150.0, 100.0),
            gap: 25.0,
            buffer_rows: DEFAULT_BUFFER_ROWS,
            stride_rows: DEFAULT_STRIDE_ROWS,
            proximity_threshold: 300.0,
            recheck_interval: Duration::from_millis(100),
            max_reconcile_steps: 64,
        }
    }
}

impl GridConfig {
    /// Default configuration with any `PACKGRID_*` overrides applied.
    ///
    /// Recognised variables: `PACKGRID_CELL_WIDTH`, `PACKGRID_CELL_HEIGHT`,
    /// `PACKGRID_GAP`, `PACKGRID_BUFFER_ROWS`, `PACKGRID_STRIDE_ROWS`,
    /// `PACKGRID_PROXIMITY_PX`, `PACKGRID_RECHECK_MS`,
    /// `PACKGRID_MAX_RECONCILE_STEPS`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(width) = env_value::<f32>("PACKGRID_CELL_WIDTH")? {
            let cell = CellSize::new(width, config.cell.height);
            config = config.with_cell(cell);
        }
        if let Some(height) = env_value::<f32>("PACKGRID_CELL_HEIGHT")? {
            let cell = CellSize::new(config.cell.width, height);
            config = config.with_cell(cell);
        }
        if let Some(gap) = env_value("PACKGRID_GAP")? {
            config = config.with_gap(gap);
        }
        if let Some(rows) = env_value("PACKGRID_BUFFER_ROWS")? {
            config = config.with_buffer_rows(rows);
        }
        if let Some(rows) = env_value("PACKGRID_STRIDE_ROWS")? {
            config.stride_rows = rows;
        }
        if let Some(px) = env_value("PACKGRID_PROXIMITY_PX")? {
            config = config.with_proximity_threshold(px);
        }
        if let Some(ms) = env_value::<u64>("PACKGRID_RECHECK_MS")? {
            config.recheck_interval = Duration::from_millis(ms);
        }
        if let Some(steps) = env_value("PACKGRID_MAX_RECONCILE_STEPS")? {
            config.max_reconcile_steps = steps;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_cell(mut self, cell: CellSize) -> Self {
        self.cell = cell;
        self
    }

    pub fn with_gap(mut self, gap: f32) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_buffer_rows(mut self, rows: usize) -> Self {
        self.buffer_rows = rows;
        self
    }

    pub fn with_proximity_threshold(mut self, px: f32) -> Self {
        self.proximity_threshold = px;
        self
    }

    /// Checks the relationships the window manager relies on.
    pub fn validate(&self) -> GridResult<()> {
        if !(self.cell.width.is_finite() && self.cell.width > 0.0) {
            return Err(GridError::InvalidConfig(format!(
                "cell width must be positive, got {}",
                self.cell.width
            )));
        }
        if !(self.cell.height.is_finite() && self.cell.height > 0.0) {
            return Err(GridError::InvalidConfig(format!(
                "cell height must be positive, got {}",
                self.cell.height
            )));
        }
        if !(self.gap.is_finite() && self.gap >= 0.0) {
            return Err(GridError::InvalidConfig(format!(
                "gap must be non-negative, got {}",
                self.gap
            )));
        }
        if self.stride_rows == 0 {
            return Err(GridError::InvalidConfig("stride rows must be at least 1".into()));
        }
        // A shift must never carry the window past the rows it is meant to cover.
        if self.buffer_rows <= self.stride_rows {
            return Err(GridError::InvalidConfig(format!(
                "buffer rows ({}) must exceed stride rows ({})",
                self.buffer_rows, self.stride_rows
            )));
        }
        if !(self.proximity_threshold.is_finite() && self.proximity_threshold >= 0.0) {
            return Err(GridError::InvalidConfig(format!(
                "proximity threshold must be non-negative, got {}",
                self.proximity_threshold
            )));
        }
        // Sentinels sit at the window edges. Unless the buffer reaches past the
        // threshold, both are near at once and neither asks for a shift.
        let buffer_span = self.buffer_rows as f32 * (self.cell.height + self.gap);
        if buffer_span <= self.proximity_threshold {
            return Err(GridError::InvalidConfig(format!(
                "buffer of {} rows spans {}px, which must exceed the proximity threshold ({}px)",
                self.buffer_rows, buffer_span, self.proximity_threshold
            )));
        }
        if self.max_reconcile_steps == 0 {
            return Err(GridError::InvalidConfig(
                "max reconcile steps must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn env_value<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Failed to parse {} value {:?}", name, raw)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("Failed to read {}", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(GridConfig::default().validate().is_ok());
    }

    #[test]
    fn test_buffer_must_exceed_stride() {
        let config = GridConfig::default().with_buffer_rows(5);
        assert!(matches!(
            config.validate(),
            Err(GridError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_buffer_must_reach_past_proximity_threshold() {
        // 6 rows of 10px cannot keep sentinels 300px away from the viewport.
        let config = GridConfig::default()
            .with_cell(CellSize::new(150.0, 10.0))
            .with_gap(0.0)
            .with_buffer_rows(6);
        assert!(matches!(
            config.validate(),
            Err(GridError::InvalidConfig(_))
        ));

        assert!(config.clone().with_proximity_threshold(59.0).validate().is_ok());
        assert!(config.clone().with_proximity_threshold(60.0).validate().is_err());
        assert!(config.with_proximity_threshold(f32::NAN).validate().is_err());
    }

    #[test]
    fn test_rejects_degenerate_cells() {
        let config = GridConfig::default().with_cell(CellSize::new(0.0, 100.0));
        assert!(config.validate().is_err());

        let config = GridConfig::default().with_cell(CellSize::new(150.0, f32::NAN));
        assert!(config.validate().is_err());

        let config = GridConfig::default().with_gap(-1.0);
        assert!(config.validate().is_err());
    }
}
