//! Map session state
//!
//! Owns the raster and rain snapshots for one map view and hands them to the
//! pure sampler functions.
//!
//! Global invariants enforced:
//! - Raster and rain are each loaded once per generation via a one-shot ticket
//! - Until both loads settle, clicks and overlays report no data
//! - Completions that arrive after teardown, or for an older generation, are
//!   discarded without touching state
//! - State is replaced, never mutated in place; the raster is shared read-only
//! - Changing the mode or the rain signal drops the painted overlay

use crate::rain::RainSignal;
use crate::raster::{LatLng, RasterGrid};
use crate::sampler::{self, Calibration, ClickedFloodInfo, Overlay};
use crate::scoring::HeatmapMode;
use anyhow::Result;
use std::sync::Arc;

/// What a ticket loads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Raster,
    Rain,
}

/// Handle for one in-flight load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    kind: LoadKind,
    generation: u64,
}

impl LoadTicket {
    pub fn kind(&self) -> LoadKind {
        self.kind
    }
}

/// How a completed load was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Result stored in the session
    Applied,
    /// Load failed; the session fell back to its degraded state
    Degraded,
    /// Session torn down, ticket stale, or already completed
    Discarded,
}

/// State for one map view
#[derive(Debug)]
pub struct MapSession {
    mode: HeatmapMode,
    calibration: Calibration,
    generation: u64,
    closed: bool,
    raster: Option<Arc<RasterGrid>>,
    raster_pending: bool,
    raster_settled: bool,
    rain: RainSignal,
    rain_pending: bool,
    rain_settled: bool,
    overlay: Option<Arc<Overlay>>,
}

impl MapSession {
    pub fn new(mode: HeatmapMode, calibration: Calibration) -> Self {
        MapSession {
            mode,
            calibration,
            generation: 0,
            closed: false,
            raster: None,
            raster_pending: false,
            raster_settled: false,
            rain: RainSignal::default(),
            rain_pending: false,
            rain_settled: false,
            overlay: None,
        }
    }

    pub fn mode(&self) -> HeatmapMode {
        self.mode
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn rain(&self) -> RainSignal {
        self.rain
    }

    pub fn raster(&self) -> Option<&Arc<RasterGrid>> {
        self.raster.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Both loads have settled and a raster is available
    pub fn is_ready(&self) -> bool {
        !self.closed && self.raster_settled && self.rain_settled && self.raster.is_some()
    }

    /// Start the raster load for the current generation
    pub fn begin_raster_load(&mut self) -> LoadTicket {
        self.raster_pending = true;
        LoadTicket {
            kind: LoadKind::Raster,
            generation: self.generation,
        }
    }

    /// Start the rain load for the current generation
    pub fn begin_rain_load(&mut self) -> LoadTicket {
        self.rain_pending = true;
        LoadTicket {
            kind: LoadKind::Rain,
            generation: self.generation,
        }
    }

    fn accepts(&self, ticket: LoadTicket, kind: LoadKind) -> bool {
        let pending = match kind {
            LoadKind::Raster => self.raster_pending,
            LoadKind::Rain => self.rain_pending,
        };
        !self.closed && ticket.kind() == kind && ticket.generation == self.generation && pending
    }

    /// Apply a finished raster load
    pub fn complete_raster_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<RasterGrid>,
    ) -> LoadOutcome {
        if !self.accepts(ticket, LoadKind::Raster) {
            tracing::debug!(generation = ticket.generation, "discarding raster load");
            return LoadOutcome::Discarded;
        }
        self.raster_pending = false;
        self.raster_settled = true;
        self.overlay = None;

        match result {
            Ok(grid) => {
                self.raster = Some(Arc::new(grid));
                LoadOutcome::Applied
            }
            Err(e) => {
                tracing::warn!("raster unavailable: {:#}", e);
                self.raster = None;
                LoadOutcome::Degraded
            }
        }
    }

    /// Apply a finished rain load (hourly mm for the current day)
    ///
    /// A failed load falls back to a dry signal, which makes realtime mode
    /// track the susceptibility baseline scaled by the rain floor.
    pub fn complete_rain_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<f64>>,
    ) -> LoadOutcome {
        if !self.accepts(ticket, LoadKind::Rain) {
            tracing::debug!(generation = ticket.generation, "discarding rain load");
            return LoadOutcome::Discarded;
        }
        self.rain_pending = false;
        self.rain_settled = true;
        self.overlay = None;

        match result {
            Ok(hourly) => {
                self.rain = RainSignal::from_hourly_with_policy(&hourly, &self.calibration.policy);
                LoadOutcome::Applied
            }
            Err(e) => {
                tracing::warn!("rain feed unavailable, using rain factor 0: {:#}", e);
                self.rain = RainSignal::default();
                LoadOutcome::Degraded
            }
        }
    }

    /// Run both loads to completion with the given loaders
    pub fn load<R, W>(&mut self, raster: R, rain: W) -> (LoadOutcome, LoadOutcome)
    where
        R: FnOnce() -> Result<RasterGrid>,
        W: FnOnce() -> Result<Vec<f64>>,
    {
        let raster_ticket = self.begin_raster_load();
        let rain_ticket = self.begin_rain_load();
        let raster_outcome = self.complete_raster_load(raster_ticket, raster());
        let rain_outcome = self.complete_rain_load(rain_ticket, rain());
        (raster_outcome, rain_outcome)
    }

    /// Switch scoring branch; the overlay must be repainted afterwards
    pub fn set_mode(&mut self, mode: HeatmapMode) {
        if self.closed || mode == self.mode {
            return;
        }
        self.mode = mode;
        self.overlay = None;
    }

    /// Resolve a click against the current snapshots
    pub fn resolve_click(&self, point: LatLng) -> Option<ClickedFloodInfo> {
        if !self.is_ready() {
            return None;
        }
        let grid = self.raster.as_ref()?;
        sampler::resolve_click_with(
            point,
            grid,
            self.rain.rain_factor,
            self.mode,
            &self.calibration,
        )
    }

    /// Current overlay, painting it in full if it was invalidated
    pub fn overlay(&mut self) -> Option<Arc<Overlay>> {
        if !self.is_ready() {
            return None;
        }
        if let Some(overlay) = &self.overlay {
            return Some(Arc::clone(overlay));
        }
        let grid = self.raster.as_ref()?;
        let overlay = Arc::new(sampler::render_overlay(
            grid,
            self.rain.rain_factor,
            self.mode,
            &self.calibration,
        ));
        self.overlay = Some(Arc::clone(&overlay));
        Some(overlay)
    }

    /// Start a new generation; older tickets become stale
    pub fn reload(&mut self) -> Result<(LoadTicket, LoadTicket)> {
        if self.closed {
            anyhow::bail!("cannot reload a torn-down map session");
        }
        self.generation += 1;
        self.raster = None;
        self.raster_settled = false;
        self.rain = RainSignal::default();
        self.rain_settled = false;
        self.overlay = None;
        Ok((self.begin_raster_load(), self.begin_rain_load()))
    }

    /// Close the view and release its snapshots
    pub fn teardown(&mut self) {
        self.closed = true;
        self.raster = None;
        self.overlay = None;
        self.raster_pending = false;
        self.rain_pending = false;
    }
}

impl Default for MapSession {
    fn default() -> Self {
        Self::new(HeatmapMode::default(), Calibration::default())
    }
}
