use crate::config::IdFormat;
use crate::ring::{RingBuffer, Sample};
use canbus::CanId;
use std::collections::{BTreeMap, HashMap};

#[derive(thiserror::Error, Debug)]
#[error("presenter failure: {0}")]
pub struct PresentError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowHandle(pub u64);

/// One display window: `x` is the index sequence, `y` the magnitudes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Series {
    pub fn from_window(window: &[Sample]) -> Self {
        Self {
            x: (0..window.len()).map(|i| i as f64).collect(),
            y: window.iter().map(|v| *v as f64).collect(),
        }
    }
}

/// Rendering seam. The store calls these; whatever draws the rows implements
/// them and owns the handles it returns.
pub trait Presenter: Send {
    fn create_row(
        &mut self,
        id: CanId,
        label: &str,
        series: &Series,
        height: u32,
    ) -> Result<RowHandle, PresentError>;
    fn update_row(&mut self, handle: RowHandle, series: &Series) -> Result<(), PresentError>;
    fn set_row_height(&mut self, handle: RowHandle, height: u32) -> Result<(), PresentError>;
    fn set_row_label(&mut self, handle: RowHandle, label: &str) -> Result<(), PresentError>;
    fn remove_row(&mut self, handle: RowHandle) -> Result<(), PresentError>;
}

#[derive(Debug, Clone)]
pub struct PlotRow {
    pub handle: RowHandle,
    pub label: String,
    pub series: Series,
}

pub struct PlotStore {
    rows: BTreeMap<CanId, PlotRow>,
    presenter: Box<dyn Presenter>,
    height: u32,
    id_format: IdFormat,
}

impl PlotStore {
    pub fn new(presenter: Box<dyn Presenter>, height: u32, id_format: IdFormat) -> Self {
        Self {
            rows: BTreeMap::new(),
            presenter,
            height,
            id_format,
        }
    }

    pub fn contains(&self, id: CanId) -> bool {
        self.rows.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<CanId> {
        self.rows.keys().copied().collect()
    }

    pub fn row(&self, id: CanId) -> Option<&PlotRow> {
        self.rows.get(&id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn add(&mut self, id: CanId, window: &[Sample]) -> Result<(), PresentError> {
        if self.rows.contains_key(&id) {
            return Err(PresentError(format!("row {id:#x} already exists")));
        }
        let label = self.id_format.label(id);
        let series = Series::from_window(window);
        let handle = self.presenter.create_row(id, &label, &series, self.height)?;
        self.rows.insert(
            id,
            PlotRow {
                handle,
                label,
                series,
            },
        );
        Ok(())
    }

    pub fn update(&mut self, id: CanId, window: &[Sample]) -> Result<(), PresentError> {
        let row = self
            .rows
            .get_mut(&id)
            .ok_or_else(|| PresentError(format!("row {id:#x} does not exist")))?;
        let series = Series::from_window(window);
        self.presenter.update_row(row.handle, &series)?;
        row.series = series;
        Ok(())
    }

    pub fn upsert(&mut self, id: CanId, window: &[Sample]) -> Result<(), PresentError> {
        if self.contains(id) {
            self.update(id, window)
        } else {
            self.add(id, window)
        }
    }

    pub fn remove(&mut self, id: CanId) {
        if let Some(row) = self.rows.remove(&id) {
            if let Err(err) = self.presenter.remove_row(row.handle) {
                log::warn!("row {id:#x} could not be removed: {err}");
            }
        }
    }

    pub fn clear(&mut self) {
        let ids: Vec<CanId> = self.rows.keys().copied().collect();
        for id in ids {
            self.remove(id);
        }
    }

    /// Applies to every existing row immediately.
    pub fn set_height(&mut self, height: u32) {
        self.height = height;
        for (id, row) in &self.rows {
            if let Err(err) = self.presenter.set_row_height(row.handle, height) {
                log::warn!("row {id:#x} height change failed: {err}");
            }
        }
    }

    /// Relabels every existing row immediately.
    pub fn set_id_format(&mut self, format: IdFormat) {
        self.id_format = format;
        for (id, row) in self.rows.iter_mut() {
            let label = format.label(*id);
            if let Err(err) = self.presenter.set_row_label(row.handle, &label) {
                log::warn!("row {id:#x} relabel failed: {err}");
                continue;
            }
            row.label = label;
        }
    }

    /// Tear down every row and re-create one per buffer in ascending id
    /// order. A row that fails to build is logged and skipped.
    pub fn repopulate(&mut self, data: &HashMap<CanId, RingBuffer>, window_len: usize) {
        self.clear();
        let mut ids: Vec<CanId> = data.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            let Some(buffer) = data.get(&id) else {
                continue;
            };
            if let Err(err) = self.add(id, &buffer.window(window_len)) {
                log::warn!("row {id:#x} could not be recreated: {err}");
            }
        }
    }
}
