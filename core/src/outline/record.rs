use error::Error;
use primitives::{Coord, Material, PlotId};
use std::collections::BTreeMap;
use storage::Backend;

/// The marker voxels placed for one plot and what each of them replaced. While the record exists
/// every coordinate in it holds the marker material (unless something outside the placer changed
/// it since).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OutlineRecord {
    pub plot: PlotId,
    pub replaced: BTreeMap<Coord, Material>,
}

impl OutlineRecord {
    pub fn new(plot: PlotId) -> OutlineRecord {
        OutlineRecord { plot, replaced: BTreeMap::new() }
    }

    pub fn len(&self) -> usize {
        self.replaced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replaced.is_empty()
    }
}


/// All outline records, written through to a backend on every change unless held.
pub struct OutlineStore {
    records: BTreeMap<PlotId, OutlineRecord>,
    backend: Box<dyn Backend<OutlineRecord>>,
    /// While set, changes stay in memory until `flush`.
    held: bool,
    dirty: bool,
}

impl OutlineStore {
    /// Load every record the backend holds.
    pub fn open(backend: Box<dyn Backend<OutlineRecord>>) -> Result<OutlineStore, Error> {
        let records = backend.load()?
            .into_iter()
            .map(|r| (r.plot.clone(), r))
            .collect::<BTreeMap<_, _>>();
        debug!("Loaded {} outline record(s) from {}", records.len(), backend.describe());
        Ok(OutlineStore { records, backend, held: false, dirty: false })
    }

    pub fn get(&self, plot: &str) -> Option<&OutlineRecord> {
        self.records.get(plot)
    }

    pub fn contains(&self, plot: &str) -> bool {
        self.records.contains_key(plot)
    }

    pub fn plots(&self) -> Vec<PlotId> {
        self.records.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn insert(&mut self, record: OutlineRecord) {
        self.records.insert(record.plot.clone(), record);
        self.persist();
    }

    pub fn take(&mut self, plot: &str) -> Option<OutlineRecord> {
        let record = self.records.remove(plot);
        if record.is_some() { self.persist(); }
        record
    }

    /// Keep changes in memory until `flush`, for passes which rewrite many records at once.
    pub fn hold(&mut self) {
        self.held = true;
    }

    /// Write out everything changed since `hold`, in one write.
    pub fn flush(&mut self) {
        self.held = false;
        if self.dirty { self.persist(); }
    }

    fn persist(&mut self) {
        if self.held {
            self.dirty = true;
            return
        }
        self.dirty = false;
        let rows: Vec<OutlineRecord> = self.records.values().cloned().collect();
        if let Err(e) = self.backend.store(&rows) {
            error!("Could not persist outline records to {}: {}", self.backend.describe(), e);
        }
    }
}
