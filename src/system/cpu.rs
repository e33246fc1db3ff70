use std::collections::BTreeMap;

/// Frequency that stuck cores park at; never counts as converged.
pub const IDLE_FLOOR_MHZ: u32 = 1200;

/// Per-core frequency tracking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreRecord {
    pub id: usize,
    pub model_name: Option<String>,
    pub rated_max_mhz: Option<u32>,
    pub observed_max_mhz: Option<u32>,
}

/// Where a core stands relative to its rated clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreStatus {
    /// Missing a model rating or a frequency sample
    Pending,
    /// Parked at the idle floor
    Floor,
    /// Ramping, but below the rated max
    Below,
    /// At or above the rated max
    Cleared,
}

impl CoreRecord {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// First model line wins; returns false when the model was already known.
    pub fn set_model(&mut self, model: &str, rated_max_mhz: Option<u32>) -> bool {
        if self.model_name.is_some() {
            return false;
        }
        self.model_name = Some(model.to_string());
        self.rated_max_mhz = rated_max_mhz;
        true
    }

    pub fn record_sample(&mut self, mhz: u32) {
        self.observed_max_mhz = Some(self.observed_max_mhz.map_or(mhz, |cur| cur.max(mhz)));
    }

    pub fn status(&self) -> CoreStatus {
        match (self.observed_max_mhz, self.rated_max_mhz) {
            (Some(IDLE_FLOOR_MHZ), _) => CoreStatus::Floor,
            (Some(observed), Some(rated)) if observed >= rated => CoreStatus::Cleared,
            (Some(_), Some(_)) => CoreStatus::Below,
            _ => CoreStatus::Pending,
        }
    }

    pub fn is_converged(&self) -> bool {
        self.status() == CoreStatus::Cleared
    }
}

/// Global convergence verdict for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    NotConverged,
    Converged,
}

/// All cores seen so far in this run, keyed by core id
#[derive(Debug, Clone, Default)]
pub struct RunState {
    cores: BTreeMap<usize, CoreRecord>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, id: usize) -> &mut CoreRecord {
        self.cores.entry(id).or_insert_with(|| CoreRecord::new(id))
    }

    #[cfg(test)]
    pub fn get(&self, id: usize) -> Option<&CoreRecord> {
        self.cores.get(&id)
    }

    /// Cores in ascending id order
    pub fn cores(&self) -> impl Iterator<Item = &CoreRecord> {
        self.cores.values()
    }

    pub fn len(&self) -> usize {
        self.cores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }

    pub fn converged_count(&self) -> usize {
        self.cores().filter(|c| c.is_converged()).count()
    }

    /// An empty run never counts as converged: at least one complete core
    /// must be seen, and every core must clear.
    pub fn verdict(&self) -> Verdict {
        if !self.is_empty() && self.cores().all(CoreRecord::is_converged) {
            Verdict::Converged
        } else {
            Verdict::NotConverged
        }
    }
}
