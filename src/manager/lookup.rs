//! Lookup Outcome Module

/// How a `wrap` call produced its value.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// Served from the store; the computation was not invoked
    Hit(T),
    /// Computed and written to the store
    MissComputed(T),
    /// Computed, but the store failed on read or write so nothing was cached
    MissStoreUnavailableComputed(T),
    /// Received from a concurrent computation of the same key
    Joined(T),
}

impl<T> Lookup<T> {
    pub fn value(&self) -> &T {
        match self {
            Lookup::Hit(v)
            | Lookup::MissComputed(v)
            | Lookup::MissStoreUnavailableComputed(v)
            | Lookup::Joined(v) => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Lookup::Hit(v)
            | Lookup::MissComputed(v)
            | Lookup::MissStoreUnavailableComputed(v)
            | Lookup::Joined(v) => v,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    /// True when this call ran the computation itself.
    pub fn computed(&self) -> bool {
        matches!(
            self,
            Lookup::MissComputed(_) | Lookup::MissStoreUnavailableComputed(_)
        )
    }

    /// Outcome label for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Lookup::Hit(_) => "hit",
            Lookup::MissComputed(_) => "miss",
            Lookup::MissStoreUnavailableComputed(_) => "miss_store_unavailable",
            Lookup::Joined(_) => "joined",
        }
    }
}
