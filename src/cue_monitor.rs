//! CuePointMonitor — turns noisy playback-progress callbacks into
//! edge-triggered ad scheduling signals.
//!
//! Owns two parallel tables: the cue points (where an ad break begins) and
//! the ad-call points (where the metadata fetch must begin so the creative is
//! ready in time). Progress callbacks arrive at the playback engine's own
//! irregular cadence, so matching is done against a ± tolerance window rather
//! than exact equality, and a per-table latch collapses the multi-frame
//! "inside window" condition into exactly one signal per point.

// --- Constants ---

/// Default tolerance window around each table entry (milliseconds).
///
/// Progress callbacks land hundreds of milliseconds apart; as long as the
/// callback cadence is finer than the window width, every point is matched
/// at least once even though the observed value differs call to call.
pub const RANGE_FACTOR: u64 = 1500;

// --- Signals ---

/// Scheduling signal emitted from one progress evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleSignal {
    /// Start fetching ad metadata for the given cue point.
    RequestAdCall { cue_point_millis: u64 },
    /// Progress has reached the cue point; begin the ad break.
    ShowAd { cue_point_millis: u64 },
}

// --- Windowed binary search ---

/// Binary search over a sorted table where any entry within `range` of `key`
/// counts as a match. Returns `Ok(index)` on a match, `Err(insertion_point)`
/// otherwise, so `range = 0` degenerates to a plain exact binary search.
///
/// Arithmetic saturates: an entry near `u64::MAX` or near zero narrows the
/// search correctly instead of wrapping.
pub fn binary_search_with_range(table: &[u64], key: u64, range: u64) -> Result<usize, usize> {
    let mut low = 0usize;
    let mut high = table.len();

    while low < high {
        let mid = (low + high) / 2;
        let mid_val = table[mid];

        if mid_val.saturating_add(range) < key {
            low = mid + 1;
        } else if mid_val.saturating_sub(range) > key {
            high = mid;
        } else {
            return Ok(mid);
        }
    }
    Err(low)
}

// --- Monitor ---

/// Per-session cue point monitor. Single-threaded by design: every mutation
/// of the latch flags and matched index happens inside one `on_progress`
/// call, never from a state-machine side effect.
#[derive(Debug, Clone)]
pub struct CuePointMonitor {
    /// Sorted content timestamps at which an ad break begins.
    cue_points: Vec<u64>,
    /// Derived: `cue_points[i] - networking_ahead`, floored at zero.
    ad_call_points: Vec<u64>,
    /// How far ahead of a cue point the metadata fetch starts.
    networking_ahead_millis: u64,
    /// Half-width of the matching window.
    tolerance_millis: u64,
    /// Latch: are we allowed to fire an ad call for the point currently in
    /// window? Re-armed only once progress leaves every ad-call window.
    armed_for_ad_call: bool,
    /// Same latch for the cue table.
    armed_for_cue: bool,
    /// Index of the table entry the last lookup landed in; `None` when
    /// progress is outside all windows. Shared between tables — the ad-call
    /// table is a shifted view of the cue table.
    matched_index: Option<usize>,
    /// Index recorded when a ShowAd fired, kept until the break is consumed
    /// so the originating pair can be removed long after progress moved on.
    active_break: Option<usize>,
}

impl CuePointMonitor {
    /// Create a monitor with no cue points set. Scheduling is disabled until
    /// `set_cue_points` is called.
    pub fn new(networking_ahead_millis: u64, tolerance_millis: u64) -> Self {
        CuePointMonitor {
            cue_points: Vec::new(),
            ad_call_points: Vec::new(),
            networking_ahead_millis,
            tolerance_millis,
            armed_for_ad_call: true,
            armed_for_cue: true,
            matched_index: None,
            active_break: None,
        }
    }

    /// Replace the cue table for this session.
    ///
    /// Values must be strictly ascending: an unsorted table would corrupt the
    /// binary search, and duplicates would break the one-signal-per-point
    /// guarantee, so both are rejected rather than silently corrected.
    /// Resets the matched index and re-arms both latches.
    pub fn set_cue_points(&mut self, points: &[u64]) -> Result<(), String> {
        for pair in points.windows(2) {
            if pair[1] <= pair[0] {
                return Err(format!(
                    "Cue points must be strictly ascending: {} followed by {}",
                    pair[0], pair[1]
                ));
            }
        }

        self.cue_points = points.to_vec();
        self.ad_call_points = points
            .iter()
            .map(|&cue| cue.saturating_sub(self.networking_ahead_millis))
            .collect();
        self.matched_index = None;
        self.active_break = None;
        self.armed_for_ad_call = true;
        self.armed_for_cue = true;
        Ok(())
    }

    /// Disable scheduling until a new table is set.
    pub fn clear_cue_points(&mut self) {
        self.cue_points.clear();
        self.ad_call_points.clear();
        self.matched_index = None;
        self.active_break = None;
        self.armed_for_ad_call = true;
        self.armed_for_cue = true;
    }

    pub fn has_cue_points(&self) -> bool {
        !self.cue_points.is_empty()
    }

    pub fn cue_points(&self) -> &[u64] {
        &self.cue_points
    }

    pub fn ad_call_points(&self) -> &[u64] {
        &self.ad_call_points
    }

    pub fn networking_ahead_millis(&self) -> u64 {
        self.networking_ahead_millis
    }

    pub fn tolerance_millis(&self) -> u64 {
        self.tolerance_millis
    }

    /// Per-frame entry point. Evaluates the ad-call table, then the cue
    /// table, returning at most one signal per table.
    ///
    /// `ad_playing` is the state machine's answer to "is an ad break running
    /// right now" — while it is true the call is a no-op, because the
    /// monitor only evaluates content-time progress.
    pub fn on_progress(
        &mut self,
        position_millis: u64,
        _duration_millis: u64,
        ad_playing: bool,
    ) -> Vec<ScheduleSignal> {
        if ad_playing {
            return Vec::new();
        }

        let mut signals = Vec::new();

        // Ad-call table first: the fetch must be in flight before the cue.
        if self.lookup(position_millis, Table::AdCall) {
            if self.armed_for_ad_call {
                self.armed_for_ad_call = false;
                if let Some(idx) = self.matched_index {
                    signals.push(ScheduleSignal::RequestAdCall {
                        cue_point_millis: self.cue_points[idx],
                    });
                }
            }
        } else {
            self.armed_for_ad_call = true;
        }

        if self.lookup(position_millis, Table::Cue) {
            if self.armed_for_cue {
                self.armed_for_cue = false;
                if let Some(idx) = self.matched_index {
                    self.active_break = Some(idx);
                    signals.push(ScheduleSignal::ShowAd {
                        cue_point_millis: self.cue_points[idx],
                    });
                }
            }
        } else {
            self.armed_for_cue = true;
        }

        signals
    }

    /// Remove the cue/ad-call pair of the break that last fired, shrinking
    /// both tables by one. No-op if no break has fired since the last
    /// consume. Called by the session once a break has actually run, so a
    /// backward seek can never replay it.
    pub fn consume_cue_point(&mut self) {
        if let Some(idx) = self.active_break.take() {
            if idx < self.cue_points.len() {
                self.cue_points.remove(idx);
                self.ad_call_points.remove(idx);
            }
            self.matched_index = None;
        }
    }

    /// Window lookup against one table, updating the shared matched index.
    fn lookup(&mut self, position_millis: u64, table: Table) -> bool {
        let points = match table {
            Table::Cue => &self.cue_points,
            Table::AdCall => &self.ad_call_points,
        };
        if points.is_empty() {
            self.matched_index = None;
            return false;
        }

        match binary_search_with_range(points, position_millis, self.tolerance_millis) {
            Ok(idx) => {
                self.matched_index = Some(idx);
                true
            }
            Err(_) => {
                self.matched_index = None;
                false
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Table {
    Cue,
    AdCall,
}
