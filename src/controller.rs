//! Per-chart interaction state: pickers, the year dropdown and the
//! animation timer.
//!
//! Every control turns an [`Event`] into the chart's next [`Selection`], or
//! ignores it. A returned selection means the chart must re-aggregate and
//! re-render.

use crate::parser::Event;
use tracing::debug;

/// Lifecycle of a chart instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing drawn yet
    #[default]
    Idle,
    /// The current selection is on screen
    Rendered,
}

/// What a chart should draw
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    pub countries: Vec<String>,
    pub year: Option<i32>,
}

impl Selection {
    pub fn countries(countries: Vec<String>) -> Self {
        Self {
            countries,
            year: None,
        }
    }

    pub fn year(year: i32) -> Self {
        Self {
            countries: Vec::new(),
            year: Some(year),
        }
    }
}

/// A variable number of country pickers whose values are read collectively
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPicker {
    entities: Vec<String>,
    picks: Vec<String>,
    max: usize,
}

impl SeriesPicker {
    pub fn new(entities: Vec<String>, count: usize, max: usize) -> Self {
        let mut picker = Self {
            entities,
            picks: Vec::new(),
            max: max.max(1),
        };
        let n = count.clamp(1, picker.max).min(picker.entities.len());
        picker.set_count(n);
        picker
    }

    pub fn count(&self) -> usize {
        self.picks.len()
    }

    pub fn picks(&self) -> &[String] {
        &self.picks
    }

    /// Rebuild exactly `n` pickers. Existing picks keep their values; new
    /// pickers take the first entities not already picked. Counts outside
    /// `1..=max`, above the number of entities, or equal to the current
    /// count are ignored.
    pub fn set_count(&mut self, n: usize) -> bool {
        if n == 0 || n > self.max || n > self.entities.len() || n == self.picks.len() {
            return false;
        }
        self.picks.truncate(n);
        let mut candidates = self.entities.iter();
        while self.picks.len() < n {
            match candidates.find(|e| !self.picks.contains(e)) {
                Some(e) => self.picks.push(e.clone()),
                None => break,
            }
        }
        true
    }

    /// Set picker `slot` (1-based) to `country`
    pub fn pick(&mut self, slot: usize, country: &str) -> bool {
        if slot == 0 || slot > self.picks.len() || !self.entities.iter().any(|e| e == country) {
            return false;
        }
        self.picks[slot - 1] = country.to_string();
        true
    }

    /// The values of all pickers, first occurrence of each country only
    pub fn selection(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.picks.len());
        for p in &self.picks {
            if !out.contains(p) {
                out.push(p.clone());
            }
        }
        out
    }
}

/// One country out of a fixed list
#[derive(Debug, Clone, PartialEq)]
pub struct CountryPicker {
    entities: Vec<String>,
    current: String,
}

impl CountryPicker {
    /// Starts on `preferred` when present, otherwise on the first entity
    pub fn new(entities: Vec<String>, preferred: &str) -> Self {
        let current = entities
            .iter()
            .find(|e| *e == preferred)
            .or_else(|| entities.first())
            .cloned()
            .unwrap_or_default();
        Self { entities, current }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    /// Returns whether the selection changed
    pub fn set(&mut self, country: &str) -> bool {
        if country == self.current || !self.entities.iter().any(|e| e == country) {
            return false;
        }
        self.current = country.to_string();
        true
    }
}

/// One year out of the dataset's years
#[derive(Debug, Clone, PartialEq)]
pub struct YearPicker {
    years: Vec<i32>,
    current: Option<i32>,
}

impl YearPicker {
    /// Starts on `preferred` when present, otherwise on the first year
    pub fn new(years: Vec<i32>, preferred: i32) -> Self {
        let current = if years.contains(&preferred) {
            Some(preferred)
        } else {
            years.first().copied()
        };
        Self { years, current }
    }

    pub fn current(&self) -> Option<i32> {
        self.current
    }

    pub fn set(&mut self, year: i32) -> bool {
        if Some(year) == self.current || !self.years.contains(&year) {
            return false;
        }
        self.current = Some(year);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Playing,
    Paused,
}

/// Handle of a scheduled timer firing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken(u64);

/// Year-by-year playback with a manual slider.
///
/// At most one timer token is pending at a time. A token is only honoured
/// while it is the pending one, so a cancelled or duplicated timer can never
/// advance the animation.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    years: Vec<i32>,
    index: usize,
    state: PlayState,
    pending: Option<TimerToken>,
    issued: u64,
}

impl Animation {
    pub fn new(years: Vec<i32>) -> Self {
        Self {
            years,
            index: 0,
            state: PlayState::Playing,
            pending: None,
            issued: 0,
        }
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_year(&self) -> Option<i32> {
        self.years.get(self.index).copied()
    }

    pub fn pending(&self) -> Option<TimerToken> {
        self.pending
    }

    /// Schedule the next firing unless one is already pending. Does nothing
    /// while paused.
    pub fn arm(&mut self) -> Option<TimerToken> {
        if self.state == PlayState::Paused || self.years.is_empty() {
            return None;
        }
        if self.pending.is_none() {
            self.issued += 1;
            self.pending = Some(TimerToken(self.issued));
        }
        self.pending
    }

    /// Advance to the next year, wrapping after the last, and re-arm.
    /// Stale tokens are ignored.
    pub fn fire(&mut self, token: TimerToken) -> bool {
        if self.state != PlayState::Playing || self.pending != Some(token) {
            return false;
        }
        self.pending = None;
        self.index = (self.index + 1) % self.years.len();
        self.arm();
        true
    }

    /// Manual slider input: pause for good, cancel the pending timer and jump
    /// to `year`. Years between dataset years snap to the closest earlier one;
    /// years outside the range clamp to its ends.
    pub fn slide(&mut self, year: i32) -> bool {
        self.state = PlayState::Paused;
        self.pending = None;
        if self.years.is_empty() {
            return false;
        }
        let index = match self.years.binary_search(&year) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };
        self.index = index;
        true
    }
}

/// The input controls of one chart
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Series(SeriesPicker),
    Country(CountryPicker),
    Year(YearPicker),
    Animation(Animation),
    /// Charts without controls
    Fixed,
}

impl Control {
    /// The selection the controls currently describe
    pub fn selection(&self) -> Selection {
        match self {
            Control::Series(p) => Selection::countries(p.selection()),
            Control::Country(p) => Selection::countries(vec![p.current().to_string()]),
            Control::Year(p) => Selection {
                countries: Vec::new(),
                year: p.current(),
            },
            Control::Animation(a) => Selection {
                countries: Vec::new(),
                year: a.current_year(),
            },
            Control::Fixed => Selection::default(),
        }
    }

    /// Apply one event. Returns the new selection when the event changed
    /// state, `None` when it does not apply to this control. `Tick` fires the
    /// pending timer once, whatever its count.
    pub fn handle(&mut self, event: &Event) -> Option<Selection> {
        let changed = match (&mut *self, event) {
            (Control::Series(p), Event::Count(n)) => p.set_count(*n),
            (Control::Series(p), Event::Pick { slot, country }) => p.pick(*slot, country),
            (Control::Country(p), Event::Country(c)) => p.set(c),
            (Control::Year(p), Event::Year(y)) => p.set(*y),
            (Control::Animation(a), Event::Slide(y)) => a.slide(*y),
            (Control::Animation(a), Event::Tick(_)) => match a.pending() {
                Some(token) => a.fire(token),
                None => false,
            },
            _ => false,
        };
        if changed {
            Some(self.selection())
        } else {
            debug!(?event, "event ignored");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_animation_wraps_around() {
        let mut anim = Animation::new(vec![2000, 2001, 2002]);
        assert_eq!(anim.state(), PlayState::Playing);
        let mut seen = vec![anim.index()];
        for _ in 0..3 {
            let token = anim.arm().unwrap();
            assert!(anim.fire(token));
            seen.push(anim.index());
        }
        assert_eq!(seen, vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_slide_pauses_for_good() {
        let mut anim = Animation::new(vec![2000, 2001, 2002]);
        let token = anim.arm().unwrap();
        assert!(anim.fire(token));
        let pending = anim.pending().unwrap();

        assert!(anim.slide(2000));
        assert_eq!(anim.state(), PlayState::Paused);
        assert_eq!(anim.current_year(), Some(2000));
        assert!(anim.pending().is_none());
        assert!(!anim.fire(pending));
        assert!(anim.arm().is_none());
        assert_eq!(anim.current_year(), Some(2000));
    }

    #[test]
    fn test_single_pending_timer() {
        let mut anim = Animation::new(vec![2000, 2001]);
        let a = anim.arm().unwrap();
        let b = anim.arm().unwrap();
        assert_eq!(a, b);
        assert!(anim.fire(a));
        // the old token is spent; only the re-armed one advances
        assert!(!anim.fire(a));
        assert_ne!(anim.pending(), Some(a));
    }

    #[test]
    fn test_slide_snaps_to_dataset_years() {
        let mut anim = Animation::new(vec![2000, 2005, 2010]);
        anim.slide(2007);
        assert_eq!(anim.current_year(), Some(2005));
        anim.slide(1990);
        assert_eq!(anim.current_year(), Some(2000));
        anim.slide(2030);
        assert_eq!(anim.current_year(), Some(2010));
    }

    #[test]
    fn test_series_picker_rebuild() {
        let mut p = SeriesPicker::new(names(&["A", "B", "C", "D"]), 3, 10);
        assert_eq!(p.picks(), names(&["A", "B", "C"]).as_slice());
        assert!(p.pick(1, "D"));
        assert_eq!(p.selection(), names(&["D", "B", "C"]));

        assert!(p.set_count(2));
        assert_eq!(p.picks(), names(&["D", "B"]).as_slice());
        assert!(p.set_count(4));
        assert_eq!(p.picks(), names(&["D", "B", "A", "C"]).as_slice());

        assert!(!p.set_count(0));
        assert!(!p.set_count(11));
        assert!(!p.pick(5, "A"));
        assert!(!p.pick(1, "Atlantis"));
    }

    #[test]
    fn test_repeated_count_does_not_redraw() {
        let mut c = Control::Series(SeriesPicker::new(names(&["A", "B", "C"]), 2, 10));
        assert_eq!(c.selection(), Selection::countries(names(&["A", "B"])));
        assert!(c.handle(&Event::Count(2)).is_none());
        assert_eq!(
            c.handle(&Event::Count(3)),
            Some(Selection::countries(names(&["A", "B", "C"])))
        );
    }

    #[test]
    fn test_count_capped_by_entities() {
        let mut p = SeriesPicker::new(names(&["A", "B"]), 3, 10);
        assert_eq!(p.count(), 2);
        assert!(!p.set_count(3));
        assert_eq!(p.count(), 2);
        assert!(p.set_count(1));
        assert!(!p.set_count(3));
        assert_eq!(p.picks(), names(&["A"]).as_slice());
    }

    #[test]
    fn test_series_selection_is_collective_and_distinct() {
        let mut p = SeriesPicker::new(names(&["A", "B", "C"]), 3, 10);
        p.pick(3, "A");
        assert_eq!(p.selection(), names(&["A", "B"]));
    }

    #[test]
    fn test_control_handle() {
        let mut c = Control::Country(CountryPicker::new(names(&["Kenya", "Pakistan"]), "Pakistan"));
        assert_eq!(c.selection(), Selection::countries(names(&["Pakistan"])));
        assert!(c.handle(&Event::Country("Pakistan".into())).is_none());
        assert!(c.handle(&Event::Year(2015)).is_none());
        assert_eq!(
            c.handle(&Event::Country("Kenya".into())),
            Some(Selection::countries(names(&["Kenya"])))
        );
    }

    #[test]
    fn test_control_tick_and_slide() {
        let mut c = Control::Animation(Animation::new(vec![2000, 2001, 2002]));
        assert!(c.handle(&Event::Tick(1)).is_none(), "not armed yet");
        if let Control::Animation(a) = &mut c {
            a.arm();
        }
        assert_eq!(c.handle(&Event::Tick(1)), Some(Selection::year(2001)));
        assert_eq!(c.handle(&Event::Slide(2000)), Some(Selection::year(2000)));
        assert!(c.handle(&Event::Tick(1)).is_none());
    }

    #[test]
    fn test_year_picker_falls_back_to_first_year() {
        let p = YearPicker::new(vec![2000, 2001], 2015);
        assert_eq!(p.current(), Some(2000));
    }
}
