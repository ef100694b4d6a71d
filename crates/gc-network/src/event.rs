//! Scenario directives keyed by (node, control kind, timestamp).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Control a directive applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlKind {
    /// Off-take flow setpoint.
    Qset,
    /// Pressure setpoint.
    Pset,
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlKind::Qset => write!(f, "QSET"),
            ControlKind::Pset => write!(f, "PSET"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEvent {
    pub node: String,
    pub kind: ControlKind,
    pub start_time: NaiveDateTime,
    pub value: f64,
    pub unit: String,
    pub active: bool,
    /// Set by the solver once applied; cleared to force re-application.
    pub processed: bool,
    pub info: String,
}

impl ScenarioEvent {
    /// Inactive zero-valued directive reserved for later in-place updates.
    pub fn placeholder(node: &str, kind: ControlKind, start_time: NaiveDateTime, unit: &str) -> Self {
        Self {
            node: node.to_string(),
            kind,
            start_time,
            value: 0.0,
            unit: unit.to_string(),
            active: false,
            processed: false,
            info: String::new(),
        }
    }

    fn matches(&self, node: &str, kind: ControlKind, time: NaiveDateTime) -> bool {
        self.node == node && self.kind == kind && self.start_time == time
    }
}

/// Mutable directive list owned by the network.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEventList {
    events: Vec<ScenarioEvent>,
}

impl ScenarioEventList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScenarioEvent> {
        self.events.iter()
    }

    pub fn find(&self, node: &str, kind: ControlKind, time: NaiveDateTime) -> Option<&ScenarioEvent> {
        self.events.iter().find(|e| e.matches(node, kind, time))
    }

    pub fn find_mut(
        &mut self,
        node: &str,
        kind: ControlKind,
        time: NaiveDateTime,
    ) -> Option<&mut ScenarioEvent> {
        self.events.iter_mut().find(|e| e.matches(node, kind, time))
    }

    /// Insert, replacing any directive with the same key.
    pub fn insert(&mut self, event: ScenarioEvent) {
        match self.find_mut(&event.node, event.kind, event.start_time) {
            Some(existing) => *existing = event,
            None => self.events.push(event),
        }
    }

    /// Value of the active directive at exactly `time`, if any.
    pub fn active_value(&self, node: &str, kind: ControlKind, time: NaiveDateTime) -> Option<f64> {
        self.find(node, kind, time)
            .filter(|e| e.active)
            .map(|e| e.value)
    }

    pub fn mark_processed(&mut self, time: NaiveDateTime) {
        for e in self.events.iter_mut().filter(|e| e.active && e.start_time == time) {
            e.processed = true;
        }
    }
}

impl FromIterator<ScenarioEvent> for ScenarioEventList {
    fn from_iter<I: IntoIterator<Item = ScenarioEvent>>(iter: I) -> Self {
        let mut list = Self::new();
        for e in iter {
            list.insert(e);
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn t(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn insert_replaces_same_key() {
        let mut list = ScenarioEventList::new();
        list.insert(ScenarioEvent::placeholder("N15", ControlKind::Qset, t(0), "sm3/s"));
        let mut e = ScenarioEvent::placeholder("N15", ControlKind::Qset, t(0), "sm3/s");
        e.value = 12.0;
        e.active = true;
        list.insert(e);
        assert_eq!(list.len(), 1);
        assert_eq!(list.active_value("N15", ControlKind::Qset, t(0)), Some(12.0));
    }

    #[test]
    fn inactive_directive_has_no_value() {
        let list: ScenarioEventList =
            [ScenarioEvent::placeholder("N15", ControlKind::Qset, t(1), "sm3/s")]
                .into_iter()
                .collect();
        assert_eq!(list.active_value("N15", ControlKind::Qset, t(1)), None);
        assert!(list.find("N15", ControlKind::Pset, t(1)).is_none());
    }

    #[test]
    fn mark_processed_touches_only_active_at_time() {
        let mut a = ScenarioEvent::placeholder("N15", ControlKind::Qset, t(1), "sm3/s");
        a.active = true;
        let b = ScenarioEvent::placeholder("N21", ControlKind::Qset, t(1), "sm3/s");
        let mut list: ScenarioEventList = [a, b].into_iter().collect();
        list.mark_processed(t(1));
        assert!(list.find("N15", ControlKind::Qset, t(1)).unwrap().processed);
        assert!(!list.find("N21", ControlKind::Qset, t(1)).unwrap().processed);
    }
}
