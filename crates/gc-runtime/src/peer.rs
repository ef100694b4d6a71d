//! Scripted peer federates for the loopback runtime.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The other side of a loopback federation.
///
/// `respond` is called once per barrier with this federate's latest
/// published values keyed by channel name, and returns the values the peer
/// publishes back, also keyed by channel name.
pub trait PeerFederate {
    fn name(&self) -> &str;

    fn respond(&mut self, time: f64, inbound: &BTreeMap<String, f64>) -> BTreeMap<String, f64>;
}

/// Active power schedule of one peer bus, one entry per time period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDemand {
    pub node: u32,
    pub schedule_mw: Vec<f64>,
}

impl NodeDemand {
    /// Demand at `time`; the schedule holds its last value past its end.
    pub fn demand_at(&self, time: f64, period: f64) -> f64 {
        if self.schedule_mw.is_empty() {
            return 0.0;
        }
        let idx = if period > 0.0 {
            (time / period).round().max(0.0) as usize
        } else {
            0
        };
        self.schedule_mw[idx.min(self.schedule_mw.len() - 1)]
    }
}

/// Electric-side stand-in: requests scheduled active power at each bus.
///
/// With `curtail_on_saturation`, a bus whose available power stopped moving
/// below its demand lowers its request to what is available.
pub struct TransmissionPeer {
    name: String,
    gas_domain: String,
    period: f64,
    horizon: usize,
    nodes: Vec<NodeDemand>,
    curtail_on_saturation: bool,
    tolerance: f64,
    seen: BTreeMap<String, Vec<f64>>,
    seen_time: Option<f64>,
}

impl TransmissionPeer {
    pub fn new(
        name: impl Into<String>,
        gas_domain: impl Into<String>,
        period: f64,
        nodes: Vec<NodeDemand>,
    ) -> Self {
        Self {
            name: name.into(),
            gas_domain: gas_domain.into(),
            period,
            horizon: 1,
            nodes,
            curtail_on_saturation: false,
            tolerance: 1e-3,
            seen: BTreeMap::new(),
            seen_time: None,
        }
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon.max(1);
        self
    }

    pub fn with_curtailment(mut self, tolerance: f64) -> Self {
        self.curtail_on_saturation = true;
        self.tolerance = tolerance;
        self
    }

    fn suffix(offset: usize) -> String {
        if offset == 0 {
            String::new()
        } else {
            format!(".{offset}")
        }
    }

    fn request_for(&self, avail_key: &str, demand: f64) -> f64 {
        if !self.curtail_on_saturation {
            return demand;
        }
        match self.seen.get(avail_key).map(Vec::as_slice) {
            Some([.., prev, last]) if (last - prev).abs() <= self.tolerance && *last < demand => {
                last.max(0.0)
            }
            _ => demand,
        }
    }
}

impl PeerFederate for TransmissionPeer {
    fn name(&self) -> &str {
        &self.name
    }

    fn respond(&mut self, time: f64, inbound: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
        if self.seen_time != Some(time) {
            self.seen.clear();
            self.seen_time = Some(time);
        }

        let mut out = BTreeMap::new();
        for node in &self.nodes {
            for offset in 0..self.horizon {
                let sfx = Self::suffix(offset);
                let avail_key = format!("{}/node.{}.avail{}", self.gas_domain, node.node, sfx);
                if let Some(v) = inbound.get(&avail_key) {
                    self.seen.entry(avail_key.clone()).or_default().push(*v);
                }
                let demand = node.demand_at(time + offset as f64 * self.period, self.period);
                let required = self.request_for(&avail_key, demand);
                out.insert(
                    format!("{}/node.{}.requested{}", self.name, node.node, sfx),
                    required,
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(curtail: bool) -> TransmissionPeer {
        let p = TransmissionPeer::new(
            "transmission",
            "ng1",
            1.0,
            vec![NodeDemand {
                node: 6,
                schedule_mw: vec![10.0, 20.0, 30.0],
            }],
        );
        if curtail { p.with_curtailment(1e-3) } else { p }
    }

    #[test]
    fn schedule_holds_last_value() {
        let d = NodeDemand {
            node: 1,
            schedule_mw: vec![1.0, 2.0],
        };
        assert_eq!(d.demand_at(0.0, 1.0), 1.0);
        assert_eq!(d.demand_at(1.0, 1.0), 2.0);
        assert_eq!(d.demand_at(7.0, 1.0), 2.0);
    }

    #[test]
    fn requests_scheduled_demand() {
        let mut p = peer(false);
        let out = p.respond(1.0, &BTreeMap::new());
        assert_eq!(out.get("transmission/node.6.requested"), Some(&20.0));
    }

    #[test]
    fn curtails_once_available_saturates() {
        let mut p = peer(true);
        let mut inbound = BTreeMap::new();
        inbound.insert("ng1/node.6.avail".to_string(), 12.0);
        assert_eq!(p.respond(2.0, &inbound)["transmission/node.6.requested"], 30.0);
        assert_eq!(p.respond(2.0, &inbound)["transmission/node.6.requested"], 12.0);
        // new time resets what was seen
        assert_eq!(p.respond(3.0, &inbound)["transmission/node.6.requested"], 30.0);
    }

    #[test]
    fn horizon_offsets_get_their_own_channels() {
        let mut p = peer(false).with_horizon(2);
        let out = p.respond(0.0, &BTreeMap::new());
        assert_eq!(out["transmission/node.6.requested"], 10.0);
        assert_eq!(out["transmission/node.6.requested.1"], 20.0);
    }
}
