//! Coupling points: channel bindings, histories and log sinks.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use gc_core::PointId;
use gc_network::{ControlKind, NetworkAccess, ScenarioEvent};
use gc_runtime::{CosimRuntime, PublicationHandle, SubscriptionHandle, ValueType};

use crate::channel::{available_channel, requested_channel};
use crate::error::{CouplingError, CouplingResult};
use crate::history::SampleHistory;
use crate::sink::{PointSink, SampleLine};

/// One allow-listed binding from a gas node to a peer bus number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowEntry {
    pub gas_node: String,
    pub peer_node: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RegistryConfig {
    /// This federate's channel prefix.
    pub domain: String,
    pub peer_domain: String,
    /// Offsets exchanged per point: `0..horizon`.
    pub horizon: usize,
    pub history_capacity: usize,
    pub publication_unit: String,
    pub subscription_unit: String,
    /// Unit written on flow-setpoint directives.
    pub setpoint_unit: String,
    /// Directory for per-point logs; `None` discards them.
    pub log_dir: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            domain: "ng1".to_string(),
            peer_domain: "transmission".to_string(),
            horizon: 1,
            history_capacity: 3,
            publication_unit: "MW".to_string(),
            subscription_unit: "MW".to_string(),
            setpoint_unit: "sm3/s".to_string(),
            log_dir: None,
        }
    }
}

pub struct CouplingPoint {
    id: PointId,
    gas_node: String,
    peer_node: u32,
    publications: Vec<PublicationHandle>,
    subscriptions: Vec<SubscriptionHandle>,
    histories: Vec<SampleHistory>,
    last_available: Vec<f64>,
    last_required: Vec<f64>,
    sink: PointSink,
}

impl CouplingPoint {
    pub fn id(&self) -> PointId {
        self.id
    }

    pub fn gas_node(&self) -> &str {
        &self.gas_node
    }

    pub fn peer_node(&self) -> u32 {
        self.peer_node
    }

    pub fn horizon(&self) -> usize {
        self.publications.len()
    }

    fn check(&self, offset: usize) -> CouplingResult<()> {
        if offset < self.horizon() {
            Ok(())
        } else {
            Err(CouplingError::Offset {
                offset,
                horizon: self.horizon(),
            })
        }
    }

    pub fn publication(&self, offset: usize) -> CouplingResult<PublicationHandle> {
        self.check(offset)?;
        Ok(self.publications[offset])
    }

    pub fn subscription(&self, offset: usize) -> CouplingResult<SubscriptionHandle> {
        self.check(offset)?;
        Ok(self.subscriptions[offset])
    }

    pub fn history(&self, offset: usize) -> CouplingResult<&[f64]> {
        self.check(offset)?;
        Ok(self.histories[offset].as_slice())
    }

    /// Last value published at `offset` (negative before the first publish).
    pub fn last_available(&self, offset: usize) -> CouplingResult<f64> {
        self.check(offset)?;
        Ok(self.last_available[offset])
    }

    pub fn set_last_available(&mut self, offset: usize, value: f64) -> CouplingResult<()> {
        self.check(offset)?;
        self.last_available[offset] = value;
        Ok(())
    }

    /// Last required value read at `offset` (negative until the peer publishes).
    pub fn last_required(&self, offset: usize) -> CouplingResult<f64> {
        self.check(offset)?;
        Ok(self.last_required[offset])
    }

    pub fn set_last_required(&mut self, offset: usize, value: f64) -> CouplingResult<()> {
        self.check(offset)?;
        self.last_required[offset] = value;
        Ok(())
    }

    pub fn sink(&self) -> &PointSink {
        &self.sink
    }

    fn clear_histories(&mut self) {
        for h in &mut self.histories {
            h.clear();
        }
    }
}

pub struct CouplingRegistry {
    points: Vec<CouplingPoint>,
    horizon: usize,
    setpoint_unit: String,
}

impl CouplingRegistry {
    /// Bind every allow-listed network node to a pair of channels per offset.
    ///
    /// Nodes missing from `allow` are skipped silently. Every node that is
    /// kept gets a flow-setpoint directive at each scenario timestamp.
    pub fn build<R: CosimRuntime + ?Sized>(
        config: &RegistryConfig,
        allow: &[AllowEntry],
        runtime: &mut R,
        network: &mut dyn NetworkAccess,
    ) -> CouplingResult<Self> {
        if config.horizon == 0 {
            return Err(CouplingError::InvalidArg {
                what: "horizon must be at least 1",
            });
        }
        if let Some(dir) = &config.log_dir {
            std::fs::create_dir_all(dir)?;
        }

        let candidates = network.demand_nodes();
        for entry in allow {
            if !candidates.iter().any(|c| *c == entry.gas_node) {
                warn!(node = %entry.gas_node, "allow-listed node not present in network");
            }
        }

        let mut points = Vec::new();
        for node in candidates {
            let Some(entry) = allow.iter().find(|e| e.gas_node == node) else {
                debug!(node = %node, "node not allow-listed, skipped");
                continue;
            };

            let mut publications = Vec::with_capacity(config.horizon);
            let mut subscriptions = Vec::with_capacity(config.horizon);
            for offset in 0..config.horizon {
                let out = available_channel(&config.domain, entry.peer_node, offset);
                let inc = requested_channel(&config.peer_domain, entry.peer_node, offset);
                publications.push(runtime.register_publication(
                    &out,
                    ValueType::Double,
                    &config.publication_unit,
                )?);
                subscriptions.push(runtime.register_subscription(&inc, &config.subscription_unit)?);
            }

            let timestamps: Vec<_> = network.clock().timestamps().map(|(_, t)| t).collect();
            let events = network.events_mut();
            let mut inserted = 0;
            for ts in timestamps {
                if events.find(&node, ControlKind::Qset, ts).is_none() {
                    events.insert(ScenarioEvent::placeholder(
                        &node,
                        ControlKind::Qset,
                        ts,
                        &config.setpoint_unit,
                    ));
                    inserted += 1;
                }
            }

            let sink = match &config.log_dir {
                Some(dir) => PointSink::create(&dir.join(format!("point_{node}.tsv")))?,
                None => PointSink::discard(),
            };

            debug!(node = %node, peer_node = entry.peer_node, placeholders = inserted, "coupling point bound");
            points.push(CouplingPoint {
                id: PointId::from_index(points.len() as u32),
                gas_node: node,
                peer_node: entry.peer_node,
                publications,
                subscriptions,
                histories: vec![SampleHistory::new(config.history_capacity); config.horizon],
                last_available: vec![-1.0; config.horizon],
                last_required: vec![-1.0; config.horizon],
                sink,
            });
        }

        info!(points = points.len(), horizon = config.horizon, "coupling registry built");
        Ok(Self {
            points,
            horizon: config.horizon,
            setpoint_unit: config.setpoint_unit.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn setpoint_unit(&self) -> &str {
        &self.setpoint_unit
    }

    pub fn points(&self) -> &[CouplingPoint] {
        &self.points
    }

    pub fn point(&self, index: usize) -> CouplingResult<&CouplingPoint> {
        self.points
            .get(index)
            .ok_or(CouplingError::UnknownPoint { index })
    }

    pub fn point_mut(&mut self, index: usize) -> CouplingResult<&mut CouplingPoint> {
        self.points
            .get_mut(index)
            .ok_or(CouplingError::UnknownPoint { index })
    }

    /// Log one sample and append `required` to the offset's history.
    pub fn record_sample(
        &mut self,
        index: usize,
        offset: usize,
        line: &SampleLine,
        required: f64,
    ) -> CouplingResult<()> {
        let point = self.point_mut(index)?;
        point.check(offset)?;
        point.sink.write_sample(line)?;
        point.histories[offset].push(required);
        Ok(())
    }

    pub fn clear_histories(&mut self) {
        for p in &mut self.points {
            p.clear_histories();
        }
    }

    pub fn flush_all(&mut self) -> CouplingResult<()> {
        for p in &mut self.points {
            p.sink.flush()?;
        }
        Ok(())
    }
}
