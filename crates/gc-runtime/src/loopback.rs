//! In-process runtime: a two-member federation with a scripted peer.
//!
//! Every time request is a barrier: the peer sees this federate's latest
//! publications and answers with its own, which land on the matching
//! subscriptions. Granted time never decreases.

use std::collections::BTreeMap;

use crate::error::{RuntimeError, RuntimeResult};
use crate::peer::PeerFederate;
use crate::runtime::{
    CosimRuntime, Grant, IterationRequest, IterationResult, PublicationHandle,
    SubscriptionHandle, ValueType,
};

/// Loopback federation settings.
#[derive(Clone, Debug, PartialEq)]
pub struct LoopbackConfig {
    pub name: String,
    pub time_period: f64,
    pub max_iterations: u32,
    /// Subscription value before the peer has published anything.
    pub default_value: f64,
    /// Values closer than this count as unchanged for `IterateIfNeeded`.
    pub change_tolerance: f64,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            name: "gas".to_string(),
            time_period: 1.0,
            max_iterations: 20,
            default_value: -1.0,
            change_tolerance: 1e-9,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Startup,
    Initializing,
    Executing,
    Finalized,
}

impl Mode {
    fn as_str(self) -> &'static str {
        match self {
            Mode::Startup => "startup",
            Mode::Initializing => "initializing",
            Mode::Executing => "executing",
            Mode::Finalized => "finalized",
        }
    }
}

#[derive(Debug)]
struct Channel {
    name: String,
    unit: String,
    value: Option<f64>,
}

pub struct LoopbackRuntime {
    config: LoopbackConfig,
    mode: Mode,
    peer: Box<dyn PeerFederate>,
    publications: Vec<Channel>,
    subscriptions: Vec<Channel>,
    granted: f64,
    iteration: u32,
    last_inbound: BTreeMap<String, f64>,
    last_outbound: BTreeMap<String, f64>,
    grants: Vec<Grant>,
}

impl LoopbackRuntime {
    pub fn new(config: LoopbackConfig, peer: Box<dyn PeerFederate>) -> RuntimeResult<Self> {
        if !(config.time_period > 0.0) {
            return Err(RuntimeError::InvalidArg {
                what: "time period must be positive",
            });
        }
        tracing::info!(federate = %config.name, peer = peer.name(), "loopback federation created");
        Ok(Self {
            config,
            mode: Mode::Startup,
            peer,
            publications: Vec::new(),
            subscriptions: Vec::new(),
            granted: 0.0,
            iteration: 0,
            last_inbound: BTreeMap::new(),
            last_outbound: BTreeMap::new(),
            grants: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn granted_time(&self) -> f64 {
        self.granted
    }

    /// Iterations granted so far at the current time.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Every grant handed out, in order.
    pub fn grants(&self) -> &[Grant] {
        &self.grants
    }

    pub fn is_finalized(&self) -> bool {
        self.mode == Mode::Finalized
    }

    pub fn published_value(&self, name: &str) -> Option<f64> {
        self.publications
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.value)
    }

    pub fn publication_unit(&self, name: &str) -> Option<&str> {
        self.publications
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.unit.as_str())
    }

    pub fn subscription_names(&self) -> impl Iterator<Item = &str> {
        self.subscriptions.iter().map(|c| c.name.as_str())
    }

    fn require(&self, allowed: &[Mode], what: &'static str) -> RuntimeResult<()> {
        if allowed.contains(&self.mode) {
            Ok(())
        } else {
            Err(RuntimeError::InvalidMode {
                mode: self.mode.as_str(),
                what,
            })
        }
    }

    fn differs(&self, a: &BTreeMap<String, f64>, b: &BTreeMap<String, f64>) -> bool {
        a.len() != b.len()
            || a.iter().any(|(k, v)| match b.get(k) {
                Some(w) => (v - w).abs() > self.config.change_tolerance,
                None => true,
            })
    }

    /// Exchange values with the peer; returns whether anything moved.
    fn barrier(&mut self, time: f64) -> bool {
        let inbound: BTreeMap<String, f64> = self
            .publications
            .iter()
            .filter_map(|c| c.value.map(|v| (c.name.clone(), v)))
            .collect();
        let outbound = self.peer.respond(time, &inbound);

        for sub in &mut self.subscriptions {
            if let Some(v) = outbound.get(&sub.name) {
                sub.value = Some(*v);
            }
        }

        let changed =
            self.differs(&inbound, &self.last_inbound) || self.differs(&outbound, &self.last_outbound);
        self.last_inbound = inbound;
        self.last_outbound = outbound;
        changed
    }

    fn grant(&mut self, time: f64, status: IterationResult) -> Grant {
        if status == IterationResult::NextStep {
            self.granted = self.granted.max(time);
            self.iteration = 0;
        } else {
            self.iteration += 1;
        }
        let grant = Grant {
            time: self.granted,
            status,
        };
        tracing::debug!(time = grant.time, ?status, iteration = self.iteration, "loopback grant");
        self.grants.push(grant);
        grant
    }

    fn may_iterate(&self) -> bool {
        self.iteration < self.config.max_iterations
    }
}

impl CosimRuntime for LoopbackRuntime {
    fn set_time_period(&mut self, period: f64) -> RuntimeResult<()> {
        self.require(&[Mode::Startup, Mode::Initializing], "set time period")?;
        if !(period > 0.0) {
            return Err(RuntimeError::InvalidArg {
                what: "time period must be positive",
            });
        }
        self.config.time_period = period;
        Ok(())
    }

    fn time_period(&self) -> RuntimeResult<f64> {
        Ok(self.config.time_period)
    }

    fn set_max_iterations(&mut self, max_iterations: u32) -> RuntimeResult<()> {
        self.require(&[Mode::Startup, Mode::Initializing], "set max iterations")?;
        self.config.max_iterations = max_iterations;
        Ok(())
    }

    fn max_iterations(&self) -> RuntimeResult<u32> {
        Ok(self.config.max_iterations)
    }

    fn enter_initializing_mode(&mut self) -> RuntimeResult<()> {
        self.require(&[Mode::Startup], "enter initializing mode")?;
        self.mode = Mode::Initializing;
        Ok(())
    }

    fn enter_executing_mode(&mut self) -> RuntimeResult<()> {
        self.require(&[Mode::Startup, Mode::Initializing], "enter executing mode")?;
        self.barrier(0.0);
        self.iteration = 0;
        self.mode = Mode::Executing;
        Ok(())
    }

    fn enter_executing_mode_iterative(
        &mut self,
        request: IterationRequest,
    ) -> RuntimeResult<IterationResult> {
        self.require(&[Mode::Startup, Mode::Initializing], "enter executing mode")?;
        let changed = self.barrier(0.0);
        let iterate = match request {
            IterationRequest::NoIteration => false,
            IterationRequest::ForceIteration => self.may_iterate(),
            IterationRequest::IterateIfNeeded => changed && self.may_iterate(),
        };
        if iterate {
            self.iteration += 1;
            return Ok(IterationResult::Iterating);
        }
        self.iteration = 0;
        self.mode = Mode::Executing;
        Ok(IterationResult::NextStep)
    }

    fn request_time(&mut self, time: f64) -> RuntimeResult<f64> {
        Ok(self
            .request_time_iterative(time, IterationRequest::NoIteration)?
            .time)
    }

    fn request_time_iterative(
        &mut self,
        time: f64,
        request: IterationRequest,
    ) -> RuntimeResult<Grant> {
        self.require(&[Mode::Executing], "request time")?;
        if !time.is_finite() {
            return Err(RuntimeError::InvalidArg {
                what: "requested time must be finite",
            });
        }
        let changed = self.barrier(time);
        let iterate = match request {
            IterationRequest::NoIteration => false,
            IterationRequest::ForceIteration => self.may_iterate(),
            IterationRequest::IterateIfNeeded => changed && self.may_iterate(),
        };
        let status = if iterate {
            IterationResult::Iterating
        } else {
            IterationResult::NextStep
        };
        Ok(self.grant(time, status))
    }

    fn register_publication(
        &mut self,
        name: &str,
        value_type: ValueType,
        unit: &str,
    ) -> RuntimeResult<PublicationHandle> {
        self.require(&[Mode::Startup, Mode::Initializing], "register publication")?;
        if self.publications.iter().any(|c| c.name == name) {
            return Err(RuntimeError::DuplicateChannel {
                name: name.to_string(),
            });
        }
        tracing::debug!(channel = name, %value_type, unit, "registered publication");
        self.publications.push(Channel {
            name: name.to_string(),
            unit: unit.to_string(),
            value: None,
        });
        Ok(PublicationHandle(self.publications.len() - 1))
    }

    fn register_subscription(
        &mut self,
        name: &str,
        unit: &str,
    ) -> RuntimeResult<SubscriptionHandle> {
        self.require(&[Mode::Startup, Mode::Initializing], "register subscription")?;
        if self.subscriptions.iter().any(|c| c.name == name) {
            return Err(RuntimeError::DuplicateChannel {
                name: name.to_string(),
            });
        }
        tracing::debug!(channel = name, unit, "registered subscription");
        self.subscriptions.push(Channel {
            name: name.to_string(),
            unit: unit.to_string(),
            value: None,
        });
        Ok(SubscriptionHandle(self.subscriptions.len() - 1))
    }

    fn publish_double(&mut self, handle: PublicationHandle, value: f64) -> RuntimeResult<()> {
        self.require(
            &[Mode::Startup, Mode::Initializing, Mode::Executing],
            "publish",
        )?;
        let channel = self
            .publications
            .get_mut(handle.0)
            .ok_or(RuntimeError::UnknownHandle { index: handle.0 })?;
        channel.value = Some(value);
        Ok(())
    }

    fn read_double(&mut self, handle: SubscriptionHandle) -> RuntimeResult<f64> {
        self.require(
            &[Mode::Startup, Mode::Initializing, Mode::Executing],
            "read",
        )?;
        let channel = self
            .subscriptions
            .get(handle.0)
            .ok_or(RuntimeError::UnknownHandle { index: handle.0 })?;
        Ok(channel.value.unwrap_or(self.config.default_value))
    }

    fn finalize(&mut self) -> RuntimeResult<()> {
        self.require(
            &[Mode::Startup, Mode::Initializing, Mode::Executing],
            "finalize",
        )?;
        self.mode = Mode::Finalized;
        tracing::info!(federate = %self.config.name, granted = self.granted, "federate finalized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Echoes every inbound value, scaled, onto a fixed channel.
    struct Echo;

    impl PeerFederate for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn respond(&mut self, _time: f64, inbound: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
            let total: f64 = inbound.values().sum();
            BTreeMap::from([("echo/out".to_string(), 2.0 * total)])
        }
    }

    fn runtime(max_iterations: u32) -> LoopbackRuntime {
        let cfg = LoopbackConfig {
            max_iterations,
            ..LoopbackConfig::default()
        };
        LoopbackRuntime::new(cfg, Box::new(Echo)).unwrap()
    }

    #[test]
    fn subscription_defaults_to_placeholder() {
        let mut rt = runtime(5);
        let sub = rt.register_subscription("echo/out", "MW").unwrap();
        assert_eq!(rt.read_double(sub).unwrap(), -1.0);
    }

    #[test]
    fn exchange_happens_at_barrier() {
        let mut rt = runtime(5);
        let pub_h = rt.register_publication("gas/x", ValueType::Double, "MW").unwrap();
        let sub = rt.register_subscription("echo/out", "MW").unwrap();
        rt.enter_initializing_mode().unwrap();
        rt.publish_double(pub_h, 4.0).unwrap();
        rt.enter_executing_mode().unwrap();
        assert_eq!(rt.read_double(sub).unwrap(), 8.0);
    }

    #[test]
    fn forced_iteration_stops_at_max() {
        let mut rt = runtime(2);
        rt.enter_executing_mode().unwrap();
        let statuses: Vec<_> = (0..3)
            .map(|_| {
                rt.request_time_iterative(1.0, IterationRequest::ForceIteration)
                    .unwrap()
                    .status
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                IterationResult::Iterating,
                IterationResult::Iterating,
                IterationResult::NextStep
            ]
        );
        assert_eq!(rt.granted_time(), 1.0);
    }

    #[test]
    fn iterate_if_needed_settles_when_values_stop_moving() {
        let mut rt = runtime(10);
        let pub_h = rt.register_publication("gas/x", ValueType::Double, "MW").unwrap();
        rt.enter_initializing_mode().unwrap();
        rt.publish_double(pub_h, 1.0).unwrap();
        assert_eq!(
            rt.enter_executing_mode_iterative(IterationRequest::IterateIfNeeded)
                .unwrap(),
            IterationResult::Iterating
        );
        assert_eq!(
            rt.enter_executing_mode_iterative(IterationRequest::IterateIfNeeded)
                .unwrap(),
            IterationResult::NextStep
        );
    }

    #[test]
    fn granted_time_never_decreases() {
        let mut rt = runtime(1);
        rt.enter_executing_mode().unwrap();
        assert_eq!(rt.request_time(3.0).unwrap(), 3.0);
        assert_eq!(rt.request_time(2.0).unwrap(), 3.0);
    }

    #[test]
    fn registration_after_start_is_rejected() {
        let mut rt = runtime(1);
        rt.enter_executing_mode().unwrap();
        assert!(matches!(
            rt.register_subscription("late", "MW"),
            Err(RuntimeError::InvalidMode { .. })
        ));
    }

    #[test]
    fn finalized_runtime_refuses_requests() {
        let mut rt = runtime(1);
        rt.enter_executing_mode().unwrap();
        rt.finalize().unwrap();
        assert!(rt.is_finalized());
        assert!(rt.request_time(1.0).is_err());
    }
}
