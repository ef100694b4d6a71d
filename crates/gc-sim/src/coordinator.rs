//! The time-step coordinator state machine.

use tracing::{debug, info, warn};

use gc_core::{in_bar, in_m3ps, mj_per_m3};
use gc_coupling::{ConvergencePolicy, CouplingRegistry, SampleLine};
use gc_network::{
    ControlKind, NetworkAccess, NetworkResult, ScenarioEvent, SolverEvent, SolverState,
    StepObserver,
};
use gc_runtime::{CosimRuntime, Grant, IterationRequest, IterationResult};
use gc_solver::{FlowLimits, HeatRateCurve, InverterConfig, PowerFuelInverter};

use crate::divergence::{DivergenceLog, DivergenceSummary};
use crate::error::{SimError, SimResult};

#[derive(Clone, Debug, PartialEq)]
pub struct CoordinatorConfig {
    pub max_iterations: u32,
    /// Runtime time units per scenario step.
    pub time_period: f64,
    pub policy: ConvergencePolicy,
    pub curve: HeatRateCurve,
    pub inverter: InverterConfig,
    /// Bounds applied to the off-take flow before inversion.
    pub flow_limits: Option<FlowLimits>,
    /// Scales thermal power into the first inversion guess.
    pub initial_efficiency: f64,
    /// Tag written on the flow-setpoint directives this coordinator owns.
    pub directive_info: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            time_period: 1.0,
            policy: ConvergencePolicy::default(),
            curve: HeatRateCurve::default(),
            inverter: InverterConfig::default(),
            flow_limits: None,
            initial_efficiency: 0.3,
            directive_info: "cosim".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Initializing,
    Stepping,
    Finalizing,
    Finished,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Initializing => "initializing",
            Phase::Stepping => "stepping",
            Phase::Finalizing => "finalizing",
            Phase::Finished => "finished",
        }
    }
}

pub struct TimeStepCoordinator<R: CosimRuntime> {
    config: CoordinatorConfig,
    runtime: R,
    registry: CouplingRegistry,
    inverter: PowerFuelInverter,
    log: DivergenceLog,
    phase: Phase,
    iteration: u32,
    violation: bool,
    last_granted: Option<f64>,
}

impl<R: CosimRuntime> TimeStepCoordinator<R> {
    pub fn new(config: CoordinatorConfig, mut runtime: R, registry: CouplingRegistry) -> SimResult<Self> {
        if config.max_iterations == 0 {
            return Err(SimError::InvalidArg {
                what: "max_iterations must be at least 1",
            });
        }
        if !(config.time_period > 0.0) {
            return Err(SimError::InvalidArg {
                what: "time period must be positive",
            });
        }
        if !(config.initial_efficiency > 0.0) {
            return Err(SimError::InvalidArg {
                what: "initial efficiency must be positive",
            });
        }
        let inverter = PowerFuelInverter::new(config.curve, config.inverter)?;

        runtime.set_time_period(config.time_period)?;
        runtime.set_max_iterations(config.max_iterations)?;
        debug!(
            period = runtime.time_period()?,
            max_iterations = runtime.max_iterations()?,
            "runtime timing configured"
        );

        Ok(Self {
            config,
            runtime,
            registry,
            inverter,
            log: DivergenceLog::new(),
            phase: Phase::Idle,
            iteration: 0,
            violation: true,
            last_granted: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn violation(&self) -> bool {
        self.violation
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn log(&self) -> &DivergenceLog {
        &self.log
    }

    pub fn registry(&self) -> &CouplingRegistry {
        &self.registry
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    pub fn into_parts(self) -> (R, CouplingRegistry, DivergenceLog) {
        (self.runtime, self.registry, self.log)
    }

    fn require(&self, phase: Phase, what: &'static str) -> SimResult<()> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(SimError::InvalidPhase {
                phase: self.phase.as_str(),
                what,
            })
        }
    }

    /// Publish initial values and run the entry handshake.
    pub fn initialize(&mut self, network: &mut dyn NetworkAccess) -> SimResult<()> {
        self.require(Phase::Idle, "initialize")?;
        self.phase = Phase::Initializing;
        info!(points = self.registry.len(), "entering initializing mode");

        self.runtime.enter_initializing_mode()?;
        self.publish_all(network, 0)?;

        let mut rounds = 0;
        loop {
            if rounds >= self.config.max_iterations {
                warn!(rounds, "entry handshake did not settle, entering executing mode directly");
                self.runtime.enter_executing_mode()?;
                break;
            }
            match self
                .runtime
                .enter_executing_mode_iterative(IterationRequest::IterateIfNeeded)?
            {
                IterationResult::NextStep => break,
                IterationResult::Iterating => {
                    rounds += 1;
                    self.iteration = rounds;
                    self.sample_all(network, 0, false)?;
                    self.publish_all(network, 0)?;
                }
                IterationResult::Halted => return Err(SimError::Halted { step: 0 }),
            }
        }

        self.iteration = 0;
        self.phase = Phase::Stepping;
        info!(handshake_rounds = rounds, "entering executing mode");
        Ok(())
    }

    pub fn before_step(
        &mut self,
        event: &mut SolverEvent,
        network: &mut dyn NetworkAccess,
    ) -> SimResult<()> {
        self.require(Phase::Stepping, "before step")?;
        if event.state() != SolverState::BeforeStep {
            return Err(SimError::InvalidArg {
                what: "expected a before-step event",
            });
        }
        let step = event.step();
        self.iteration = 0;
        self.violation = true;
        self.registry.clear_histories();
        self.log.begin_step(step, network.clock().timestamp(step)?);
        debug!(step, "step started");
        Ok(())
    }

    pub fn after_step(
        &mut self,
        event: &mut SolverEvent,
        network: &mut dyn NetworkAccess,
    ) -> SimResult<()> {
        self.require(Phase::Stepping, "after step")?;
        if event.state() != SolverState::AfterStep {
            return Err(SimError::InvalidArg {
                what: "expected an after-step event",
            });
        }
        let step = event.step();

        if step == 0 {
            event.set_repeat(false);
            self.log.close_step(step);
            return Ok(());
        }

        let max = self.config.max_iterations;
        let grant = if !self.violation {
            self.publish_all(network, step)?;
            self.request(step, IterationRequest::NoIteration)?
        } else if self.iteration < max {
            self.publish_all(network, step)?;
            event.set_repeat(true);
            self.request(step, IterationRequest::ForceIteration)?
        } else {
            if self.log.record_divergence(step, max) {
                warn!(
                    step,
                    iterations = max,
                    "step did not converge within the iteration limit, advancing"
                );
            }
            self.request(step, IterationRequest::NoIteration)?
        };

        match grant.status {
            IterationResult::NextStep => {
                self.violation = self.sample_all(network, step, true)?;
                event.set_repeat(false);
                self.log.close_step(step);
                debug!(step, iterations = self.iteration, time = grant.time, "step advanced");
            }
            IterationResult::Iterating => {
                self.violation = self.sample_all(network, step, true)?;
                event.set_repeat(true);
                self.iteration += 1;
                self.log.increment(step);
                debug!(step, iteration = self.iteration, violation = self.violation, "step repeated");
            }
            IterationResult::Halted => return Err(SimError::Halted { step }),
        }
        Ok(())
    }

    /// Termination barrier, sink flush and runtime shutdown.
    pub fn finalize(&mut self, network: &dyn NetworkAccess) -> SimResult<DivergenceSummary> {
        self.require(Phase::Stepping, "finalize")?;
        self.phase = Phase::Finalizing;

        let final_step = network.clock().last_step();
        let time = (final_step + 1) as f64 * self.config.time_period;
        let granted = self.runtime.request_time(time)?;
        self.check_granted(granted)?;
        info!(requested = time, granted, "termination barrier passed");

        self.registry.flush_all()?;
        self.runtime.finalize()?;

        let summary = self.log.summary();
        if summary.total > 0 {
            let steps: Vec<usize> = summary.steps.iter().map(|d| d.step).collect();
            warn!(divergent_steps = summary.total, ?steps, "run finished with divergent steps");
        } else {
            info!("run finished, every step converged");
        }
        self.phase = Phase::Finished;
        Ok(summary)
    }

    fn check_granted(&mut self, granted: f64) -> SimResult<()> {
        if let Some(prev) = self.last_granted
            && granted < prev
        {
            return Err(SimError::Invariant {
                what: "granted time decreased",
            });
        }
        self.last_granted = Some(granted);
        Ok(())
    }

    fn request(&mut self, step: usize, request: IterationRequest) -> SimResult<Grant> {
        let time = step as f64 * self.config.time_period;
        let grant = self.runtime.request_time_iterative(time, request)?;
        self.check_granted(grant.time)?;
        Ok(grant)
    }

    fn initial_guess(&self, last_required: f64, thermal: f64) -> f64 {
        if last_required > 0.0 {
            last_required
        } else {
            thermal * self.config.initial_efficiency
        }
    }

    /// Invert the current off-take of every point and offset and publish it.
    fn publish_all(&mut self, network: &dyn NetworkAccess, step: usize) -> SimResult<()> {
        let last_step = network.clock().last_step();
        for i in 0..self.registry.len() {
            for k in 0..self.registry.horizon() {
                let target = step + k;
                if target > last_step {
                    continue;
                }
                let point = self.registry.point(i)?;
                let node = point.gas_node().to_string();
                let handle = point.publication(k)?;
                let last_required = point.last_required(k)?;

                let flow = if k == 0 {
                    in_m3ps(network.flow(&node, step)?)
                } else {
                    in_m3ps(network.flow_setpoint(&node, target)?)
                };
                let gcv = mj_per_m3(network.calorific_value(&node, target)?);

                let (thermal, inversion) = match &self.config.flow_limits {
                    Some(limits) => {
                        let guess = self.initial_guess(last_required, gcv * limits.clamp(flow));
                        let c = self.inverter.invert_clamped(flow, gcv, limits, guess);
                        if c.was_clamped() {
                            debug!(node = %node, step, requested = c.requested_flow, flow = c.flow, "off-take clamped");
                        }
                        (c.thermal_power, c.inversion)
                    }
                    None => {
                        let thermal = gcv * flow;
                        let guess = self.initial_guess(last_required, thermal);
                        (thermal, self.inverter.invert(thermal, guess))
                    }
                };
                if !inversion.converged {
                    warn!(
                        node = %node,
                        step,
                        offset = k,
                        residual = inversion.residual,
                        "inversion did not converge, publishing last iterate"
                    );
                }

                let available = inversion.active_power();
                self.runtime.publish_double(handle, available)?;
                self.registry.point_mut(i)?.set_last_available(k, available)?;
                debug!(node = %node, step, offset = k, thermal_mw = thermal, available_mw = available, "published");
            }
        }
        Ok(())
    }

    /// Read every required value, rewrite the matching flow setpoints and
    /// log the sample. Returns whether any point still violates.
    fn sample_all(
        &mut self,
        network: &mut dyn NetworkAccess,
        step: usize,
        stepping: bool,
    ) -> SimResult<bool> {
        let last_step = network.clock().last_step();
        let mut violation = false;
        for i in 0..self.registry.len() {
            for k in 0..self.registry.horizon() {
                let target = step + k;
                if target > last_step {
                    continue;
                }
                let point = self.registry.point(i)?;
                let node = point.gas_node().to_string();
                let sub = point.subscription(k)?;
                let available = point.last_available(k)?;

                let required = self.runtime.read_double(sub)?;
                if ConvergencePolicy::is_placeholder(required) {
                    if stepping {
                        warn!(node = %node, step, offset = k, "no required value published yet");
                    }
                    continue;
                }
                self.registry.point_mut(i)?.set_last_required(k, required)?;

                let ts = network.clock().timestamp(target)?;
                let gcv = mj_per_m3(network.calorific_value(&node, target)?);
                let required_thermal = self.config.curve.thermal_power(required);
                self.write_setpoint(network, &node, ts, required_thermal / gcv);

                let flow = in_m3ps(network.flow(&node, target)?);
                let line = SampleLine {
                    timestamp: ts,
                    step,
                    iteration: self.iteration,
                    pressure_bar: in_bar(network.pressure(&node, target)?),
                    flow_m3_s: flow,
                    thermal_power_mw: gcv * flow,
                };
                self.registry.record_sample(i, k, &line, required)?;

                let history = self.registry.point(i)?.history(k)?;
                let v = self.config.policy.is_violation(available, required, history);
                violation |= v;
                debug!(node = %node, step, offset = k, available, required, violation = v, "sampled");
            }
        }
        Ok(violation)
    }

    fn write_setpoint(
        &self,
        network: &mut dyn NetworkAccess,
        node: &str,
        ts: chrono::NaiveDateTime,
        value: f64,
    ) {
        let unit = self.registry.setpoint_unit();
        match network.events_mut().find_mut(node, ControlKind::Qset, ts) {
            Some(ev) => {
                ev.value = value;
                ev.unit = unit.to_string();
                ev.active = true;
                ev.processed = false;
                ev.info = self.config.directive_info.clone();
            }
            None => {
                let mut ev = ScenarioEvent::placeholder(node, ControlKind::Qset, ts, unit);
                ev.value = value;
                ev.active = true;
                ev.info = self.config.directive_info.clone();
                network.events_mut().insert(ev);
            }
        }
    }
}

impl<R: CosimRuntime> StepObserver for TimeStepCoordinator<R> {
    fn on_before_step(
        &mut self,
        event: &mut SolverEvent,
        network: &mut dyn NetworkAccess,
    ) -> NetworkResult<()> {
        Ok(self.before_step(event, network)?)
    }

    fn on_after_step(
        &mut self,
        event: &mut SolverEvent,
        network: &mut dyn NetworkAccess,
    ) -> NetworkResult<()> {
        Ok(self.after_step(event, network)?)
    }
}
