//! Schema migration framework.

use crate::ProjectError;
use crate::schema::Scenario;

pub const LATEST_VERSION: u32 = 2;

pub fn migrate_to_latest(mut scenario: Scenario) -> Result<Scenario, ProjectError> {
    while scenario.version < LATEST_VERSION {
        scenario = migrate_one_version(scenario)?;
    }
    Ok(scenario)
}

fn migrate_one_version(scenario: Scenario) -> Result<Scenario, ProjectError> {
    match scenario.version {
        1 => migrate_v1_to_v2(scenario),
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}

/// Version 1 counted only previous samples in `history_window`.
fn migrate_v1_to_v2(mut scenario: Scenario) -> Result<Scenario, ProjectError> {
    scenario.coupling.history_window += 1;
    scenario.version = 2;
    Ok(scenario)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::*;

    fn scenario(version: u32, window: usize) -> Scenario {
        let yaml = format!(
            r#"
version: {version}
name: m
federate: {{ name: ng1, peer: transmission }}
coupling: {{ history_window: {window} }}
network: {{ start_time: "2026-01-01T00:00:00", time_step_s: 3600.0, steps: 1 }}
peer: {{}}
"#
        );
        serde_yaml::from_str(&yaml).unwrap()
    }

    #[test]
    fn v1_window_gains_current_sample() {
        let s = migrate_to_latest(scenario(1, 2)).unwrap();
        assert_eq!(s.version, LATEST_VERSION);
        assert_eq!(s.coupling.history_window, 3);
    }

    #[test]
    fn latest_is_untouched() {
        let s = migrate_to_latest(scenario(2, 3)).unwrap();
        assert_eq!(s.coupling.history_window, 3);
        assert_eq!(s.heat_rate, HeatRateDef::default());
    }

    #[test]
    fn version_zero_has_no_path() {
        assert!(matches!(
            migrate_to_latest(scenario(0, 3)),
            Err(ProjectError::Migration { .. })
        ));
    }
}
