//! Probe registry
//!
//! Built explicitly once at start-up; resolves the active probe set from
//! per-probe enablement overrides. Never mutated while cycles run.

use std::collections::HashMap;
use std::sync::Arc;

use super::traits::{Probe, SampleDesc};
use super::{
    GcProbe, HealthProbe, LabelsProbe, LogsProbe, ProjectsProbe, RegistriesProbe,
    ReplicationProbe, StatisticsProbe, SystemInfoProbe, UsersProbe, VolumesProbe,
};
use crate::error::{ExporterError, Result};

/// Duration label reserved for the liveness check
pub const LIVENESS_LABEL: &str = "reach";

/// A registered probe with its default enablement
#[derive(Clone)]
pub struct RegistryEntry {
    pub probe: Arc<dyn Probe>,
    pub default_enabled: bool,
}

/// Ordered collection of every available probe
#[derive(Clone, Default)]
pub struct ProbeRegistry {
    entries: Vec<RegistryEntry>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every built-in harbor probe with its default enablement
    pub fn builtin(version_override: Option<String>) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(SystemInfoProbe::new(version_override)), true)?;
        registry.register(Arc::new(StatisticsProbe), true)?;
        registry.register(Arc::new(VolumesProbe), true)?;
        registry.register(Arc::new(HealthProbe), true)?;
        registry.register(Arc::new(ProjectsProbe), true)?;
        registry.register(Arc::new(UsersProbe), true)?;
        registry.register(Arc::new(LogsProbe), true)?;
        registry.register(Arc::new(ReplicationProbe), false)?;
        registry.register(Arc::new(GcProbe), true)?;
        registry.register(Arc::new(RegistriesProbe), false)?;
        registry.register(Arc::new(LabelsProbe), false)?;
        Ok(registry)
    }

    /// Add a probe; names are unique ignoring ASCII case.
    pub fn register(&mut self, probe: Arc<dyn Probe>, default_enabled: bool) -> Result<()> {
        let name = probe.name();
        if name.trim().is_empty() || name.eq_ignore_ascii_case(LIVENESS_LABEL) {
            return Err(ExporterError::InvalidProbeName(name.to_string()));
        }
        if self.get(name).is_some() {
            return Err(ExporterError::DuplicateProbe(name.to_string()));
        }

        for desc in probe.samples() {
            if let Some(existing) = self.shape(desc.name) {
                if existing != *desc {
                    return Err(ExporterError::ConflictingShape {
                        name: desc.name.to_string(),
                        reason: format!("probe {name} redeclares it with different help or labels"),
                    });
                }
            }
        }

        self.entries.push(RegistryEntry {
            probe,
            default_enabled,
        });
        Ok(())
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.entries
            .iter()
            .find(|e| e.probe.name().eq_ignore_ascii_case(name))
    }

    fn shape(&self, name: &str) -> Option<&'static SampleDesc> {
        self.entries
            .iter()
            .flat_map(|e| e.probe.samples().iter().copied())
            .find(|d| d.name == name)
    }

    /// Every sample shape declared by any registered probe, deduplicated
    pub fn sample_shapes(&self) -> Vec<&'static SampleDesc> {
        let mut shapes: Vec<&'static SampleDesc> = Vec::new();
        for desc in self.entries.iter().flat_map(|e| e.probe.samples().iter().copied()) {
            if !shapes.iter().any(|d| d.name == desc.name) {
                shapes.push(desc);
            }
        }
        shapes
    }

    /// Build the active probe set, in registration order.
    ///
    /// An override naming an unregistered probe, or naming one probe twice
    /// in different case, is a configuration error.
    pub fn resolve(&self, overrides: &HashMap<String, bool>) -> Result<Vec<Arc<dyn Probe>>> {
        if let Some(unknown) = overrides.keys().find(|name| self.get(name).is_none()) {
            return Err(ExporterError::UnknownProbe(unknown.clone()));
        }

        let mut keys: Vec<String> = overrides.keys().map(|k| k.to_ascii_lowercase()).collect();
        keys.sort();
        if let Some(pair) = keys.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(ExporterError::DuplicateOverride(pair[0].clone()));
        }

        let active = self
            .entries
            .iter()
            .filter(|entry| {
                overrides
                    .iter()
                    .find(|(name, _)| entry.probe.name().eq_ignore_ascii_case(name))
                    .map(|(_, enabled)| *enabled)
                    .unwrap_or(entry.default_enabled)
            })
            .map(|entry| Arc::clone(&entry.probe))
            .collect();

        Ok(active)
    }
}
