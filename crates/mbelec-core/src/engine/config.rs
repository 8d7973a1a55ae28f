use super::error::ElectrostaticsError;
use crate::core::electrostatics::constants::{
    DEFAULT_A_CC, DEFAULT_A_CD, DEFAULT_A_DD, DEFAULT_ASPC_ORDER, DEFAULT_DIPOLE_TOLERANCE,
    DEFAULT_EWALD_TOLERANCE, DEFAULT_EXCLUSION_DISTANCE, DEFAULT_MAX_ITERATIONS,
    DEFAULT_PERIODIC_CUTOFF,
};
use crate::core::models::cell::PeriodicBox;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: &'static str, reason: String },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error: {source}")]
    Toml { source: toml::de::Error },
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        name,
        reason: reason.into(),
    }
}

/// Thole damping strengths per interaction kind.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TholeConfig {
    pub a_cc: f64,
    pub a_cd: f64,
    pub a_dd: f64,
}

impl Default for TholeConfig {
    fn default() -> Self {
        Self {
            a_cc: DEFAULT_A_CC,
            a_cd: DEFAULT_A_CD,
            a_dd: DEFAULT_A_DD,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CutoffConfig {
    /// Pair cutoff in Å. `None` means every pair interacts in cluster mode and
    /// `periodic_default` applies under periodic boundaries.
    pub cutoff: Option<f64>,
    pub switch_width: f64,
    pub exclusion_distance: f64,
    pub periodic_default: f64,
}

impl Default for CutoffConfig {
    fn default() -> Self {
        Self {
            cutoff: None,
            switch_width: 1.0,
            exclusion_distance: DEFAULT_EXCLUSION_DISTANCE,
            periodic_default: DEFAULT_PERIODIC_CUTOFF,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EwaldConfig {
    /// Splitting parameter in 1/Å. Derived from the cutoff and tolerance when absent.
    pub alpha: Option<f64>,
    pub tolerance: f64,
}

impl Default for EwaldConfig {
    fn default() -> Self {
        Self {
            alpha: None,
            tolerance: DEFAULT_EWALD_TOLERANCE,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AspcConfig {
    pub order: usize,
}

impl Default for AspcConfig {
    fn default() -> Self {
        Self {
            order: DEFAULT_ASPC_ORDER,
        }
    }
}

/// Engine-wide settings that do not change between energy evaluations.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct ElectrostaticsConfig {
    pub thole: TholeConfig,
    pub cutoff: CutoffConfig,
    pub ewald: EwaldConfig,
    pub aspc: AspcConfig,
}

impl ElectrostaticsConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Toml { source: e })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("thole.a_cc", self.thole.a_cc),
            ("thole.a_cd", self.thole.a_cd),
            ("thole.a_dd", self.thole.a_dd),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(name, format!("must be finite and non-negative, got {value}")));
            }
        }

        let cutoff = &self.cutoff;
        if !cutoff.exclusion_distance.is_finite() || cutoff.exclusion_distance < 0.0 {
            return Err(invalid(
                "cutoff.exclusion_distance",
                format!("must be non-negative, got {}", cutoff.exclusion_distance),
            ));
        }
        if !cutoff.switch_width.is_finite() || cutoff.switch_width < 0.0 {
            return Err(invalid(
                "cutoff.switch_width",
                format!("must be non-negative, got {}", cutoff.switch_width),
            ));
        }
        if let Some(value) = cutoff.cutoff {
            if !(value > cutoff.exclusion_distance) {
                return Err(invalid(
                    "cutoff.cutoff",
                    format!(
                        "must exceed the exclusion distance {}, got {value}",
                        cutoff.exclusion_distance
                    ),
                ));
            }
        }
        if !(cutoff.periodic_default > cutoff.exclusion_distance) {
            return Err(invalid(
                "cutoff.periodic_default",
                format!(
                    "must exceed the exclusion distance {}, got {}",
                    cutoff.exclusion_distance, cutoff.periodic_default
                ),
            ));
        }

        if !(self.ewald.tolerance > 0.0 && self.ewald.tolerance < 1.0) {
            return Err(invalid(
                "ewald.tolerance",
                format!("must lie in (0, 1), got {}", self.ewald.tolerance),
            ));
        }
        if let Some(alpha) = self.ewald.alpha {
            if !(alpha > 0.0 && alpha.is_finite()) {
                return Err(invalid("ewald.alpha", format!("must be positive, got {alpha}")));
            }
        }
        Ok(())
    }

    pub fn builder() -> ElectrostaticsConfigBuilder {
        ElectrostaticsConfigBuilder::new()
    }
}

#[derive(Default)]
pub struct ElectrostaticsConfigBuilder {
    a_cc: Option<f64>,
    a_cd: Option<f64>,
    a_dd: Option<f64>,
    cutoff: Option<f64>,
    switch_width: Option<f64>,
    exclusion_distance: Option<f64>,
    periodic_default: Option<f64>,
    ewald_alpha: Option<f64>,
    ewald_tolerance: Option<f64>,
    aspc_order: Option<usize>,
}

impl ElectrostaticsConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn thole(mut self, a_cc: f64, a_cd: f64, a_dd: f64) -> Self {
        self.a_cc = Some(a_cc);
        self.a_cd = Some(a_cd);
        self.a_dd = Some(a_dd);
        self
    }
    pub fn cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = Some(cutoff);
        self
    }
    pub fn switch_width(mut self, width: f64) -> Self {
        self.switch_width = Some(width);
        self
    }
    pub fn exclusion_distance(mut self, distance: f64) -> Self {
        self.exclusion_distance = Some(distance);
        self
    }
    pub fn periodic_default(mut self, cutoff: f64) -> Self {
        self.periodic_default = Some(cutoff);
        self
    }
    pub fn ewald_alpha(mut self, alpha: f64) -> Self {
        self.ewald_alpha = Some(alpha);
        self
    }
    pub fn ewald_tolerance(mut self, tolerance: f64) -> Self {
        self.ewald_tolerance = Some(tolerance);
        self
    }
    pub fn aspc_order(mut self, order: usize) -> Self {
        self.aspc_order = Some(order);
        self
    }

    pub fn build(self) -> Result<ElectrostaticsConfig, ConfigError> {
        let defaults = ElectrostaticsConfig::default();
        let config = ElectrostaticsConfig {
            thole: TholeConfig {
                a_cc: self.a_cc.unwrap_or(defaults.thole.a_cc),
                a_cd: self.a_cd.unwrap_or(defaults.thole.a_cd),
                a_dd: self.a_dd.unwrap_or(defaults.thole.a_dd),
            },
            cutoff: CutoffConfig {
                cutoff: self.cutoff.or(defaults.cutoff.cutoff),
                switch_width: self.switch_width.unwrap_or(defaults.cutoff.switch_width),
                exclusion_distance: self
                    .exclusion_distance
                    .unwrap_or(defaults.cutoff.exclusion_distance),
                periodic_default: self
                    .periodic_default
                    .unwrap_or(defaults.cutoff.periodic_default),
            },
            ewald: EwaldConfig {
                alpha: self.ewald_alpha.or(defaults.ewald.alpha),
                tolerance: self.ewald_tolerance.unwrap_or(defaults.ewald.tolerance),
            },
            aspc: AspcConfig {
                order: self.aspc_order.unwrap_or(defaults.aspc.order),
            },
        };
        config.validate()?;
        Ok(config)
    }
}

/// Strategy used to obtain the induced dipoles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DipoleMethod {
    #[default]
    Iterative,
    ConjugateGradient,
    Aspc,
    Inversion,
}

impl DipoleMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DipoleMethod::Iterative => "iter",
            DipoleMethod::ConjugateGradient => "cg",
            DipoleMethod::Aspc => "aspc",
            DipoleMethod::Inversion => "inv",
        }
    }
}

impl fmt::Display for DipoleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DipoleMethod {
    type Err = ElectrostaticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iter" => Ok(DipoleMethod::Iterative),
            "cg" => Ok(DipoleMethod::ConjugateGradient),
            "aspc" => Ok(DipoleMethod::Aspc),
            "inv" => Ok(DipoleMethod::Inversion),
            other => Err(ElectrostaticsError::invalid(
                "dipole_method",
                format!("unknown method '{other}', expected one of iter, cg, aspc, inv"),
            )),
        }
    }
}

/// Per-system options supplied at initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationOptions {
    pub do_grads: bool,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub dipole_method: DipoleMethod,
    pub periodic_box: Option<PeriodicBox>,
}

impl Default for CalculationOptions {
    fn default() -> Self {
        Self {
            do_grads: true,
            tolerance: DEFAULT_DIPOLE_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            dipole_method: DipoleMethod::default(),
            periodic_box: None,
        }
    }
}

impl CalculationOptions {
    pub fn validate(&self) -> Result<(), ElectrostaticsError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ElectrostaticsError::invalid(
                "tolerance",
                format!("must be finite and non-negative, got {}", self.tolerance),
            ));
        }
        if self.max_iterations == 0 {
            return Err(ElectrostaticsError::invalid(
                "max_iterations",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn default_config_uses_standard_thole_parameters() {
        let config = ElectrostaticsConfig::default();
        assert_eq!(config.thole.a_cc, 0.4);
        assert_eq!(config.thole.a_cd, 0.4);
        assert_eq!(config.thole.a_dd, 0.055);
        assert_eq!(config.cutoff.exclusion_distance, 2.0);
        assert_eq!(config.aspc.order, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config = ElectrostaticsConfig::from_toml_str(
            r#"
            [thole]
            a_dd = 0.06

            [cutoff]
            cutoff = 7.5
            switch_width = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(config.thole.a_cc, 0.4);
        assert_eq!(config.thole.a_dd, 0.06);
        assert_eq!(config.cutoff.cutoff, Some(7.5));
        assert_eq!(config.cutoff.switch_width, 0.5);
        assert_eq!(config.ewald, EwaldConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = ElectrostaticsConfig::from_toml_str("[thole]\na_xx = 1.0\n");
        assert!(matches!(result, Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn cutoff_inside_exclusion_distance_is_rejected() {
        let result = ElectrostaticsConfig::from_toml_str("[cutoff]\ncutoff = 1.5\n");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { name: "cutoff.cutoff", .. })
        ));
    }

    #[test]
    fn load_reads_config_from_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("electrostatics.toml");
        fs::write(&file_path, "[ewald]\nalpha = 0.3\ntolerance = 1e-10\n").unwrap();
        let config = ElectrostaticsConfig::load(&file_path).unwrap();
        assert_eq!(config.ewald.alpha, Some(0.3));
        assert_eq!(config.ewald.tolerance, 1e-10);
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = tempdir().unwrap();
        let result = ElectrostaticsConfig::load(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn builder_overrides_selected_fields_and_validates() {
        let config = ElectrostaticsConfig::builder()
            .thole(0.3, 0.35, 0.05)
            .cutoff(8.0)
            .aspc_order(2)
            .build()
            .unwrap();
        assert_eq!(config.thole.a_cd, 0.35);
        assert_eq!(config.cutoff.cutoff, Some(8.0));
        assert_eq!(config.aspc.order, 2);

        let err = ElectrostaticsConfig::builder().ewald_tolerance(2.0).build();
        assert!(matches!(
            err,
            Err(ConfigError::InvalidValue { name: "ewald.tolerance", .. })
        ));
    }

    #[test]
    fn dipole_method_parses_known_names() {
        assert_eq!("iter".parse::<DipoleMethod>().unwrap(), DipoleMethod::Iterative);
        assert_eq!("cg".parse::<DipoleMethod>().unwrap(), DipoleMethod::ConjugateGradient);
        assert_eq!("aspc".parse::<DipoleMethod>().unwrap(), DipoleMethod::Aspc);
        assert_eq!("inv".parse::<DipoleMethod>().unwrap(), DipoleMethod::Inversion);
        for method in [DipoleMethod::Iterative, DipoleMethod::Aspc] {
            assert_eq!(method.to_string().parse::<DipoleMethod>().unwrap(), method);
        }
    }

    #[test]
    fn unknown_dipole_method_is_an_invalid_argument() {
        assert!(matches!(
            "jacobi".parse::<DipoleMethod>(),
            Err(ElectrostaticsError::InvalidArgument { name: "dipole_method", .. })
        ));
    }

    #[test]
    fn calculation_options_reject_bad_scalars() {
        let mut options = CalculationOptions::default();
        assert!(options.validate().is_ok());
        options.tolerance = -1.0;
        assert!(options.validate().is_err());
        options.tolerance = 1e-12;
        options.max_iterations = 0;
        assert!(options.validate().is_err());
    }
}
