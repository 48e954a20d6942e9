use super::traits::ConfigSection;
use crate::error::PicEvolveError;
use crate::functions::registry::FunctionRegistry;
use serde::{Deserialize, Serialize};

/// Weights steering the mutation engine.
///
/// `global` is the per-node probability of mutating at all. The per-kind
/// weights are laid end to end as intervals on [0, 1); a draw past the last
/// interval leaves the node unchanged, so only their ratios and their total
/// relative to 1 matter.
///
/// Deserializes from this table or from the flat 13-value array accepted by
/// [`MutationRates::from_slice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RatesRepr")]
pub struct MutationRates {
    pub global: f64,
    /// random expression, different function, become argument,
    /// become value of argument, copy of another node
    pub function: [f64; 5],
    /// random expression, adjust, become argument, copy of another node
    pub scalar: [f64; 4],
    /// random expression, become argument, copy of another node
    pub variable: [f64; 3],
}

impl MutationRates {
    pub const LEN: usize = 13;

    /// Build from the flat 13-value layout: global, 5 function, 4 scalar,
    /// 3 variable weights
    pub fn from_slice(values: &[f64]) -> Result<Self, PicEvolveError> {
        if values.len() != Self::LEN {
            return Err(PicEvolveError::Configuration(format!(
                "Expected {} mutation rates, got {}",
                Self::LEN,
                values.len()
            )));
        }
        let mut function = [0.0; 5];
        let mut scalar = [0.0; 4];
        let mut variable = [0.0; 3];
        function.copy_from_slice(&values[1..6]);
        scalar.copy_from_slice(&values[6..10]);
        variable.copy_from_slice(&values[10..13]);
        Ok(Self {
            global: values[0],
            function,
            scalar,
            variable,
        })
    }

    pub fn to_vec(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(Self::LEN);
        values.push(self.global);
        values.extend_from_slice(&self.function);
        values.extend_from_slice(&self.scalar);
        values.extend_from_slice(&self.variable);
        values
    }

    pub fn validate(&self) -> Result<(), PicEvolveError> {
        if !(0.0..=1.0).contains(&self.global) {
            return Err(PicEvolveError::Configuration(
                "Global mutation rate must be between 0 and 1".to_string(),
            ));
        }
        if self.to_vec().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(PicEvolveError::Configuration(
                "Mutation weights must be finite and non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RatesRepr {
    Flat(Vec<f64>),
    Table {
        global: f64,
        function: [f64; 5],
        scalar: [f64; 4],
        variable: [f64; 3],
    },
}

impl TryFrom<RatesRepr> for MutationRates {
    type Error = PicEvolveError;

    fn try_from(repr: RatesRepr) -> Result<Self, Self::Error> {
        match repr {
            RatesRepr::Flat(values) => Self::from_slice(&values),
            RatesRepr::Table {
                global,
                function,
                scalar,
                variable,
            } => Ok(Self {
                global,
                function,
                scalar,
                variable,
            }),
        }
    }
}

impl Default for MutationRates {
    fn default() -> Self {
        Self {
            global: 0.4,
            function: [0.2, 0.2, 0.2, 0.2, 0.2],
            scalar: [0.25, 0.25, 0.25, 0.25],
            variable: [0.3, 0.3, 0.3],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub population_size: usize,
    pub mutation_rates: MutationRates,
    /// Candidates tried per offspring before giving up
    pub max_attempts: usize,
    /// Offspring with longer genome text are rejected and redrawn
    pub max_genome_len: Option<usize>,
    pub excluded_functions: Vec<String>,
    pub seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 9,
            mutation_rates: MutationRates::default(),
            max_attempts: 100,
            max_genome_len: None,
            excluded_functions: Vec::new(),
            seed: None,
        }
    }
}

impl EvolutionConfig {
    pub fn registry(&self) -> Result<FunctionRegistry, PicEvolveError> {
        FunctionRegistry::excluding(&self.excluded_functions)
    }
}

impl ConfigSection for EvolutionConfig {
    fn section_name() -> &'static str {
        "evolution"
    }

    fn validate(&self) -> Result<(), PicEvolveError> {
        if self.population_size == 0 {
            return Err(PicEvolveError::Configuration(
                "Population size must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(PicEvolveError::Configuration(
                "Max attempts must be at least 1".to_string(),
            ));
        }
        if self.max_genome_len == Some(0) {
            return Err(PicEvolveError::Configuration(
                "Max genome length must be positive".to_string(),
            ));
        }
        self.mutation_rates.validate()?;
        self.registry().map_err(|e| PicEvolveError::Configuration(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rates_layout() {
        let rates = MutationRates::default();
        assert_eq!(
            rates.to_vec(),
            vec![0.4, 0.2, 0.2, 0.2, 0.2, 0.2, 0.25, 0.25, 0.25, 0.25, 0.3, 0.3, 0.3]
        );
        assert_eq!(MutationRates::from_slice(&rates.to_vec()).unwrap(), rates);
    }

    #[test]
    fn test_from_slice_rejects_wrong_length() {
        assert!(MutationRates::from_slice(&[0.1; 12]).is_err());
    }

    #[test]
    fn test_rates_from_flat_json_array() {
        let rates: MutationRates = serde_json::from_str(
            "[0.5, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 1]",
        )
        .unwrap();
        assert_eq!(rates.global, 0.5);
        assert_eq!(rates.function, [1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(rates.scalar, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(rates.variable, [0.0, 0.0, 1.0]);

        assert!(serde_json::from_str::<MutationRates>("[0.5, 1, 0]").is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = EvolutionConfig::default();
        assert!(config.validate().is_ok());

        config.mutation_rates.global = 1.5;
        assert!(config.validate().is_err());

        let mut config = EvolutionConfig::default();
        config.mutation_rates.scalar[1] = -0.1;
        assert!(config.validate().is_err());

        let mut config = EvolutionConfig::default();
        config.excluded_functions = vec!["nope".to_string()];
        assert!(config.validate().is_err());
    }
}
