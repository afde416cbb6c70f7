//! Gene validators.
//!
//! A [`Validator`] accepts or rejects a single [`Sprinkler`]. Independent
//! checks are combined with [`CompositeValidator`], which only accepts a gene
//! every member accepts.

use std::f64::consts::TAU;
use std::fmt;
use std::sync::Arc;

use super::{Sprinkler, Terrain};
use crate::error::{GeneticError, Result};

pub trait Validator: fmt::Debug + Send + Sync {
    /// Returns [`GeneticError::InvalidGene`] when the sprinkler is rejected.
    fn validate(&self, sprinkler: &Sprinkler) -> Result<()>;

    fn is_valid(&self, sprinkler: &Sprinkler) -> bool {
        self.validate(sprinkler).is_ok()
    }

    /// Combines two validators; both must accept.
    fn and<V>(self, other: V) -> CompositeValidator
    where
        Self: Sized + 'static,
        V: Validator + 'static,
    {
        CompositeValidator::new(vec![Arc::new(self), Arc::new(other)])
    }
}

/// Domain checks that hold for any terrain: finite fields, a range within
/// bounds and angles ordered inside `[0, 2π]`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct CommonSenseValidator {
    pub min_range: f64,
    pub max_range: f64,
}

impl CommonSenseValidator {
    pub fn new(min_range: f64, max_range: f64) -> Self {
        Self {
            min_range,
            max_range,
        }
    }
}

impl Default for CommonSenseValidator {
    fn default() -> Self {
        Self::new(1.0, 8.0)
    }
}

impl Validator for CommonSenseValidator {
    fn validate(&self, sprinkler: &Sprinkler) -> Result<()> {
        if sprinkler.to_fields().iter().any(|v| !v.is_finite()) {
            return Err(GeneticError::InvalidGene(format!(
                "Non-finite sprinkler {:?}",
                sprinkler
            )));
        }

        let range = sprinkler.range();
        if range < self.min_range || range > self.max_range {
            return Err(GeneticError::InvalidGene(format!(
                "Invalid sprinkler range ({:.2})",
                range
            )));
        }

        let (start, end) = (sprinkler.start_angle(), sprinkler.end_angle());
        if start < 0.0 || end > TAU || start > end {
            return Err(GeneticError::InvalidGene(format!(
                "Invalid sprinkler angles ({:.2}, {:.2})",
                start, end
            )));
        }

        Ok(())
    }
}

/// Rejects sprinklers placed outside the terrain boundary.
#[derive(Debug, Clone)]
pub struct TerrainValidator {
    terrain: Arc<Terrain>,
}

impl TerrainValidator {
    pub fn new(terrain: Arc<Terrain>) -> Self {
        Self { terrain }
    }
}

impl Validator for TerrainValidator {
    fn validate(&self, sprinkler: &Sprinkler) -> Result<()> {
        let p = sprinkler.position();
        if !self.terrain.contains(p) {
            return Err(GeneticError::InvalidGene(format!(
                "Invalid sprinkler position ({:.2}, {:.2})",
                p.x, p.y
            )));
        }
        Ok(())
    }
}

/// AND-combination of validators. An empty composite accepts everything.
#[derive(Debug, Clone, Default)]
pub struct CompositeValidator {
    validators: Vec<Arc<dyn Validator>>,
}

impl CompositeValidator {
    pub fn new(validators: Vec<Arc<dyn Validator>>) -> Self {
        Self { validators }
    }

    pub fn with(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl Validator for CompositeValidator {
    fn validate(&self, sprinkler: &Sprinkler) -> Result<()> {
        self.validators
            .iter()
            .try_for_each(|validator| validator.validate(sprinkler))
    }

    fn and<V>(self, other: V) -> CompositeValidator
    where
        V: Validator + 'static,
    {
        self.with(Arc::new(other))
    }
}
