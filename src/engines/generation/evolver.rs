use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use std::sync::Arc;

use super::ast::ExprTree;
use super::generator::ExprGenerator;
use super::mutation::MutationEngine;
use super::operators::crossover_trees;
use super::progress::ProgressCallback;
use crate::config::traits::ConfigSection;
use crate::config::EvolutionConfig;
use crate::engines::evaluation::Evaluator;
use crate::error::{PicEvolveError, Result};
use crate::functions::registry::FunctionRegistry;
use crate::types::{Genome, PixelBuffer};

/// Interactive evolution driver.
///
/// Holds the current population. A generation is bred from the members a
/// user picks: one parent yields a population of its mutations, two
/// parents yield a population of their crossover offspring.
pub struct PicEvolver {
    config: EvolutionConfig,
    registry: Arc<FunctionRegistry>,
    generator: ExprGenerator,
    mutation: MutationEngine,
    population: Vec<Genome>,
    generation: usize,
    rng: StdRng,
}

impl PicEvolver {
    pub fn new(config: EvolutionConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_rng(config: EvolutionConfig, rng: StdRng) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(config.registry()?);
        let generator = ExprGenerator::new(Arc::clone(&registry));
        let mutation = MutationEngine::new(Arc::clone(&registry), config.mutation_rates.clone());

        Ok(Self {
            config,
            registry,
            generator,
            mutation,
            population: Vec::new(),
            generation: 0,
            rng,
        })
    }

    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    pub fn population(&self) -> &[Genome] {
        &self.population
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    /// The random source every operation draws from
    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn random_genome(&mut self) -> Genome {
        self.generator.random_genome(&mut self.rng)
    }

    /// Single mutation pass, without any acceptance checks
    pub fn mutate(&mut self, genome: &str) -> Result<Genome> {
        self.mutation.mutate(genome, &mut self.rng)
    }

    /// Single crossover, without any acceptance checks
    pub fn crossover(&mut self, parent1: &str, parent2: &str) -> Result<(Genome, Genome)> {
        super::operators::crossover(parent1, parent2, &self.registry, &mut self.rng)
    }

    /// Replace the population with fresh random genomes
    pub fn initialize_population(&mut self) -> &[Genome] {
        self.population = (0..self.config.population_size)
            .map(|_| self.generator.random_genome(&mut self.rng))
            .collect();
        self.generation = 0;
        info!("Initialized population of {}", self.population.len());
        &self.population
    }

    /// `count` accepted mutations of `parent`.
    ///
    /// A mutant is accepted when it reparses, has a function at its root and
    /// fits `max_genome_len`. Each offspring gets `max_attempts` tries.
    pub fn breed_from<C: ProgressCallback>(
        &mut self,
        parent: &str,
        count: usize,
        callback: &mut C,
    ) -> Result<Vec<Genome>> {
        let tree = ExprTree::parse(parent, &self.registry)?;
        let mut offspring = Vec::with_capacity(count);

        while offspring.len() < count {
            let mut accepted = None;
            for attempt in 1..=self.config.max_attempts {
                let mut candidate = tree.clone();
                self.mutation.mutate_tree(&mut candidate, &mut self.rng);
                let genome = candidate.to_genome();
                match self.rejection(&genome) {
                    Ok(None) => {
                        accepted = Some(genome);
                        break;
                    }
                    Ok(Some(reason)) => {
                        warn!("Rejected mutant on attempt {}: {}", attempt, reason);
                    }
                    Err(e) if e.is_retryable() => {
                        warn!("Mutant failed to reparse on attempt {}: {}", attempt, e);
                    }
                    Err(e) => return Err(e),
                }
            }

            let genome = accepted.ok_or_else(|| {
                PicEvolveError::Generation(format!(
                    "no acceptable mutation after {} attempts",
                    self.config.max_attempts
                ))
            })?;
            offspring.push(genome);
            callback.on_offspring_created(offspring.len(), count);
        }

        Ok(offspring)
    }

    /// `count` crossover offspring of two parents. Pairs are kept only when
    /// both children are acceptable; the final pair is cut short for an odd
    /// `count`.
    pub fn mate<C: ProgressCallback>(
        &mut self,
        parent1: &str,
        parent2: &str,
        count: usize,
        callback: &mut C,
    ) -> Result<Vec<Genome>> {
        let tree1 = ExprTree::parse(parent1, &self.registry)?;
        let tree2 = ExprTree::parse(parent2, &self.registry)?;
        let mut offspring = Vec::with_capacity(count);
        let mut rejected = 0;

        while offspring.len() < count {
            let (mut child1, mut child2) = (tree1.clone(), tree2.clone());
            crossover_trees(&mut child1, &mut child2, &mut self.rng);
            let (g1, g2) = (child1.to_genome(), child2.to_genome());

            let keep = match (self.accept(&g1), self.accept(&g2)) {
                (Ok(a), Ok(b)) => a && b,
                (Err(e), _) | (_, Err(e)) if !e.is_retryable() => return Err(e),
                _ => false,
            };
            if !keep {
                rejected += 1;
                warn!("Rejected crossover pair ({} in a row)", rejected);
                if rejected >= self.config.max_attempts {
                    return Err(PicEvolveError::Generation(format!(
                        "no acceptable crossover after {} attempts",
                        rejected
                    )));
                }
                continue;
            }

            rejected = 0;
            for genome in [g1, g2] {
                if offspring.len() < count {
                    offspring.push(genome);
                    callback.on_offspring_created(offspring.len(), count);
                }
            }
        }

        Ok(offspring)
    }

    /// Breed the next population from the members at `selected`
    pub fn advance<C: ProgressCallback>(&mut self, selected: &[usize], callback: &mut C) -> Result<&[Genome]> {
        let parents = selected
            .iter()
            .map(|&i| {
                self.population.get(i).cloned().ok_or_else(|| {
                    PicEvolveError::Generation(format!("no population member {}", i))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let size = self.config.population_size;
        callback.on_generation_start(self.generation);
        let next = match parents.as_slice() {
            [parent] => self.breed_from(parent, size, callback)?,
            [parent1, parent2] => self.mate(parent1, parent2, size, callback)?,
            _ => {
                return Err(PicEvolveError::Generation(format!(
                    "select one or two parents, got {}",
                    parents.len()
                )))
            }
        };

        self.population = next;
        callback.on_generation_complete(self.generation, self.population.len());
        self.generation += 1;
        Ok(&self.population)
    }

    /// Replace the population with caller-supplied genomes, e.g. a saved
    /// library. Every genome must parse against the registry.
    pub fn set_population(&mut self, genomes: Vec<Genome>) -> Result<()> {
        for genome in &genomes {
            ExprTree::parse(genome, &self.registry)?;
        }
        self.population = genomes;
        Ok(())
    }

    /// Evaluate every member in parallel. Afterwards, members using `noise`
    /// reseed the random source when the evaluator has reseeding enabled.
    pub fn render_population(&mut self, evaluator: &Evaluator) -> Vec<Result<PixelBuffer>> {
        let registry = &self.registry;
        let rendered: Vec<(Option<ExprTree>, Result<PixelBuffer>)> = self
            .population
            .par_iter()
            .map(|genome| match ExprTree::parse(genome, registry) {
                Ok(tree) => {
                    let buffer = evaluator.evaluate(&tree);
                    (Some(tree), buffer)
                }
                Err(e) => (None, Err(e)),
            })
            .collect();

        rendered
            .into_iter()
            .map(|(tree, buffer)| {
                if let Some(tree) = tree {
                    evaluator.reseed_after(&tree, &mut self.rng);
                }
                buffer
            })
            .collect()
    }

    fn accept(&self, genome: &str) -> Result<bool> {
        Ok(self.rejection(genome)?.is_none())
    }

    /// Why `genome` is not an acceptable offspring, if it is not
    fn rejection(&self, genome: &str) -> Result<Option<String>> {
        let tree = ExprTree::parse(genome, &self.registry)?;
        if !tree.node(tree.root()).is_function() {
            return Ok(Some("leaf at the root".to_string()));
        }
        match self.config.max_genome_len {
            Some(limit) if genome.len() > limit => Ok(Some(format!(
                "{} characters, limit {}",
                genome.len(),
                limit
            ))),
            _ => Ok(None),
        }
    }
}
