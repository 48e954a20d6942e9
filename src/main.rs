use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use picevolve::config::ConfigManager;
use picevolve::engines::generation::ConsoleProgressCallback;
use picevolve::{Evaluator, Genome, PicEvolver};

#[derive(Parser)]
#[command(name = "picevolve", about = "Evolve images from expression genomes")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for the random source (overrides the configuration)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Print genome lists as a JSON array
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print random genomes
    Random {
        #[arg(long)]
        count: Option<usize>,
    },
    /// Print mutations of a genome
    Mutate {
        genome: String,
        #[arg(long)]
        count: Option<usize>,
    },
    /// Print crossover offspring of two genomes
    Crossover {
        parent1: String,
        parent2: String,
        #[arg(long)]
        count: Option<usize>,
    },
    /// Evaluate a genome and write it as a PNG
    Render {
        genome: String,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        width: Option<usize>,
        #[arg(long)]
        height: Option<usize>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let manager = ConfigManager::new();
    if let Some(path) = &cli.config {
        manager
            .load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?;
    }
    if let Some(seed) = cli.seed {
        manager.update(|c| c.evolution.seed = Some(seed))?;
    }

    let config = manager.get();
    let population_size = config.evolution.population_size;
    let mut evolver = PicEvolver::new(config.evolution.clone())?;
    let mut progress = ConsoleProgressCallback;

    match cli.command {
        Cmd::Random { count } => {
            let genomes: Vec<Genome> = (0..count.unwrap_or(population_size))
                .map(|_| evolver.random_genome())
                .collect();
            print_genomes(&genomes, cli.json)?;
        }
        Cmd::Mutate { genome, count } => {
            let genomes = evolver.breed_from(&genome, count.unwrap_or(population_size), &mut progress)?;
            print_genomes(&genomes, cli.json)?;
        }
        Cmd::Crossover {
            parent1,
            parent2,
            count,
        } => {
            let genomes = evolver.mate(&parent1, &parent2, count.unwrap_or(population_size), &mut progress)?;
            print_genomes(&genomes, cli.json)?;
        }
        Cmd::Render {
            genome,
            output,
            width,
            height,
        } => {
            manager.update(|c| {
                if let Some(w) = width {
                    c.render.width = w;
                }
                if let Some(h) = height {
                    c.render.height = h;
                }
            })?;
            let evaluator = Evaluator::from_config(&manager.get().render);
            evolver.set_population(vec![genome])?;
            for buffer in evolver.render_population(&evaluator) {
                evaluator
                    .save(&buffer?, &output)
                    .with_context(|| format!("writing {}", output.display()))?;
            }
        }
    }

    Ok(())
}

fn print_genomes(genomes: &[Genome], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(genomes)?);
    } else {
        for genome in genomes {
            println!("{}", genome);
        }
    }
    Ok(())
}
