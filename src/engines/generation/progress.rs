use log::info;

/// Hooks called while a new population is bred
pub trait ProgressCallback: Send {
    fn on_generation_start(&mut self, generation: usize);
    fn on_offspring_created(&mut self, created: usize, total: usize);
    fn on_generation_complete(&mut self, generation: usize, population_size: usize);
}

pub struct ConsoleProgressCallback;

impl ProgressCallback for ConsoleProgressCallback {
    fn on_generation_start(&mut self, generation: usize) {
        info!("Generation {} starting...", generation + 1);
    }

    fn on_offspring_created(&mut self, created: usize, total: usize) {
        if created % 10 == 0 || created == total {
            info!("  Created {}/{} offspring", created, total);
        }
    }

    fn on_generation_complete(&mut self, generation: usize, population_size: usize) {
        info!(
            "Generation {} complete. Population size: {}",
            generation + 1,
            population_size
        );
    }
}

/// Ignores every event
pub struct SilentProgress;

impl ProgressCallback for SilentProgress {
    fn on_generation_start(&mut self, _generation: usize) {}
    fn on_offspring_created(&mut self, _created: usize, _total: usize) {}
    fn on_generation_complete(&mut self, _generation: usize, _population_size: usize) {}
}
