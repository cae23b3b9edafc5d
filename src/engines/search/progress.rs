/// Receives milestones of a running iteration.
pub trait ProgressCallback: Send {
    fn on_iteration_start(&mut self, sequence: u64, generation: usize);
    fn on_batch_simulated(&mut self, sequence: u64, batch: BatchKind, instances: usize);
    fn on_iteration_complete(&mut self, sequence: u64, generation: usize, favorable_regions: usize);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Training,
    Test,
}

/// No-op.
impl ProgressCallback for () {
    fn on_iteration_start(&mut self, _: u64, _: usize) {}
    fn on_batch_simulated(&mut self, _: u64, _: BatchKind, _: usize) {}
    fn on_iteration_complete(&mut self, _: u64, _: usize, _: usize) {}
}

pub struct LogProgressCallback;

impl ProgressCallback for LogProgressCallback {
    fn on_iteration_start(&mut self, sequence: u64, generation: usize) {
        log::info!("Sequence {}: generation {} starting...", sequence, generation);
    }

    fn on_batch_simulated(&mut self, sequence: u64, batch: BatchKind, instances: usize) {
        log::info!("Sequence {}: simulated {:?} batch of {} instances", sequence, batch, instances);
    }

    fn on_iteration_complete(&mut self, sequence: u64, generation: usize, favorable_regions: usize) {
        log::info!(
            "Sequence {}: generation {} complete. Favorable regions: {}",
            sequence, generation, favorable_regions
        );
    }
}

// For forwarding progress to another thread
pub struct ChannelProgressCallback {
    sender: std::sync::mpsc::Sender<ProgressMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressMessage {
    IterationStart { sequence: u64, generation: usize },
    BatchSimulated { sequence: u64, batch: BatchKind, instances: usize },
    IterationComplete { sequence: u64, generation: usize, favorable_regions: usize },
}

impl ChannelProgressCallback {
    pub fn new(sender: std::sync::mpsc::Sender<ProgressMessage>) -> Self {
        Self { sender }
    }
}

impl ProgressCallback for ChannelProgressCallback {
    fn on_iteration_start(&mut self, sequence: u64, generation: usize) {
        let _ = self.sender.send(ProgressMessage::IterationStart { sequence, generation });
    }

    fn on_batch_simulated(&mut self, sequence: u64, batch: BatchKind, instances: usize) {
        let _ = self.sender.send(ProgressMessage::BatchSimulated {
            sequence,
            batch,
            instances,
        });
    }

    fn on_iteration_complete(&mut self, sequence: u64, generation: usize, favorable_regions: usize) {
        let _ = self.sender.send(ProgressMessage::IterationComplete {
            sequence,
            generation,
            favorable_regions,
        });
    }
}
