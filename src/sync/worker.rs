//! Simulation on its own thread
//!
//! The presentation side talks to the worker only through two bounded
//! channels: `WorkerCommand`s in, `StateUpdate`s out. The simulation thread
//! never waits on the presentation thread. When the update channel is full
//! the extraction is skipped and the dirty flags keep accumulating, so the
//! next delta that does go out covers everything missed.

use std::thread::JoinHandle;
use std::time::Instant;

use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::{debug, error, info, warn};

use crate::core::config::SimulationConfig;
use crate::sync::clock::FixedStep;
use crate::sync::delta::{DeltaTracker, WorldDelta, WorldSnapshot};
use crate::world::{World, WorldCommand};

#[derive(Debug, Clone)]
pub enum WorkerCommand {
    /// (Re)create the world; a full snapshot follows
    Init(Box<SimulationConfig>),
    Start,
    Pause,
    /// Run this many fixed steps now, running or not
    Step(u32),
    Command(WorldCommand),
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum StateUpdate {
    Snapshot(Box<WorldSnapshot>),
    Delta(Box<WorldDelta>),
}

pub struct SimulationWorker {
    /// Dropped on stop so the thread sees a closed channel
    commands: Option<mpsc::Sender<WorkerCommand>>,
    updates: mpsc::Receiver<StateUpdate>,
    handle: Option<JoinHandle<()>>,
}

impl SimulationWorker {
    /// Spawn the simulation thread. The world is created on `Init`.
    pub fn spawn(config: &SimulationConfig) -> std::io::Result<Self> {
        let (command_tx, command_rx) = mpsc::channel(config.command_channel_capacity.max(1));
        let (update_tx, update_rx) = mpsc::channel(config.update_channel_capacity.max(1));
        let handle = std::thread::Builder::new()
            .name("simulation".into())
            .spawn(move || run(command_rx, update_tx))?;
        Ok(Self {
            commands: Some(command_tx),
            updates: update_rx,
            handle: Some(handle),
        })
    }

    /// Non-blocking send. False if the command queue is full or closed.
    pub fn send(&self, command: WorkerCommand) -> bool {
        let Some(commands) = &self.commands else {
            return false;
        };
        match commands.try_send(command) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Worker command queue full");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    pub fn try_recv(&mut self) -> Option<StateUpdate> {
        self.updates.try_recv().ok()
    }

    /// Wait for the next update. None once the worker has stopped.
    pub fn recv_blocking(&mut self) -> Option<StateUpdate> {
        self.updates.blocking_recv()
    }

    /// Stop the thread and wait for it
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(commands) = self.commands.take() {
            let _ = commands.try_send(WorkerCommand::Shutdown);
        }
        self.updates.close();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Simulation thread panicked");
            }
        }
    }
}

impl Drop for SimulationWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker {
    world: Option<World>,
    tracker: DeltaTracker,
    clock: FixedStep,
    running: bool,
    snapshot_due: bool,
    updates: mpsc::Sender<StateUpdate>,
}

/// Outcome of trying to publish
enum Publish {
    Sent,
    Skipped,
    Closed,
}

impl Worker {
    fn handle(&mut self, command: WorkerCommand) -> bool {
        match command {
            WorkerCommand::Init(config) => match World::new(*config) {
                Ok(world) => {
                    self.clock = FixedStep::new(world.config.fixed_dt);
                    self.tracker = DeltaTracker::new();
                    self.world = Some(world);
                    self.snapshot_due = true;
                    info!("Worker initialised");
                }
                Err(e) => error!("Worker init failed: {}", e),
            },
            WorkerCommand::Start => {
                self.running = true;
                self.clock.reset();
            }
            WorkerCommand::Pause => self.running = false,
            WorkerCommand::Step(n) => {
                if let Some(world) = self.world.as_mut() {
                    let dt = self.clock.dt();
                    for _ in 0..n {
                        world.tick(dt);
                    }
                }
            }
            WorkerCommand::Command(cmd) => match self.world.as_mut() {
                Some(world) => world.queue_command(cmd),
                None => warn!("Command {} before init", cmd.name()),
            },
            WorkerCommand::Shutdown => return false,
        }
        true
    }

    fn publish(&mut self) -> Publish {
        let Some(world) = self.world.as_mut() else {
            return Publish::Skipped;
        };
        let permit = match self.updates.try_reserve() {
            Ok(permit) => permit,
            Err(TrySendError::Full(())) => return Publish::Skipped,
            Err(TrySendError::Closed(())) => return Publish::Closed,
        };
        if self.snapshot_due {
            self.snapshot_due = false;
            permit.send(StateUpdate::Snapshot(Box::new(self.tracker.full_snapshot(world))));
        } else {
            let delta = self.tracker.extract(world);
            permit.send(StateUpdate::Delta(Box::new(delta)));
        }
        Publish::Sent
    }
}

fn run(mut commands: mpsc::Receiver<WorkerCommand>, updates: mpsc::Sender<StateUpdate>) {
    let mut worker = Worker {
        world: None,
        tracker: DeltaTracker::new(),
        clock: FixedStep::new(SimulationConfig::default().fixed_dt),
        running: false,
        snapshot_due: false,
        updates,
    };
    let mut last = Instant::now();

    loop {
        // Paused: sleep until a command arrives
        if !worker.running && !worker.snapshot_due {
            match commands.blocking_recv() {
                Some(command) => {
                    let stepped = matches!(command, WorkerCommand::Step(_));
                    if !worker.handle(command) {
                        break;
                    }
                    if stepped {
                        if let Publish::Closed = worker.publish() {
                            break;
                        }
                    }
                }
                None => break,
            }
            last = Instant::now();
            continue;
        }

        let mut alive = true;
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    if !worker.handle(command) {
                        alive = false;
                        break;
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    alive = false;
                    break;
                }
            }
        }
        if !alive {
            break;
        }

        let now = Instant::now();
        let elapsed = now.duration_since(last).as_secs_f64();
        last = now;

        let mut stepped = false;
        if worker.running {
            if let Some(world) = worker.world.as_mut() {
                let dt = worker.clock.dt();
                for _ in 0..worker.clock.advance(elapsed) {
                    world.tick(dt);
                    stepped = true;
                }
            }
        }

        if stepped || worker.snapshot_due {
            match worker.publish() {
                Publish::Sent => {}
                Publish::Skipped => debug!("Update channel full, delta deferred"),
                Publish::Closed => break,
            }
        }

        if worker.running {
            std::thread::sleep(worker.clock.until_next());
        } else if worker.snapshot_due {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
    }
    info!("Worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_sends_snapshot() {
        let config = SimulationConfig::default();
        let mut worker = SimulationWorker::spawn(&config).unwrap();
        assert!(worker.send(WorkerCommand::Init(Box::new(config))));
        match worker.recv_blocking() {
            Some(StateUpdate::Snapshot(snapshot)) => assert!(!snapshot.entities.is_empty()),
            _ => panic!("expected snapshot"),
        }
        worker.shutdown();
    }

    #[test]
    fn test_step_sends_delta() {
        let config = SimulationConfig::default();
        let mut worker = SimulationWorker::spawn(&config).unwrap();
        worker.send(WorkerCommand::Init(Box::new(config)));
        assert!(matches!(worker.recv_blocking(), Some(StateUpdate::Snapshot(_))));
        worker.send(WorkerCommand::Step(3));
        match worker.recv_blocking() {
            Some(StateUpdate::Delta(delta)) => assert_eq!(delta.header.tick, 3),
            _ => panic!("expected delta"),
        }
        worker.shutdown();
    }
}
