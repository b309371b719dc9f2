use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::app_types::{EngineCommand, EngineUpdate};
use crate::engine::{Optimizer, StepOutcome};
use crate::error::{EngineError, Error};
use crate::render::Surface;
use crate::settings::Config;

/// handle to a running background optimizer
pub struct EngineHandle {
    pub commands: mpsc::Sender<EngineCommand>,
    pub updates: mpsc::Receiver<EngineUpdate>,
    pub thread: thread::JoinHandle<()>,
}

impl EngineHandle {
    #[inline]
    pub fn send(&self, cmd: EngineCommand) {
        // a closed channel just means the thread already finished
        let _ = self.commands.send(cmd);
    }

    /// stop the run (between steps) and wait for the thread
    pub fn stop(self) {
        self.send(EngineCommand::Stop);
        let _ = self.thread.join();
    }
}

/// Start the optimizer on a named background thread, paused until `EngineCommand::Start`.
/// Commands are only looked at between steps, so a step in flight always completes.
/// The optimizer is built on the calling thread so configuration errors surface here.
pub fn spawn(target: Surface, cfg: Config) -> Result<EngineHandle, Error> {
    profiling::scope!("engine_thread::spawn");
    let delay = Duration::from_millis(cfg.step_delay_ms);
    let mut optimizer = Optimizer::start(target, cfg)?;

    let (commands, command_rx) = mpsc::channel();
    let (update_tx, updates) = mpsc::channel();

    let thread = thread::Builder::new()
        .name("optimizer".to_owned())
        .spawn(move || {
            let mut running = false;

            loop {
                profiling::scope!("engine_thread_loop");

                // paused: block until told otherwise. running: drain without blocking
                let next = if running {
                    command_rx.try_recv().ok()
                } else {
                    match command_rx.recv() {
                        Ok(cmd) => Some(cmd),
                        Err(_) => break, // driver dropped its sender
                    }
                };
                match next {
                    Some(EngineCommand::Start) => running = true,
                    Some(EngineCommand::Pause) => running = false,
                    Some(EngineCommand::Stop) => break,
                    None => {}
                }
                if !running {
                    continue;
                }

                match optimizer.advance() {
                    Ok(StepOutcome::Finished) => break,
                    Ok(outcome) => {
                        let accepted = match outcome {
                            StepOutcome::Accepted(step) => Some(step),
                            _ => None,
                        };
                        let update = EngineUpdate::Step {
                            index: optimizer.stats().steps,
                            total: optimizer.config().total_steps,
                            accepted,
                            metrics: optimizer.metrics(),
                        };
                        if update_tx.send(update).is_err() {
                            return; // nobody listening
                        }
                    }
                    Err(e) => {
                        let _ = update_tx.send(EngineUpdate::Failed(e));
                        return;
                    }
                }

                if !delay.is_zero() {
                    thread::sleep(delay);
                }
            }

            log::info!("optimizer thread exiting after {} steps", optimizer.stats().steps);
            let _ = update_tx.send(EngineUpdate::Finished {
                stats: optimizer.stats(),
                metrics: optimizer.metrics(),
                history: optimizer.history().to_vec(),
            });
        })
        .map_err(|e| EngineError::Spawn(e.to_string()))?;

    Ok(EngineHandle {
        commands,
        updates,
        thread,
    })
}
