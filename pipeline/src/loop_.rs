use std::{io, sync::Arc, time::Instant};

use log::{debug, info};
use machine_learning::{
    CHANNELS, Dataset, NUM_CLASSES,
    arch::Model,
    batch,
    specs::LossFnSpec,
};
use parking_lot::{Mutex, MutexGuard};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    PipelineConfig, PipelineErr, Result,
    device::{Tensor, TensorParam, transfer},
    eval::EvalPass,
    metrics::{EpochReport, PipelineMetrics, TrainReport},
    schedule::{EpochSchedule, LrSchedule},
    slot::{RoundRobin, SLOTS, Slot, input_shape},
};

/// Drives training over two alternating slots.
///
/// Every iteration fills the current slot's host batch while the other slot's
/// step may still be running, queues the copy to the device on the current
/// slot's stream, waits for the other slot's stream and then queues the step.
/// The model is shared by both streams, the wait keeps their steps apart.
///
/// At the end of every epoch both streams are drained, the learning rate is
/// decayed when due and the model is scored on the held out set using slot 0.
/// The following iteration starts over at slot 0.
pub struct TrainLoop<M> {
    cfg: PipelineConfig,
    model: Arc<Mutex<M>>,
    slots: [Slot; SLOTS],
    host_outputs: Tensor,
    eval_labels: Vec<usize>,
    rng: StdRng,
    metrics: PipelineMetrics,
}

impl<M: Model + 'static> TrainLoop<M> {
    /// Creates a new `TrainLoop`, compiling `model` for the configured batch.
    ///
    /// # Arguments
    /// * `cfg` - The training configuration.
    /// * `model` - An uncompiled model.
    ///
    /// # Returns
    /// `BackendUnavailable` if the model can't run here, or an error if the
    /// configuration is invalid or the model fails to compile.
    pub fn new(cfg: PipelineConfig, mut model: M) -> Result<Self> {
        cfg.validate()?;

        if !model.backend_available() {
            return Err(PipelineErr::BackendUnavailable);
        }

        let batch_size = cfg.batch_size;
        model.compile(&input_shape(batch_size), cfg.optimizer, LossFnSpec::default())?;

        let slots = [
            Slot::new(0, batch_size, cfg.device)?,
            Slot::new(1, batch_size, cfg.device)?,
        ];

        let mut host_outputs = Tensor::new(TensorParam::host(&[batch_size, NUM_CLASSES]));
        host_outputs.pin_memory()?;

        debug!(batch_size = batch_size, device = cfg.device; "pipeline allocated");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            slots,
            host_outputs,
            eval_labels: vec![0; batch_size],
            rng: StdRng::seed_from_u64(cfg.seed),
            metrics: PipelineMetrics::default(),
            cfg,
        })
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Locks the model. Only call between runs, while no step is queued.
    pub fn model(&self) -> MutexGuard<'_, M> {
        self.model.lock()
    }

    /// Writes the model's graph description.
    pub fn write_dot(&self, w: &mut dyn io::Write) -> io::Result<()> {
        self.model.lock().write_dot(w)
    }

    /// Trains for the configured amount of epochs.
    ///
    /// The metrics start from zero on every call, the model keeps training
    /// from where the previous call left it.
    ///
    /// # Arguments
    /// * `train` - The training set batches are sampled from.
    /// * `test` - The held out set scored at every epoch end.
    /// * `mean` - The per channel mean subtracted from every pixel.
    ///
    /// # Returns
    /// The per epoch evaluations and the loop's metrics, or the first failure.
    pub fn run(&mut self, train: &Dataset, test: &Dataset, mean: &[f32; CHANNELS]) -> Result<TrainReport> {
        let mut epochs = EpochSchedule::new(train.len(), self.cfg.batch_size, self.cfg.epochs);
        let mut lr = LrSchedule::new(
            self.cfg.optimizer.learning_rate(),
            self.cfg.lr_decay_every,
            self.cfg.lr_decay_factor,
        );
        let mut rr = RoundRobin::default();
        let mut report = TrainReport::default();
        self.metrics = PipelineMetrics::default();

        info!(
            epochs = self.cfg.epochs,
            epoch_end = epochs.epoch_end(),
            batch_size = self.cfg.batch_size;
            "training started"
        );

        let mut i = 0;
        while !epochs.finished() {
            let (p, q) = (rr.current(), rr.other());

            self.fill(p, train, mean)?;

            let slot = &self.slots[p];
            transfer(
                &[&slot.host_inputs, &slot.host_labels],
                &[&slot.inputs, &slot.labels],
                Some(&slot.stream),
            )?;

            let start = Instant::now();
            self.slots[q].stream.wait()?;
            self.metrics.wait_time += start.elapsed();

            self.submit_fit(p)?;
            self.metrics.bump_iteration();
            self.metrics.add_samples(self.cfg.batch_size);
            debug!(iteration = i, slot = self.slots[p].index(); "step issued");

            if epochs.ends_epoch(i) {
                let epoch = epochs.advance();
                self.metrics.bump_epoch();
                self.barrier()?;

                if let Some(rate) = lr.on_epoch(epoch) {
                    let spec = self.cfg.optimizer.with_learning_rate(rate);
                    self.model.lock().set_minimizer(spec)?;
                    info!(epoch = epoch, learning_rate = rate; "learning rate decayed");
                }

                let correct = self.evaluate(test, mean)?;
                let epoch_report = EpochReport {
                    epoch,
                    learning_rate: lr.current(),
                    correct,
                    total: test.len(),
                };
                info!(
                    epoch = epoch,
                    correct = correct,
                    total = test.len();
                    "evaluation finished, accuracy {:.2}%",
                    epoch_report.accuracy() * 100.0
                );
                report.epochs.push(epoch_report);

                rr.reset();
            } else {
                rr.advance();
            }

            i += 1;
        }

        report.metrics = self.metrics.clone();
        Ok(report)
    }

    fn fill(&mut self, p: usize, train: &Dataset, mean: &[f32; CHANNELS]) -> Result<()> {
        let start = Instant::now();
        let slot = &self.slots[p];
        let mut inputs = slot.host_inputs.lock();
        let mut labels = slot.host_labels.lock();

        batch::fill_batch(train, mean, &mut self.rng, &mut inputs, &mut labels)?;

        self.metrics.fill_time += start.elapsed();
        Ok(())
    }

    fn submit_fit(&self, p: usize) -> Result<()> {
        let slot = &self.slots[p];
        let model = Arc::clone(&self.model);
        let inputs = slot.inputs.clone();
        let labels = slot.labels.clone();
        let outputs = slot.outputs.clone();

        slot.stream.submit(move || {
            let inputs = inputs.lock();
            let labels = labels.lock();
            let mut outputs = outputs.lock();
            model.lock().fit(&inputs, &labels, &mut outputs)?;
            Ok(())
        })
    }

    /// Waits for every queued command on both streams.
    fn barrier(&mut self) -> Result<()> {
        let start = Instant::now();
        for slot in &self.slots {
            slot.stream.wait()?;
        }

        self.metrics.wait_time += start.elapsed();
        Ok(())
    }

    fn evaluate(&mut self, test: &Dataset, mean: &[f32; CHANNELS]) -> Result<usize> {
        let start = Instant::now();
        let mut pass = EvalPass {
            model: &self.model,
            slot: &self.slots[0],
            host_outputs: &self.host_outputs,
            labels: &mut self.eval_labels,
        };
        let correct = pass.run(test, mean)?;

        self.metrics.eval_time += start.elapsed();
        Ok(correct)
    }
}
