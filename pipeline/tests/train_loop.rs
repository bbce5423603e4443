use std::{sync::Arc, thread};

use machine_learning::{
    Dataset, IMAGE_LEN, LabeledSample, MlErr, NUM_CLASSES,
    arch::{Model, SoftmaxRegression},
    specs::{LossFnSpec, OptimizerSpec},
    synthetic::SyntheticCifar,
};
use parking_lot::Mutex;
use rand::{SeedableRng, rngs::StdRng};

use pipeline::{PipelineConfig, PipelineErr, TrainLoop};

#[derive(Debug, Default)]
struct Calls {
    fit_threads: Vec<String>,
    minimizers: Vec<f32>,
    evaluations: usize,
}

/// Records what the loop asks of it and always predicts the same class.
struct RecordingModel {
    calls: Arc<Mutex<Calls>>,
    predict: usize,
    fail_fit: bool,
    available: bool,
}

impl RecordingModel {
    fn new() -> (Self, Arc<Mutex<Calls>>) {
        let calls = Arc::new(Mutex::new(Calls::default()));
        let model = Self {
            calls: Arc::clone(&calls),
            predict: 0,
            fail_fit: false,
            available: true,
        };
        (model, calls)
    }
}

impl Model for RecordingModel {
    fn backend_available(&self) -> bool {
        self.available
    }

    fn compile(&mut self, input_shape: &[usize], _: OptimizerSpec, _: LossFnSpec) -> Result<(), MlErr> {
        assert_eq!(input_shape[1..], [3, 32, 32]);
        Ok(())
    }

    fn fit(&mut self, inputs: &[f32], labels: &[f32], _outputs: &mut [f32]) -> Result<(), MlErr> {
        if self.fail_fit {
            return Err(MlErr::InvalidParameter {
                what: "fit",
                detail: "injected failure".into(),
            });
        }

        assert_eq!(inputs.len(), labels.len() * IMAGE_LEN);
        let name = thread::current().name().unwrap_or_default().to_owned();
        self.calls.lock().fit_threads.push(name);
        Ok(())
    }

    fn evaluate(&mut self, _inputs: &[f32], outputs: &mut [f32]) -> Result<(), MlErr> {
        for row in outputs.chunks_exact_mut(NUM_CLASSES) {
            row.fill(0.0);
            row[self.predict] = 1.0;
        }
        self.calls.lock().evaluations += 1;
        Ok(())
    }

    fn set_minimizer(&mut self, optimizer: OptimizerSpec) -> Result<(), MlErr> {
        self.calls.lock().minimizers.push(optimizer.learning_rate());
        Ok(())
    }
}

fn dataset(labels: &[usize]) -> Dataset {
    labels
        .iter()
        .map(|&label| LabeledSample::new(label, vec![0.5; IMAGE_LEN]).unwrap())
        .collect()
}

fn config(batch_size: usize, epochs: usize) -> PipelineConfig {
    PipelineConfig {
        batch_size,
        epochs,
        optimizer: OptimizerSpec::Sgd {
            learning_rate: 0.8,
            decay: 0.0,
            momentum: 0.0,
            dampening: 0.0,
        },
        ..PipelineConfig::default()
    }
}

#[test]
fn slots_alternate_and_restart_at_zero_after_evaluation() {
    let (model, calls) = RecordingModel::new();
    let mut train_loop = TrainLoop::new(config(4, 2), model).unwrap();

    let train = dataset(&[0; 12]);
    let test = dataset(&[0; 3]);
    let report = train_loop.run(&train, &test, &[0.5; 3]).unwrap();

    assert_eq!(
        calls.lock().fit_threads,
        ["stream-0", "stream-1", "stream-0", "stream-0", "stream-1", "stream-0"]
    );
    assert_eq!(report.epochs.len(), 2);
    assert_eq!(report.metrics.iterations, 6);
    assert_eq!(report.metrics.samples, 24);
    assert_eq!(report.metrics.epochs, 2);
}

#[test]
fn every_run_reports_its_own_metrics() {
    let (model, calls) = RecordingModel::new();
    let mut train_loop = TrainLoop::new(config(4, 2), model).unwrap();

    let train = dataset(&[0; 12]);
    let test = dataset(&[0; 3]);
    let first = train_loop.run(&train, &test, &[0.0; 3]).unwrap();
    let second = train_loop.run(&train, &test, &[0.0; 3]).unwrap();

    for report in [&first, &second] {
        assert_eq!(report.metrics.iterations, 6);
        assert_eq!(report.metrics.samples, 24);
        assert_eq!(report.metrics.epochs, 2);
    }
    assert_eq!(train_loop.metrics().iterations, 6);
    assert_eq!(calls.lock().fit_threads.len(), 12);
}

#[test]
fn learning_rate_halves_every_five_epochs() {
    let (model, calls) = RecordingModel::new();
    let mut train_loop = TrainLoop::new(config(4, 10), model).unwrap();

    let train = dataset(&[1, 2, 3, 4]);
    let test = dataset(&[1]);
    let report = train_loop.run(&train, &test, &[0.0; 3]).unwrap();

    assert_eq!(calls.lock().minimizers, [0.4, 0.2]);
    assert_eq!(calls.lock().fit_threads.len(), 10);

    let rates: Vec<f32> = report.epochs.iter().map(|e| e.learning_rate).collect();
    assert_eq!(rates, [0.8, 0.8, 0.8, 0.8, 0.4, 0.4, 0.4, 0.4, 0.4, 0.2]);
    let numbers: Vec<usize> = report.epochs.iter().map(|e| e.epoch).collect();
    assert_eq!(numbers, (1..=10).collect::<Vec<_>>());
}

#[test]
fn evaluation_scores_every_test_sample_once() {
    let (model, calls) = RecordingModel::new();
    let mut train_loop = TrainLoop::new(config(4, 3), model).unwrap();

    let train = dataset(&[0, 1, 2, 3, 4, 5]);
    let test = dataset(&[0, 1, 0, 2, 0]);
    let report = train_loop.run(&train, &test, &[0.0; 3]).unwrap();

    for epoch in &report.epochs {
        assert_eq!(epoch.correct, 3);
        assert_eq!(epoch.total, 5);
        assert_eq!(epoch.accuracy(), 0.6);
    }

    // Two chunks of 4 per epoch, the last one partial.
    assert_eq!(calls.lock().evaluations, 6);
}

#[test]
fn a_failing_step_stops_training() {
    let (mut model, calls) = RecordingModel::new();
    model.fail_fit = true;
    let mut train_loop = TrainLoop::new(config(4, 1), model).unwrap();

    let train = dataset(&[0; 8]);
    let test = dataset(&[0]);
    let res = train_loop.run(&train, &test, &[0.0; 3]);

    match res {
        Err(PipelineErr::Stream { stream: 0, msg }) => assert!(msg.contains("injected failure")),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(calls.lock().evaluations, 0);
}

#[test]
fn missing_backend_aborts_before_compiling() {
    let (mut model, _) = RecordingModel::new();
    model.available = false;

    let res = TrainLoop::new(config(4, 1), model);
    assert!(matches!(res, Err(PipelineErr::BackendUnavailable)));
}

#[test]
fn invalid_config_is_rejected() {
    let (model, _) = RecordingModel::new();
    let res = TrainLoop::new(config(0, 1), model);
    assert!(matches!(res, Err(PipelineErr::InvalidConfig(_))));
}

#[test]
fn empty_training_set_fails() {
    let (model, _) = RecordingModel::new();
    let mut train_loop = TrainLoop::new(config(4, 1), model).unwrap();

    let res = train_loop.run(&Dataset::default(), &dataset(&[0]), &[0.0; 3]);
    assert!(matches!(res, Err(PipelineErr::Ml(MlErr::EmptyDataset))));
}

#[test]
fn softmax_regression_learns_synthetic_cifar() {
    let generator = SyntheticCifar::new(0.3).unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    let train = generator.generate(200, &mut rng).unwrap();
    let test = generator.generate(100, &mut rng).unwrap();
    let mean = train.channel_mean();

    let cfg = PipelineConfig {
        batch_size: 16,
        epochs: 3,
        optimizer: OptimizerSpec::Sgd {
            learning_rate: 0.001,
            decay: 0.0,
            momentum: 0.9,
            dampening: 0.9,
        },
        ..PipelineConfig::default()
    };
    let mut train_loop = TrainLoop::new(cfg, SoftmaxRegression::new(NUM_CLASSES, 0)).unwrap();
    let report = train_loop.run(&train, &test, &mean).unwrap();

    assert_eq!(report.epochs.len(), 3);
    assert_eq!(report.metrics.iterations, 39);
    let last = report.last().unwrap();
    assert!(last.accuracy() > 0.6, "accuracy {}", last.accuracy());

    let mut dot = Vec::new();
    train_loop.write_dot(&mut dot).unwrap();
    assert!(String::from_utf8(dot).unwrap().contains("dense (3072x10)"));
}
