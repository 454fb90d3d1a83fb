use super::*;
use approx::assert_abs_diff_eq;

#[test]
fn test_running_mean() {
    let mut mean = RunningMean::default();
    assert_abs_diff_eq!(mean.mean(), 0.0);
    mean.push(1.0);
    mean.push(2.0);
    mean.push(6.0);
    assert_eq!(mean.count(), 3);
    assert_abs_diff_eq!(mean.mean(), 3.0);
    mean.reset();
    assert_eq!(mean.count(), 0);
}

#[test]
fn test_memory_sink_series() {
    let mut sink = MemorySink::default();
    sink.add_scalar(G_INIT, 0.5, 0).unwrap();
    sink.add_scalar(GENERATOR_LOSS, 2.0, 1).unwrap();
    sink.add_scalar(G_INIT, 0.25, 1).unwrap();
    assert_eq!(sink.series(G_INIT), vec![(0, 0.5), (1, 0.25)]);
    assert!(sink.series(DISCRIMINATOR_LOSS).is_empty());
}

#[test]
fn test_jsonl_writer_appends() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut writer = JsonlSummaryWriter::create(dir.path()).unwrap();
        writer.add_scalar(G_GAN, 1.5, 0).unwrap();
        writer.flush().unwrap();
    }
    let mut writer = JsonlSummaryWriter::create(dir.path()).unwrap();
    writer.add_scalar(DISCRIMINATOR_LOSS, -0.5, 1).unwrap();
    writer.flush().unwrap();

    let records = JsonlSummaryWriter::read_all(writer.path()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].tag, G_GAN);
    assert_eq!(records[1].step, 1);
    assert_abs_diff_eq!(records[1].value, -0.5);
}
