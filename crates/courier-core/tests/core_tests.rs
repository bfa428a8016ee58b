use courier_core::{
    CancellationGate, EngineConfig, ExportMessage, Notice, OperationError, PrimitiveError,
    ProgressSink, ProgressState, TransferContext, WorkList, percentage,
};

#[test]
fn test_percentage_sequence_is_monotonic_and_reaches_100() {
    for total in [1u64, 3, 7, 100, 1023, 4096 + 17] {
        for step in [1u64, 2, 5, 64] {
            let sink = ProgressSink::new(total);
            let mut rendered = vec![sink.percentage()];
            let mut remaining = total;

            while remaining > 0 {
                let delta = step.min(remaining);
                sink.advance(delta);
                remaining -= delta;
                rendered.push(sink.percentage());
            }

            assert!(rendered.windows(2).all(|w| w[0] <= w[1]), "total={total} step={step}");
            assert_eq!(*rendered.last().unwrap(), 100);
            assert!(rendered.iter().all(|p| *p <= 100));
        }
    }
}

#[test]
fn test_overshoot_is_clamped_only_at_render() {
    let sink = ProgressSink::new(10);
    sink.advance(15);

    let state = sink.snapshot();
    assert_eq!(state.completed, 15);
    assert_eq!(state.percentage(), 100);
    assert_eq!(percentage(state.completed, state.total), 100);
}

#[test]
fn test_context_shares_one_accumulator() {
    let sink = ProgressSink::new(100);
    let gate = CancellationGate::never();

    let a = TransferContext::new(&sink, &gate);
    let b = a;
    a.advance(30);
    b.advance(20);

    assert_eq!(sink.snapshot(), ProgressState { completed: 50, total: 100 });
}

#[test]
fn test_error_surface_codes() {
    let err = OperationError::from(PrimitiveError::new(-28, "No space left on device"));
    assert_eq!(err.code(), -28);
    assert!(err.to_string().contains("No space left"));

    let err = OperationError::InsufficientSpace {
        volume: "ux0:".into(),
        required: 10,
        available: 5,
    };
    assert_eq!(err.code(), -1);
}

#[test]
fn test_worklist_and_notice_together() {
    let list = WorkList::resolve("ux0:music", "a.mp3", &["a.mp3".into(), "b.mp3".into()]);
    assert_eq!(list.base(), "ux0:music/");
    assert_eq!(list.paths().count(), 2);

    let notice = Notice::Exported(ExportMessage::from_counts(2, 0, 0).unwrap());
    assert_eq!(notice.to_string(), "Exported 2 song(s).");
}

#[test]
fn test_config_roundtrips_through_builder_defaults() {
    let built = EngineConfig::builder().build().unwrap();
    let default = EngineConfig::default();

    assert_eq!(built.poll_interval, default.poll_interval);
    assert_eq!(built.transfer_chunk_size, default.transfer_chunk_size);
    assert_eq!(built.always_available_volume, default.always_available_volume);
    assert_eq!(built.user_agent, default.user_agent);
}
