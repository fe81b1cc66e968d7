use anyhow::anyhow;
use std::cell::RefCell;
use std::rc::Rc;
use trellis::{missing, supply, BusError, Consumer, Producer, Provide, ResolveError, TypeSet};

struct ModelTrained {
    metrics: Vec<i32>,
}

struct ModelEvaluated {
    metrics: Vec<i32>,
}

struct Unrouted;

type MetricsLog = Rc<RefCell<Vec<Vec<i32>>>>;

fn metrics_log() -> Provide<MetricsLog> {
    missing("metrics log")
}

fn telemetry_consumer(log: &MetricsLog) -> Consumer {
    let mut consumer = Consumer::new();
    consumer.on_union(
        TypeSet::of::<ModelTrained>().or::<ModelEvaluated>(),
        |event, scope| {
            let log = scope.resolve(metrics_log)?;
            if let Some(event) = event.downcast_ref::<ModelTrained>() {
                log.borrow_mut().push(event.metrics.clone());
            } else if let Some(event) = event.downcast_ref::<ModelEvaluated>() {
                log.borrow_mut().push(event.metrics.clone());
            }
            Ok(())
        },
    );
    consumer.provider_mut().override_with(metrics_log, {
        let log = Rc::clone(log);
        move || supply(Rc::clone(&log))
    });
    consumer
}

#[test]
fn union_handler_receives_every_member_type() {
    let log: MetricsLog = Rc::new(RefCell::new(Vec::new()));
    let mut producer = Producer::new();
    producer.register(telemetry_consumer(&log));

    producer.dispatch(&ModelTrained { metrics: vec![1, 2, 3] }).unwrap();
    producer.dispatch(&ModelEvaluated { metrics: vec![4, 5, 6] }).unwrap();
    assert_eq!(*log.borrow(), vec![vec![1, 2, 3], vec![4, 5, 6]]);
}

#[test]
fn unmatched_event_is_silently_dropped() {
    let log: MetricsLog = Rc::new(RefCell::new(Vec::new()));
    let mut producer = Producer::new();
    producer.register(telemetry_consumer(&log));

    producer.dispatch(&Unrouted).unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn failing_consumer_does_not_block_the_fanout() {
    let delivered = Rc::new(RefCell::new(Vec::new()));

    let mut failing = Consumer::new();
    failing.on(|_: &ModelTrained, _| Err(anyhow!("checkpoint write failed").into()));

    let mut healthy = Consumer::new();
    healthy.on({
        let delivered = Rc::clone(&delivered);
        move |event: &ModelTrained, _| {
            delivered.borrow_mut().push(event.metrics.clone());
            Ok(())
        }
    });

    let mut producer = Producer::new();
    producer.register(failing);
    producer.register(healthy);

    let error = producer.dispatch(&ModelTrained { metrics: vec![9] }).unwrap_err();
    assert!(matches!(error, BusError::Handler(_)));
    assert_eq!(*delivered.borrow(), vec![vec![9]], "second consumer still served");
}

#[test]
fn error_inside_a_consumer_aborts_its_remaining_handlers() {
    let reached = Rc::new(RefCell::new(Vec::new()));
    let mut consumer = Consumer::new();
    consumer.on({
        let reached = Rc::clone(&reached);
        move |_: &ModelTrained, _| {
            reached.borrow_mut().push("first");
            Err(anyhow!("boom").into())
        }
    });
    consumer.on({
        let reached = Rc::clone(&reached);
        move |_: &ModelTrained, _| {
            reached.borrow_mut().push("second");
            Ok(())
        }
    });

    let mut producer = Producer::new();
    producer.register(consumer);

    assert!(producer.dispatch(&ModelTrained { metrics: vec![] }).is_err());
    assert_eq!(*reached.borrow(), vec!["first"]);
}

#[test]
fn unoverridden_dependency_surfaces_as_configuration_error() {
    let mut consumer = Consumer::new();
    consumer.on(|_: &ModelTrained, scope| {
        let _ = scope.resolve(metrics_log)?;
        Ok(())
    });
    let mut producer = Producer::new();
    producer.register(consumer);

    let error = producer.dispatch(&ModelTrained { metrics: vec![] }).unwrap_err();
    assert!(matches!(
        error,
        BusError::Resolve(ResolveError::Unimplemented("metrics log"))
    ));
}
