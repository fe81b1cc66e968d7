use std::cell::RefCell;
use std::rc::Rc;
use trellis::{missing, supply, BusError, Provide, Service};

struct TrainRequest {
    epochs: u32,
}

type Device = String;

fn device() -> Provide<Device> {
    missing("device")
}

#[test]
fn handlers_dispatch_by_action_name() {
    let ran = Rc::new(RefCell::new(Vec::new()));
    let mut service = Service::new();
    service.on("train", {
        let ran = Rc::clone(&ran);
        move |request: &TrainRequest, scope| {
            let device = scope.resolve(device)?;
            ran.borrow_mut().push((request.epochs, device));
            Ok(())
        }
    });
    service.provider_mut().override_with(device, || supply("cuda".to_string()));

    service.handle("train", &TrainRequest { epochs: 3 }).unwrap();
    assert_eq!(*ran.borrow(), vec![(3, "cuda".to_string())]);
}

#[test]
fn unknown_action_is_a_noop() {
    let service = Service::new();
    service.handle("evaluate", &TrainRequest { epochs: 1 }).unwrap();
}

#[test]
fn wrong_payload_type_is_rejected_with_the_action_name() {
    let mut service = Service::new();
    service.on("train", |_: &TrainRequest, _| Ok(()));

    let error = service.handle("train", &"not a request").unwrap_err();
    match error {
        BusError::MessageType { topic, .. } => assert_eq!(topic, "train"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn handlers_for_one_action_run_in_registration_order() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let mut service = Service::new();
    service.on("train", {
        let order = Rc::clone(&order);
        move |_: &TrainRequest, _| {
            order.borrow_mut().push("warmup");
            Ok(())
        }
    });
    service.on("train", {
        let order = Rc::clone(&order);
        move |_: &TrainRequest, _| {
            order.borrow_mut().push("fit");
            Ok(())
        }
    });

    service.handle("train", &TrainRequest { epochs: 1 }).unwrap();
    assert_eq!(*order.borrow(), vec!["warmup", "fit"]);
}
