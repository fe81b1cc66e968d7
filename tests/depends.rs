use std::cell::{Cell, RefCell};
use std::rc::Rc;
use trellis::{missing, scoped, supply, Provide, Provider, ResolveError};

fn answer() -> Provide<u32> {
    supply(42)
}

fn device() -> Provide<String> {
    missing("device")
}

thread_local! {
    static ACQUIRED: Cell<u32> = Cell::new(0);
    static RELEASED: Cell<u32> = Cell::new(0);
    static ORDER: RefCell<Vec<&'static str>> = RefCell::new(Vec::new());
}

fn tracked_resource() -> Provide<u32> {
    ACQUIRED.with(|count| count.set(count.get() + 1));
    scoped(7, || RELEASED.with(|count| count.set(count.get() + 1)))
}

fn outer_resource() -> Provide<&'static str> {
    ORDER.with(|order| order.borrow_mut().push("acquire outer"));
    scoped("outer", || {
        ORDER.with(|order| order.borrow_mut().push("release outer"))
    })
}

fn inner_resource() -> Provide<&'static str> {
    ORDER.with(|order| order.borrow_mut().push("acquire inner"));
    scoped("inner", || {
        ORDER.with(|order| order.borrow_mut().push("release inner"))
    })
}

#[test]
fn plain_provider_resolves_on_every_call() {
    let provider = Provider::new();
    let first = provider.inject(|scope| scope.resolve(answer)).unwrap();
    let second = provider.inject(|scope| scope.resolve(answer)).unwrap();
    assert_eq!(first, 42);
    assert_eq!(second, 42);
}

#[test]
fn scoped_provider_releases_after_the_wrapped_call() {
    let provider = Provider::new();
    let value = provider
        .inject(|scope| {
            let value = scope.resolve(tracked_resource).unwrap();
            assert_eq!(ACQUIRED.with(Cell::get), 1);
            assert_eq!(RELEASED.with(Cell::get), 0, "still inside the call");
            Ok::<u32, ResolveError>(value)
        })
        .unwrap();
    assert_eq!(value, 7);
    assert_eq!(RELEASED.with(Cell::get), 1);
}

#[test]
fn scoped_providers_release_in_reverse_acquisition_order() {
    let provider = Provider::new();
    provider.inject(|scope| {
        scope.resolve(outer_resource).unwrap();
        scope.resolve(inner_resource).unwrap();
    });
    let order = ORDER.with(|order| order.borrow().clone());
    assert_eq!(
        order,
        vec![
            "acquire outer",
            "acquire inner",
            "release inner",
            "release outer"
        ]
    );
}

#[test]
fn scoped_provider_releases_even_when_the_call_fails() {
    let provider = Provider::new();
    let result: Result<u32, &str> = provider.inject(|scope| {
        scope.resolve(tracked_resource).unwrap();
        Err("wrapped call failed")
    });
    assert!(result.is_err());
    assert_eq!(RELEASED.with(Cell::get), 1);
}

#[test]
fn override_replaces_provider_until_removed() {
    let mut provider = Provider::new();
    provider.override_with(answer, || supply(43));
    assert_eq!(provider.inject(|scope| scope.resolve(answer)).unwrap(), 43);

    provider.remove_override(answer);
    assert_eq!(provider.inject(|scope| scope.resolve(answer)).unwrap(), 42);
}

#[test]
fn missing_provider_is_a_configuration_error() {
    let mut provider = Provider::new();
    let error = provider.inject(|scope| scope.resolve(device)).unwrap_err();
    assert!(matches!(error, ResolveError::Unimplemented("device")));

    provider.override_with(device, || supply("cuda".to_string()));
    let resolved = provider.inject(|scope| scope.resolve(device)).unwrap();
    assert_eq!(resolved, "cuda");
}

#[test]
fn override_may_introduce_a_scoped_resource() {
    let released = Rc::new(Cell::new(0u32));
    let mut provider = Provider::new();
    provider.override_with(answer, {
        let released = Rc::clone(&released);
        move || {
            let released = Rc::clone(&released);
            scoped(99, move || released.set(released.get() + 1))
        }
    });
    let value = provider.inject(|scope| scope.resolve(answer)).unwrap();
    assert_eq!(value, 99);
    assert_eq!(released.get(), 1);
}
