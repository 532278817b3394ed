use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::oneshot;

use crate::test_utils::enable_logger;
use crate::DispatchError;
use crate::Error;
use crate::TagDispatcher;
use crate::TagListener;

type Dispatcher = TagDispatcher<String, u32, String>;

fn sink() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let writer = Arc::clone(&seen);
    (seen, move |d| writer.lock().push(d))
}

fn assert_unknown_tag(result: crate::Result<()>) {
    assert!(matches!(
        result,
        Err(Error::Dispatch(DispatchError::UnknownTag(_)))
    ));
}

#[test]
fn test_second_registration_for_tag_fails_without_eviction() {
    enable_logger();
    let dispatcher = Dispatcher::new();
    let (seen, cb) = sink();

    dispatcher.add_callback("t".to_string(), cb).unwrap();
    let second = dispatcher.add_callback("t".to_string(), |_| {});
    assert!(matches!(
        second,
        Err(Error::Dispatch(DispatchError::DuplicateTag(_)))
    ));

    // First listener is still functional.
    dispatcher.unicast(&"t".to_string(), 5).unwrap();
    assert_eq!(vec![5], *seen.lock());
}

#[test]
fn test_tokens_compare_by_registration_identity() {
    enable_logger();
    let dispatcher = Dispatcher::new();

    let a = dispatcher.add_callback("a".to_string(), |_| {}).unwrap();
    dispatcher.remove_listener(&"a".to_string()).unwrap();
    let b = dispatcher.add_callback("a".to_string(), |_| {}).unwrap();

    assert_eq!(a.tag(), b.tag());
    assert_ne!(a, b);
    assert_eq!(a, a.clone());
}

#[test]
fn test_unicast_to_unknown_tag_fails() {
    enable_logger();
    let dispatcher = Dispatcher::new();
    assert_unknown_tag(dispatcher.unicast(&"nope".to_string(), 1));
}

#[test]
fn test_persistent_listener_survives_deliveries() {
    enable_logger();
    let dispatcher = Dispatcher::new();
    let (seen, cb) = sink();

    dispatcher.add_callback("t".to_string(), cb).unwrap();
    dispatcher.unicast(&"t".to_string(), 1).unwrap();
    dispatcher.unicast(&"t".to_string(), 2).unwrap();

    assert_eq!(vec![1, 2], *seen.lock());
}

#[test]
fn test_oneshot_listener_unreachable_after_delivery() {
    enable_logger();
    let dispatcher = Dispatcher::new();
    let (seen, cb) = sink();

    dispatcher
        .add_listener("t".to_string(), TagListener::sync_oneshot(cb))
        .unwrap();
    dispatcher.unicast(&"t".to_string(), 3).unwrap();

    assert_unknown_tag(dispatcher.unicast(&"t".to_string(), 4));
    assert_eq!(vec![3], *seen.lock());
    assert!(dispatcher.is_empty());
}

#[test]
fn test_broadcast_error_reaches_all_and_removes_oneshots() {
    enable_logger();
    let dispatcher = Dispatcher::new();
    let errors = Arc::new(Mutex::new(Vec::new()));

    let persistent_errors = Arc::clone(&errors);
    dispatcher
        .add_listener(
            "persistent".to_string(),
            TagListener::sync(|_| {}).with_error(move |e| persistent_errors.lock().push(e)),
        )
        .unwrap();

    let oneshot_errors = Arc::clone(&errors);
    dispatcher
        .add_listener(
            "oneshot".to_string(),
            TagListener::sync_oneshot(|_| {}).with_error(move |e| oneshot_errors.lock().push(e)),
        )
        .unwrap();

    dispatcher.broadcast_error("down".to_string());

    assert_eq!(2, errors.lock().len());
    assert_eq!(1, dispatcher.len());
    assert_unknown_tag(dispatcher.unicast(&"oneshot".to_string(), 1));
    dispatcher.unicast(&"persistent".to_string(), 1).unwrap();
}

#[test]
fn test_close_all_empties_registry_regardless_of_kind() {
    enable_logger();
    let dispatcher = Dispatcher::new();
    let errors = Arc::new(Mutex::new(Vec::new()));

    for tag in ["a", "b"] {
        let sink = Arc::clone(&errors);
        dispatcher
            .add_listener(
                tag.to_string(),
                TagListener::sync(|_| {}).with_error(move |e| sink.lock().push(e)),
            )
            .unwrap();
    }

    dispatcher.close_all("shutdown".to_string());

    assert_eq!(
        vec!["shutdown".to_string(), "shutdown".to_string()],
        *errors.lock()
    );
    assert!(dispatcher.is_empty());
    assert_unknown_tag(dispatcher.unicast(&"a".to_string(), 1));
    assert_unknown_tag(dispatcher.unicast(&"b".to_string(), 1));
}

#[test]
fn test_remove_listener() {
    enable_logger();
    let dispatcher = Dispatcher::new();

    dispatcher.add_callback("t".to_string(), |_| {}).unwrap();
    dispatcher.remove_listener(&"t".to_string()).unwrap();

    // Removed and never-registered tags fail the same way.
    assert_unknown_tag(dispatcher.unicast(&"t".to_string(), 1));
    assert_unknown_tag(dispatcher.remove_listener(&"t".to_string()));
}

#[tokio::test]
async fn test_add_future_resolves_on_data() {
    enable_logger();
    let dispatcher = Dispatcher::new();
    let (tx, rx) = oneshot::channel();

    dispatcher.add_future("t".to_string(), tx).unwrap();
    dispatcher.unicast(&"t".to_string(), 11).unwrap();

    assert_eq!(Ok(11), rx.await.unwrap());
    // Futures are oneshots.
    assert_unknown_tag(dispatcher.unicast(&"t".to_string(), 12));
}

#[tokio::test]
async fn test_add_future_rejects_on_broadcast_error() {
    enable_logger();
    let dispatcher = Dispatcher::new();
    let (tx, rx) = oneshot::channel();

    dispatcher.add_future("t".to_string(), tx).unwrap();
    dispatcher.broadcast_error("gone".to_string());

    assert_eq!(Err("gone".to_string()), rx.await.unwrap());
    assert!(dispatcher.is_empty());
}

#[tokio::test]
async fn test_add_callback_async_schedules_delivery() {
    enable_logger();
    let dispatcher = Dispatcher::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    dispatcher
        .add_callback_async("t".to_string(), move |d| {
            tx.send(d).unwrap();
        })
        .unwrap();
    dispatcher.unicast(&"t".to_string(), 21).unwrap();
    dispatcher.unicast(&"t".to_string(), 22).unwrap();

    assert_eq!(Some(21), rx.recv().await);
    assert_eq!(Some(22), rx.recv().await);
}
