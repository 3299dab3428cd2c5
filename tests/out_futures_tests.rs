use portfutures::core::Promise;
use portfutures::{FutureError, OutFutures, ALL_PORTS};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
struct Volume {
    voxels: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
struct Histogram {
    bins: Vec<u64>,
}

#[test]
fn test_names_from_futures() {
    let volume = Promise::new::<Volume>("volume");
    let histogram = Promise::new::<Histogram>("histogram");

    let outputs = OutFutures::new(vec![volume.future(), histogram.future()]).unwrap();

    assert_eq!(outputs.ports().collect::<Vec<_>>(), vec!["volume", "histogram"]);
    assert_eq!(outputs.get_future("volume").unwrap(), &volume.future());
    assert_eq!(outputs.get_futures().len(), 2);
}

#[test]
fn test_explicit_names() {
    let a = Promise::unnamed::<u32>();
    let b = Promise::unnamed::<u32>();

    let outputs = OutFutures::with_names(
        vec![a.future(), b.future()],
        vec!["left".to_string(), "right".to_string()],
    )
    .unwrap();

    b.set(7u32).unwrap();
    assert_eq!(outputs.get::<u32>("right").unwrap(), 7);
    assert!(!outputs.is_ready("left").unwrap());
}

#[test]
fn test_construction_errors() {
    let a = Promise::new::<u32>("same");
    let b = Promise::new::<u32>("same");

    assert_eq!(
        OutFutures::new(vec![a.future(), b.future()]).unwrap_err(),
        FutureError::DuplicatePort("same".to_string())
    );
    assert_eq!(
        OutFutures::with_names(vec![a.future()], vec![]).unwrap_err(),
        FutureError::NameCountMismatch {
            futures: 1,
            names: 0,
        }
    );
    assert!(matches!(
        OutFutures::with_names(vec![a.future()], vec![ALL_PORTS.to_string()]),
        Err(FutureError::InvalidPortName(_))
    ));
}

#[test]
fn test_unknown_port() {
    let promise = Promise::new::<u32>("volume");
    let outputs = OutFutures::new(vec![promise.future()]).unwrap();

    assert_eq!(
        outputs.get::<u32>("histogram"),
        Err(FutureError::UnknownPort("histogram".to_string()))
    );
    assert!(matches!(outputs.is_ready("histogram"), Err(FutureError::UnknownPort(_))));
    assert!(matches!(outputs.wait("histogram"), Err(FutureError::UnknownPort(_))));
}

#[test]
fn test_get_future_rejects_all_ports() {
    let promise = Promise::new::<u32>("volume");
    let outputs = OutFutures::new(vec![promise.future()]).unwrap();

    assert!(matches!(
        outputs.get_future(ALL_PORTS),
        Err(FutureError::UnknownPort(_))
    ));
}

#[test]
fn test_histogram_ready_before_volume() {
    let volume = Promise::new::<Volume>("volume");
    let histogram = Promise::new::<Histogram>("histogram");
    let outputs = OutFutures::new(vec![volume.future(), histogram.future()]).unwrap();

    histogram.set(Histogram { bins: vec![1, 2, 3] }).unwrap();

    assert!(outputs.is_ready("histogram").unwrap());
    assert!(!outputs.is_ready("volume").unwrap());
    assert!(!outputs.is_ready(ALL_PORTS).unwrap());
    assert_eq!(
        outputs.get::<Histogram>("histogram").unwrap(),
        Histogram { bins: vec![1, 2, 3] }
    );

    let reader = {
        let outputs = outputs.clone();
        thread::spawn(move || outputs.get::<Volume>("volume"))
    };
    thread::sleep(Duration::from_millis(20));
    assert!(!reader.is_finished());

    volume.set(Volume { voxels: vec![9; 4] }).unwrap();
    assert_eq!(reader.join().unwrap().unwrap(), Volume { voxels: vec![9; 4] });
    assert!(outputs.is_ready(ALL_PORTS).unwrap());
}

#[test]
fn test_wait_for_any_all_ports_returns_on_ready_member() {
    let promises: Vec<_> = (0..4).map(|i| Promise::new::<u32>(format!("out{}", i))).collect();
    let outputs = OutFutures::new(promises.iter().map(Promise::future).collect()).unwrap();

    promises[2].set(2u32).unwrap();
    outputs.wait_for_any(ALL_PORTS).unwrap();
    assert!(matches!(
        outputs.wait_for_any_timeout("out0", Duration::from_millis(10)),
        Err(FutureError::Timeout { .. })
    ));
}

#[test]
fn test_wait_for_any_all_ports_blocks() {
    let promises: Vec<_> = (0..3).map(|i| Promise::new::<u32>(format!("out{}", i))).collect();
    let outputs = OutFutures::new(promises.iter().map(Promise::future).collect()).unwrap();

    let waiter = {
        let outputs = outputs.clone();
        thread::spawn(move || outputs.wait_for_any(ALL_PORTS))
    };
    thread::sleep(Duration::from_millis(20));
    assert!(!waiter.is_finished());

    promises[0].set(0u32).unwrap();
    waiter.join().unwrap().unwrap();
    assert!(!outputs.is_ready(ALL_PORTS).unwrap());
}

#[test]
fn test_wait_all_ports() {
    let promises: Vec<_> = (0..3).map(|i| Promise::new::<u32>(format!("out{}", i))).collect();
    let outputs = OutFutures::new(promises.iter().map(Promise::future).collect()).unwrap();

    let producer = thread::spawn(move || {
        for (i, promise) in promises.iter().enumerate() {
            thread::sleep(Duration::from_millis(5));
            promise.set(i as u32).unwrap();
        }
    });

    outputs.wait(ALL_PORTS).unwrap();
    assert!(outputs.is_ready(ALL_PORTS).unwrap());
    producer.join().unwrap();
}

#[test]
fn test_take_once() {
    let promise = Promise::new::<Volume>("volume");
    let outputs = OutFutures::new(vec![promise.future()]).unwrap();
    promise.set(Volume { voxels: vec![1] }).unwrap();

    assert_eq!(outputs.take::<Volume>("volume").unwrap().voxels, vec![1]);
    assert!(matches!(
        outputs.take::<Volume>("volume"),
        Err(FutureError::UseAfterConsume(_))
    ));
}

#[test]
fn test_empty_registry_wait_for_any() {
    let outputs = OutFutures::new(Vec::new()).unwrap();
    assert_eq!(outputs.wait_for_any(ALL_PORTS), Err(FutureError::EmptyGroup));
}

#[tokio::test]
async fn test_wait_async() {
    let promise = Promise::new::<u32>("total");
    let outputs = OutFutures::new(vec![promise.future()]).unwrap();

    let producer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        promise.set(11u32).unwrap();
    });

    outputs.wait_async("total").await.unwrap();
    assert_eq!(outputs.get::<u32>("total").unwrap(), 11);
    producer.join().unwrap();
}
