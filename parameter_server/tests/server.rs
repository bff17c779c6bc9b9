use std::num::NonZeroUsize;

use comms::specs::OptimizerSpec;
use parameter_server::{
    BarrierSync, DistKvStore, KvErr, KvStore, NoBlockingSync, ParameterServer, Synchronizer,
};
use tokio::io::{self, DuplexStream, ReadHalf, WriteHalf};

type Store = DistKvStore<ReadHalf<DuplexStream>, WriteHalf<DuplexStream>>;

const BUF_SIZE: usize = 1 << 16;

fn attach<S: Synchronizer + Sync + 'static>(server: &mut ParameterServer<S>) -> (
    comms::OnoReceiver<ReadHalf<DuplexStream>>,
    comms::OnoSender<WriteHalf<DuplexStream>>,
) {
    let (server_end, worker_end) = io::duplex(BUF_SIZE);

    let (rx, tx) = io::split(server_end);
    let (rx, tx) = comms::channel(rx, tx);
    server.spawn(rx, tx);

    let (rx, tx) = io::split(worker_end);
    comms::channel(rx, tx)
}

async fn workers<S: Synchronizer + Sync + 'static>(
    server: &mut ParameterServer<S>,
    n: usize,
) -> Vec<Store> {
    let mut stores = Vec::with_capacity(n);
    for _ in 0..n {
        let (rx, tx) = attach(server);
        stores.push(DistKvStore::handshake(rx, tx).await.unwrap());
    }

    stores
}

fn shard_size() -> NonZeroUsize {
    NonZeroUsize::new(2).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn ranks_follow_the_connection_order() {
    let mut server = ParameterServer::new(3, shard_size(), NoBlockingSync::new());
    let mut stores = workers(&mut server, 3).await;

    for (i, store) in stores.iter().enumerate() {
        assert_eq!(store.rank(), i);
        assert_eq!(store.num_workers(), 3);
        assert!(!store.is_synchronous());
    }

    for store in &mut stores {
        store.close().await.unwrap();
    }

    server.run().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn sync_mode_applies_the_summed_gradient_once() {
    let mut server = ParameterServer::new(2, shard_size(), BarrierSync::new(2));
    let mut stores = workers(&mut server, 2).await;
    assert!(stores.iter().all(|store| store.is_synchronous()));

    let spec = OptimizerSpec::GradientDescent { learning_rate: 1.0 };
    for store in &mut stores {
        store.set_optimizer(spec).await.unwrap();
        store.init(0, &[10., 10., 10.]).await.unwrap();
    }

    let handles: Vec<_> = stores
        .into_iter()
        .enumerate()
        .map(|(i, mut store)| {
            tokio::spawn(async move {
                store.barrier().await.unwrap();

                let grad = if i == 0 { [1., 2., 3.] } else { [3., 2., 1.] };
                store.push(0, &grad).await.unwrap();

                let mut out = [0.; 3];
                store.pull(0, &mut out).await.unwrap();
                store.close().await.unwrap();
                out
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), [6., 6., 6.]);
    }

    server.run().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn async_mode_applies_every_push() {
    let mut server = ParameterServer::new(1, shard_size(), NoBlockingSync::new());
    let mut store = workers(&mut server, 1).await.remove(0);

    store
        .set_optimizer(OptimizerSpec::GradientDescent { learning_rate: 0.5 })
        .await
        .unwrap();
    store.init(3, &[1., 1.]).await.unwrap();
    store.init(3, &[9., 9.]).await.unwrap();

    store.push(3, &[2., 2.]).await.unwrap();
    store.push(3, &[2., 4.]).await.unwrap();

    let mut out = [0.; 2];
    store.pull(3, &mut out).await.unwrap();
    assert_eq!(out, [-1., -2.]);

    store.close().await.unwrap();
    server.run().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn without_optimizer_pushes_replace_the_value() {
    let mut server = ParameterServer::new(1, shard_size(), NoBlockingSync::new());
    let mut store = workers(&mut server, 1).await.remove(0);

    store.init(1, &[0., 0., 0.]).await.unwrap();
    store.push(1, &[4., 5., 6.]).await.unwrap();

    let mut out = [0.; 3];
    store.pull(1, &mut out).await.unwrap();
    assert_eq!(out, [4., 5., 6.]);

    store.close().await.unwrap();
    server.run().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn errors_are_reported_and_the_session_survives() {
    let mut server = ParameterServer::new(1, shard_size(), NoBlockingSync::new());
    let mut store = workers(&mut server, 1).await.remove(0);

    let mut out = [0.; 2];
    let err = store.pull(42, &mut out).await.unwrap_err();
    assert!(matches!(err, KvErr::Remote(_)));

    store.init(42, &[1., 2.]).await.unwrap();
    store.pull(42, &mut out).await.unwrap();
    assert_eq!(out, [1., 2.]);

    let mut wrong = [0.; 3];
    let err = store.pull(42, &mut wrong).await.unwrap_err();
    assert!(matches!(err, KvErr::SizeMismatch { key: 42, got: 2, expected: 3 }));

    store.close().await.unwrap();
    server.run().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn barrier_releases_once_everyone_arrives() {
    let mut server = ParameterServer::new(2, shard_size(), NoBlockingSync::new());
    let stores = workers(&mut server, 2).await;

    let handles: Vec<_> = stores
        .into_iter()
        .map(|mut store| {
            tokio::spawn(async move {
                store.barrier().await.unwrap();
                store.barrier().await.unwrap();
                store.close().await.unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    server.run().await.unwrap();
}
